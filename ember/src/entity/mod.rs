pub mod monster;
pub mod player;

pub use monster::*;
pub use player::*;
