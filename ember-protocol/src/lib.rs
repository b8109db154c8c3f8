//! The wire model: one JSON envelope `{"event": <name>, "data": <payload>}`
//! per message, in both directions. Serverbound payloads live under
//! [`server`] (`S*` types), clientbound under [`client`] (`C*` types).

pub mod client;
pub mod server;

mod envelope;

pub use envelope::*;

/// A loosely-shaped payload that the server relays without interpreting.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
