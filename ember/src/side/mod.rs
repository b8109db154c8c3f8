//! Side surfaces that share the socket but not the map rooms: the chess
//! pair-router and the party-quest stage relay.

pub mod chess;
pub mod party_quest;

pub use chess::ChessLobby;
pub use party_quest::PartyQuestRelay;
