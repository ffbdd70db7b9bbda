//! Server-authoritative multiplayer UNO.
//!
//! The `uno` tree holds the deck, rule engine and game state machine;
//! every transition is a pure function from one snapshot to the next.
//! The `sync` tree wraps one such snapshot per room behind an HTTP and
//! WebSocket API: clients send intents, the server validates them
//! (turn ownership included) and fans the confirmed, per-viewer
//! redacted snapshot out to every subscriber.

pub mod sync;
pub mod uno;
