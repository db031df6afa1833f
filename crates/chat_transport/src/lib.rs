//! chat_transport - Real-time transport adapter
//!
//! Wraps an externally-provided real-time connection, scoped to one
//! `(visitor, session)` pair. Translates protocol events into typed
//! listener callbacks, owns the reconnect policy, and fills the protocol's
//! missing "agent stopped typing" push with a local auto-clear.

pub mod adapter;
pub mod connection;
pub mod error;
pub mod listeners;
pub mod states;

// Re-exports
pub use adapter::{TransportAdapter, TransportOptions};
pub use connection::{ClientSignal, ConnectParams, ConnectionFactory, RealtimeConnection, WireEvent};
pub use error::TransportError;
pub use listeners::{ListenerSet, Subscription};
pub use states::LinkState;
