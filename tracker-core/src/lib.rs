//! Core types for the CryptoTracker realtime feed
//!
//! This crate defines the shared data structures used across the tracker,
//! including the websocket wire protocol, session credentials, and the
//! common error type.

pub mod error;
pub mod session;
pub mod websocket;

pub use error::{TrackerError, TrackerResult};
pub use session::Session;
pub use websocket::{ClientMessage, FeedState, ServerMessage};
