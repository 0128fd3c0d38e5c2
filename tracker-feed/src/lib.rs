//! Realtime signal feed for CryptoTracker
//!
//! This crate provides the client-side connection manager for the
//! backend's `/ws/signals` push channel: session-gated connect,
//! keepalive heartbeat, close-code-aware reconnection, and fan-out of
//! decoded frames to a registered callback.

pub mod config;
pub mod websocket;

pub use config::FeedConfig;
pub use websocket::SignalFeed;
