//! Control channel to the voicenav backend.
//!
//! This module provides [`ControlChannel`], a single-flight WebSocket client
//! with bounded connection retries. Tool calls go out as JSON text frames;
//! inbound text frames are exposed as a stream of raw payloads.

pub mod client;
pub mod messages;

pub use client::{
    ChannelError, ChannelState, ControlChannel, RetryPolicy, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_DELAY,
};
pub use messages::ToolCallRequest;
