//! voicenav - browser login and remote control channel for the voice
//! navigation backend
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod traits;
pub mod websocket;
