//! Authentication for voicenav.
//!
//! - Token pair storage
//! - Loopback callback server for the OAuth redirect
//! - Login flow orchestration

pub mod callback_server;
pub mod session;
pub mod tokens;

pub use callback_server::{
    CallbackServerError, CodeCallback, LoopbackCallbackServer, ReceivedCode, CALLBACK_PATH,
};
pub use session::{AuthSessionManager, LoginStart, LoginState, TokenCallback};
pub use tokens::{TokenFile, TokenPair};
