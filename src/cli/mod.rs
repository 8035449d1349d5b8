//! CLI module for voicenav.
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing
//! - Version display
//! - Browser login and logout
//! - An interactive control channel session
//!
//! # Usage
//!
//! ```ignore
//! use voicenav::cli::{parse_args, run_cli_command};
//! use voicenav::config::AppConfig;
//!
//! let command = parse_args(std::env::args());
//! run_cli_command(command, &AppConfig::from_env()).await?;
//! ```

pub mod args;
pub mod connect;
pub mod login;
pub mod version;

pub use args::{parse_args, CliCommand, USAGE};
pub use connect::{handle_connect_command, parse_tool_line};
pub use login::{handle_login_command, handle_logout_command, token_store_for};
pub use version::{handle_version_command, VERSION};

use color_eyre::Result;

use crate::config::AppConfig;

/// Run a parsed CLI command to completion.
pub async fn run_cli_command(command: CliCommand, config: &AppConfig) -> Result<()> {
    match command {
        CliCommand::Version => {
            handle_version_command();
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Login => handle_login_command(config).await,
        CliCommand::Logout => handle_logout_command(config).await,
        CliCommand::Connect => handle_connect_command(config).await,
    }
}
