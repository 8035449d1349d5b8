//! Command-line argument parsing for the voicenav CLI.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Run the browser login flow
    Login,
    /// Clear stored tokens
    Logout,
    /// Open the control channel and relay tool calls from stdin (default)
    Connect,
}

/// Parse command-line arguments and return the appropriate command.
///
/// # Examples
///
/// ```
/// use voicenav::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["voicenav".to_string(), "login".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Login);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    for arg in args.skip(1) {
        // Skip the program name
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" | "help" => return CliCommand::Help,
            "login" | "--login" => return CliCommand::Login,
            "logout" | "--logout" => return CliCommand::Logout,
            "connect" | "--connect" => return CliCommand::Connect,
            _ => {}
        }
    }
    CliCommand::Connect
}

/// Usage text printed for `--help`.
pub const USAGE: &str = "\
Usage: voicenav [COMMAND]

Commands:
  login      Sign in through the browser
  logout     Remove stored tokens
  connect    Open the control channel (default)

Options:
  -h, --help       Print help
  -V, --version    Print version

In `connect` mode each stdin line is `<tool> [json-arguments]`;
inbound frames are printed as they arrive.";
