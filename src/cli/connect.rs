//! Connect command: a line-oriented shell over the control channel.
//!
//! Each stdin line is `<tool> [json-arguments]` and goes out as one tool
//! call. Inbound frames are printed to stdout as they arrive.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::config::AppConfig;
use crate::websocket::{ControlChannel, ToolCallRequest};

/// Parse one input line into a tool call.
///
/// Blank lines yield `Ok(None)`. The arguments, if present, must be a JSON
/// object.
pub fn parse_tool_line(line: &str) -> Result<Option<ToolCallRequest>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (tool, rest) = match line.split_once(char::is_whitespace) {
        Some((tool, rest)) => (tool, rest.trim()),
        None => (line, ""),
    };

    if rest.is_empty() {
        return Ok(Some(ToolCallRequest::new(tool)));
    }

    let arguments: serde_json::Value =
        serde_json::from_str(rest).map_err(|e| format!("invalid JSON arguments: {}", e))?;
    ToolCallRequest::with_arguments(tool, arguments)
        .map(Some)
        .ok_or_else(|| "arguments must be a JSON object".to_string())
}

pub async fn handle_connect_command(config: &AppConfig) -> Result<()> {
    let channel = ControlChannel::from_config(config);
    channel
        .connect()
        .await
        .wrap_err_with(|| format!("Could not connect to {}", config.control_url))?;
    println!("Connected to {}", channel.url());

    let mut inbound = channel.receive_messages();
    let printer = tokio::spawn(async move {
        while let Some(frame) = inbound.next().await {
            println!("<- {}", frame);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line.wrap_err("Failed to read stdin")? {
                    Some(line) => line,
                    None => break,
                };
                match parse_tool_line(&line) {
                    Ok(Some(request)) => {
                        if !channel.send_tool_call(&request).await {
                            warn!(tool = %request.tool_name, "Tool call not sent, channel is not connected");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    channel.close().await;
    let _ = printer.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_tool_line("   "), Ok(None));
    }

    #[test]
    fn test_parse_tool_without_arguments() {
        let request = parse_tool_line("scroll_down").unwrap().unwrap();
        assert_eq!(request.tool_name, "scroll_down");
        assert!(request.arguments.is_empty());
    }

    #[test]
    fn test_parse_tool_with_arguments() {
        let request = parse_tool_line(r#"navigate {"url": "https://example.com"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(request.tool_name, "navigate");
        assert_eq!(request.arguments["url"], json!("https://example.com"));
    }

    #[test]
    fn test_parse_rejects_non_object_arguments() {
        assert!(parse_tool_line("click [1, 2]").is_err());
        assert!(parse_tool_line("click {not json").is_err());
    }
}
