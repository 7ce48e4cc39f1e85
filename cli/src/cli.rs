//! Command-line arguments

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tooloop_domain::TypeDescriptor;

/// Run a tool-calling model loop
#[derive(Parser, Debug)]
#[command(name = "tooloop")]
#[command(author, version, about)]
#[command(long_about = r#"
Sends a prompt to a model, runs any tools it asks for concurrently, and
loops until the model answers or the tool turn cap is reached.

The model is served from a replay script (--script), a JSON list of turns:

  {"turns": [
    {"text": "Checking.", "tool_calls": [{"name": "current_time"}]},
    {"text": "It is noon."}
  ]}

Built-in tools: echo, current_time, read_file, show_image.

Examples:
  tooloop --script turns.json "What time is it?"
  tooloop --script turns.json --stream -v "What time is it?"
  tooloop --script turns.json --returns integer "How many files?"
"#)]
pub struct Cli {
    /// The prompt to send
    pub prompt: Option<String>,

    /// Replay script serving the model turns
    #[arg(short, long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// System prompt for plain runs
    #[arg(long, value_name = "TEXT")]
    pub system: Option<String>,

    /// Decode the answer as this type (typed function mode)
    #[arg(short, long, value_enum, value_name = "TYPE")]
    pub returns: Option<ReturnKind>,

    /// Stream model turns
    #[arg(long)]
    pub stream: bool,

    /// Tool-executing turns before the final no-tools call
    #[arg(long, value_name = "N")]
    pub max_turns: Option<usize>,

    /// Per-call tool timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// Do not offer any tools to the model
    #[arg(long)]
    pub no_tools: bool,

    /// Write the JSONL conversation log here
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress tool progress on stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

/// Return types available from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReturnKind {
    Text,
    Integer,
    Float,
    Boolean,
    /// Any JSON value
    Json,
    /// A list of strings
    Lines,
}

impl ReturnKind {
    pub fn descriptor(self) -> TypeDescriptor {
        match self {
            ReturnKind::Text => TypeDescriptor::Text,
            ReturnKind::Integer => TypeDescriptor::integer(),
            ReturnKind::Float => TypeDescriptor::float(),
            ReturnKind::Boolean => TypeDescriptor::boolean(),
            ReturnKind::Json => TypeDescriptor::Any,
            ReturnKind::Lines => TypeDescriptor::list(TypeDescriptor::Text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_typed_run() {
        let cli = Cli::parse_from([
            "tooloop",
            "--script",
            "turns.json",
            "--returns",
            "integer",
            "--max-turns",
            "2",
            "-vv",
            "How many?",
        ]);
        assert_eq!(cli.prompt.as_deref(), Some("How many?"));
        assert_eq!(cli.returns, Some(ReturnKind::Integer));
        assert_eq!(cli.max_turns, Some(2));
        assert_eq!(cli.verbose, 2);
        assert_eq!(ReturnKind::Lines.descriptor().title(), "List[string]");
    }
}
