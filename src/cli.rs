use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use lineage_client::EventType;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

/// Run state accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunState {
    Start,
    Running,
    Complete,
    Abort,
    Fail,
    Other,
}

impl From<RunState> for EventType {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Start => EventType::Start,
            RunState::Running => EventType::Running,
            RunState::Complete => EventType::Complete,
            RunState::Abort => EventType::Abort,
            RunState::Fail => EventType::Fail,
            RunState::Other => EventType::Other,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "lineage",
    about = "Emit lineage run events through HTTP, console or file transports",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/lineage/logs/lineage.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to openlineage.yml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to send events; without `--url` the environment decides
#[derive(Debug, Clone, clap::Args)]
pub struct TargetArgs {
    /// Lineage API base URL
    #[arg(long)]
    pub url: Option<String>,

    /// API key sent as a bearer token (requires --url)
    #[arg(long, requires = "url")]
    pub api_key: Option<String>,

    /// Request timeout in seconds (requires --url)
    #[arg(long, requires = "url")]
    pub timeout: Option<f64>,

    /// Skip TLS certificate verification (requires --url)
    #[arg(long, requires = "url")]
    pub insecure: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit an event read from a JSON file (or stdin)
    Emit {
        /// Event file; reads stdin when omitted or "-"
        file: Option<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Build and emit a run event
    Run {
        /// Run state to report
        #[arg(value_enum)]
        state: RunState,

        /// Job namespace
        #[arg(long)]
        namespace: String,

        /// Job name
        #[arg(long)]
        job: String,

        /// Run id (a new one is generated when omitted)
        #[arg(long)]
        run_id: Option<uuid::Uuid>,

        /// Producer URI stamped on the event
        #[arg(long)]
        producer: Option<String>,

        /// Input dataset as namespace:name (repeatable)
        #[arg(long = "input")]
        inputs: Vec<String>,

        /// Output dataset as namespace:name (repeatable)
        #[arg(long = "output")]
        outputs: Vec<String>,

        /// Print the event JSON instead of emitting it
        #[arg(long)]
        print: bool,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the resolved configuration and transport
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}
