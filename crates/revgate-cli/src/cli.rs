use clap::{Parser, Subcommand, ValueEnum};
use revgate_driver::DEFAULT_CONFIG_FILE;
use revgate_kernel::GateAction;

#[derive(Parser)]
#[command(
    name = "revgate",
    about = "Revgate: review-requirement gating for change requests",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse one line as a `/reviewers` command
    Parse {
        /// The comment line
        line: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one reconciliation pass over a change-request snapshot
    Evaluate {
        /// Path to the change-request snapshot JSON
        #[arg(long)]
        snapshot: String,

        /// Path to a census TOML file (`[members]` table)
        #[arg(long)]
        census: Option<String>,

        /// Path to the driver configuration
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Persist posted replies and label changes back to the snapshot
        #[arg(long)]
        write: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Consult the readiness gate for an integration or sponsorship
    Gate {
        /// Path to the change-request snapshot JSON
        #[arg(long)]
        snapshot: String,

        /// Action asking for permission
        #[arg(long, value_enum)]
        action: ActionArg,

        /// Path to a census TOML file (`[members]` table)
        #[arg(long)]
        census: Option<String>,

        /// Path to the driver configuration
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Persist posted replies and label changes back to the snapshot
        #[arg(long)]
        write: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll a change-request snapshot until interrupted
    Watch {
        /// Path to the change-request snapshot JSON
        #[arg(long)]
        snapshot: String,

        /// Path to a census TOML file (`[members]` table)
        #[arg(long)]
        census: Option<String>,

        /// Path to the driver configuration
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Stop after this many ticks
        #[arg(long)]
        passes: Option<u64>,

        /// Override the configured poll interval
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Persist posted replies and label changes back to the snapshot
        #[arg(long)]
        write: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ActionArg {
    Integrate,
    Sponsor,
}

impl From<ActionArg> for GateAction {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::Integrate => GateAction::Integrate,
            ActionArg::Sponsor => GateAction::Sponsor,
        }
    }
}
