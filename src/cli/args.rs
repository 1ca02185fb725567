//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::application::services::ExportFormat;

/// ICS command-structure charts: edit, lay out and export organization trees
#[derive(Parser, Debug)]
#[command(name = "icschart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Config file (default: $XDG_CONFIG_HOME/icschart/icschart.toml)
    #[arg(long, global = true, env = "ICSCHART_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available templates
    Templates,

    /// Print the chart as an outline
    Show {
        #[command(flatten)]
        chart: ChartArgs,
    },

    /// Apply an edit script and report each step
    Run {
        /// Edit script
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,
        /// Starting template
        #[arg(short, long)]
        template: Option<String>,
        /// Print the resulting outline
        #[arg(long)]
        show: bool,
    },

    /// Export the chart as a printable document
    Export {
        #[command(flatten)]
        chart: ChartArgs,
        /// Task reference (used for the file name)
        #[arg(long, default_value = "")]
        task: String,
        /// Event or incident name
        #[arg(long, default_value = "")]
        event: String,
        /// Operational period
        #[arg(long, default_value = "")]
        period: String,
        /// Output directory (default: export.output_dir)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Pdf)]
        format: ExportFormat,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Which chart to build before acting on it.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ChartArgs {
    /// Template to start from
    #[arg(short, long)]
    pub template: Option<String>,
    /// Edit script applied before acting
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub script: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print a commented config template
    Template,
}
