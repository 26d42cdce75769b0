use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use teardown::{AuthMode, CategoryKind};

#[derive(Parser)]
#[command(name = "edgesweep")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Tear down every resource in an Apigee Edge organization", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Undeploy and delete everything in an organization
    Sweep(SweepArgs),

    /// List resource categories in teardown order
    Categories,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Sweep
// ============================================================================

#[derive(Parser)]
pub struct SweepArgs {
    /// Organization to tear down
    #[arg(short, long, env = "EDGESWEEP_ORG")]
    pub org: Option<String>,

    /// Account username (email)
    #[arg(short, long, env = "EDGESWEEP_USERNAME")]
    pub username: Option<String>,

    /// Account password (prompted when omitted)
    #[arg(long, env = "EDGESWEEP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// One-time code for accounts with MFA enabled
    #[arg(long, env = "EDGESWEEP_MFA", hide_env_values = true)]
    pub mfa_code: Option<String>,

    /// Authentication mode (defaults to config, then oauth)
    #[arg(long, value_enum)]
    pub auth: Option<AuthArg>,

    /// Only tear down these categories (comma-separated), e.g. proxies,products
    #[arg(long, value_delimiter = ',', value_parser = parse_category)]
    pub only: Vec<CategoryKind>,

    /// Enumerate without undeploying or deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Config file (defaults to ~/.config/edgesweep/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AuthArg {
    Oauth,
    Basic,
}

impl From<AuthArg> for AuthMode {
    fn from(arg: AuthArg) -> Self {
        match arg {
            AuthArg::Oauth => Self::OAuth,
            AuthArg::Basic => Self::Basic,
        }
    }
}

fn parse_category(s: &str) -> Result<CategoryKind, String> {
    s.parse()
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show {
        /// Config file to read
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default config file path
    Path,
}

// ============================================================================
// Tests
// ============================================================================
