//! Clap derive structures for the `vpdesk` CLI.
//!
//! Defines the command tree, global flags, and shared types. Only clap and
//! the standard library may be used here; build.rs compiles this file on
//! its own to render man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vpdesk -- Value-Payable collection at the post office counter
#[derive(Debug, Parser)]
#[command(
    name = "vpdesk",
    version,
    about = "Collect Value-Payable money with OTP authorization",
    long_about = "Counter tool for Value-Payable (VP) articles.\n\n\
        Look up a VP by barcode, mark its amount received, send the payment\n\
        OTP to the sender, and pay out once the sender reads the OTP back.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "VPDESK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// DMS server URL (overrides profile)
    #[arg(long, env = "VPDESK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Operator bearer token
    #[arg(long, env = "VPDESK_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VPDESK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "VPDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "VPDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up and collect Value-Payable articles
    #[command(alias = "v")]
    Vp(VpArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── VP ───────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VpArgs {
    #[command(subcommand)]
    pub command: VpCommand,
}

#[derive(Debug, Subcommand)]
pub enum VpCommand {
    /// Show one VP record with its payable amount and OTP state
    #[command(alias = "show")]
    Info {
        /// Article barcode
        barcode: String,
    },

    /// Browse VP records page by page
    #[command(alias = "ls")]
    List(VpListArgs),

    /// Mark the VP money as received from the addressee
    Receive {
        /// Article barcode
        barcode: String,
    },

    /// Send (or resend) the payment OTP to the sender
    SendOtp {
        /// Article barcode
        barcode: String,
    },

    /// Pay the sender with the OTP they read back
    Pay {
        /// Article barcode
        barcode: String,

        /// Six-digit OTP (prompted for when omitted)
        #[arg(value_parser = parse_otp)]
        otp: Option<String>,
    },

    /// Run an interactive collection session for one barcode
    Collect {
        /// Article barcode (prompted for when omitted)
        barcode: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct VpListArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Records per page
    #[arg(long, short = 'l', default_value = "10", value_parser = clap::value_parser!(u32).range(1..=200))]
    pub page_size: u32,

    /// Free-text search (barcode, sender, branch)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Start of the booking window, `dd-mm-yyyy HH:MM:SS`
    #[arg(long)]
    pub from: Option<String>,

    /// End of the booking window, `dd-mm-yyyy HH:MM:SS`
    #[arg(long)]
    pub to: Option<String>,

    /// Filter by paid status
    #[arg(long, default_value = "all")]
    pub paid: PaidFilter,

    /// Filter by received status
    #[arg(long, default_value = "all")]
    pub received: ReceivedFilter,

    /// Filter by OTP status
    #[arg(long, default_value = "all")]
    pub otp: OtpFilter,

    /// Filter by service type code
    #[arg(long)]
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PaidFilter {
    All,
    Pending,
    Paid,
}

impl PaidFilter {
    /// Query value, `None` for no filtering.
    pub fn wire(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Pending => Some("Pending"),
            Self::Paid => Some("Paid"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReceivedFilter {
    All,
    Pending,
    Received,
}

impl ReceivedFilter {
    pub fn wire(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Pending => Some("Pending"),
            Self::Received => Some("Received"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OtpFilter {
    All,
    Pending,
    SentSuccess,
    SentFailed,
    Verified,
}

impl OtpFilter {
    pub fn wire(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Pending => Some("pending"),
            Self::SentSuccess => Some("sent_success"),
            Self::SentFailed => Some("sent_failed"),
            Self::Verified => Some("verified"),
        }
    }
}

/// Reject anything but six ASCII digits before a request is built.
fn parse_otp(raw: &str) -> Result<String, String> {
    let otp = raw.trim();
    if otp.len() == 6 && otp.bytes().all(|b| b.is_ascii_digit()) {
        Ok(otp.to_owned())
    } else {
        Err("Please enter a valid 6-digit OTP".into())
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (tokens masked)
    Show,

    /// Print the config file location
    Path,

    /// Store the operator token for a profile in the system keyring
    SetToken,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
