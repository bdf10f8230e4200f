//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use toolgate_domain::OutputFormat;

/// Output format for invocation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Content, usage and warnings for every result
    Full,
    /// One line per result
    Summary,
    /// JSON output
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Full => OutputFormat::Full,
            OutputFormatArg::Summary => OutputFormat::Summary,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for toolgate
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author, version, about = "Resilient tool invocation gateway")]
#[command(long_about = r#"
toolgate runs tool calls through a resilience pipeline: argument validation,
authorization and egress checks, idempotent result caching, a per-tool
circuit breaker, rate limiting and retries with deadlines.

Configuration files are loaded from (in priority order):
1. TOOLGATE_* environment variables
2. --config <path>     Explicit config file
3. ./toolgate.toml     Project-level config
4. ~/.config/toolgate/config.toml   Global config

Without configured tools the built-in demo tools (add, divide, echo, sleep)
are available.

Example:
  toolgate list
  toolgate invoke add --args '{"a": 2, "b": 3}'
  toolgate invoke sleep --args '{"ms": 50}' --repeat 20 --concurrency 5 --output summary
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List configured tools with their driver and policies
    List,
    /// Invoke a tool through the pipeline
    Invoke(InvokeArgs),
    /// Print tool definitions as JSON (every tool when no id is given)
    Export {
        /// Tool id
        tool: Option<String>,
    },
    /// Show configuration sources and validation issues
    Config {
        /// Show configuration file locations
        #[arg(long)]
        show_sources: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InvokeArgs {
    /// Tool id
    pub tool: String,

    /// Arguments as a JSON object
    #[arg(short, long, value_name = "JSON", default_value = "{}")]
    pub args: String,

    /// Calling user
    #[arg(long)]
    pub user: Option<String>,

    /// Session id
    #[arg(long)]
    pub session: Option<String>,

    /// Tenant id
    #[arg(long)]
    pub tenant: Option<String>,

    /// Caller role
    #[arg(long)]
    pub role: Option<String>,

    /// Caller permissions (repeatable)
    #[arg(long = "permission", value_name = "PERMISSION")]
    pub permissions: Vec<String>,

    /// Per-call deadline in milliseconds
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Number of calls to make
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Calls in flight at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: u32,

    /// Output format (defaults to the configured one)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormatArg>,

    /// Print collected metrics after the calls
    #[arg(long)]
    pub metrics: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_invoke() {
        let cli = Cli::parse_from([
            "toolgate",
            "-vv",
            "invoke",
            "add",
            "--args",
            r#"{"a":1,"b":2}"#,
            "--user",
            "alice",
            "--permission",
            "math",
            "--permission",
            "admin",
            "--repeat",
            "5",
            "--concurrency",
            "2",
            "--output",
            "json",
        ]);

        assert_eq!(cli.verbose, 2);
        let Command::Invoke(args) = cli.command else {
            panic!("expected invoke");
        };
        assert_eq!(args.tool, "add");
        assert_eq!(args.user.as_deref(), Some("alice"));
        assert_eq!(args.permissions, vec!["math", "admin"]);
        assert_eq!(args.repeat, 5);
        assert_eq!(args.concurrency, 2);
        assert_eq!(args.output, Some(OutputFormatArg::Json));
        assert_eq!(OutputFormat::from(OutputFormatArg::Json), OutputFormat::Json);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["toolgate", "invoke", "echo"]);
        let Command::Invoke(args) = cli.command else {
            panic!("expected invoke");
        };
        assert_eq!(args.args, "{}");
        assert_eq!(args.repeat, 1);
        assert!(args.output.is_none());
    }

    #[test]
    fn test_zero_repeat_rejected() {
        assert!(Cli::try_parse_from(["toolgate", "invoke", "echo", "--repeat", "0"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["toolgate", "config", "--show-sources", "--no-config"]);
        assert!(cli.no_config);
        assert!(matches!(cli.command, Command::Config { show_sources: true }));
    }

    #[test]
    fn test_parse_export() {
        let cli = Cli::parse_from(["toolgate", "export", "search"]);
        assert!(matches!(cli.command, Command::Export { tool: Some(ref id) } if id == "search"));

        let cli = Cli::parse_from(["toolgate", "export"]);
        assert!(matches!(cli.command, Command::Export { tool: None }));
    }
}
