use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use console::style;
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use sec_gemini::config::Overrides;
use sec_gemini::{AnalysisClient, AnalysisError, ConfigError, Settings, ToolError};

mod commands;
mod mcp;
mod render;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API key (can also be set via SEC_GEMINI_API_KEY environment variable)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Service host (can also be set via SEC_GEMINI_HOST environment variable)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Give up on the analysis after this many seconds
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Audit a sample vulnerable smart contract (default)
    Example,

    /// Analyze a source file for security vulnerabilities
    Analyze {
        /// File to analyze
        file: PathBuf,

        /// Programming language of the file
        #[arg(short, long)]
        language: Option<String>,

        /// Security concern to focus on, may be repeated
        #[arg(short, long = "focus")]
        focus_areas: Vec<String>,

        /// Additional context about the code or system
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Ask a security question
    Query {
        /// The question or topic to explore
        question: String,

        /// Security domain (web3, defi, nft, infrastructure, application, ...)
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Perform a full audit of a smart contract
    Audit {
        /// Contract source file
        file: PathBuf,

        /// Type of contract (token, nft, defi, dao, ...)
        #[arg(short = 't', long)]
        contract_type: Option<String>,

        /// Target blockchain
        #[arg(short, long)]
        blockchain: Option<String>,
    },

    /// Serve the analysis tools over JSON-RPC on stdin/stdout
    McpServer,

    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        api_key: cli.api_key,
        host: cli.host,
    };
    let deadline = cli.deadline_secs.map(Duration::from_secs);

    match cli.command.unwrap_or(Command::Example) {
        Command::Example => {
            let client = build_client(overrides)?;
            commands::example::execute(&client, deadline).await
        }
        Command::Analyze {
            file,
            language,
            focus_areas,
            context,
        } => {
            let system = commands::tool::system(build_client(overrides)?);
            let call = commands::tool::analyze_call(&file, language, focus_areas, context)?;
            commands::tool::execute(&system, call, "Security Analysis Results:", deadline).await
        }
        Command::Query { question, domain } => {
            let system = commands::tool::system(build_client(overrides)?);
            let call = commands::tool::query_call(question, domain);
            commands::tool::execute(&system, call, "Security Guidance:", deadline).await
        }
        Command::Audit {
            file,
            contract_type,
            blockchain,
        } => {
            let system = commands::tool::system(build_client(overrides)?);
            let call = commands::tool::audit_call(&file, contract_type, blockchain)?;
            commands::tool::execute(&system, call, "Audit Report:", deadline).await
        }
        Command::McpServer => commands::mcp_server::execute(Settings::load_with(overrides)?).await,
        Command::Version => commands::version::execute(),
    }
}

/// Reads the settings and builds the client. Every failure here is fatal and
/// happens before any network activity.
fn build_client(overrides: Overrides) -> Result<AnalysisClient> {
    let settings = Settings::load_with(overrides)?;
    let config = settings.client_config()?;
    AnalysisClient::new(config).map_err(|e| anyhow!("Failed to initialize HTTP client: {}", e))
}

/// The only recovery boundary: a failed analysis is reported and the run still
/// succeeds, anything else ends the process with status 1.
fn report(err: anyhow::Error) -> ExitCode {
    if let Some(err) = analysis_failure(&err) {
        eprintln!("{} {}", style("Error during analysis:").red().for_stderr(), err);
        return ExitCode::SUCCESS;
    }

    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::MissingCredential { env_var }) => {
            eprintln!(
                "{} {} environment variable not set",
                style("Error:").red().for_stderr(),
                env_var
            );
            eprintln!("Please set your API key:");
            eprintln!("  export {}=\"your-api-key-here\"", env_var);
        }
        _ => eprintln!("{} {:#}", style("Error:").red().for_stderr(), err),
    }
    ExitCode::FAILURE
}

fn analysis_failure(err: &anyhow::Error) -> Option<&AnalysisError> {
    err.downcast_ref::<AnalysisError>()
        .or_else(|| match err.downcast_ref::<ToolError>() {
            Some(ToolError::Analysis(inner)) => Some(inner),
            _ => None,
        })
}

/// Logs go to stderr so stdout carries only results and the JSON-RPC stream.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
