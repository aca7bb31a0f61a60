mod backend;
mod config;
mod error;
mod shell;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use mcp::ToolServer;
use runtime::{
    Backend, Orchestrator, OrchestratorConfig, ServerPool, ShutdownReport, StdioLauncher,
    ToolRegistry,
};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use backend::ModelBackend;
use config::Config;
use error::Result;
use shell::{Responder, Shell};

const CONFIG_FILE: &str = "switchboard.toml";

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Chat with a language model over the tools of MCP servers", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    scripts: ServerScripts,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
struct ServerScripts {
    /// Server scripts to launch after the configured servers (.py, .js or an executable)
    #[arg(value_name = "SERVERS")]
    servers: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive query session (default)
    Chat(ServerScripts),
    /// List the merged tool catalog and exit
    Tools(ServerScripts),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Chat(scripts)) => cmd_chat(&cli.config, &scripts.servers).await,
        Some(Commands::Tools(scripts)) => cmd_tools(&cli.config, &scripts.servers).await,
        None => cmd_chat(&cli.config, &cli.scripts.servers).await,
    }
}

async fn cmd_chat(config_path: &Path, scripts: &[PathBuf]) -> Result<()> {
    let config = Config::load(config_path)?;
    let servers = config.server_configs(scripts)?;
    // Credentials are checked before any server process is spawned.
    let backend = ModelBackend::from_config(&config.backend)?;

    let pool = ServerPool::start(&StdioLauncher, &servers).await?;
    info!(backend = %backend, servers = pool.len(), "switchboard ready");

    println!("\nSwitchboard started with {backend}.");
    print_server_tools(pool.servers()).await;
    println!("\nType your queries or 'quit' to exit.");

    let orchestrator = Orchestrator::new(backend, pool.servers().to_vec())
        .with_config(OrchestratorConfig::from(&config.orchestrator));
    let mut shell = Shell::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let outcome = shell.run(&orchestrator).await;

    log_shutdown(pool.shutdown().await);
    Ok(outcome?)
}

async fn cmd_tools(config_path: &Path, scripts: &[PathBuf]) -> Result<()> {
    let config = Config::load(config_path)?;
    let servers = config.server_configs(scripts)?;
    let pool = ServerPool::start(&StdioLauncher, &servers).await?;

    let mut registry = ToolRegistry::new();
    registry.rebuild(pool.servers()).await;

    if registry.is_empty() {
        println!("No tools available.");
    } else {
        println!("{:<32}  {:<16}  DESCRIPTION", "TOOL", "SERVER");
        println!("{}", "-".repeat(80));
        for tool in registry.tools() {
            println!(
                "{:<32}  {:<16}  {}",
                tool.descriptor.name,
                tool.server_name,
                first_line(&tool.descriptor.description)
            );
        }
    }

    for shadowed in registry.shadowed() {
        println!(
            "\n{} from {} is shadowed by {}",
            shadowed.tool, shadowed.shadowed, shadowed.kept
        );
    }

    log_shutdown(pool.shutdown().await);
    Ok(())
}

fn log_shutdown(report: ShutdownReport) {
    if !report.is_clean() {
        warn!(failed = ?report.failed, "some servers did not shut down cleanly");
    }
}

/// Print each server's tool names, in startup order.
async fn print_server_tools<S: ToolServer>(servers: &[Arc<S>]) {
    for server in servers {
        match server.list_tools().await {
            Ok(tools) => {
                let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
                println!("\n{} server tools: {names:?}", display_name(server.name()));
            }
            Err(e) => warn!(server = %server.name(), error = %e, "cannot list tools"),
        }
    }
}

/// Capitalize each word of a server name for display.
fn display_name(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

impl<B: Backend, S: ToolServer> Responder for Orchestrator<B, S> {
    type Error = runtime::Error;

    async fn respond(&self, query: &str) -> std::result::Result<String, runtime::Error> {
        Ok(self.process_query(query).await?.answer)
    }
}
