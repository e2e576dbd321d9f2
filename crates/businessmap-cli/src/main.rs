//! mcp-businessmap - JSON-RPC tool server for Businessmap.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use businessmap_api::BusinessmapClient;
use businessmap_core::config::parse_bool;
use businessmap_core::{Config, Gateway, Transport};
use businessmap_mcp::{build_registry, sse, ClientRegistry, Dispatcher, StdioTransport};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Crates whose log level follows `-v`.
const LOG_TARGETS: &[&str] = &[
    "mcp_businessmap",
    "businessmap_core",
    "businessmap_api",
    "businessmap_mcp",
];

#[derive(Parser)]
#[command(name = "mcp-businessmap")]
#[command(author, version, about = "Businessmap tools over JSON-RPC (stdio or SSE)", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags that take precedence over the config file and environment.
#[derive(Args, Default)]
struct Overrides {
    /// Transport to serve on: stdio or sse
    #[arg(short, long)]
    transport: Option<Transport>,

    /// SSE port
    #[arg(short, long)]
    port: Option<u16>,

    /// SSE bind address
    #[arg(long)]
    host: Option<String>,

    /// Businessmap base URL
    #[arg(long)]
    businessmap_url: Option<String>,

    /// Businessmap API key
    #[arg(long)]
    businessmap_apikey: Option<String>,

    /// Verify TLS certificates (true/false)
    #[arg(long, value_parser = parse_flag_bool)]
    businessmap_ssl_verify: Option<bool>,

    /// Comma-separated board IDs to expose
    #[arg(long)]
    businessmap_boards_filter: Option<String>,

    /// Reject every mutating tool
    #[arg(long)]
    read_only: bool,

    /// Per-call timeout in seconds (0 disables)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default)
    Serve,

    /// Inspect or edit the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print boards visible with the current configuration
    Boards {
        /// Show a single board
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration (API key masked)
    Show,
    /// Print one value, e.g. `businessmap.url`
    Get { key: String },
    /// Store one value in the config file
    Set { key: String, value: String },
    /// Print the config file path
    Path,
}

fn parse_flag_bool(value: &str) -> Result<bool, String> {
    parse_bool(value).map_err(|e| e.to_string())
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        let bm = &mut config.businessmap;
        if let Some(url) = &self.businessmap_url {
            bm.url = Some(url.clone());
        }
        if let Some(key) = &self.businessmap_apikey {
            bm.api_key = Some(key.clone());
        }
        if let Some(verify) = self.businessmap_ssl_verify {
            bm.ssl_verify = verify;
        }
        if let Some(boards) = &self.businessmap_boards_filter {
            let boards = businessmap_core::config::split_list(boards);
            bm.boards_filter = (!boards.is_empty()).then_some(boards);
        }
        if self.read_only {
            bm.read_only = true;
        }

        let server = &mut config.server;
        if let Some(transport) = self.transport {
            server.transport = transport;
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(host) = &self.host {
            server.host = host.clone();
        }
        if let Some(timeout) = self.timeout {
            server.call_timeout_secs = timeout;
        }
    }
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// File, then environment, then flags.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_from(&self.config_path()?)?;
        config.apply_env()?;
        self.overrides.apply(&mut config);
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    });

    // stdout carries protocol traffic in stdio mode
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_env_file(path: Option<&PathBuf>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    load_env_file(cli.env_file.as_ref())?;
    init_logging(cli.verbose);

    if cli.overrides.businessmap_apikey.is_some() {
        warn!("API key passed on the command line; prefer BUSINESSMAP_APIKEY");
    }

    match &cli.command {
        None | Some(Commands::Serve) => serve(cli.load_config()?).await,
        Some(Commands::Config { command }) => {
            let output = run_config_command(&cli, command)?;
            println!("{}", output);
            Ok(())
        }
        Some(Commands::Boards { id }) => {
            let config = cli.load_config()?;
            config.validate()?;
            let client = BusinessmapClient::from_config(&config.businessmap)?;

            let output = match id {
                Some(id) => serde_json::to_string_pretty(&client.get_board(id).await?)?,
                None => serde_json::to_string_pretty(&client.list_boards().await?)?,
            };
            println!("{}", output);
            Ok(())
        }
    }
}

fn run_config_command(cli: &Cli, command: &ConfigCommands) -> anyhow::Result<String> {
    match command {
        ConfigCommands::Show => {
            let config = cli.load_config()?;
            Ok(serde_json::to_string_pretty(&config.redacted())?)
        }
        ConfigCommands::Get { key } => match cli.load_config()?.get(key)? {
            Some(value) => Ok(value),
            None => bail!("'{}' is not set", key),
        },
        ConfigCommands::Set { key, value } => {
            let path = cli.config_path()?;
            let mut config = Config::load_from(&path)?;
            config.set(key, value)?;
            config.save_to(&path)?;
            Ok(format!("Set {} in {}", key, path.display()))
        }
        ConfigCommands::Path => Ok(cli.config_path()?.display().to_string()),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let client = BusinessmapClient::from_config(&config.businessmap)?;
    let gateway: Arc<dyn Gateway> = Arc::new(client);
    let registry = build_registry(gateway, config.businessmap.read_only);
    let dispatcher =
        Dispatcher::new(Arc::new(registry)).with_call_timeout(config.server.call_timeout());

    info!(
        transport = %config.server.transport,
        read_only = config.businessmap.read_only,
        tools = dispatcher.registry().len(),
        "Starting server"
    );

    match config.server.transport {
        Transport::Stdio => {
            StdioTransport::stdio()
                .serve(&dispatcher)
                .await
                .context("Stdio transport failed")?;
            info!("Server stopped");
            Ok(())
        }
        Transport::Sse => {
            let addr = resolve(&config.server.host, config.server.port).await?;
            sse::serve(addr, dispatcher, ClientRegistry::new())
                .await
                .with_context(|| format!("SSE transport failed on {}", addr))
        }
    }
}

async fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    match tokio::net::lookup_host((host, port)).await?.next() {
        Some(addr) => Ok(addr),
        None => bail!("Could not resolve {}:{}", host, port),
    }
}
