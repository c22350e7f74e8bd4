//! hublink - command-line client for SignalR-style hubs
//!
//! Negotiates with a hub server, opens a WebSocket transport and invokes or
//! listens for hub methods.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use hublink_client::Shutdown;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hublink")]
#[command(about = "Command-line client for SignalR-style hubs")]
#[command(version)]
struct Cli {
    /// Base server URL (overrides HUBLINK_URL and the config file)
    #[arg(short, long)]
    url: Option<String>,

    /// Hub name (overrides HUBLINK_HUB and the config file)
    #[arg(short = 'H', long)]
    hub: Option<String>,

    /// Path to CA certificate for server verification
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Skip server certificate verification (INSECURE)
    #[arg(long, short = 'k')]
    insecure: bool,

    /// Connect timeout in seconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Per-frame receive timeout in seconds
    #[arg(long)]
    receive_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Negotiate and print the connection id and offered transports
    Negotiate,

    /// Connect, invoke a hub method once and disconnect
    Invoke {
        /// Hub method name
        target: String,

        /// Positional arguments as JSON (or @file.json)
        args: Vec<String>,
    },

    /// Connect and print invocations until the server closes or Ctrl+C
    Listen {
        /// Method to print (repeatable)
        #[arg(short, long = "method")]
        methods: Vec<String>,

        /// Method to invoke once connected
        #[arg(long)]
        invoke: Option<String>,

        /// JSON array of arguments for --invoke (or @file.json)
        #[arg(long, requires = "invoke")]
        args: Option<String>,
    },
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply_to(&self, config: &mut Config) {
        if let Some(ref url) = self.url {
            config.connection.url = url.clone();
        }
        if let Some(ref hub) = self.hub {
            config.connection.hub = hub.clone();
        }
        if let Some(ref path) = self.ca_cert {
            config.tls.ca_cert_path = Some(path.clone());
        }
        if self.insecure {
            config.tls.insecure = true;
        }
        if let Some(secs) = self.connect_timeout {
            config.connection.connect_timeout_secs = Some(secs);
        }
        if let Some(secs) = self.receive_timeout {
            config.connection.receive_timeout_secs = Some(secs);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    if let Ok(path) = std::env::var("HUBLINK_CONFIG") {
        tracing::debug!("Loaded config from {}", path);
    }
    cli.apply_to(&mut config);

    if let Err(e) = config.validate() {
        eprintln!("{}: {}", "Error".red(), e);
        return Err(e.into());
    }
    if config.tls.insecure {
        tracing::warn!("TLS certificate verification is disabled");
    }

    let hub_config = config.hub_config();
    tracing::debug!("Using hub {} at {}", hub_config.hub, hub_config.url);

    let result = match cli.command {
        Commands::Negotiate => commands::negotiate_only(&hub_config).await,
        Commands::Invoke { target, args } => {
            let arguments = args
                .iter()
                .map(|arg| commands::parse_json_arg(arg))
                .collect::<Result<Vec<_>, _>>()?;
            commands::invoke_once(hub_config, &target, arguments).await
        }
        Commands::Listen {
            methods,
            invoke,
            args,
        } => {
            let initial = match invoke {
                Some(target) => {
                    let arguments = match args {
                        Some(ref list) => commands::parse_argument_list(list)?,
                        None => Vec::new(),
                    };
                    Some((target, arguments))
                }
                None => None,
            };

            let shutdown = Shutdown::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                eprintln!("\n{}", "Stopping...".dimmed());
                signal.trigger();
            });

            commands::listen(hub_config, methods, initial, shutdown).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("{}: {}", "Error".red(), e);
    }
    result
}
