//! Command execution.

use colored::Colorize;
use hublink_client::{negotiate, HubClient, HubConfig, Shutdown};
use serde_json::Value;

/// Prints the negotiate reply.
pub async fn negotiate_only(config: &HubConfig) -> Result<(), Box<dyn std::error::Error>> {
    let negotiation = negotiate(config).await?;

    println!("{} {}", "Connection".bold(), negotiation.connection_id.cyan());
    if let Some(ref token) = negotiation.connection_token {
        println!("  token: {}", token);
    }
    if let Some(version) = negotiation.negotiate_version {
        println!("  negotiate version: {}", version);
    }
    if negotiation.available_transports.is_empty() {
        println!("  {}", "No transports offered".yellow());
    }
    for transport in &negotiation.available_transports {
        println!(
            "  {} [{}]",
            transport.transport.green(),
            transport.transfer_formats.join(", ")
        );
    }
    Ok(())
}

/// Connects, invokes `target` once and closes.
pub async fn invoke_once(
    config: HubConfig,
    target: &str,
    arguments: Vec<Value>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = HubClient::new(config);
    client.connect().await?;

    let result = client.invoke(target, arguments).await;
    client.close().await?;
    result?;

    println!("{} {}()", "Invoked".green(), target.cyan());
    Ok(())
}

/// Connects and prints invocations of `methods` until the server closes
/// the connection or `shutdown` is triggered.
pub async fn listen(
    config: HubConfig,
    methods: Vec<String>,
    initial: Option<(String, Vec<Value>)>,
    shutdown: Shutdown,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = HubClient::new(config);

    for method in methods {
        let name = method.clone();
        client.on(method, move |args, _client| {
            println!("{} {}", name.cyan(), format_arguments(args));
            Box::pin(async { Ok(()) })
        });
    }

    let exit_signal = shutdown.clone();
    client.on_exit(move |_args, _client| {
        eprintln!("{}", "Server closed the connection".yellow());
        exit_signal.trigger();
        Box::pin(async { Ok(()) })
    });

    client.connect().await?;
    eprintln!(
        "{} to hub {}",
        "Connected".green(),
        client.config().hub.cyan()
    );
    eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

    if let Some((target, arguments)) = initial {
        client.invoke(&target, arguments).await?;
    }

    let result = client.run(&shutdown).await;
    client.close().await?;
    result?;
    Ok(())
}

/// Parses a JSON argument (either inline JSON or @file.json).
pub fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Parses a JSON array of positional arguments.
pub fn parse_argument_list(arg: &str) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    match parse_json_arg(arg)? {
        Value::Array(items) => Ok(items),
        other => Err(format!("expected a JSON array of arguments, got {}", other).into()),
    }
}

fn format_arguments(args: &[Value]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
