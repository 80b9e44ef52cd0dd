use std::env;
use tracing_subscriber::EnvFilter;

use intake_core::config::Config;

mod commands;

const USAGE: &str = "Usage: intake [-v] <ingest [corpus_dir] | search \"<query>\" | classify \"<request text>\" [--type \"<request type>\"] | chat>";

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).without_time().init();
}

fn parse_args() -> (bool, String, Vec<String>) {
    let mut verbose = false;
    let mut rest: Vec<String> = Vec::new();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            _ => rest.push(arg),
        }
    }
    if rest.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = rest.remove(0);
    (verbose, cmd, rest)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (verbose, cmd, args) = parse_args();
    init_tracing(verbose);
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;
    let settings = config.settings()?;
    tracing::debug!(command = %cmd, env = %env::var("RUST_ENV").unwrap_or_else(|_| "dev".into()), "starting");
    match cmd.as_str() {
        "ingest" => commands::ingest(&config, &settings, args.first().map(String::as_str)).await,
        "search" => {
            let Some(query) = args.first() else { eprintln!("Usage: intake search \"<query>\""); std::process::exit(1) };
            commands::search(&config, &settings, query).await
        }
        "classify" => {
            let mut text = None;
            let mut request_type = None;
            let mut i = 0;
            while i < args.len() {
                match args[i].as_str() {
                    "--type" | "-t" => { request_type = args.get(i + 1).cloned(); i += 1; }
                    _ if text.is_none() => text = Some(args[i].clone()),
                    _ => {}
                }
                i += 1;
            }
            let Some(text) = text else { eprintln!("Usage: intake classify \"<request text>\" [--type \"<request type>\"]"); std::process::exit(1) };
            commands::classify(&config, &settings, &text, request_type.as_deref()).await
        }
        "chat" => commands::chat(&config, &settings).await,
        _ => { eprintln!("Unknown command: {cmd}\n{USAGE}"); std::process::exit(1); }
    }
}
