use std::str::FromStr;

use clap::Parser;
use kp_cli::Cli;
use kp_kubehub::KubeStore;
use tracing::debug;

fn init_tracing() {
    let env = std::env::var("KP_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // stdout carries command output only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = KubeStore::try_default().await?;
    debug!("kube client ready");
    let mut stdout = std::io::stdout();
    kp_cli::run(cli, &store, &mut stdout).await
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
