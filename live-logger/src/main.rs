use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use live_logger::{shutdown_signal, Args, LifecycleController, SinkStats, SubscriberConfig};
use log::{error, info};


/// Show only the first few characters of a secret
fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if visible.len() == secret.len() {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

fn log_startup(config: &SubscriberConfig) {
    info!("🚀 Starting OpenF1 live logger with client ID: {}", config.client_id);
    info!("🌐 MQTT broker: {}", config.broker);
    match (&config.username, &config.token) {
        (Some(user), Some(token)) => info!("🔑 Credentials: {} / {}", user, redact(token)),
        (Some(user), None) => info!("🔑 Credentials: {} (no token)", user),
        (None, Some(token)) => info!("🔑 Credentials: token {}", redact(token)),
        (None, None) => info!("🔑 No credentials configured"),
    }
    info!("📝 Log file: {}", config.log_file.display());
}

fn summary_lines(stats: &SinkStats) -> Vec<String> {
    let mut lines = vec![format!(
        "📊 {} messages, {} decoded, {} decode failures, {} append failures",
        stats.total(),
        stats.decoded,
        stats.decode_failures,
        stats.append_failures
    )];
    lines.extend(
        stats
            .delivered
            .iter()
            .map(|(topic, count)| format!("   {}: {}", topic, count)),
    );
    if let Some(at) = stats.last_received {
        lines.push(format!("🕒 Last message received at {}", at.to_rfc3339()));
    }
    lines
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = SubscriberConfig::try_from(args).context("Invalid configuration")?;
    log_startup(&config);

    let shutdown = shutdown_signal().context("Failed to listen for shutdown signals")?;

    let report = LifecycleController::new(config)
        .run(shutdown)
        .await
        .context("Live logger stopped")?;

    for line in summary_lines(&report.stats) {
        info!("{}", line);
    }
    info!("✅ Graceful shutdown completed");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
