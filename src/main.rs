use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

use meterpoll::{CancelFlag, Config, FleetPoller, TcpSessionFactory};

fn cli() -> Command {
    Command::new("meterpoll")
        .about("Modbus TCP fleet poller for measurement devices")
        .version(meterpoll::VERSION)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .default_value("meterpoll.toml")
                .help("Path to the TOML fleet configuration"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_parser(clap::value_parser!(u64))
                .help("Override the poll interval in seconds"),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .action(ArgAction::SetTrue)
                .help("Run a single poll cycle and exit"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print cycle results as JSON"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let matches = cli().get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("meterpoll.toml");

    let config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        warn!("⚠️  No configuration at {}, writing defaults", config_path);
        let config = Config::default();
        config.save_to_file(config_path)?;
        config
    };

    let interval_secs = matches
        .get_one::<u64>("interval")
        .copied()
        .unwrap_or(config.update_interval_seconds)
        .max(1);
    let once = matches.get_flag("once");
    let json = matches.get_flag("json");

    let meters: Vec<_> = config.meters.iter().filter(|m| m.enabled).cloned().collect();
    info!(
        "🚀 meterpoll v{} — {} meter(s) configured, {} enabled",
        meterpoll::VERSION,
        config.meters.len(),
        meters.len()
    );
    for meter in &meters {
        info!(
            "📋 {} [{}] at {} slave {}, {} point(s)",
            meter.measure_name,
            meter.uuid,
            meter.address,
            meter.slave_id,
            meter.points.len()
        );
    }

    let factory = Arc::new(TcpSessionFactory::new(Duration::from_millis(
        config.connect_timeout_ms,
    )));
    let mut poller = FleetPoller::new(factory);

    // UI-bound progress messages, consumed independently of the poll loop
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(message) = progress_rx.recv().await {
            if let Some(bar) = message.strip_prefix("m|") {
                println!("{}", bar);
            }
        }
    });

    let cancel = CancelFlag::new();
    let ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Stop requested, finishing current device...");
            ctrlc.cancel();
        }
    });

    let mut ticker = interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        if cancel.is_cancelled() {
            break;
        }

        let results = poller.poll_fleet(&meters, &progress_tx, &cancel).await;

        if json {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            for result in results.values() {
                info!(
                    "📊 {} [{}] — {} point(s)",
                    result.measure_name,
                    result.uuid,
                    result.points.len()
                );
                for (name, value) in &result.points {
                    info!("   {}: {:.3}", name, value);
                }
            }
        }
        for (key, error) in poller.error_table() {
            warn!("📛 {}: {}", key, error);
        }
        info!(
            "❤️  Fleet health: {} failing point(s), state {:?}",
            poller.health(),
            poller.state()
        );

        if once || cancel.is_cancelled() {
            break;
        }
    }

    info!("👋 Shutting down");
    Ok(())
}
