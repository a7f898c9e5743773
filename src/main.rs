mod cli;

use clipgate::bridge::{self, Bridge, BridgeState, StandaloneHost};
use clipgate::{config, probe, report, timeline};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipgate=trace,clipgate_scan=trace".to_string()
        } else {
            "clipgate=debug,clipgate_scan=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Run {
            inputs,
            output,
            deliver,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_batch(&inputs, output, deliver, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, cli.config.as_deref()))
        }
        Commands::Decode { value } => decode_value(&value),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("clipgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_batch(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    deliver: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let shared_timeline = timeline::ProbeTimeline::new();
    let runner = probe::BatchRunner::with_timeline(
        config.policy.clone(),
        config.scheduler.scheduler(),
        shared_timeline.clone(),
    );

    tracing::info!("Probing {} file(s)", inputs.len());
    let records = runner.run(inputs).await;

    for record in &records {
        println!(
            "{}: format {} [{}], codecs {} [{}], size {:.2} MB [{}]",
            record.name,
            record.format,
            record.format_flag.label(),
            record.codecs_summary(),
            record.codec_flag.label(),
            record.size_mib(),
            record.size_flag.label(),
        );
    }

    let output = output.unwrap_or_else(|| PathBuf::from(report::suggested_filename()));
    report::write_xlsx(&output, &records)?;
    println!("Report written to {}", output.display());

    if deliver {
        // A plain process has no embedding page; discovery will run its
        // budgets out and delivery will print the redirect URL.
        let (_events_tx, events_rx) = tokio::sync::mpsc::channel(8);
        let mut bridge = Bridge::new(
            StandaloneHost,
            events_rx,
            config.bridge.tuning(),
            shared_timeline,
        );
        let state = bridge.connect().await;
        if state == BridgeState::DegradedPolling {
            tracing::debug!("No host discovered; delivery will use the fallback ladder");
        }
        match bridge.deliver(&records).await {
            Ok(channel) => tracing::info!("Results delivered via {:?}", channel),
            Err(e) => tracing::warn!("Delivery failed: {}", e),
        }
    }

    Ok(())
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let runner = probe::BatchRunner::new(config.policy.clone(), config.scheduler.scheduler());
    let record = runner.probe_path(file).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("File: {}", record.name);
        println!("Format: {} [{}]", record.format, record.format_flag.label());
        println!(
            "Codecs: {} [{}]",
            record.codecs_summary(),
            record.codec_flag.label()
        );
        println!(
            "Size: {:.2} MB [{}]",
            record.size_mib(),
            record.size_flag.label()
        );
        println!();
        for entry in runner.timeline().entries() {
            println!("{entry}");
        }
    }

    Ok(())
}

fn decode_value(value: &str) -> Result<()> {
    let param = if value.contains("?results=") {
        bridge::payload::extract_results_param(value)
            .ok_or_else(|| anyhow::anyhow!("URL has no decodable results parameter"))?
    } else {
        value.to_string()
    };

    let payload = bridge::decode_results(&param)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Configuration is valid");
    println!(
        "  policy: {} format(s), {} video codec(s), {:.0} MB limit",
        config.policy.allowed_formats.len(),
        config.policy.allowed_video_codecs.len(),
        config.policy.max_size_mib,
    );
    println!(
        "  scheduler: {} byte chunks, {}s timeout",
        config.scheduler.chunk_size, config.scheduler.timeout_secs
    );
    println!(
        "  bridge: announce {}ms x{}, poll {}ms x{}",
        config.bridge.announce_interval_ms,
        config.bridge.announce_budget,
        config.bridge.poll_interval_ms,
        config.bridge.poll_budget,
    );
    Ok(())
}
