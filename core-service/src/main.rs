//! ThreatLens CLI - analyze one indicator from the command line

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use threatlens_core::constants::{APP_NAME, APP_VERSION};
use threatlens_core::{classify, FusionEngine, IndicatorType};

#[derive(Debug, Parser)]
#[command(name = "threatlens", version, about = "Multi-source indicator reputation lookup")]
struct Cli {
    /// IP, domain, URL or file hash
    #[arg(required_unless_present = "file")]
    indicator: Option<String>,

    /// Print the detected type and exit (no network)
    #[arg(long)]
    classify_only: bool,

    /// Skip detection and treat the indicator as this type
    #[arg(long = "type", value_name = "TYPE")]
    indicator_type: Option<IndicatorType>,

    /// Analyze the SHA-256 of a local file
    #[arg(long, conflicts_with = "indicator")]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.classify_only {
        let indicator = cli.indicator.as_deref().unwrap_or_default();
        println!("{}", classify(indicator)?);
        return Ok(());
    }

    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let engine = FusionEngine::from_env()
        .await
        .context("invalid weight configuration")?;
    log::info!("Sources: {}", engine.source_names().join(", "));

    let result = match (&cli.file, &cli.indicator, cli.indicator_type) {
        (Some(path), _, _) => engine.analyze_file(path).await?,
        (None, Some(indicator), Some(indicator_type)) => {
            engine.analyze_as(indicator, indicator_type).await?
        }
        (None, Some(indicator), None) => engine.analyze(indicator).await?,
        (None, None, _) => anyhow::bail!("an indicator or --file is required"),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
