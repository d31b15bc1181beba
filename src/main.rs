use anyhow::{bail, Result};
use pca_scraper::{pipeline, ScraperConfig};
use std::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) config + dirs ────────────────────────────────────────────
    let config = ScraperConfig::load()?;
    fs::create_dir_all(&config.data_dir)?;
    info!(
        start_date = %config.start_date,
        data_dir = %config.data_dir.display(),
        "configured"
    );

    // ─── 3) list, download, combine ──────────────────────────────────
    let report = pipeline::run(&config).await?;

    if report.downloads.is_empty() {
        println!("No files were downloaded successfully");
        bail!("no monthly files downloaded");
    }

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOAD SUMMARY");
    println!("{}", "=".repeat(60));
    for rec in &report.downloads {
        println!("{}: {}", rec.date, rec.title);
    }

    match report.combined {
        Some(summary) => summary.print_report(),
        None => {
            println!("Failed to combine datasets");
            bail!("no combined output written");
        }
    }

    info!("all done");
    Ok(())
}
