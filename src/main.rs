mod browser;
mod cleaner;
mod config;
mod loader;
mod models;
mod pipeline;
mod report;
mod scraper;
mod storage;
mod utils;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cleaner::CleanedData;
use crate::config::AppConfig;
use crate::pipeline::{Pipeline, Section, SectionOutcome, SectionReport};

#[derive(Parser)]
#[command(name = "film-etl", about = "FilmAffinity scraper and chart datasets", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every section, then build the chart datasets
    Run,

    /// Scrape sections into the data directory
    Scrape {
        /// Sections to scrape (default: all)
        #[arg(short, long = "section", value_enum)]
        sections: Vec<Section>,
    },

    /// Clean the scraped tables and write the chart datasets
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "film_etl=info,warn",
        1 => "film_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Run => {
            let _t = utils::Timer::start("Full run");
            scrape(&config, &Section::ALL).await?;
            build_reports(&config)?;
        }

        Command::Scrape { sections } => {
            let _t = utils::Timer::start("Scrape");
            let sections = if sections.is_empty() {
                Section::ALL.to_vec()
            } else {
                sections
            };
            let reports = scrape(&config, &sections).await?;
            if !reports.iter().all(SectionReport::is_written) {
                bail!("some sections were not scraped");
            }
        }

        Command::Report => {
            let _t = utils::Timer::start("Report");
            build_reports(&config)?;
        }
    }

    Ok(())
}

async fn scrape(config: &AppConfig, sections: &[Section]) -> Result<Vec<SectionReport>> {
    let reports = Pipeline::new(config.clone()).run(sections).await?;

    println!("─────────────────────────────────────────────");
    println!("  Section               Rows   Degr.   Drop.");
    println!("─────────────────────────────────────────────");
    for r in &reports {
        let name = r.section.to_string();
        match &r.outcome {
            SectionOutcome::Written(s) => println!(
                "  {:<20} {:>6} {:>7} {:>7}",
                name,
                utils::fmt_count(s.rows),
                s.degraded,
                s.dropped
            ),
            SectionOutcome::Failed(e) => println!("  {:<20} failed: {}", name, e),
            SectionOutcome::Skipped => println!("  {:<20} skipped", name),
        }
    }
    println!("─────────────────────────────────────────────");

    Ok(reports)
}

fn build_reports(config: &AppConfig) -> Result<()> {
    let data = CleanedData::load(&config.storage.data_dir)?;
    let written = report::write_reports(&data, &config.storage.reports_dir)?;
    info!("Done: {} chart datasets", written.len());
    Ok(())
}
