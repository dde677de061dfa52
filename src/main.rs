use std::path::PathBuf;

use anyhow::{Context, Result};
use log::error;

use chart_crosstab::pipeline;
use chart_crosstab::PipelineConfig;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("crosstab.toml"));

    let config = PipelineConfig::from_file(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let output = pipeline::run(&config).context("running pipeline")?;

    println!(
        "Cross-table: {} x {} written to {}",
        output.cross_table.rows().len(),
        output.cross_table.columns().len(),
        config.output_file.display()
    );

    if let Some(correlations) = &output.correlations {
        println!("\n{}", correlations.pearson);
        println!("{}", correlations.spearman);
    }
    if let Some(rankings) = &output.rankings {
        println!("{:<20}{:>12}{:>12}", "country", "appearances", "final rank");
        for r in rankings {
            println!("{:<20}{:>12}{:>12}", r.country, r.chart_appearances, r.final_rank);
        }
        if let Some(rho) = output.popularity_correlation {
            println!("appearances vs final rank (spearman): {rho:.3}");
        }
    }
    if let Some(coverage) = &output.coverage {
        println!("\n{coverage}");
    }
    Ok(())
}
