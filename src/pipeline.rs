//! One-shot batch run over a fixed snapshot of input files.
//!
//! ```text
//!   charts/*.csv      results.csv      mapping.json
//!        │                 │                │
//!        └────────┬────────┘                │
//!                 ▼                         │
//!        ┌──────────────────┐               │
//!        │ CrossTableBuilder │◀──────────────┘
//!        └──────────────────┘
//!                 │  CrossTable ──▶ cross_table.csv
//!        ┌────────┼──────────────┐
//!        ▼        ▼              ▼
//!  ScoreCorrelator  RankMerger  CoverageReport
//! ```

use log::{info, warn};

use crate::config::PipelineConfig;
use crate::correlate::{CorrelationReport, ScoreCorrelator};
use crate::crosstab::{BuildReport, CrossTableBuilder};
use crate::data::loader::{list_chart_files, load_score_table, load_standings, ResultsRepository};
use crate::data::mapping::CountryMapper;
use crate::data::model::CrossTable;
use crate::error::{PipelineError, Result};
use crate::ranking::{RankMerger, RankedCountry};
use crate::report::CoverageReport;

/// Everything a run derives from its inputs.
#[derive(Debug)]
pub struct PipelineOutput {
    pub cross_table: CrossTable,
    pub build: BuildReport,
    pub correlations: Option<CorrelationReport>,
    pub rankings: Option<Vec<RankedCountry>>,
    pub popularity_correlation: Option<f64>,
    pub coverage: Option<CoverageReport>,
}

/// Run the whole pipeline and write the cross-table CSV.
///
/// Fails on mapping, results or chart-folder errors; a results table with
/// no rows is not an error and yields an empty cross-table. Individual chart
/// files that cannot be loaded are skipped; optional score and standings
/// tables that cannot be loaded only disable their own stage.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let mapper = CountryMapper::load(&config.mapping_file)?;
    info!("Loaded {} country names", mapper.len());

    let results = match ResultsRepository::new(config.case_sensitive_join).load(&config.results_file) {
        Ok(results) => results,
        Err(PipelineError::EmptyInput { path }) => {
            warn!("{}: results table has no rows, nothing can match", path.display());
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    let chart_files = list_chart_files(&config.chart_folder)?;
    info!(
        "Found {} chart files in {}",
        chart_files.len(),
        config.chart_folder.display()
    );

    let (cross_table, build) = CrossTableBuilder::new(&mapper, config.case_sensitive_join)
        .parallel(config.parallel)
        .build(&chart_files, &results);
    cross_table.write_csv(&config.output_file, config.missing_cell_policy)?;

    let correlations = match (&config.jury_file, &config.public_file) {
        (Some(jury_path), Some(public_path)) => {
            match (load_score_table(jury_path), load_score_table(public_path)) {
                (Ok(jury), Ok(public)) => Some(
                    ScoreCorrelator::new(config.missing_cell_policy)
                        .correlate_all(&cross_table, &jury, &public),
                ),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Skipping correlation: {e}");
                    None
                }
            }
        }
        _ => None,
    };

    let rankings = match &config.standings_file {
        Some(path) => match load_standings(path) {
            Ok(standings) => {
                let unplaced = RankMerger::unplaced(&standings, &cross_table);
                if !unplaced.is_empty() {
                    warn!("No final placement for: {}", unplaced.join(", "));
                }
                Some(RankMerger::merge(&standings, &cross_table))
            }
            Err(e) => {
                warn!("Skipping rank merge: {e}");
                None
            }
        },
        None => None,
    };
    let popularity_correlation = rankings
        .as_deref()
        .and_then(RankMerger::popularity_correlation);

    let coverage = config.target_country.as_deref().map(|target| {
        CoverageReport::for_country(
            &cross_table,
            &build.chart_countries,
            target,
            config.missing_cell_policy,
        )
    });

    Ok(PipelineOutput {
        cross_table,
        build,
        correlations,
        rankings,
        popularity_correlation,
        coverage,
    })
}
