//! Joins every chart file against the results table and pivots the matches
//! into a chart-country × result-country matrix of best positions.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::MissingCellPolicy;
use crate::data::loader::{chart_code, ChartRepository};
use crate::data::mapping::CountryMapper;
use crate::data::model::{ChartRecord, CrossEntry, CrossTable, ResultRecord};
use crate::error::{PipelineError, Result, SkippedSource, UnmappedCodeWarning};

// ---------------------------------------------------------------------------
// Build diagnostics
// ---------------------------------------------------------------------------

/// What happened to each chart file during a build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Every chart country whose file loaded, including empty charts and
    /// charts with no matching artist.
    pub chart_countries: BTreeSet<String>,
    pub skipped: Vec<SkippedSource>,
    pub unmapped: BTreeSet<UnmappedCodeWarning>,
    /// Rows in the long relation before aggregation.
    pub joined_rows: usize,
}

/// Outcome of joining one chart file.
enum SourceOutcome {
    Joined {
        chart_country: String,
        entries: Vec<CrossEntry>,
    },
    Skipped(SkippedSource),
}

// ---------------------------------------------------------------------------
// CrossTableBuilder
// ---------------------------------------------------------------------------

pub struct CrossTableBuilder<'a> {
    mapper: &'a CountryMapper,
    charts: ChartRepository,
    parallel: bool,
}

impl<'a> CrossTableBuilder<'a> {
    pub fn new(mapper: &'a CountryMapper, case_sensitive_join: bool) -> Self {
        CrossTableBuilder {
            mapper,
            charts: ChartRepository::new(case_sensitive_join),
            parallel: false,
        }
    }

    /// Spread per-file joins over the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Join each chart file to `results` and aggregate into a [`CrossTable`].
    ///
    /// A chart file that fails to load is skipped and recorded in the
    /// report; it never aborts the build.
    pub fn build(
        &self,
        chart_sources: &[PathBuf],
        results: &[ResultRecord],
    ) -> (CrossTable, BuildReport) {
        let index = index_results(results);

        let outcomes: Vec<SourceOutcome> = if self.parallel {
            chart_sources
                .par_iter()
                .map(|path| self.join_source(path, &index))
                .collect()
        } else {
            chart_sources
                .iter()
                .map(|path| self.join_source(path, &index))
                .collect()
        };

        let mut report = BuildReport::default();
        let mut long: Vec<CrossEntry> = Vec::new();
        for outcome in outcomes {
            match outcome {
                SourceOutcome::Joined {
                    chart_country,
                    entries,
                } => {
                    report.chart_countries.insert(chart_country);
                    long.extend(entries);
                }
                SourceOutcome::Skipped(skipped) => {
                    warn!("Skipping {}: {}", skipped.path.display(), skipped.reason);
                    report.skipped.push(skipped);
                }
            }
        }
        for path in chart_sources {
            if let Some(code) = chart_code(path) {
                if !self.mapper.contains(&code) {
                    report.unmapped.insert(UnmappedCodeWarning { code });
                }
            }
        }
        report.joined_rows = long.len();

        let table = CrossTable::from_entries(long);
        info!(
            "Cross-table: {} chart countries x {} result countries from {} joined rows ({} files skipped)",
            table.rows().len(),
            table.columns().len(),
            report.joined_rows,
            report.skipped.len()
        );
        (table, report)
    }

    fn join_source(&self, path: &Path, index: &BTreeMap<&str, &ResultRecord>) -> SourceOutcome {
        let Some(code) = chart_code(path) else {
            return SourceOutcome::Skipped(SkippedSource {
                path: path.to_path_buf(),
                reason: PipelineError::malformed(path, "file name has no country code"),
            });
        };
        let chart_country = self.mapper.resolve(&code);

        let records = match self.charts.load(path) {
            Ok(records) => records,
            Err(PipelineError::EmptyInput { .. }) => {
                debug!("{}: empty chart, contributes nothing", path.display());
                Vec::new()
            }
            Err(reason) => {
                return SourceOutcome::Skipped(SkippedSource {
                    path: path.to_path_buf(),
                    reason,
                })
            }
        };

        let entries = join_chart(&chart_country, &records, index);
        debug!(
            "{}: {} of {} entries matched a contest artist",
            path.display(),
            entries.len(),
            records.len()
        );
        SourceOutcome::Joined {
            chart_country,
            entries,
        }
    }
}

/// Results keyed by normalized artist. The results repository guarantees
/// the key is unique.
fn index_results(results: &[ResultRecord]) -> BTreeMap<&str, &ResultRecord> {
    results
        .iter()
        .map(|r| (r.normalized_artist.as_str(), r))
        .collect()
}

/// Inner join of one chart against the results; unmatched chart entries are
/// dropped.
fn join_chart(
    chart_country: &str,
    records: &[ChartRecord],
    index: &BTreeMap<&str, &ResultRecord>,
) -> Vec<CrossEntry> {
    records
        .iter()
        .filter_map(|rec| {
            index
                .get(rec.normalized_artist.as_str())
                .map(|result| CrossEntry {
                    chart_country: chart_country.to_string(),
                    result_country: result.country.clone(),
                    position: rec.position,
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV output
// ---------------------------------------------------------------------------

impl CrossTable {
    /// Write the matrix as CSV. Absent cells are empty, or `0` under
    /// [`MissingCellPolicy::Zero`].
    pub fn write_csv(&self, path: &Path, policy: MissingCellPolicy) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let csv_err = |source| PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
        let mut header = vec!["ChartCountry".to_string()];
        header.extend(self.columns().iter().cloned());
        writer.write_record(&header).map_err(csv_err)?;

        for row in self.rows() {
            let mut line = vec![row.clone()];
            line.extend(self.columns().iter().map(|col| match self.get(row, col) {
                Some(pos) => pos.to_string(),
                None if policy == MissingCellPolicy::Zero => "0".to_string(),
                None => String::new(),
            }));
            writer.write_record(&line).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Wrote cross-table to {}", path.display());
        Ok(())
    }
}
