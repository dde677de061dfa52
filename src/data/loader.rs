use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{debug, info};

use super::model::{normalize_artist, ChartRecord, ResultRecord, ScoreTable, Standing};
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Shared CSV helpers
// ---------------------------------------------------------------------------

/// Score-table columns that are index or aggregate columns, not countries.
const NON_COUNTRY_COLUMNS: [&str; 3] = ["", "Unnamed: 0", "Total"];

fn open_csv(path: &Path) -> Result<(csv::Reader<File>, StringRecord)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|source| csv_error(path, source))?;
    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    Ok((reader, headers))
}

fn csv_error(path: &Path, source: csv::Error) -> PipelineError {
    PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn require_column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PipelineError::malformed(path, format!("missing column '{name}'")))
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

/// Data line number for messages (the header is line 1).
fn line_no(row_idx: usize) -> usize {
    row_idx + 2
}

/// Finite numbers only; `NaN` and infinities are rejected.
fn parse_f64(value: &str, column: &str, row_idx: usize, path: &Path) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PipelineError::malformed(
            path,
            format!(
                "line {}: '{value}' in column '{column}' is not a finite number",
                line_no(row_idx)
            ),
        )),
    }
}

/// Spellings of a missing score cell besides the empty string.
fn is_missing_marker(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan")
}

fn parse_rank(value: &str, column: &str, row_idx: usize, path: &Path) -> Result<u32> {
    match value.parse::<u32>() {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(PipelineError::malformed(
            path,
            format!(
                "line {}: '{value}' in column '{column}' is not a positive integer",
                line_no(row_idx)
            ),
        )),
    }
}

// ---------------------------------------------------------------------------
// Chart files
// ---------------------------------------------------------------------------

/// Country code of a chart file: the part of the file stem before the first
/// underscore, lowercased (`SE_daily.csv` → `se`).
pub fn chart_code(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let code = stem.split('_').next().unwrap_or(stem);
    if code.is_empty() {
        None
    } else {
        Some(code.to_lowercase())
    }
}

/// Every `*.csv` file directly inside `folder`, sorted by path.
pub fn list_chart_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source| PipelineError::Io {
        path: folder.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads one chart file into [`ChartRecord`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartRepository {
    pub case_sensitive_join: bool,
}

impl ChartRepository {
    pub fn new(case_sensitive_join: bool) -> Self {
        ChartRepository {
            case_sensitive_join,
        }
    }

    /// Required columns: `Artist`, `Pos`. Other columns are ignored.
    pub fn load(&self, path: &Path) -> Result<Vec<ChartRecord>> {
        let (mut reader, headers) = open_csv(path)?;
        let artist_idx = require_column(&headers, "Artist", path)?;
        let pos_idx = require_column(&headers, "Pos", path)?;

        let mut records = Vec::new();
        let mut rows = 0usize;
        for (row_idx, result) in reader.records().enumerate() {
            let record = result.map_err(|source| csv_error(path, source))?;
            rows += 1;

            let artist = field(&record, artist_idx);
            if artist.is_empty() {
                debug!("{}: line {} has no artist, skipped", path.display(), line_no(row_idx));
                continue;
            }
            let position = parse_rank(field(&record, pos_idx), "Pos", row_idx, path)?;

            records.push(ChartRecord {
                artist: artist.to_string(),
                normalized_artist: normalize_artist(artist, self.case_sensitive_join),
                position,
            });
        }

        if rows == 0 {
            return Err(PipelineError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        debug!("{}: {} chart entries", path.display(), records.len());
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Results table
// ---------------------------------------------------------------------------

/// Loads the contest results table into [`ResultRecord`]s, unique on the
/// normalized artist key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsRepository {
    pub case_sensitive_join: bool,
}

impl ResultsRepository {
    pub fn new(case_sensitive_join: bool) -> Self {
        ResultsRepository {
            case_sensitive_join,
        }
    }

    /// Required columns: `Artist`, `Country`, `Points`, `Public`, `Jury`.
    ///
    /// Exact repeats of an (artist, country) row collapse into one. An artist
    /// listed for two countries, or twice for one country with different
    /// scores, is a [`PipelineError::DataIntegrity`].
    pub fn load(&self, path: &Path) -> Result<Vec<ResultRecord>> {
        let (mut reader, headers) = open_csv(path)?;
        let artist_idx = require_column(&headers, "Artist", path)?;
        let country_idx = require_column(&headers, "Country", path)?;
        let points_idx = require_column(&headers, "Points", path)?;
        let public_idx = require_column(&headers, "Public", path)?;
        let jury_idx = require_column(&headers, "Jury", path)?;

        let mut records: Vec<ResultRecord> = Vec::new();
        let mut by_key: BTreeMap<String, usize> = BTreeMap::new();
        let mut rows = 0usize;

        for (row_idx, result) in reader.records().enumerate() {
            let record = result.map_err(|source| csv_error(path, source))?;
            rows += 1;

            let artist = field(&record, artist_idx);
            let country = field(&record, country_idx);
            if artist.is_empty() || country.is_empty() {
                return Err(PipelineError::malformed(
                    path,
                    format!("line {}: empty Artist or Country", line_no(row_idx)),
                ));
            }

            let rec = ResultRecord {
                artist: artist.to_string(),
                normalized_artist: normalize_artist(artist, self.case_sensitive_join),
                country: country.to_string(),
                points: parse_f64(field(&record, points_idx), "Points", row_idx, path)?,
                public_points: parse_f64(field(&record, public_idx), "Public", row_idx, path)?,
                jury_points: parse_f64(field(&record, jury_idx), "Jury", row_idx, path)?,
            };

            if let Some(&existing_idx) = by_key.get(&rec.normalized_artist) {
                let existing = &records[existing_idx];
                if existing.country != rec.country {
                    return Err(PipelineError::integrity(
                        path,
                        format!(
                            "artist '{}' represents both {} and {}",
                            rec.artist, existing.country, rec.country
                        ),
                    ));
                }
                if existing.points != rec.points
                    || existing.public_points != rec.public_points
                    || existing.jury_points != rec.jury_points
                {
                    return Err(PipelineError::integrity(
                        path,
                        format!(
                            "artist '{}' ({}) listed twice with different scores",
                            rec.artist, rec.country
                        ),
                    ));
                }
                debug!(
                    "{}: line {} repeats '{}' ({}), collapsed",
                    path.display(),
                    line_no(row_idx),
                    rec.artist,
                    rec.country
                );
                continue;
            }

            by_key.insert(rec.normalized_artist.clone(), records.len());
            records.push(rec);
        }

        if rows == 0 {
            return Err(PipelineError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        info!("{}: {} result entries", path.display(), records.len());
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Final score tables (jury / public)
// ---------------------------------------------------------------------------

/// Load a final-points table.
///
/// The `Country` column labels rows; every other column except index and
/// `Total` columns is a country column. Empty and `NaN` cells are missing.
pub fn load_score_table(path: &Path) -> Result<ScoreTable> {
    let (mut reader, headers) = open_csv(path)?;
    let country_idx = require_column(&headers, "Country", path)?;

    let value_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != country_idx && !NON_COUNTRY_COLUMNS.contains(h))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut rows: Vec<String> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut values: BTreeMap<(String, String), f64> = BTreeMap::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|source| csv_error(path, source))?;
        let country = field(&record, country_idx).to_string();
        if country.is_empty() {
            return Err(PipelineError::malformed(
                path,
                format!("line {}: empty Country", line_no(row_idx)),
            ));
        }
        if !seen.insert(country.clone()) {
            return Err(PipelineError::integrity(
                path,
                format!("country '{country}' appears on more than one row"),
            ));
        }

        for (col_idx, col_name) in &value_cols {
            let raw = field(&record, *col_idx);
            if is_missing_marker(raw) {
                continue;
            }
            let v = parse_f64(raw, col_name, row_idx, path)?;
            values.insert((country.clone(), col_name.clone()), v);
        }
        rows.push(country);
    }

    if rows.is_empty() {
        return Err(PipelineError::EmptyInput {
            path: path.to_path_buf(),
        });
    }
    let columns = value_cols.into_iter().map(|(_, name)| name).collect();
    Ok(ScoreTable::new(rows, columns, values))
}

// ---------------------------------------------------------------------------
// Final standings
// ---------------------------------------------------------------------------

/// Load final placements (`Country`, `Place`). Places must be a permutation
/// of `1..=N`.
pub fn load_standings(path: &Path) -> Result<Vec<Standing>> {
    let (mut reader, headers) = open_csv(path)?;
    let country_idx = require_column(&headers, "Country", path)?;
    let place_idx = require_column(&headers, "Place", path)?;

    let mut standings = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|source| csv_error(path, source))?;
        let country = field(&record, country_idx);
        if country.is_empty() {
            return Err(PipelineError::malformed(
                path,
                format!("line {}: empty Country", line_no(row_idx)),
            ));
        }
        standings.push(Standing {
            country: country.to_string(),
            place: parse_rank(field(&record, place_idx), "Place", row_idx, path)?,
        });
    }

    if standings.is_empty() {
        return Err(PipelineError::EmptyInput {
            path: path.to_path_buf(),
        });
    }

    let n = standings.len() as u32;
    let mut countries = BTreeSet::new();
    let mut places = BTreeSet::new();
    for s in &standings {
        if !countries.insert(s.country.as_str()) {
            return Err(PipelineError::integrity(
                path,
                format!("country '{}' placed more than once", s.country),
            ));
        }
        if s.place > n || !places.insert(s.place) {
            return Err(PipelineError::integrity(
                path,
                format!("place {} of '{}' is duplicated or out of 1..={n}", s.place, s.country),
            ));
        }
    }
    Ok(standings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn chart_code_is_prefix_before_underscore() {
        assert_eq!(chart_code(Path::new("charts/se_daily.csv")), Some("se".into()));
        assert_eq!(chart_code(Path::new("GB_weekly_totals.csv")), Some("gb".into()));
        assert_eq!(chart_code(Path::new("global.csv")), Some("global".into()));
        assert_eq!(chart_code(Path::new("_daily.csv")), None);
    }

    #[test]
    fn lists_only_csv_files_sorted() {
        let dir = TempDir::new().unwrap();
        write(&dir, "no_daily.csv", "Pos,Artist\n");
        write(&dir, "ee_daily.CSV", "Pos,Artist\n");
        write(&dir, "notes.txt", "x");
        let files = list_chart_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["ee_daily.CSV", "no_daily.csv"]);
    }

    #[test]
    fn loads_chart_with_extra_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "se_daily.csv",
            "Pos,P+,Artist and Title,Artist,Track\n1,=,Alice - Song,Alice,Song\n2,+1,BOB - Tune, BOB ,Tune\n",
        );
        let records = ChartRepository::new(false).load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].artist, "BOB");
        assert_eq!(records[1].normalized_artist, "bob");
        assert_eq!(records[1].position, 2);
    }

    #[test]
    fn chart_missing_pos_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "se_daily.csv", "Artist\nAlice\n");
        let err = ChartRepository::default().load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
        assert!(err.to_string().contains("'Pos'"));
    }

    #[test]
    fn chart_with_zero_position_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "se_daily.csv", "Pos,Artist\n0,Alice\n");
        assert!(matches!(
            ChartRepository::default().load(&path),
            Err(PipelineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn header_only_chart_is_empty_input() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "se_daily.csv", "Pos,Artist\n");
        assert!(matches!(
            ChartRepository::default().load(&path),
            Err(PipelineError::EmptyInput { .. })
        ));
    }

    #[test]
    fn results_collapse_exact_repeats() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Artist,Country,Points,Public,Jury\nAlice,Sweden,80,40,40\nalice ,Sweden,80,40,40\nBob,Norway,60,30,30\n",
        );
        let records = ResultsRepository::new(false).load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].country, "Sweden");
        assert_eq!(records[1].jury_points, 30.0);
    }

    #[test]
    fn results_artist_for_two_countries_fails() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Artist,Country,Points,Public,Jury\nAlice,Sweden,80,40,40\nALICE,Norway,60,30,30\n",
        );
        let err = ResultsRepository::new(false).load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity { .. }));
    }

    #[test]
    fn case_sensitive_results_keep_distinct_spellings() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Artist,Country,Points,Public,Jury\nAlice,Sweden,80,40,40\nALICE,Norway,60,30,30\n",
        );
        let records = ResultsRepository::new(true).load(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn results_conflicting_scores_fail() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Artist,Country,Points,Public,Jury\nAlice,Sweden,80,40,40\nAlice,Sweden,81,41,40\n",
        );
        assert!(matches!(
            ResultsRepository::default().load(&path),
            Err(PipelineError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn results_missing_jury_column_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "results.csv", "Artist,Country,Points,Public\nA,B,1,1\n");
        assert!(matches!(
            ResultsRepository::default().load(&path),
            Err(PipelineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn score_table_drops_index_and_total() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "jury.csv",
            ",Country,Total,Sweden,Norway\n0,Sweden,20,,12\n1,Norway,10,10,\n",
        );
        let table = load_score_table(&path).unwrap();
        assert_eq!(table.rows(), ["Sweden", "Norway"]);
        assert_eq!(table.columns(), ["Sweden", "Norway"]);
        assert_eq!(table.get("Sweden", "Norway"), Some(12.0));
        assert_eq!(table.get("Sweden", "Sweden"), None);
    }

    #[test]
    fn score_table_rejects_text_cells() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "jury.csv", "Country,Sweden\nNorway,twelve\n");
        assert!(matches!(
            load_score_table(&path),
            Err(PipelineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn results_reject_non_finite_scores() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "results.csv",
            "Artist,Country,Points,Public,Jury\nAlice,Sweden,NaN,40,40\n",
        );
        assert!(matches!(
            ResultsRepository::default().load(&path),
            Err(PipelineError::MalformedInput { .. })
        ));
        let path = write(
            &dir,
            "results_inf.csv",
            "Artist,Country,Points,Public,Jury\nAlice,Sweden,80,inf,40\n",
        );
        assert!(matches!(
            ResultsRepository::default().load(&path),
            Err(PipelineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn score_table_nan_cell_is_missing() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "jury.csv", "Country,Sweden,Norway\nNorway,NaN,\nSweden,,12\n");
        let table = load_score_table(&path).unwrap();
        assert_eq!(table.get("Norway", "Sweden"), None);
        assert_eq!(table.get("Sweden", "Norway"), Some(12.0));
    }

    #[test]
    fn score_table_rejects_infinite_cells() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "jury.csv", "Country,Sweden\nNorway,inf\n");
        assert!(matches!(
            load_score_table(&path),
            Err(PipelineError::MalformedInput { .. })
        ));
    }

    #[test]
    fn score_table_duplicate_row_is_integrity_error() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "jury.csv",
            "Country,Sweden,Norway\nNorway,12,\nSweden,,8\nNorway,10,\n",
        );
        let err = load_score_table(&path).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity { .. }));
        assert!(err.to_string().contains("'Norway'"));
    }

    #[test]
    fn standings_reject_repeated_country_or_place() {
        let dir = TempDir::new().unwrap();
        let twice = write(&dir, "twice.csv", "Country,Place\nSweden,1\nSweden,2\n");
        let err = load_standings(&twice).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity { .. }));
        assert!(err.to_string().contains("more than once"));

        let shared = write(&dir, "shared.csv", "Country,Place\nSweden,1\nNorway,1\n");
        let err = load_standings(&shared).unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity { .. }));
        assert!(err.to_string().contains("place 1 of 'Norway'"));
    }

    #[test]
    fn standings_must_be_a_permutation() {
        let dir = TempDir::new().unwrap();
        let ok = write(&dir, "ok.csv", "Country,Place\nSweden,1\nNorway,2\n");
        assert_eq!(load_standings(&ok).unwrap().len(), 2);

        let gap = write(&dir, "gap.csv", "Country,Place\nSweden,1\nNorway,3\n");
        assert!(matches!(
            load_standings(&gap),
            Err(PipelineError::DataIntegrity { .. })
        ));
    }
}
