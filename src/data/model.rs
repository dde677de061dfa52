use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Join key
// ---------------------------------------------------------------------------

/// Canonical artist key used to join charts against results.
///
/// Whitespace is always trimmed; case is folded unless `case_sensitive`.
/// Both repositories must go through this function before any join.
pub fn normalize_artist(raw: &str, case_sensitive: bool) -> String {
    let trimmed = raw.trim();
    if case_sensitive {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Records – one validated row of an input file
// ---------------------------------------------------------------------------

/// One line of a per-country chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRecord {
    pub artist: String,
    pub normalized_artist: String,
    /// 1-based chart position.
    pub position: u32,
}

/// One competing entry of the contest results table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub artist: String,
    pub normalized_artist: String,
    pub country: String,
    pub points: f64,
    pub public_points: f64,
    pub jury_points: f64,
}

/// Final contest placement of one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub country: String,
    /// 1-based; 1 is the winner.
    pub place: u32,
}

// ---------------------------------------------------------------------------
// CrossTable – chart country × result country → best position
// ---------------------------------------------------------------------------

/// One joined row of the long relation, before aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossEntry {
    pub chart_country: String,
    pub result_country: String,
    pub position: u32,
}

/// Best chart position each result country reached on each country's chart.
///
/// Rows are chart-owning countries, columns are result countries, both
/// sorted lexicographically. A missing cell is *absent*: no artist of the
/// column country appeared on the row country's chart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrossTable {
    rows: Vec<String>,
    columns: Vec<String>,
    cells: BTreeMap<(String, String), u32>,
}

impl CrossTable {
    /// Aggregate the long relation, keeping the minimum position per cell.
    ///
    /// The reduction is order-independent, so entries may arrive in any
    /// order (e.g. from parallel workers).
    pub fn from_entries(entries: impl IntoIterator<Item = CrossEntry>) -> Self {
        let mut cells: BTreeMap<(String, String), u32> = BTreeMap::new();
        for e in entries {
            cells
                .entry((e.chart_country, e.result_country))
                .and_modify(|best| *best = (*best).min(e.position))
                .or_insert(e.position);
        }

        let rows: BTreeSet<&String> = cells.keys().map(|(r, _)| r).collect();
        let columns: BTreeSet<&String> = cells.keys().map(|(_, c)| c).collect();
        CrossTable {
            rows: rows.into_iter().cloned().collect(),
            columns: columns.into_iter().cloned().collect(),
            cells,
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Best position of `result_country` on `chart_country`'s chart.
    pub fn get(&self, chart_country: &str, result_country: &str) -> Option<u32> {
        self.cells
            .get(&(chart_country.to_string(), result_country.to_string()))
            .copied()
    }

    /// Number of non-absent cells in a result country's column.
    pub fn column_count(&self, result_country: &str) -> usize {
        self.cells
            .keys()
            .filter(|(_, c)| c == result_country)
            .count()
    }

    /// Number of non-absent cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ScoreTable – per-country final points (jury or public)
// ---------------------------------------------------------------------------

/// A labelled matrix of contest points. Cells may be missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreTable {
    rows: Vec<String>,
    columns: Vec<String>,
    values: BTreeMap<(String, String), f64>,
}

impl ScoreTable {
    /// Build from row/column labels and the present cells. Cells whose labels
    /// are not in `rows`/`columns` are discarded.
    pub fn new(
        rows: Vec<String>,
        columns: Vec<String>,
        values: BTreeMap<(String, String), f64>,
    ) -> Self {
        let row_set: BTreeSet<&String> = rows.iter().collect();
        let col_set: BTreeSet<&String> = columns.iter().collect();
        let values = values
            .into_iter()
            .filter(|((r, c), _)| row_set.contains(r) && col_set.contains(c))
            .collect();
        ScoreTable {
            rows,
            columns,
            values,
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        self.values
            .get(&(row.to_string(), column.to_string()))
            .copied()
    }

    /// Keep only the columns that are also row labels of `index`.
    pub fn restrict_columns_to_rows_of(&self, index: &ScoreTable) -> ScoreTable {
        let keep: BTreeSet<&String> = index.rows.iter().collect();
        let columns: Vec<String> = self
            .columns
            .iter()
            .filter(|c| keep.contains(c))
            .cloned()
            .collect();
        ScoreTable::new(self.rows.clone(), columns, self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(chart: &str, result: &str, position: u32) -> CrossEntry {
        CrossEntry {
            chart_country: chart.into(),
            result_country: result.into(),
            position,
        }
    }

    #[test]
    fn normalization_trims_and_folds_case() {
        assert_eq!(normalize_artist("  ALICE ", false), "alice");
        assert_eq!(normalize_artist("  ALICE ", true), "ALICE");
    }

    #[test]
    fn aggregation_keeps_best_position() {
        let table = CrossTable::from_entries(vec![
            entry("Sweden", "Norway", 12),
            entry("Sweden", "Norway", 5),
            entry("Sweden", "Norway", 40),
        ]);
        assert_eq!(table.get("Sweden", "Norway"), Some(5));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn labels_are_sorted_and_absent_cells_stay_absent() {
        let table = CrossTable::from_entries(vec![
            entry("Norway", "Sweden", 3),
            entry("Estonia", "Norway", 7),
        ]);
        assert_eq!(table.rows(), ["Estonia", "Norway"]);
        assert_eq!(table.columns(), ["Norway", "Sweden"]);
        assert_eq!(table.get("Estonia", "Sweden"), None);
        assert_eq!(table.column_count("Sweden"), 1);
        assert_eq!(table.column_count("Latvia"), 0);
    }

    #[test]
    fn aggregation_ignores_entry_order() {
        let mut entries = vec![
            entry("A", "B", 9),
            entry("A", "B", 2),
            entry("C", "B", 4),
            entry("A", "D", 1),
        ];
        let forward = CrossTable::from_entries(entries.clone());
        entries.reverse();
        assert_eq!(forward, CrossTable::from_entries(entries));
    }

    #[test]
    fn restrict_columns_drops_non_voting_labels() {
        let mut values = BTreeMap::new();
        values.insert(("Sweden".to_string(), "Norway".to_string()), 12.0);
        values.insert(("Sweden".to_string(), "Rest of World".to_string()), 8.0);
        let table = ScoreTable::new(
            vec!["Sweden".into(), "Norway".into()],
            vec!["Norway".into(), "Rest of World".into()],
            values,
        );
        let restricted = table.restrict_columns_to_rows_of(&table);
        assert_eq!(restricted.columns(), ["Norway"]);
        assert_eq!(restricted.get("Sweden", "Norway"), Some(12.0));
        assert_eq!(restricted.get("Sweden", "Rest of World"), None);
    }
}
