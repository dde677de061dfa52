use std::collections::BTreeSet;

use crate::data::model::{CrossTable, Standing};
use crate::stats::spearman;

/// Chart exposure and contest outcome of one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCountry {
    pub country: String,
    /// In how many charts an artist of this country appeared.
    pub chart_appearances: usize,
    /// Inverted placement: the winner has the highest value.
    pub final_rank: u32,
}

pub struct RankMerger;

impl RankMerger {
    /// Pair every placed country with its appearance count in `cross`.
    ///
    /// Countries without a column in the cross-table have zero appearances.
    /// Output is ordered best outcome first.
    pub fn merge(final_standings: &[Standing], cross: &CrossTable) -> Vec<RankedCountry> {
        let n = final_standings.len() as u32;
        let mut merged: Vec<RankedCountry> = final_standings
            .iter()
            .map(|s| RankedCountry {
                country: s.country.clone(),
                chart_appearances: cross.column_count(&s.country),
                final_rank: (n + 1).saturating_sub(s.place),
            })
            .collect();
        merged.sort_by(|a, b| {
            b.final_rank
                .cmp(&a.final_rank)
                .then_with(|| a.country.cmp(&b.country))
        });
        merged
    }

    /// Spearman coefficient between chart appearances and final rank.
    pub fn popularity_correlation(rows: &[RankedCountry]) -> Option<f64> {
        let appearances: Vec<f64> = rows.iter().map(|r| r.chart_appearances as f64).collect();
        let ranks: Vec<f64> = rows.iter().map(|r| f64::from(r.final_rank)).collect();
        spearman(&appearances, &ranks)
    }

    /// Cross-table columns with no final placement.
    pub fn unplaced(final_standings: &[Standing], cross: &CrossTable) -> Vec<String> {
        let placed: BTreeSet<&str> = final_standings.iter().map(|s| s.country.as_str()).collect();
        cross
            .columns()
            .iter()
            .filter(|c| !placed.contains(c.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CrossEntry;

    fn standing(country: &str, place: u32) -> Standing {
        Standing {
            country: country.into(),
            place,
        }
    }

    fn cross() -> CrossTable {
        let cells = [
            ("Sweden", "Sweden", 1),
            ("Norway", "Sweden", 4),
            ("Estonia", "Sweden", 9),
            ("Sweden", "Norway", 30),
            ("Estonia", "Israel", 12),
        ];
        CrossTable::from_entries(cells.iter().map(|(r, c, p)| CrossEntry {
            chart_country: r.to_string(),
            result_country: c.to_string(),
            position: *p,
        }))
    }

    #[test]
    fn placement_is_inverted_and_counted() {
        let standings = vec![
            standing("Norway", 3),
            standing("Sweden", 1),
            standing("Finland", 4),
            standing("Israel", 2),
        ];
        let merged = RankMerger::merge(&standings, &cross());
        assert_eq!(
            merged,
            vec![
                RankedCountry { country: "Sweden".into(), chart_appearances: 3, final_rank: 4 },
                RankedCountry { country: "Israel".into(), chart_appearances: 1, final_rank: 3 },
                RankedCountry { country: "Norway".into(), chart_appearances: 1, final_rank: 2 },
                RankedCountry { country: "Finland".into(), chart_appearances: 0, final_rank: 1 },
            ]
        );
    }

    #[test]
    fn popularity_tracks_rank_when_monotone() {
        let standings = vec![standing("Sweden", 1), standing("Norway", 2), standing("Finland", 3)];
        let merged = RankMerger::merge(&standings, &cross());
        let r = RankMerger::popularity_correlation(&merged).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reports_columns_without_placement() {
        let standings = vec![standing("Sweden", 1)];
        assert_eq!(RankMerger::unplaced(&standings, &cross()), ["Israel", "Norway"]);
    }
}
