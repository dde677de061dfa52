use std::collections::BTreeSet;
use std::fmt;

use crate::config::MissingCellPolicy;
use crate::data::model::CrossTable;

/// How widely one result country's artists charted.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub target: String,
    pub policy: MissingCellPolicy,
    /// Distinct chart countries considered.
    pub charts_total: usize,
    /// Charts on which the target appeared.
    pub charts_present: usize,
    /// Average best position; see [`CoverageReport::for_country`].
    pub average_position: Option<f64>,
}

impl CoverageReport {
    /// Summarise `target`'s column of the cross-table over every loaded chart.
    ///
    /// Under [`MissingCellPolicy::Zero`] a chart without the target counts as
    /// position 0 in the average; under [`MissingCellPolicy::Absent`] only
    /// appearances are averaged.
    pub fn for_country(
        cross: &CrossTable,
        chart_countries: &BTreeSet<String>,
        target: &str,
        policy: MissingCellPolicy,
    ) -> Self {
        let positions: Vec<u32> = chart_countries
            .iter()
            .filter_map(|chart| cross.get(chart, target))
            .collect();
        let sum: u32 = positions.iter().sum();

        let average_position = match policy {
            MissingCellPolicy::Zero if !chart_countries.is_empty() => {
                Some(f64::from(sum) / chart_countries.len() as f64)
            }
            MissingCellPolicy::Absent if !positions.is_empty() => {
                Some(f64::from(sum) / positions.len() as f64)
            }
            _ => None,
        };

        CoverageReport {
            target: target.to_string(),
            policy,
            charts_total: chart_countries.len(),
            charts_present: positions.len(),
            average_position,
        }
    }

    /// Share of charts on which the target appeared, in `0.0..=1.0`.
    pub fn coverage(&self) -> f64 {
        if self.charts_total == 0 {
            0.0
        } else {
            self.charts_present as f64 / self.charts_total as f64
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Country: {}", self.target)?;
        match self.average_position {
            Some(avg) => writeln!(f, "Average position ({}): {}", self.policy, round2(avg))?,
            None => writeln!(f, "Average position ({}): n/a", self.policy)?,
        }
        write!(
            f,
            "Charted in {}/{} charts ({})",
            self.charts_present,
            self.charts_total,
            round2(self.coverage())
        )
    }
}
