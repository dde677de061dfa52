//! Aligns the cross-table with the jury and public final-score tables and
//! correlates the three over their shared cells.

use std::fmt;

use log::info;

use crate::config::MissingCellPolicy;
use crate::data::model::{CrossTable, ScoreTable};
use crate::stats::{complete_pairs, pearson, spearman};

// ---------------------------------------------------------------------------
// Variables and methods
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationMethod::Pearson => f.pad("pearson"),
            CorrelationMethod::Spearman => f.pad("spearman"),
        }
    }
}

/// The three correlated quantities, in matrix order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    ChartPosition,
    JuryPoints,
    PublicPoints,
}

impl Variable {
    pub const ALL: [Variable; 3] = [
        Variable::ChartPosition,
        Variable::JuryPoints,
        Variable::PublicPoints,
    ];

    fn index(self) -> usize {
        match self {
            Variable::ChartPosition => 0,
            Variable::JuryPoints => 1,
            Variable::PublicPoints => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variable::ChartPosition => "position",
            Variable::JuryPoints => "jury",
            Variable::PublicPoints => "public",
        }
    }
}

// ---------------------------------------------------------------------------
// CorrelationMatrix
// ---------------------------------------------------------------------------

/// Symmetric 3×3 coefficients over {chart position, jury, public}.
///
/// Off-diagonal entries are `None` when undefined (fewer than two complete
/// pairs, or a constant side). The diagonal is always `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    coefficients: [[Option<f64>; 3]; 3],
    observations: [[usize; 3]; 3],
}

impl CorrelationMatrix {
    pub fn get(&self, a: Variable, b: Variable) -> Option<f64> {
        self.coefficients[a.index()][b.index()]
    }

    /// Number of complete pairs behind the coefficient of `a` and `b`.
    pub fn observations(&self, a: Variable, b: Variable) -> usize {
        self.observations[a.index()][b.index()]
    }

    fn compute(method: CorrelationMethod, aligned: &AlignedScores) -> Self {
        let series = [&aligned.position, &aligned.jury, &aligned.public];
        let mut coefficients = [[None; 3]; 3];
        let mut observations = [[0usize; 3]; 3];

        for i in 0..3 {
            coefficients[i][i] = Some(1.0);
            observations[i][i] = series[i].iter().filter(|v| v.is_some()).count();
            for j in (i + 1)..3 {
                let (xs, ys) = complete_pairs(series[i], series[j]);
                let r = match method {
                    CorrelationMethod::Pearson => pearson(&xs, &ys),
                    CorrelationMethod::Spearman => spearman(&xs, &ys),
                };
                coefficients[i][j] = r;
                coefficients[j][i] = r;
                observations[i][j] = xs.len();
                observations[j][i] = xs.len();
            }
        }

        CorrelationMatrix {
            method,
            coefficients,
            observations,
        }
    }
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10}", self.method)?;
        for v in Variable::ALL {
            write!(f, "{:>10}", v.label())?;
        }
        writeln!(f)?;
        for a in Variable::ALL {
            write!(f, "{:<10}", a.label())?;
            for b in Variable::ALL {
                match self.get(a, b) {
                    Some(r) => write!(f, "{r:>10.3}")?,
                    None => write!(f, "{:>10}", "n/a")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScoreCorrelator
// ---------------------------------------------------------------------------

/// The three tables flattened row-major over the cross-table's index.
/// `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignedScores {
    pub position: Vec<Option<f64>>,
    pub jury: Vec<Option<f64>>,
    pub public: Vec<Option<f64>>,
}

/// Both coefficient matrices for one alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationReport {
    pub pearson: CorrelationMatrix,
    pub spearman: CorrelationMatrix,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCorrelator {
    policy: MissingCellPolicy,
}

impl ScoreCorrelator {
    /// `policy` decides whether absent cross-table cells enter the
    /// correlation as missing or as position `0`.
    pub fn new(policy: MissingCellPolicy) -> Self {
        ScoreCorrelator { policy }
    }

    /// Reconcile the score tables with the cross-table and flatten all three.
    ///
    /// Both score tables first lose every column that is not a row of the
    /// jury table; then all three are read over the cross-table's rows and
    /// columns. Labels missing from a score table yield missing cells.
    pub fn align(&self, cross: &CrossTable, jury: &ScoreTable, public: &ScoreTable) -> AlignedScores {
        let jury_r = jury.restrict_columns_to_rows_of(jury);
        let public_r = public.restrict_columns_to_rows_of(jury);

        let cells = cross.rows().len() * cross.columns().len();
        let mut aligned = AlignedScores {
            position: Vec::with_capacity(cells),
            jury: Vec::with_capacity(cells),
            public: Vec::with_capacity(cells),
        };
        for row in cross.rows() {
            for col in cross.columns() {
                let position = match (cross.get(row, col), self.policy) {
                    (Some(pos), _) => Some(f64::from(pos)),
                    (None, MissingCellPolicy::Zero) => Some(0.0),
                    (None, MissingCellPolicy::Absent) => None,
                };
                aligned.position.push(position);
                aligned.jury.push(jury_r.get(row, col));
                aligned.public.push(public_r.get(row, col));
            }
        }
        aligned
    }

    pub fn correlate(
        &self,
        cross: &CrossTable,
        jury: &ScoreTable,
        public: &ScoreTable,
        method: CorrelationMethod,
    ) -> CorrelationMatrix {
        CorrelationMatrix::compute(method, &self.align(cross, jury, public))
    }

    pub fn correlate_all(
        &self,
        cross: &CrossTable,
        jury: &ScoreTable,
        public: &ScoreTable,
    ) -> CorrelationReport {
        let aligned = self.align(cross, jury, public);
        let report = CorrelationReport {
            pearson: CorrelationMatrix::compute(CorrelationMethod::Pearson, &aligned),
            spearman: CorrelationMatrix::compute(CorrelationMethod::Spearman, &aligned),
        };
        info!(
            "Correlated {} cells ({} with a chart position)",
            aligned.position.len(),
            report
                .pearson
                .observations(Variable::ChartPosition, Variable::ChartPosition)
        );
        report
    }
}
