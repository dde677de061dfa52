use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// MissingCellPolicy – how absent cross-table cells are reported
// ---------------------------------------------------------------------------

/// Reporting treatment for a (chart country, result country) pair with no
/// matching artist.
///
/// The cross-table itself always stores such cells as absent; the policy only
/// decides whether derived outputs see them as missing or as position `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCellPolicy {
    #[default]
    Absent,
    Zero,
}

impl fmt::Display for MissingCellPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingCellPolicy::Absent => write!(f, "absent"),
            MissingCellPolicy::Zero => write!(f, "zero"),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Inputs and options for one batch run.
///
/// Loaded from TOML:
///
/// ```toml
/// chart_folder = "charts"
/// results_file = "results.csv"
/// mapping_file = "mapping.json"
/// case_sensitive_join = false
/// missing_cell_policy = "absent"
/// jury_file = "jury.csv"
/// public_file = "public.csv"
/// target_country = "Estonia"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub chart_folder: PathBuf,
    pub results_file: PathBuf,
    pub mapping_file: PathBuf,
    #[serde(default)]
    pub case_sensitive_join: bool,
    #[serde(default)]
    pub missing_cell_policy: MissingCellPolicy,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(default)]
    pub jury_file: Option<PathBuf>,
    #[serde(default)]
    pub public_file: Option<PathBuf>,
    #[serde(default)]
    pub standings_file: Option<PathBuf>,
    #[serde(default)]
    pub target_country: Option<String>,
    /// Join chart files on the rayon pool instead of one after another.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_output_file() -> PathBuf {
    PathBuf::from("cross_table.csv")
}

fn default_parallel() -> bool {
    true
}

impl PipelineConfig {
    /// Config with the three required inputs and every option at its default.
    pub fn new(
        chart_folder: impl Into<PathBuf>,
        results_file: impl Into<PathBuf>,
        mapping_file: impl Into<PathBuf>,
    ) -> Self {
        PipelineConfig {
            chart_folder: chart_folder.into(),
            results_file: results_file.into(),
            mapping_file: mapping_file.into(),
            case_sensitive_join: false,
            missing_cell_policy: MissingCellPolicy::default(),
            output_file: default_output_file(),
            jury_file: None,
            public_file: None,
            standings_file: None,
            target_country: None,
            parallel: default_parallel(),
        }
    }

    /// Read a TOML config file. Relative paths inside it are resolved
    /// against the file's own directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Check option combinations that parse but cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.chart_folder.as_os_str().is_empty() {
            return Err(PipelineError::Config("chart_folder is empty".into()));
        }
        match (&self.jury_file, &self.public_file) {
            (Some(_), None) => Err(PipelineError::Config(
                "jury_file is set but public_file is not".into(),
            )),
            (None, Some(_)) => Err(PipelineError::Config(
                "public_file is set but jury_file is not".into(),
            )),
            _ => Ok(()),
        }
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.chart_folder);
        join(&mut self.results_file);
        join(&mut self.mapping_file);
        join(&mut self.output_file);
        for p in [
            &mut self.jury_file,
            &mut self.public_file,
            &mut self.standings_file,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            chart_folder = "charts"
            results_file = "results.csv"
            mapping_file = "mapping.json"
            "#,
        )
        .unwrap();
        assert!(!cfg.case_sensitive_join);
        assert_eq!(cfg.missing_cell_policy, MissingCellPolicy::Absent);
        assert_eq!(cfg.output_file, PathBuf::from("cross_table.csv"));
        assert!(cfg.parallel);
        assert_eq!(cfg, PipelineConfig::new("charts", "results.csv", "mapping.json"));
    }

    #[test]
    fn parses_zero_policy() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            chart_folder = "c"
            results_file = "r.csv"
            mapping_file = "m.json"
            missing_cell_policy = "zero"
            case_sensitive_join = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.missing_cell_policy, MissingCellPolicy::Zero);
        assert!(cfg.case_sensitive_join);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PipelineConfig::from_toml_str(
            r#"
            chart_folder = "c"
            results_file = "r.csv"
            mapping_file = "m.json"
            chart_dir = "typo"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn score_tables_come_in_pairs() {
        let mut cfg = PipelineConfig::new("c", "r.csv", "m.json");
        cfg.jury_file = Some("jury.csv".into());
        assert!(cfg.validate().is_err());
        cfg.public_file = Some("public.csv".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn relative_paths_follow_config_location() {
        let mut cfg = PipelineConfig::new("charts", "/abs/results.csv", "mapping.json");
        cfg.jury_file = Some("jury.csv".into());
        cfg.resolve_relative_to(Path::new("/data/run"));
        assert_eq!(cfg.chart_folder, PathBuf::from("/data/run/charts"));
        assert_eq!(cfg.results_file, PathBuf::from("/abs/results.csv"));
        assert_eq!(cfg.jury_file, Some(PathBuf::from("/data/run/jury.csv")));
        assert_eq!(cfg.output_file, PathBuf::from("/data/run/cross_table.csv"));
    }
}
