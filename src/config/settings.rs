//! Run configuration.
//!
//! Purpose
//! -------
//! Hold every tunable of one pipeline run in an explicit value that is passed
//! into the entry points, loadable from TOML and validated before any
//! computation.
//!
//! Key behaviors
//! -------------
//! - [`RegimeConfig`] derives `serde` with `#[serde(default)]`: a TOML file
//!   only needs the keys it overrides.
//! - [`RegimeConfig::validate`] rejects every invalid combination with a
//!   [`ConfigError`].
//! - [`RegimeConfig::em_options`] / [`RegimeConfig::align_options`] /
//!   [`RegimeConfig::feature_layout`] translate the flat configuration into
//!   the option types of the lower layers.
//!
//! Conventions
//! -----------
//! - `regime_count_range` is inclusive and written as a two-element array,
//!   e.g. `regime_count_range = [4, 8]`.
//! - Window bounds select whole months: both are moved to their month end,
//!   so `window_end = 2024-07-01` keeps July 2024.
use crate::{
    config::errors::{ConfigError, ConfigResult},
    hmm::{core::options, DecodeAlgorithm, EmOptions, InitOptions},
    panel::{calendar::month_end, AlignOptions, DerivedFeatures, FeatureLayout},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

pub const DEFAULT_SPLIT_FRACTION: f64 = 0.70;
pub const DEFAULT_REGIME_COUNT_RANGE: (usize, usize) = (4, 8);
pub const DEFAULT_MIN_ALIGNED_ROWS: usize = 24;
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 12.0;

/// Default feature layout: fifteen macro indicators, in model order.
pub const DEFAULT_INDICATORS: [&str; 15] = [
    "TED_Spread",
    "10Y_Treasury",
    "Leading_Economic_Index",
    "Initial_Jobless_Claims",
    "Capacity_Utilization",
    "Industrial_Production_Index",
    "Core_CPI",
    "Exports_(Goods_&_Services)",
    "PCE_Price_Index",
    "CPI_(All_Items)",
    "High_Yield_Spread_(ICE_BofA)",
    "2Y_Treasury",
    "Personal_Consumption_Expenditures",
    "PPI_(All_Commodities)",
    "BAA_Corporate_Bond_Yield_Bond_BAA_Yield_Volatility",
];

/// Configuration of one regime-inference run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub split_fraction: f64,
    pub regime_count_range: (usize, usize),
    pub em_max_iterations: usize,
    pub em_tolerance: f64,
    pub covariance_regularization: f64,
    pub random_seed: u64,
    pub selected_indicator_names: Vec<String>,
    pub derived_features: DerivedFeatures,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    pub min_aligned_rows: usize,
    pub decode_algorithm: DecodeAlgorithm,
    pub init: InitOptions,
    pub periods_per_year: f64,
    pub parallel: bool,
    pub macro_panel_path: Option<PathBuf>,
    pub returns_panel_path: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        RegimeConfig {
            split_fraction: DEFAULT_SPLIT_FRACTION,
            regime_count_range: DEFAULT_REGIME_COUNT_RANGE,
            em_max_iterations: options::DEFAULT_MAX_ITER,
            em_tolerance: options::DEFAULT_TOL,
            covariance_regularization: options::DEFAULT_COVARIANCE_REGULARIZATION,
            random_seed: options::DEFAULT_SEED,
            selected_indicator_names: DEFAULT_INDICATORS.iter().map(|s| s.to_string()).collect(),
            derived_features: DerivedFeatures::default(),
            window_start: None,
            window_end: None,
            min_aligned_rows: DEFAULT_MIN_ALIGNED_ROWS,
            decode_algorithm: DecodeAlgorithm::default(),
            init: InitOptions::default(),
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            parallel: true,
            macro_panel_path: None,
            returns_panel_path: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl RegimeConfig {
    /// Parse a TOML document; `origin` names it in errors.
    pub fn from_toml_str(text: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: origin.to_path_buf(), source })
    }

    /// Load from a TOML file. Does not validate.
    ///
    /// # Errors
    /// - `ConfigError::Read` / `ConfigError::Parse`.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text, path)
    }

    /// Check every option.
    ///
    /// # Errors
    /// The first violated rule, as a [`ConfigError`].
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.split_fraction > 0.0 && self.split_fraction < 1.0) {
            return Err(ConfigError::InvalidSplitFraction { value: self.split_fraction });
        }
        let (min, max) = self.regime_count_range;
        if min == 0 || min > max {
            return Err(ConfigError::InvalidRegimeRange { min, max });
        }
        if self.em_max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations { value: self.em_max_iterations });
        }
        if !(self.em_tolerance.is_finite() && self.em_tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance { value: self.em_tolerance });
        }
        if !(self.covariance_regularization.is_finite() && self.covariance_regularization > 0.0) {
            return Err(ConfigError::InvalidRegularization {
                value: self.covariance_regularization,
            });
        }
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(ConfigError::InvalidPeriodsPerYear { value: self.periods_per_year });
        }
        self.init.validate()?;

        if self.selected_indicator_names.is_empty() {
            return Err(ConfigError::EmptyIndicators);
        }
        let mut seen = HashSet::new();
        for name in self.feature_layout().names() {
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateFeature { name });
            }
        }
        if let (Some(start), Some(end)) = (self.window_start, self.window_end) {
            if start > end {
                return Err(ConfigError::InvalidWindow { start, end });
            }
        }
        if self.min_aligned_rows < 2 {
            return Err(ConfigError::MinRowsTooSmall { value: self.min_aligned_rows, required: 2 });
        }
        Ok(())
    }

    /// Inclusive list of state counts to sweep.
    pub fn state_counts(&self) -> Vec<usize> {
        (self.regime_count_range.0..=self.regime_count_range.1).collect()
    }

    pub fn feature_layout(&self) -> FeatureLayout {
        FeatureLayout::new(self.selected_indicator_names.clone(), self.derived_features.clone())
    }

    /// Estimator options for every K of the sweep.
    ///
    /// # Errors
    /// - `ConfigError::Estimator` if the options are rejected by the model layer.
    pub fn em_options(&self) -> ConfigResult<EmOptions> {
        Ok(EmOptions::new(
            self.em_max_iterations,
            self.em_tolerance,
            self.covariance_regularization,
            self.random_seed,
            self.init.clone(),
            self.decode_algorithm,
        )?)
    }

    pub fn align_options(&self) -> AlignOptions {
        AlignOptions {
            window_start: self.window_start.map(month_end),
            window_end: self.window_end.map(month_end),
            min_rows: self.min_aligned_rows,
            split_fraction: self.split_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::{MeansInit, TransitionInit};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Defaults and partial TOML documents.
    // - Each validation rule.
    // - Translation into lower-layer options.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Defaults pass validation and describe the standard 4..=8 sweep over 18
    // features (15 indicators + 3 derived).
    fn defaults_are_valid() {
        let cfg = RegimeConfig::default();
        cfg.validate().unwrap();

        assert_eq!(cfg.state_counts(), vec![4, 5, 6, 7, 8]);
        assert_eq!(cfg.feature_layout().len(), 18);
        assert_eq!(cfg.em_options().unwrap(), EmOptions::default());
    }

    #[test]
    // Purpose
    // -------
    // A partial TOML file overrides only the keys it names.
    fn partial_toml_overrides_defaults() {
        let text = r#"
            split_fraction = 0.8
            regime_count_range = [2, 3]
            decode_algorithm = "viterbi"
            window_start = "2000-07-01"
            window_end = "2024-07-01"
            selected_indicator_names = ["CPI", "10Y", "2Y"]

            [derived_features]
            spread = { name = "Slope", long = "10Y", short = "2Y" }
            yoy = [{ name = "CPI_YoY", source = "CPI" }]

            [init]
            transition = { kind = "uniform" }
            means = { kind = "random_sample" }
        "#;
        let cfg = RegimeConfig::from_toml_str(text, Path::new("inline.toml")).unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.split_fraction, 0.8);
        assert_eq!(cfg.state_counts(), vec![2, 3]);
        assert_eq!(cfg.decode_algorithm, DecodeAlgorithm::Viterbi);
        assert_eq!(cfg.init.transition, TransitionInit::Uniform);
        assert_eq!(cfg.init.means, MeansInit::RandomSample);
        assert_eq!(cfg.em_max_iterations, 100);
        assert_eq!(cfg.feature_layout().names(), vec!["CPI", "10Y", "2Y", "Slope", "CPI_YoY"]);

        let align = cfg.align_options();
        assert_eq!(align.window_start, NaiveDate::from_ymd_opt(2000, 7, 31));
        assert_eq!(align.window_end, NaiveDate::from_ymd_opt(2024, 7, 31));
    }

    #[test]
    // Purpose
    // -------
    // Invalid values are rejected before any computation.
    fn validation_rejects_bad_values() {
        let base = RegimeConfig::default();

        let cfg = RegimeConfig { split_fraction: 1.0, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidSplitFraction { .. })));

        let cfg = RegimeConfig { regime_count_range: (0, 4), ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRegimeRange { min: 0, max: 4 })));

        let cfg = RegimeConfig { regime_count_range: (6, 4), ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRegimeRange { .. })));

        let cfg = RegimeConfig { em_tolerance: 0.0, ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTolerance { .. })));

        let cfg = RegimeConfig { selected_indicator_names: vec![], ..base.clone() };
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyIndicators)));

        let mut names = base.selected_indicator_names.clone();
        names.push("IP_YoY".to_string());
        let cfg = RegimeConfig { selected_indicator_names: names, ..base.clone() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DuplicateFeature { name }) if name == "IP_YoY"
        ));

        let cfg = RegimeConfig {
            window_start: NaiveDate::from_ymd_opt(2010, 1, 1),
            window_end: NaiveDate::from_ymd_opt(2005, 1, 1),
            ..base.clone()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidWindow { .. })));

        let cfg = RegimeConfig {
            init: InitOptions {
                transition: TransitionInit::DiagonalBias { self_prob: 1.5 },
                ..InitOptions::default()
            },
            ..base
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Estimator(_))));
    }
}
