//! Configuration file handling.
//!
//! This module handles loading configuration from `.cohort-tables.toml`
//! files and resolving the path templates into a [`PathLayout`].

use crate::models::{FactorModel, MetricType, PredictorSet};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".cohort-tables.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which analyses and factor models to collect.
    #[serde(default)]
    pub study: StudyConfig,

    /// Input and output path templates.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Optional supplementary tables.
    #[serde(default)]
    pub tables: TablesConfig,
}

/// The (predictor set × factor model) space to collect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Predictor-set identifiers, e.g. `questions_mri`.
    #[serde(default = "default_analyses")]
    pub analyses: Vec<String>,

    /// Factor-model identifiers, e.g. `within_event`.
    #[serde(default = "default_factor_models")]
    pub factor_models: Vec<String>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            analyses: default_analyses(),
            factor_models: default_factor_models(),
        }
    }
}

fn default_analyses() -> Vec<String> {
    PredictorSet::ALL
        .iter()
        .map(|p| p.identifier().to_string())
        .collect()
}

fn default_factor_models() -> Vec<String> {
    FactorModel::ALL
        .iter()
        .map(|m| m.identifier().to_string())
        .collect()
}

/// Path templates, relative to the project root.
///
/// `analysis_results` understands `{factor_model}`, `{analysis}` and
/// `{metric_type}`; `combined_results` understands `{metric_type}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_analysis_results")]
    pub analysis_results: String,

    #[serde(default = "default_combined_results")]
    pub combined_results: String,

    #[serde(default = "default_quartile_table")]
    pub quartile_table: String,

    #[serde(default = "default_demographic_table")]
    pub demographic_table: String,

    #[serde(default = "default_metadata")]
    pub metadata: String,

    #[serde(default = "default_shap_coefs")]
    pub shap_coefs: String,

    #[serde(default = "default_variables")]
    pub variables: String,

    #[serde(default = "default_quartile_counts_table")]
    pub quartile_counts_table: String,

    #[serde(default = "default_demographic_counts_table")]
    pub demographic_counts_table: String,

    #[serde(default = "default_shap_table")]
    pub shap_table: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            analysis_results: default_analysis_results(),
            combined_results: default_combined_results(),
            quartile_table: default_quartile_table(),
            demographic_table: default_demographic_table(),
            metadata: default_metadata(),
            shap_coefs: default_shap_coefs(),
            variables: default_variables(),
            quartile_counts_table: default_quartile_counts_table(),
            demographic_counts_table: default_demographic_counts_table(),
            shap_table: default_shap_table(),
        }
    }
}

fn default_analysis_results() -> String {
    "data/analyses/{factor_model}/{analysis}/results/metrics/{metric_type}.csv".to_string()
}

fn default_combined_results() -> String {
    "data/results/metrics/{metric_type}.parquet".to_string()
}

fn default_quartile_table() -> String {
    "data/tables/table_2.csv".to_string()
}

fn default_demographic_table() -> String {
    "data/supplement/tables/supplemental_table_2.csv".to_string()
}

fn default_metadata() -> String {
    "data/raw/metadata.csv".to_string()
}

fn default_shap_coefs() -> String {
    "data/results/shap_coefs.csv".to_string()
}

fn default_variables() -> String {
    "data/variables.csv".to_string()
}

fn default_quartile_counts_table() -> String {
    "data/tables/table_1.csv".to_string()
}

fn default_demographic_counts_table() -> String {
    "data/tables/supplemental_table_1.csv".to_string()
}

fn default_shap_table() -> String {
    "data/tables/shap_coefs.csv".to_string()
}

/// Switches for the tables built outside the core metric pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Crosstab of demographics against next-timepoint quartile.
    #[serde(default)]
    pub quartile_counts: bool,

    /// Per-subject demographic breakdown.
    #[serde(default)]
    pub demographic_counts: bool,

    /// Mean/std SHAP coefficient per variable.
    #[serde(default)]
    pub shap_coefficients: bool,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location under `root`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default(root: &Path) -> Result<Option<Self>> {
        let default_path = root.join(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(&default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }

    /// Resolve the path templates against `root`.
    pub fn layout(&self, root: &Path) -> PathLayout {
        PathLayout {
            root: root.to_path_buf(),
            paths: self.paths.clone(),
        }
    }
}

/// Concrete filesystem layout for one run.
///
/// The pipeline stages only ever ask the layout for paths, so they never
/// depend on the directory structure directly.
#[derive(Debug, Clone)]
pub struct PathLayout {
    root: PathBuf,
    paths: PathsConfig,
}

impl PathLayout {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-run result file for one (factor model, analysis, metric type).
    pub fn analysis_results(
        &self,
        factor_model: &str,
        analysis: &str,
        metric_type: MetricType,
    ) -> PathBuf {
        let relative = self
            .paths
            .analysis_results
            .replace("{factor_model}", factor_model)
            .replace("{analysis}", analysis)
            .replace("{metric_type}", metric_type.as_str());
        self.root.join(relative)
    }

    /// Combined columnar file for one metric type.
    pub fn combined_results(&self, metric_type: MetricType) -> PathBuf {
        self.root.join(
            self.paths
                .combined_results
                .replace("{metric_type}", metric_type.as_str()),
        )
    }

    pub fn quartile_table(&self) -> PathBuf {
        self.root.join(&self.paths.quartile_table)
    }

    pub fn demographic_table(&self) -> PathBuf {
        self.root.join(&self.paths.demographic_table)
    }

    pub fn metadata(&self) -> PathBuf {
        self.root.join(&self.paths.metadata)
    }

    pub fn shap_coefs(&self) -> PathBuf {
        self.root.join(&self.paths.shap_coefs)
    }

    pub fn variables(&self) -> PathBuf {
        self.root.join(&self.paths.variables)
    }

    pub fn quartile_counts_table(&self) -> PathBuf {
        self.root.join(&self.paths.quartile_counts_table)
    }

    pub fn demographic_counts_table(&self) -> PathBuf {
        self.root.join(&self.paths.demographic_counts_table)
    }

    pub fn shap_table(&self) -> PathBuf {
        self.root.join(&self.paths.shap_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.study.analyses.len(), 6);
        assert!(config.study.analyses.contains(&"questions_mri".to_string()));
        assert_eq!(config.study.factor_models, vec!["within_event", "across_event"]);
        assert!(!config.tables.shap_coefficients);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[study]
analyses = ["questions", "symptoms"]

[paths]
quartile_table = "out/table_2.csv"

[tables]
shap_coefficients = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.study.analyses, vec!["questions", "symptoms"]);
        assert_eq!(config.study.factor_models.len(), 2);
        assert_eq!(config.paths.quartile_table, "out/table_2.csv");
        assert_eq!(config.paths.metadata, "data/raw/metadata.csv");
        assert!(config.tables.shap_coefficients);
        assert!(!config.tables.quartile_counts);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[study]"));
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[tables]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.study.analyses, Config::default().study.analyses);
    }

    #[test]
    fn test_layout_expands_templates() {
        let layout = Config::default().layout(Path::new("/project"));

        let sensitivity = layout.analysis_results(
            "within_event",
            "questions",
            MetricType::SensitivitySpecificity,
        );
        assert_eq!(
            sensitivity,
            Path::new("/project/data/analyses/within_event/questions/results/metrics")
                .join("sensitivity_specificity.csv")
        );
        assert_eq!(
            layout.combined_results(MetricType::Metrics),
            PathBuf::from("/project/data/results/metrics/metrics.parquet")
        );
        assert_eq!(
            layout.demographic_table(),
            PathBuf::from("/project/data/supplement/tables/supplemental_table_2.csv")
        );
    }
}
