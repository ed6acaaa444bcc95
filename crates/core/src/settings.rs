//! Report-engine settings.
//!
//! These were ambient process-wide tables in the system this replaces; here
//! they are an explicit value constructed once and passed into the
//! aggregators that need them. Replacing the tables at runtime is an
//! ordinary call on the owning service, not a global mutation.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// Canonical non-terminal pipeline order used by the closing-probability and
/// value-change reports.
pub const DEFAULT_PIPELINE_STAGES: &[&str] =
    &["Introduction", "Discover", "Validation", "Proposal", "Negotiation/Review"];

pub const DEFAULT_ROSTER_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not parse report settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("report settings validation failed: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportSettings {
    /// Raw stage label (lowercased) -> canonical display label.
    stage_aliases: HashMap<String, String>,
    pipeline_stages: Vec<String>,
    roster_limit: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            stage_aliases: HashMap::new(),
            pipeline_stages: DEFAULT_PIPELINE_STAGES.iter().map(|s| (*s).to_string()).collect(),
            roster_limit: DEFAULT_ROSTER_LIMIT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    stage_aliases: HashMap<String, String>,
    pipeline_stages: Option<Vec<String>>,
    roster_limit: Option<usize>,
}

impl ReportSettings {
    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        let parsed: RawSettings = toml::from_str(raw)?;
        let mut settings = Self::default();
        settings.replace_stage_aliases(parsed.stage_aliases);
        if let Some(stages) = parsed.pipeline_stages {
            settings.replace_pipeline_stages(stages)?;
        }
        if let Some(limit) = parsed.roster_limit {
            settings.roster_limit = limit.max(1);
        }
        Ok(settings)
    }

    /// Canonical label for a raw upload stage: trimmed, remapped through the
    /// alias table when an alias exists.
    pub fn canonical_stage(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        self.stage_aliases
            .get(&trimmed.to_lowercase())
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    pub fn pipeline_stages(&self) -> &[String] {
        &self.pipeline_stages
    }

    /// Position of a stage label in the canonical pipeline order, matched
    /// case-insensitively. `None` for stages outside the configured funnel.
    pub fn pipeline_position(&self, stage: &str) -> Option<usize> {
        self.pipeline_stages.iter().position(|known| crate::stage::same_stage(known, stage))
    }

    pub fn roster_limit(&self) -> usize {
        self.roster_limit
    }

    pub fn replace_stage_aliases(&mut self, aliases: HashMap<String, String>) {
        self.stage_aliases = aliases
            .into_iter()
            .map(|(raw, canonical)| (raw.trim().to_lowercase(), canonical.trim().to_string()))
            .collect();
    }

    pub fn replace_pipeline_stages(&mut self, stages: Vec<String>) -> Result<(), SettingsError> {
        let stages: Vec<String> =
            stages.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        if stages.is_empty() {
            return Err(SettingsError::Validation(
                "pipeline_stages must contain at least one stage".to_string(),
            ));
        }
        self.pipeline_stages = stages;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ReportSettings, DEFAULT_PIPELINE_STAGES};

    #[test]
    fn default_settings_carry_the_canonical_funnel() {
        let settings = ReportSettings::default();
        assert_eq!(settings.pipeline_stages().len(), DEFAULT_PIPELINE_STAGES.len());
        assert_eq!(settings.pipeline_position("discover"), Some(1));
        assert_eq!(settings.pipeline_position("Closed Won"), None);
    }

    #[test]
    fn aliases_remap_case_insensitively() {
        let mut settings = ReportSettings::default();
        settings.replace_stage_aliases(HashMap::from([(
            "Neg/Review".to_string(),
            "Negotiation/Review".to_string(),
        )]));
        assert_eq!(settings.canonical_stage("  neg/review "), "Negotiation/Review");
        assert_eq!(settings.canonical_stage("Discover"), "Discover");
    }

    #[test]
    fn settings_load_from_toml() {
        let settings = ReportSettings::from_toml_str(
            r#"
            pipeline_stages = ["Discover", "Proposal"]
            roster_limit = 5

            [stage_aliases]
            "disc" = "Discover"
            "#,
        )
        .expect("parse settings");

        assert_eq!(settings.pipeline_stages(), ["Discover", "Proposal"]);
        assert_eq!(settings.roster_limit(), 5);
        assert_eq!(settings.canonical_stage("DISC"), "Discover");
    }

    #[test]
    fn empty_pipeline_stage_list_is_rejected() {
        assert!(ReportSettings::from_toml_str("pipeline_stages = []").is_err());
    }
}
