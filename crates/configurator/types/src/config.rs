//! Wizard engine configuration
//!
//! Loaded from TOML. Every field has a default so an empty file (or no
//! file at all) yields a working configuration.

use crate::{ConfiguratorError, ConfiguratorResult, ValueId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Value id of the synthetic "Custom" option unless configured otherwise
pub const DEFAULT_CUSTOM_OPTION_ID: ValueId = ValueId(0);

/// Configuration for the configurator wizard engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Id of the synthetic value offered on lines that accept custom input
    pub custom_option_id: ValueId,

    /// Upper bound on propagation passes per edit.
    ///
    /// `None` means "number of attribute lines + 1".
    pub max_propagation_passes: Option<usize>,

    /// Fill empty fields of the active step with their default during
    /// propagation, not only fields whose value became invalid
    pub fill_empty_defaults: bool,

    /// Layout group the dynamic form is inserted after
    pub static_form_anchor: String,

    /// Name of the generated dynamic form group
    pub dynamic_form_name: String,

    /// Column span of the generated dynamic form group
    pub dynamic_form_colspan: u8,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            custom_option_id: DEFAULT_CUSTOM_OPTION_ID,
            max_propagation_passes: None,
            fill_empty_defaults: false,
            static_form_anchor: "static_form".to_string(),
            dynamic_form_name: "dynamic_form".to_string(),
            dynamic_form_colspan: 3,
        }
    }
}

impl WizardConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(contents: &str) -> ConfiguratorResult<Self> {
        let config: WizardConfig =
            toml::from_str(contents).map_err(|e| ConfiguratorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults when absent
    pub fn load(path: &Path) -> ConfiguratorResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfiguratorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfiguratorResult<()> {
        if self.max_propagation_passes == Some(0) {
            return Err(ConfiguratorError::Config(
                "max_propagation_passes must be at least 1".into(),
            ));
        }
        if self.static_form_anchor.trim().is_empty() {
            return Err(ConfiguratorError::Config(
                "static_form_anchor cannot be empty".into(),
            ));
        }
        if self.dynamic_form_name.trim().is_empty() {
            return Err(ConfiguratorError::Config(
                "dynamic_form_name cannot be empty".into(),
            ));
        }
        if self.dynamic_form_name == self.static_form_anchor {
            return Err(ConfiguratorError::Config(
                "dynamic_form_name must differ from static_form_anchor".into(),
            ));
        }
        Ok(())
    }

    /// Propagation pass limit for a template with `line_count` lines
    pub fn pass_limit(&self, line_count: usize) -> usize {
        self.max_propagation_passes.unwrap_or(line_count + 1)
    }
}
