use serde::{Deserialize, Serialize};

use crate::error::{BinningError, Result};

/// Configuration for turning spectra into binned spectra
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinnerConfig {
    /// Exponent applied to every peak intensity before binning (default: 0.5)
    pub peak_scaling: f64,
    /// Maximum weighted share (0-100) of a spectrum allowed to fall outside the known bins (default: 0.0)
    pub allowed_missing_percentage: f64,
    /// Metadata key carried over onto binned spectra (default: "inchikey")
    #[serde(default = "default_identity_key")]
    pub identity_key: String,
    /// Number of threads used for per-spectrum work (default: 4)
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

fn default_identity_key() -> String {
    "inchikey".to_string()
}

fn default_num_threads() -> usize {
    4
}

impl Default for BinnerConfig {
    fn default() -> Self {
        BinnerConfig {
            peak_scaling: 0.5,
            allowed_missing_percentage: 0.0,
            identity_key: default_identity_key(),
            num_threads: default_num_threads(),
        }
    }
}

impl BinnerConfig {
    pub fn with_peak_scaling(mut self, peak_scaling: f64) -> Self {
        self.peak_scaling = peak_scaling;
        self
    }

    pub fn with_allowed_missing_percentage(mut self, allowed_missing_percentage: f64) -> Self {
        self.allowed_missing_percentage = allowed_missing_percentage;
        self
    }

    pub fn with_identity_key(mut self, identity_key: &str) -> Self {
        self.identity_key = identity_key.to_string();
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Checks the configuration, so that bad values fail when a binner is built.
    pub fn validate(&self) -> Result<()> {
        if !self.peak_scaling.is_finite() || self.peak_scaling < 0.0 {
            return Err(BinningError::InvalidParameter(format!(
                "peak_scaling must be finite and non-negative, got {}", self.peak_scaling
            )));
        }
        if !self.allowed_missing_percentage.is_finite() || self.allowed_missing_percentage < 0.0 {
            return Err(BinningError::InvalidParameter(format!(
                "allowed_missing_percentage must be a non-negative percentage, got {}",
                self.allowed_missing_percentage
            )));
        }
        if self.identity_key.is_empty() {
            return Err(BinningError::InvalidParameter("identity_key must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BinnerConfig::default();
        assert_eq!(config.peak_scaling, 0.5);
        assert_eq!(config.allowed_missing_percentage, 0.0);
        assert_eq!(config.identity_key, "inchikey");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_missing_percentage() {
        let config = BinnerConfig::default().with_allowed_missing_percentage(-1.0);
        assert!(matches!(config.validate(), Err(BinningError::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_nan_scaling() {
        let config = BinnerConfig::default().with_peak_scaling(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_scaling() {
        let config = BinnerConfig::default().with_peak_scaling(-1.0);
        assert!(matches!(config.validate(), Err(BinningError::InvalidParameter(_))));
        assert!(BinnerConfig::default().with_peak_scaling(0.0).validate().is_ok());
    }

    #[test]
    fn test_optional_fields_fall_back_to_defaults() {
        let config: BinnerConfig =
            serde_json::from_str(r#"{"peak_scaling": 1.0, "allowed_missing_percentage": 5.0}"#).unwrap();
        assert_eq!(config.peak_scaling, 1.0);
        assert_eq!(config.identity_key, "inchikey");
        assert_eq!(config.num_threads, 4);
    }
}
