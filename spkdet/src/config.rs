use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use voxid_gmm::{MapConfig, TrainConfig};

use crate::error::SpkDetError;
use crate::mfcc::MfccConfig;

/// Top-level pipeline settings, loadable from YAML.
///
/// Every field has a default, so a partial file only needs to name what
/// it overrides. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpkDetConfig {
    /// Front-end settings.
    pub mfcc: MfccConfig,
    /// Mixture components in the background model.
    pub num_components: usize,
    /// MAP relevance factor for speaker adaptation.
    pub relevance: f64,
    /// Adapt variances as well as means during enrollment.
    pub adapt_variances: bool,
    /// Adapt mixture weights as well as means during enrollment.
    pub adapt_weights: bool,
    /// Verification decision threshold on the average log-likelihood ratio.
    pub threshold: f64,
}

impl Default for SpkDetConfig {
    fn default() -> Self {
        Self {
            mfcc: MfccConfig::default(),
            num_components: 512,
            relevance: 16.0,
            adapt_variances: false,
            adapt_weights: false,
            threshold: 0.0,
        }
    }
}

impl SpkDetConfig {
    pub fn from_yaml(text: &str) -> Result<Self, SpkDetError> {
        let cfg: Self =
            serde_yaml::from_str(text).map_err(|e| SpkDetError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SpkDetError> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), SpkDetError> {
        if self.num_components == 0 {
            return Err(SpkDetError::Config(
                "num_components must be at least 1".into(),
            ));
        }
        if !(self.relevance > 0.0 && self.relevance.is_finite()) {
            return Err(SpkDetError::Config(format!(
                "relevance {} is not usable",
                self.relevance
            )));
        }
        if !self.threshold.is_finite() {
            return Err(SpkDetError::Config("threshold must be finite".into()));
        }
        Ok(())
    }

    /// Adaptation settings derived from this configuration.
    pub fn map_config(&self) -> MapConfig {
        MapConfig {
            relevance: self.relevance,
            adapt_means: true,
            adapt_variances: self.adapt_variances,
            adapt_weights: self.adapt_weights,
            ..MapConfig::default()
        }
    }

    /// Background-model training settings derived from this configuration.
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            num_components: self.num_components,
            ..TrainConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SpkDetConfig::default();
        assert_eq!(cfg.num_components, 512);
        assert_eq!(cfg.relevance, 16.0);
        assert_eq!(cfg.threshold, 0.0);
        assert!(!cfg.adapt_variances);
        assert_eq!(cfg.mfcc.feature_dim(), 13);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = SpkDetConfig::from_yaml("num_components: 64\nthreshold: 0.25\n").unwrap();
        assert_eq!(cfg.num_components, 64);
        assert_eq!(cfg.threshold, 0.25);
        assert_eq!(cfg.relevance, 16.0);
        assert_eq!(cfg.mfcc.sample_rate, 16000);
    }

    #[test]
    fn test_nested_override() {
        let cfg = SpkDetConfig::from_yaml("mfcc:\n  num_ceps: 19\n  append_energy: false\n")
            .unwrap();
        assert_eq!(cfg.mfcc.num_ceps, 19);
        assert_eq!(cfg.mfcc.feature_dim(), 19);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            SpkDetConfig::from_yaml("num_comopnents: 64\n"),
            Err(SpkDetError::Config(_))
        ));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(SpkDetConfig::from_yaml("num_components: 0\n").is_err());
        assert!(SpkDetConfig::from_yaml("relevance: -2.0\n").is_err());
        assert!(SpkDetConfig::from_yaml("threshold: .nan\n").is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let cfg = SpkDetConfig {
            num_components: 32,
            threshold: 0.1,
            ..SpkDetConfig::default()
        };
        let text = serde_yaml::to_string(&cfg).unwrap();
        let back = SpkDetConfig::from_yaml(&text).unwrap();
        assert_eq!(back.num_components, 32);
        assert_eq!(back.threshold, 0.1);
    }

    #[test]
    fn test_derived_configs() {
        let cfg = SpkDetConfig {
            num_components: 8,
            relevance: 10.0,
            adapt_weights: true,
            ..SpkDetConfig::default()
        };
        let map = cfg.map_config();
        assert_eq!(map.relevance, 10.0);
        assert!(map.adapt_means);
        assert!(map.adapt_weights);
        assert!(!map.adapt_variances);
        assert_eq!(cfg.train_config().num_components, 8);
    }
}
