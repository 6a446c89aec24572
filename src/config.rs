use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// a JSON config only names the values it overrides
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub vector_size: usize,
    pub window: usize,
    pub min_count: u64,
    pub epochs: usize,
    pub phrase_min_count: u64,
    pub phrase_threshold: f64,
    pub negative_samples: usize,
    pub alpha: f32,
    pub min_alpha: f32,
    pub sample: f64,
    pub seed: u64,
    pub workers: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            vector_size: 100,
            window: 5,
            min_count: 1,
            epochs: 10,
            phrase_min_count: 1,
            phrase_threshold: 10.0,
            negative_samples: 5,
            alpha: 0.025,
            min_alpha: 0.0001,
            sample: 1e-3,
            seed: 1,
            workers: 4,
        }
    }
}

impl Display for TrainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "training hyper parameters:
        vector_size: {},
        window: {},
        min_count: {},
        epochs: {},
        phrase_min_count: {},
        phrase_threshold: {},
        negative_samples: {},
        alpha: {},
        min_alpha: {},
        sample: {},
        seed: {},
        workers: {}",
        self.vector_size, self.window, self.min_count, self.epochs, self.phrase_min_count, self.phrase_threshold,
        self.negative_samples, self.alpha, self.min_alpha, self.sample, self.seed, self.workers
        )
    }
}

impl TrainConfig {

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<TrainConfig> {
        let path = path.as_ref();
        let f = BufReader::new(File::open(path)?);
        let config: TrainConfig = serde_json::from_reader(f)
            .map_err(|e| Error::InvalidConfig(format!("cannot parse {:?}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {

        let positive = [
            ("vector_size", self.vector_size),
            ("window", self.window),
            ("epochs", self.epochs),
            ("workers", self.workers),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if self.min_count == 0 {
            return Err(Error::InvalidConfig("min_count must be positive".into()));
        }
        if self.phrase_min_count == 0 {
            return Err(Error::InvalidConfig("phrase_min_count must be positive".into()));
        }

        if !self.phrase_threshold.is_finite() || self.phrase_threshold < 0.0 {
            return Err(Error::InvalidConfig(format!("phrase_threshold must be a non-negative number, got {}", self.phrase_threshold)));
        }
        if !self.sample.is_finite() || self.sample < 0.0 {
            return Err(Error::InvalidConfig(format!("sample must be a non-negative number, got {}", self.sample)));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(Error::InvalidConfig(format!("alpha must be positive, got {}", self.alpha)));
        }
        if !(self.min_alpha.is_finite() && self.min_alpha >= 0.0 && self.min_alpha <= self.alpha) {
            return Err(Error::InvalidConfig(format!("min_alpha must lie in [0, alpha], got {}", self.min_alpha)));
        }

        Ok(())
    }

}


#[cfg(test)]
mod tests {

    use super::TrainConfig;
    use std::io::Write;

    #[test]
    fn defaults_test() {
        let config = TrainConfig::default();
        assert_eq!(config.vector_size, 100);
        assert_eq!(config.window, 5);
        assert_eq!(config.min_count, 1);
        assert_eq!(config.epochs, 10);
        assert_eq!(config.phrase_min_count, 1);
        assert_eq!(config.phrase_threshold, 10.0);
        assert_eq!(config.negative_samples, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_test() {

        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"vector_size": 32, "epochs": 3}}"#).unwrap();

        let config = TrainConfig::from_json_file(f.path()).unwrap();
        assert_eq!(config.vector_size, 32);
        assert_eq!(config.epochs, 3);
        // untouched keys keep defaults
        assert_eq!(config.window, 5);
        assert_eq!(config.phrase_threshold, 10.0);
    }

    #[test]
    fn invalid_values_test() {

        let zero_dim = TrainConfig { vector_size: 0, ..TrainConfig::default() };
        assert!(zero_dim.validate().is_err());

        let bad_alpha = TrainConfig { min_alpha: 0.5, alpha: 0.1, ..TrainConfig::default() };
        assert!(bad_alpha.validate().is_err());

        let bad_threshold = TrainConfig { phrase_threshold: f64::NAN, ..TrainConfig::default() };
        assert!(bad_threshold.validate().is_err());

        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"window": "wide"}}"#).unwrap();
        assert!(TrainConfig::from_json_file(f.path()).is_err());
    }
}
