use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::lookup::Throttle;
use crate::validate::ValidationMode;

/// The canonical PeriodO dataset.
pub const DEFAULT_DATASET_URL: &str = "http://n2t.net/ark:/99152/p0d.json";

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Default for Source {
    fn default() -> Self {
        Source::Url(DEFAULT_DATASET_URL.to_string())
    }
}

// `http://` and `https://` are URLs, anything else is a path.
impl FromStr for Source {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Source::Url(s.to_string()))
        } else {
            Ok(Source::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Emit the patched dataset instead of the patch.
    pub apply: bool,
    pub source: Source,
    /// Extra query parameters for the dataset request.
    pub params: Vec<(String, String)>,
    /// Pause after each remote lookup.
    pub lookup_interval: Duration,
    /// Overrides the validation mode the rule asks for.
    pub validation: Option<ValidationMode>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            apply: false,
            source: Source::default(),
            params: Vec::new(),
            lookup_interval: Throttle::DEFAULT_INTERVAL,
            validation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_from_str() {
        assert_eq!(
            "https://example.org/d.json".parse::<Source>().unwrap(),
            Source::Url("https://example.org/d.json".into())
        );
        assert_eq!(
            "data/p0d.json".parse::<Source>().unwrap(),
            Source::File(PathBuf::from("data/p0d.json"))
        );
    }

    #[test]
    fn defaults_generate_from_canonical_dataset() {
        let config = PipelineConfig::default();
        assert!(!config.apply);
        assert_eq!(config.source.to_string(), DEFAULT_DATASET_URL);
        assert_eq!(config.lookup_interval, Duration::from_millis(50));
    }
}
