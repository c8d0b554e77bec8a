//! jpreprocess-backed morphological analysis.
//!
//! Wraps the bundled NAIST-jdic system dictionary. Loading can fail on
//! stripped-down installs, so construction reports `TokenizerUnavailable`
//! and test suites skip rather than fail when the dictionary is missing.

use crate::error::{Result, YomiageError};
use crate::tokenize::{MorphAnalyzer, Morpheme};
use jpreprocess::kind::JPreprocessDictionaryKind;
use jpreprocess::{DefaultTokenizer, JPreprocess, JPreprocessConfig, SystemDictionaryConfig};

pub struct JpreprocessAnalyzer {
    jpreprocess: JPreprocess<DefaultTokenizer>,
}

impl JpreprocessAnalyzer {
    /// Load the bundled NAIST-jdic dictionary.
    pub fn new() -> Result<Self> {
        let config = JPreprocessConfig {
            dictionary: SystemDictionaryConfig::Bundled(JPreprocessDictionaryKind::NaistJdic),
            user_dictionary: None,
        };
        let jpreprocess =
            JPreprocess::from_config(config).map_err(|e| YomiageError::TokenizerUnavailable {
                message: e.to_string(),
            })?;
        Ok(Self { jpreprocess })
    }
}

impl MorphAnalyzer for JpreprocessAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>> {
        let features = self
            .jpreprocess
            .run_frontend(text)
            .map_err(|e| YomiageError::Other(format!("morphological analysis failed: {e}")))?;
        Ok(features.iter().map(|f| parse_njd_feature(f)).collect())
    }
}

/// Parse one NJD feature line into a morpheme.
///
/// Format: surface,pos,group1,group2,group3,ctype,cform,base,reading,
/// pronunciation,accent,chain — unset fields are `*`.
fn parse_njd_feature(line: &str) -> Morpheme {
    let parts: Vec<&str> = line.split(',').collect();
    let surface = parts.first().copied().unwrap_or("").to_string();
    let pos = parts.get(1).copied().unwrap_or("*").to_string();
    let raw_reading = parts.get(8).copied().unwrap_or("*");
    let reading = if raw_reading == "*" || pos == "記号" {
        String::new()
    } else {
        raw_reading.to_string()
    };
    Morpheme {
        surface,
        pos,
        reading,
    }
}
