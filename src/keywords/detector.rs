// DistressKeywordDetector - lexical and acoustic distress signals
//
// The lexical signal matches transcript text against the catalogue; the
// acoustic signal evaluates fixed predicates on clip features. Results are
// unioned into one deduplicated set.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::acoustic::AcousticPatterns;
use super::catalogue::KeywordCatalogue;
use crate::analysis::features::{AudioCharacteristics, FeatureVector};
use crate::config::AcousticThresholds;
use crate::error::{log_keyword_error, KeywordError};

/// Result of a lexical test run on arbitrary text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTestReport {
    pub input_text: String,
    pub detected_keywords: Vec<String>,
    pub keyword_count: usize,
    /// Detected keywords as a fraction of the catalogue size
    pub confidence: f32,
}

pub struct DistressKeywordDetector {
    catalogue: Arc<KeywordCatalogue>,
    acoustic: AcousticPatterns,
}

impl DistressKeywordDetector {
    pub fn new(catalogue: Arc<KeywordCatalogue>, thresholds: AcousticThresholds) -> Self {
        Self {
            catalogue,
            acoustic: AcousticPatterns::new(thresholds),
        }
    }

    pub fn catalogue(&self) -> &Arc<KeywordCatalogue> {
        &self.catalogue
    }

    /// Union of lexical matches on `transcript` and acoustic pattern labels
    ///
    /// A catalogue failure drops the lexical signal only.
    pub fn detect(
        &self,
        transcript: Option<&str>,
        features: &FeatureVector,
        characteristics: &AudioCharacteristics,
    ) -> BTreeSet<String> {
        let mut keywords = match transcript.filter(|t| !t.trim().is_empty()) {
            Some(text) => self.catalogue.match_text(text).unwrap_or_else(|err| {
                log_keyword_error(&err, "DistressKeywordDetector::detect");
                BTreeSet::new()
            }),
            None => BTreeSet::new(),
        };

        keywords.extend(
            self.acoustic
                .detect(features, characteristics)
                .into_iter()
                .map(String::from),
        );
        keywords
    }

    /// Run lexical matching on `text` and report coverage
    pub fn test_keyword_detection(&self, text: &str) -> Result<KeywordTestReport, KeywordError> {
        let detected: Vec<String> = self.catalogue.match_text(text)?.into_iter().collect();
        let catalogue_size = self.catalogue.len()?;
        let confidence = if catalogue_size > 0 {
            detected.len() as f32 / catalogue_size as f32
        } else {
            0.0
        };

        Ok(KeywordTestReport {
            input_text: text.to_string(),
            keyword_count: detected.len(),
            detected_keywords: detected,
            confidence,
        })
    }
}
