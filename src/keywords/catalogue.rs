// Keyword catalogue - distress keywords and their morphological variants
//
// Read-mostly: matching takes a shared read lock, mutation an exclusive
// write lock. Keywords are stored lowercase in insertion order.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::KeywordError;

/// Built-in keywords and the variant forms each one also matches
const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    ("help", &["helping", "helped", "helps"]),
    ("emergency", &["emergencies", "emergency's"]),
    ("fall", &["fell", "fallen", "falling", "falls"]),
    ("hurt", &["hurts", "hurting", "hurted"]),
    ("pain", &["pains", "painful", "paining"]),
    ("ambulance", &[]),
    ("doctor", &["doctors", "doctor's"]),
    ("hospital", &["hospitals", "hospital's"]),
    ("911", &[]),
    ("assistance", &["assist", "assisting", "assisted"]),
    ("accident", &["accidents", "accident's"]),
    ("injured", &["injury", "injuries", "injuring"]),
    ("bleeding", &["bleed", "bleeds", "bled"]),
    ("unconscious", &["consciousness", "unconsciousness"]),
    ("can't move", &[]),
    ("stuck", &["sticking", "sticker"]),
    ("trapped", &["trap", "trapping", "traps"]),
    ("danger", &["dangerous", "dangers"]),
    ("urgent", &["urgency", "urgently"]),
    ("critical", &["critically", "criticism"]),
];

/// One catalogue keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub variants: Vec<String>,
}

impl KeywordEntry {
    fn new(keyword: &str, variants: &[&str]) -> Self {
        Self {
            keyword: keyword.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Case-insensitive substring match of the keyword or any variant
    ///
    /// `text` must already be lowercase.
    fn matches(&self, text: &str) -> bool {
        text.contains(self.keyword.as_str()) || self.variants.iter().any(|v| text.contains(v.as_str()))
    }
}

/// Result of an add request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    pub entry: KeywordEntry,
    /// false when the keyword was already present and left unchanged
    pub inserted: bool,
}

/// Catalogue summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordStatistics {
    pub total_keywords: usize,
    pub total_variants: usize,
    pub min_keyword_length: usize,
    pub max_keyword_length: usize,
    pub keywords: Vec<String>,
}

pub struct KeywordCatalogue {
    entries: RwLock<Vec<KeywordEntry>>,
}

impl Default for KeywordCatalogue {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl KeywordCatalogue {
    /// Catalogue seeded with the built-in distress keywords
    pub fn with_defaults() -> Self {
        Self::from_entries(
            DEFAULT_KEYWORDS
                .iter()
                .map(|(keyword, variants)| KeywordEntry::new(keyword, variants))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    fn from_entries(entries: Vec<KeywordEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Keywords in catalogue order
    pub fn keywords(&self) -> Result<Vec<String>, KeywordError> {
        Ok(self.read()?.iter().map(|e| e.keyword.clone()).collect())
    }

    pub fn len(&self) -> Result<usize, KeywordError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, KeywordError> {
        Ok(self.read()?.is_empty())
    }

    /// Add a keyword with no extra variants
    pub fn add(&self, keyword: &str) -> Result<AddOutcome, KeywordError> {
        self.add_with_variants(keyword, &[])
    }

    /// Add a keyword; an existing keyword is returned unchanged
    ///
    /// # Errors
    /// `KeywordError::EmptyKeyword` if the keyword is blank
    pub fn add_with_variants(
        &self,
        keyword: &str,
        variants: &[&str],
    ) -> Result<AddOutcome, KeywordError> {
        let keyword = normalize(keyword).ok_or(KeywordError::EmptyKeyword)?;
        let mut entries = self.write()?;

        if let Some(existing) = entries.iter().find(|e| e.keyword == keyword) {
            return Ok(AddOutcome {
                entry: existing.clone(),
                inserted: false,
            });
        }

        let variants: Vec<String> = variants.iter().filter_map(|v| normalize(v)).collect();
        let entry = KeywordEntry { keyword, variants };
        entries.push(entry.clone());
        log::info!("[Keywords] Added distress keyword '{}'", entry.keyword);

        Ok(AddOutcome {
            entry,
            inserted: true,
        })
    }

    /// Remove a keyword
    ///
    /// # Returns
    /// false if the keyword was not in the catalogue
    pub fn remove(&self, keyword: &str) -> Result<bool, KeywordError> {
        let Some(keyword) = normalize(keyword) else {
            return Ok(false);
        };
        let mut entries = self.write()?;

        let before = entries.len();
        entries.retain(|e| e.keyword != keyword);
        let removed = entries.len() != before;
        if removed {
            log::info!("[Keywords] Removed distress keyword '{}'", keyword);
        }
        Ok(removed)
    }

    /// Keywords whose base form or a variant occurs anywhere in `text`
    pub fn match_text(&self, text: &str) -> Result<BTreeSet<String>, KeywordError> {
        let text = text.to_lowercase();
        Ok(self
            .read()?
            .iter()
            .filter(|e| e.matches(&text))
            .map(|e| e.keyword.clone())
            .collect())
    }

    pub fn statistics(&self) -> Result<KeywordStatistics, KeywordError> {
        let entries = self.read()?;
        let lengths = entries.iter().map(|e| e.keyword.chars().count());
        Ok(KeywordStatistics {
            total_keywords: entries.len(),
            total_variants: entries.iter().map(|e| e.variants.len()).sum(),
            min_keyword_length: lengths.clone().min().unwrap_or(0),
            max_keyword_length: lengths.max().unwrap_or(0),
            keywords: entries.iter().map(|e| e.keyword.clone()).collect(),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<KeywordEntry>>, KeywordError> {
        self.entries.read().map_err(|_| KeywordError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<KeywordEntry>>, KeywordError> {
        self.entries.write().map_err(|_| KeywordError::LockPoisoned)
    }
}

fn normalize(keyword: &str) -> Option<String> {
    let keyword = keyword.trim().to_lowercase();
    (!keyword.is_empty()).then_some(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogue() {
        let catalogue = KeywordCatalogue::with_defaults();
        let keywords = catalogue.keywords().unwrap();

        assert_eq!(keywords.len(), 20);
        assert_eq!(keywords[0], "help");
        assert!(keywords.contains(&"can't move".to_string()));
        assert!(keywords.contains(&"911".to_string()));
    }

    #[test]
    fn test_variant_matches_base_keyword() {
        let catalogue = KeywordCatalogue::with_defaults();

        let found = catalogue.match_text("she fell down").unwrap();
        assert!(found.contains("fall"));

        let found = catalogue.match_text("HELP me, I CAN'T MOVE").unwrap();
        assert!(found.contains("help"));
        assert!(found.contains("can't move"));

        assert!(catalogue.match_text("lovely weather today").unwrap().is_empty());
    }

    #[test]
    fn test_matching_is_not_token_aware() {
        let catalogue = KeywordCatalogue::with_defaults();
        // "pain" inside "painting"
        assert!(catalogue.match_text("painting the fence").unwrap().contains("pain"));
    }

    #[test]
    fn test_add_is_idempotent_and_remove_restores() {
        let catalogue = KeywordCatalogue::with_defaults();
        let baseline = catalogue.len().unwrap();

        let first = catalogue.add("Slip").unwrap();
        assert!(first.inserted);
        assert_eq!(first.entry.keyword, "slip");

        let second = catalogue.add("slip").unwrap();
        assert!(!second.inserted);
        assert_eq!(catalogue.len().unwrap(), baseline + 1);

        assert!(catalogue.remove("slip").unwrap());
        assert_eq!(catalogue.len().unwrap(), baseline);
        assert!(!catalogue.remove("slip").unwrap());
    }

    #[test]
    fn test_existing_keyword_keeps_its_variants() {
        let catalogue = KeywordCatalogue::with_defaults();
        let outcome = catalogue.add_with_variants("fall", &["tumble"]).unwrap();

        assert!(!outcome.inserted);
        assert!(outcome.entry.variants.contains(&"fell".to_string()));
        assert!(!outcome.entry.variants.contains(&"tumble".to_string()));
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let catalogue = KeywordCatalogue::empty();
        assert_eq!(catalogue.add("   "), Err(KeywordError::EmptyKeyword));
        assert!(!catalogue.remove("").unwrap());
        assert!(catalogue.is_empty().unwrap());
    }

    #[test]
    fn test_statistics() {
        let catalogue = KeywordCatalogue::with_defaults();
        let stats = catalogue.statistics().unwrap();

        assert_eq!(stats.total_keywords, 20);
        assert_eq!(stats.min_keyword_length, 3);
        assert_eq!(stats.max_keyword_length, 11);
        assert!(stats.total_variants > 40);
    }
}
