//! Ordered, case-insensitively deduplicated keyword set.

use serde::{Deserialize, Deserializer, Serialize};

/// Emotion and spatial-tendency tags, in first-insertion order.
///
/// Every member is stored normalized: surrounding whitespace trimmed and
/// lowercased. Empty strings are never stored, so two keywords that differ
/// only by case or padding occupy a single slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeywordSet {
    items: Vec<String>,
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a raw keyword: trim, then lowercase.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    /// Insert a keyword. Returns false when empty or already present.
    pub fn insert(&mut self, raw: &str) -> bool {
        let keyword = Self::normalize(raw);
        if keyword.is_empty() || self.items.contains(&keyword) {
            return false;
        }
        self.items.push(keyword);
        true
    }

    /// Insert every keyword from an iterator, keeping first-seen order.
    pub fn extend<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for k in keywords {
            self.insert(k.as_ref());
        }
    }

    /// Union another set into this one.
    pub fn merge(&mut self, other: &KeywordSet) {
        self.extend(other.iter());
    }

    pub fn contains(&self, raw: &str) -> bool {
        let keyword = Self::normalize(raw);
        self.items.contains(&keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|s| s.as_str())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Join with the ideographic comma, as used in prompts.
    pub fn joined(&self) -> String {
        self.items.join("、")
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

impl<S: AsRef<str>> FromIterator<S> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        set.extend(iter);
        set
    }
}

impl<'de> Deserialize<'de> for KeywordSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_trim_and_case() {
        let mut set = KeywordSet::new();
        assert!(set.insert("自然"));
        assert!(!set.insert("自然 "));
        assert!(!set.insert("自然"));
        assert!(!set.insert("  自然\t"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice(), &["自然".to_string()]);

        assert!(set.insert("Calm"));
        assert!(!set.insert("calm"));
        assert!(!set.insert("CALM "));
        assert_eq!(set.len(), 2);
        assert!(set.contains("cAlM"));
    }

    #[test]
    fn test_empty_ignored() {
        let mut set = KeywordSet::new();
        assert!(!set.insert(""));
        assert!(!set.insert("   "));
        assert!(set.is_empty());
    }

    #[test]
    fn test_insertion_order_kept() {
        let set: KeywordSet = ["宁静", "户外", "宁静", "开阔"].into_iter().collect();
        assert_eq!(set.joined(), "宁静、户外、开阔");
    }

    #[test]
    fn test_deserialize_dedups() {
        let set: KeywordSet = serde_json::from_str(r#"["水边", " 水边", "山地"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["水边","山地"]"#);
    }
}
