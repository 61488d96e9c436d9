//! Substring rule tables.

use moodtrip_core::KeywordSet;

/// A rule fires when the input contains any of `needles`; it then contributes `tags`.
pub(crate) struct Rule {
    pub needles: &'static [&'static str],
    pub tags: &'static [&'static str],
}

impl Rule {
    fn matches(&self, value: &str) -> bool {
        self.needles.iter().any(|n| value.contains(n))
    }
}

/// Lookup table: every matching rule contributes (union).
pub(crate) fn apply_all(token: &str, table: &[Rule], out: &mut KeywordSet) {
    let token = token.trim().to_lowercase();
    if token.is_empty() {
        return;
    }
    for rule in table.iter().filter(|r| r.matches(&token)) {
        out.extend(rule.tags.iter());
    }
}

/// Priority chain: the first matching rule wins. Empty input contributes nothing.
pub(crate) fn apply_first(value: &str, chain: &[Rule], out: &mut KeywordSet) {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return;
    }
    if let Some(rule) = chain.iter().find(|r| r.matches(&value)) {
        out.extend(rule.tags.iter());
    }
}
