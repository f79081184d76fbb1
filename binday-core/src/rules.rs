//! Declarative per-source rules: label classification, date encodings, noise.

use serde::{Deserialize, Serialize};

use crate::model::BinKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How a rule pattern is compared against a label.
pub enum MatchMode {
    /// Label starts with the pattern.
    Prefix,
    /// Label contains the pattern anywhere.
    #[default]
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Single `pattern -> kind` classification rule.
pub struct LabelRule {
    /// Text to look for; compared case-insensitively.
    pub pattern: String,
    /// Comparison mode.
    #[serde(default)]
    pub mode: MatchMode,
    /// Kind assigned when the rule matches.
    pub kind: BinKind,
}

impl LabelRule {
    /// Rule matching labels that start with `pattern`.
    #[must_use]
    pub fn prefix(pattern: &str, kind: BinKind) -> Self {
        Self {
            pattern: pattern.to_lowercase(),
            mode: MatchMode::Prefix,
            kind,
        }
    }

    /// Rule matching labels that contain `pattern`.
    #[must_use]
    pub fn contains(pattern: &str, kind: BinKind) -> Self {
        Self {
            pattern: pattern.to_lowercase(),
            mode: MatchMode::Contains,
            kind,
        }
    }

    /// Test an already trimmed and lower-cased label.
    fn matches(&self, normalized: &str) -> bool {
        let pattern = self.pattern.to_lowercase();
        match self.mode {
            MatchMode::Prefix => normalized.starts_with(&pattern),
            MatchMode::Contains => normalized.contains(&pattern),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Ordered rule table; the first matching rule wins.
pub struct LabelRules {
    /// Bumped whenever a source changes its wording.
    #[serde(default = "default_rules_version")]
    pub version: u32,
    /// Rules in evaluation order.
    pub rules: Vec<LabelRule>,
}

fn default_rules_version() -> u32 {
    1
}

impl LabelRules {
    /// Build a table from rules in evaluation order.
    #[must_use]
    pub fn new(version: u32, rules: Vec<LabelRule>) -> Self {
        Self { version, rules }
    }

    /// Classify a free-text label, returning `None` when nothing matches.
    #[must_use]
    pub fn classify(&self, label: &str) -> Option<BinKind> {
        let normalized = normalize_label(label);
        self.rules
            .iter()
            .find(|rule| rule.matches(&normalized))
            .map(|rule| rule.kind.clone())
    }
}

impl Default for LabelRules {
    /// General-purpose vocabulary used when a source brings no table of its own.
    fn default() -> Self {
        Self::new(
            1,
            vec![
                LabelRule::contains("food", BinKind::FoodWaste),
                LabelRule::contains("brown or blue", BinKind::Blue),
                LabelRule::contains("refuse", BinKind::Black),
                LabelRule::contains("general", BinKind::Black),
                LabelRule::contains("black", BinKind::Black),
                LabelRule::contains("recycl", BinKind::Blue),
                LabelRule::contains("blue", BinKind::Blue),
                LabelRule::contains("garden", BinKind::Green),
                LabelRule::contains("green", BinKind::Green),
                LabelRule::contains("brown", BinKind::Green),
                LabelRule::contains("pink", BinKind::Pink),
            ],
        )
    }
}

/// Trim and lower-case a label the way rules and `Unknown` kinds expect it.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
/// Named encodings sources use for collection dates.
pub enum DateStrategy {
    /// Fixed textual layout, as a chrono format string.
    Layout {
        /// e.g. `"%A, %d %B %Y"`.
        format: String,
    },
    /// Epoch milliseconds embedded in a wrapper such as `/Date(1700000000000)/`.
    EpochMillis,
}

impl DateStrategy {
    /// Layout strategy for the given chrono format.
    #[must_use]
    pub fn layout(format: &str) -> Self {
        DateStrategy::Layout {
            format: format.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// When `with` is due, `also` goes out on the same day.
pub struct Companion {
    /// Kind that triggers the companion.
    pub with: BinKind,
    /// Kind added alongside it.
    pub also: BinKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Everything the normalizer needs to know about one source.
pub struct SourceProfile {
    /// Label classification table.
    #[serde(default)]
    pub rules: LabelRules,
    /// Date encoding used by the source.
    pub date: DateStrategy,
    /// Substrings the source injects into date markers.
    #[serde(default)]
    pub noise: Vec<String>,
    /// Kinds that always accompany another kind.
    #[serde(default)]
    pub companions: Vec<Companion>,
}

impl SourceProfile {
    /// Profile with the default rule table and no noise or companions.
    #[must_use]
    pub fn new(date: DateStrategy) -> Self {
        Self {
            rules: LabelRules::default(),
            date,
            noise: Vec::new(),
            companions: Vec::new(),
        }
    }

    /// Replace the rule table.
    #[must_use]
    pub fn with_rules(mut self, rules: LabelRules) -> Self {
        self.rules = rules;
        self
    }

    /// Register a noise substring.
    #[must_use]
    pub fn with_noise(mut self, noise: &str) -> Self {
        self.noise.push(noise.to_owned());
        self
    }

    /// Register a companion pair.
    #[must_use]
    pub fn with_companion(mut self, with: BinKind, also: BinKind) -> Self {
        self.companions.push(Companion { with, also });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_cover_common_wording() {
        let rules = LabelRules::default();
        assert_eq!(rules.classify("Garden Waste"), Some(BinKind::Green));
        assert_eq!(rules.classify("  Recyclable Waste "), Some(BinKind::Blue));
        assert_eq!(rules.classify("REFUSE"), Some(BinKind::Black));
        assert_eq!(rules.classify("Green Food caddy"), Some(BinKind::FoodWaste));
        assert_eq!(rules.classify("Brown or Blue bin"), Some(BinKind::Blue));
        assert_eq!(rules.classify("Mystery Bin Type"), None);
    }

    #[test]
    fn prefix_rules_ignore_later_occurrences() {
        let rules = LabelRules::new(1, vec![LabelRule::prefix("Black", BinKind::Black)]);
        assert_eq!(rules.classify("black bin"), Some(BinKind::Black));
        assert_eq!(rules.classify("not black"), None);
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = LabelRules::new(
            2,
            vec![
                LabelRule::contains("garden", BinKind::Green),
                LabelRule::contains("waste", BinKind::Black),
            ],
        );
        assert_eq!(rules.classify("Garden Waste"), Some(BinKind::Green));
        assert_eq!(rules.classify("Other Waste"), Some(BinKind::Black));
    }

    #[test]
    fn profile_deserializes_from_tagged_strategy() {
        let json = r#"{
            "date": {"strategy": "layout", "format": "%d/%m/%Y"},
            "rules": {"rules": [{"pattern": "Wheelie", "kind": "black"}]},
            "noise": ["(provisional)"]
        }"#;
        let profile: SourceProfile = serde_json::from_str(json).expect("valid profile");
        assert_eq!(profile.date, DateStrategy::layout("%d/%m/%Y"));
        assert_eq!(profile.rules.version, 1);
        assert_eq!(profile.rules.classify("wheelie bin"), Some(BinKind::Black));
        assert_eq!(profile.noise, vec!["(provisional)".to_owned()]);
        assert!(profile.companions.is_empty());
    }
}
