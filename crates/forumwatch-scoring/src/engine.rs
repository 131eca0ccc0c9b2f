//! The scoring engine and its copy-on-write pattern set.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};

use forumwatch_core::{ContentItem, DetectionResult, KeywordMap, MatchLocation, MatchRecord};

use crate::error::ScoringError;

pub const DEFAULT_THRESHOLD: f64 = 1.5;

const TITLE_WEIGHT: f64 = 2.0;
const BODY_WEIGHT: f64 = 1.0;
const CATEGORY_MULTIPLIER: f64 = 1.5;

/// Lowercase category names whose items get the score multiplier.
pub const PRIORITY_CATEGORIES: &[&str] = &[
    "governance",
    "security",
    "security council",
    "proposals",
    "voting",
    "constitution",
    "treasury",
];

/// A compiled, case-insensitive keyword pattern.
#[derive(Debug, Clone)]
pub struct KeywordPattern {
    pub group: String,
    pub pattern: String,
    regex: Regex,
}

impl KeywordPattern {
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidPattern`] if `pattern` is not a valid regex.
    pub fn compile(group: &str, pattern: &str) -> Result<Self, ScoringError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ScoringError::InvalidPattern {
                pattern: pattern.to_owned(),
                source: e,
            })?;
        Ok(Self {
            group: group.to_owned(),
            pattern: pattern.to_owned(),
            regex,
        })
    }
}

/// An immutable snapshot of the active patterns, grouped by name.
///
/// Groups are held in name order, so matches are reported group by group
/// alphabetically; patterns keep their configured order within a group.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    groups: BTreeMap<String, Vec<KeywordPattern>>,
}

impl PatternSet {
    /// Compiles every pattern in `keywords`, dropping (and logging) the ones
    /// that fail. A group whose patterns all fail is kept, empty. Repeated
    /// patterns are kept as configured and each one scores.
    #[must_use]
    pub fn compile_lenient(keywords: &KeywordMap) -> Self {
        let mut set = Self::default();
        for (group, patterns) in keywords {
            let compiled = set.groups.entry(group.clone()).or_default();
            for pattern in patterns {
                match KeywordPattern::compile(group, pattern) {
                    Ok(p) => compiled.push(p),
                    Err(e) => {
                        tracing::warn!(group = %group, pattern = %pattern, error = %e, "dropping invalid keyword pattern");
                    }
                }
            }
        }
        set
    }

    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn to_keyword_map(&self) -> KeywordMap {
        self.groups
            .iter()
            .map(|(group, patterns)| {
                (
                    group.clone(),
                    patterns.iter().map(|p| p.pattern.clone()).collect(),
                )
            })
            .collect()
    }

    /// Scores `item` against this snapshot.
    #[must_use]
    pub fn score(&self, item: &ContentItem, threshold: f64) -> DetectionResult {
        let mut score = 0.0_f64;
        let mut matches = Vec::new();

        for (group, patterns) in &self.groups {
            for pattern in patterns {
                if let Some(m) = pattern.regex.find(&item.title) {
                    score += TITLE_WEIGHT;
                    matches.push(MatchRecord {
                        group: group.clone(),
                        pattern: pattern.pattern.clone(),
                        location: MatchLocation::Title,
                        matched_text: m.as_str().to_owned(),
                    });
                }
                if let Some(m) = pattern.regex.find(&item.body) {
                    score += BODY_WEIGHT;
                    matches.push(MatchRecord {
                        group: group.clone(),
                        pattern: pattern.pattern.clone(),
                        location: MatchLocation::Body,
                        matched_text: m.as_str().to_owned(),
                    });
                }
            }
        }

        if is_priority_category(&item.category) {
            score *= CATEGORY_MULTIPLIER;
        }

        DetectionResult {
            item: item.clone(),
            triggered: score >= threshold,
            score,
            matches,
        }
    }

    fn insert(&mut self, pattern: KeywordPattern) {
        self.groups
            .entry(pattern.group.clone())
            .or_default()
            .push(pattern);
    }

    fn remove(&mut self, group: &str, pattern: &str) -> bool {
        let Some(patterns) = self.groups.get_mut(group) else {
            return false;
        };
        let before = patterns.len();
        patterns.retain(|p| p.pattern != pattern);
        let removed = patterns.len() != before;
        if patterns.is_empty() {
            self.groups.remove(group);
        }
        removed
    }
}

fn is_priority_category(category: &str) -> bool {
    let lowered = category.to_lowercase();
    PRIORITY_CATEGORIES.contains(&lowered.as_str())
}

/// Scores items against a runtime-mutable pattern set.
///
/// Readers take an `Arc` snapshot of the current [`PatternSet`] and score
/// against it without holding the lock; writers build a new set and swap it
/// in. An `analyze` that overlaps an `add_keyword` therefore sees either the
/// old set or the new one, never a mix.
pub struct ScoringEngine {
    threshold: f64,
    patterns: RwLock<Arc<PatternSet>>,
}

impl ScoringEngine {
    /// Builds an engine from keyword groups. Invalid patterns are dropped with
    /// a warning; construction itself never fails.
    #[must_use]
    pub fn new(keywords: &KeywordMap, threshold: f64) -> Self {
        let set = PatternSet::compile_lenient(keywords);
        tracing::info!(
            groups = set.group_count(),
            total_patterns = set.pattern_count(),
            threshold,
            "scoring engine initialized"
        );
        Self {
            threshold,
            patterns: RwLock::new(Arc::new(set)),
        }
    }

    /// An engine holding exactly one pattern, for single-keyword backfill scans.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidPattern`] if `pattern` does not compile.
    pub fn single(group: &str, pattern: &str, threshold: f64) -> Result<Self, ScoringError> {
        let mut set = PatternSet::default();
        set.insert(KeywordPattern::compile(group, pattern)?);
        Ok(Self {
            threshold,
            patterns: RwLock::new(Arc::new(set)),
        })
    }

    /// Checks that `pattern` would be accepted by [`ScoringEngine::add_keyword`].
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidPattern`] if `pattern` does not compile.
    pub fn validate_pattern(pattern: &str) -> Result<(), ScoringError> {
        KeywordPattern::compile("", pattern).map(|_| ())
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The current pattern set. Cheap: clones an `Arc`.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PatternSet> {
        Arc::clone(&self.patterns.read())
    }

    /// Scores `item` against the active pattern set.
    #[must_use]
    pub fn analyze(&self, item: &ContentItem) -> DetectionResult {
        let result = self.snapshot().score(item, self.threshold);
        if result.triggered {
            tracing::info!(
                source = %item.source,
                item_id = %item.id,
                title = %truncate(&item.title, 80),
                score = result.score,
                match_count = result.matches.len(),
                "item triggered"
            );
        }
        result
    }

    /// Compiles and appends one pattern to its group. A pattern already
    /// present is appended again and scores once per entry.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidPattern`] if `pattern` does not compile;
    /// the active set is left unchanged.
    pub fn add_keyword(&self, group: &str, pattern: &str) -> Result<(), ScoringError> {
        let compiled = KeywordPattern::compile(group, pattern)?;
        let mut guard = self.patterns.write();
        let mut next = PatternSet::clone(&guard);
        next.insert(compiled);
        *guard = Arc::new(next);
        tracing::info!(group, pattern, "keyword added");
        Ok(())
    }

    /// Removes every entry of `pattern` from `group`; returns whether any was
    /// present.
    pub fn remove_keyword(&self, group: &str, pattern: &str) -> bool {
        let mut guard = self.patterns.write();
        let mut next = PatternSet::clone(&guard);
        let removed = next.remove(group, pattern);
        if removed {
            *guard = Arc::new(next);
            tracing::info!(group, pattern, "keyword removed");
        }
        removed
    }

    /// Replaces the whole active set in one swap. Invalid patterns are dropped
    /// with a warning, as in [`ScoringEngine::new`].
    pub fn set_keywords(&self, keywords: &KeywordMap) {
        let next = PatternSet::compile_lenient(keywords);
        tracing::debug!(
            groups = next.group_count(),
            total_patterns = next.pattern_count(),
            "keyword set replaced"
        );
        *self.patterns.write() = Arc::new(next);
    }

    /// Active patterns grouped by group name.
    #[must_use]
    pub fn get_all_keywords(&self) -> KeywordMap {
        self.snapshot().to_keyword_map()
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
