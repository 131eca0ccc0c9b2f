//! Identity of administrable keywords and sources.
//!
//! Built-in items come from the monitor file and are addressed by a natural
//! key; they can only be disabled and re-enabled. User-owned items live in the
//! ledger and are addressed by their surrogate row id; they can only be
//! created and deleted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Keyword,
    Source,
}

impl ItemKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Keyword => "keyword",
            ItemKind::Source => "source",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keyword" => Ok(ItemKind::Keyword),
            "source" => Ok(ItemKind::Source),
            other => Err(format!("unknown item kind '{other}'")),
        }
    }
}

/// Natural key of a built-in item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NaturalKey {
    Keyword { group: String, pattern: String },
    Source { name: String },
}

impl NaturalKey {
    #[must_use]
    pub fn keyword(group: impl Into<String>, pattern: impl Into<String>) -> Self {
        NaturalKey::Keyword {
            group: group.into(),
            pattern: pattern.into(),
        }
    }

    #[must_use]
    pub fn source(name: impl Into<String>) -> Self {
        NaturalKey::Source { name: name.into() }
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            NaturalKey::Keyword { .. } => ItemKind::Keyword,
            NaturalKey::Source { .. } => ItemKind::Source,
        }
    }

    /// The `item_key` column value. Keyword keys are `"{group}:{pattern}"`;
    /// group names are validated to contain no `:` so the split is unambiguous.
    #[must_use]
    pub fn item_key(&self) -> String {
        match self {
            NaturalKey::Keyword { group, pattern } => format!("{group}:{pattern}"),
            NaturalKey::Source { name } => name.clone(),
        }
    }

    /// Inverse of [`NaturalKey::item_key`].
    #[must_use]
    pub fn parse(kind: ItemKind, item_key: &str) -> Option<Self> {
        match kind {
            ItemKind::Keyword => item_key
                .split_once(':')
                .map(|(group, pattern)| NaturalKey::keyword(group, pattern)),
            ItemKind::Source => Some(NaturalKey::source(item_key)),
        }
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.item_key())
    }
}

/// Who owns a managed item, and therefore how it is removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOwner {
    /// Defined in static configuration; removal is a reversible disable.
    BuiltIn(NaturalKey),
    /// Created at runtime; removal is a permanent delete.
    UserOwned(i64),
}

impl ItemOwner {
    #[must_use]
    pub fn is_built_in(&self) -> bool {
        matches!(self, ItemOwner::BuiltIn(_))
    }
}
