//! Order-independent identity for a set of variant option titles.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum number of variant axes a single combination may span.
pub const MAX_AXES: usize = 3;

/// Separator used by the combination title format, e.g. `"Red/Large/"`.
pub const TITLE_DELIMITER: char = '/';

/// Canonical identity of a combination: its titles, deduplicated and sorted.
///
/// `"Red/Large/"`, `"Large/Red"` and `"/Large//Red"` all produce the same key.
/// Titles are compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CombinationKey(Vec<String>);

impl CombinationKey {
    /// Parse a delimiter-joined title string.
    ///
    /// Empty segments (including the trailing one produced by `"A/B/"`) are
    /// dropped. Segments are not trimmed: `" Red"` and `"Red"` are distinct.
    #[must_use]
    pub fn parse(title: &str) -> Self {
        Self::from_titles(title.split(TITLE_DELIMITER))
    }

    /// Build a key from already-split titles, e.g. the resolved slots of a
    /// stored price record.
    pub fn from_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut titles: Vec<String> = titles
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        titles.sort();
        titles.dedup();
        Self(titles)
    }

    #[must_use]
    pub fn titles(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, title: &str) -> bool {
        self.0.binary_search_by(|t| t.as_str().cmp(title)).is_ok()
    }

    /// Returns `true` when the combination spans more axes than a price
    /// record has slots for.
    #[must_use]
    pub fn exceeds_max_axes(&self) -> bool {
        self.0.len() > MAX_AXES
    }

    /// Render in the legacy payload format: sorted titles, each followed by
    /// the delimiter (`"Large/Red/"`).
    #[must_use]
    pub fn to_title_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for title in &self.0 {
            write!(f, "{title}{TITLE_DELIMITER}")?;
        }
        Ok(())
    }
}

impl From<&str> for CombinationKey {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for CombinationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CombinationKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
