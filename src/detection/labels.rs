use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Classes reported by the ripeness detector.
///
/// The shipped strawberry weights name their classes `straw-ripe` and
/// `straw-unripe`; both spellings map to the same variant. Anything else
/// lands in [`RipenessLabel::Unknown`] so a retrained model with extra
/// classes keeps working.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RipenessLabel {
    Ripe,
    Unripe,
    Unknown(String),
}

/// Classes reported by the spoilage detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpoilageLabel {
    Healthy,
    Spoiled,
    Unknown(String),
}

impl From<&str> for RipenessLabel {
    fn from(name: &str) -> Self {
        match name {
            "ripe" | "straw-ripe" => RipenessLabel::Ripe,
            "unripe" | "straw-unripe" => RipenessLabel::Unripe,
            other => RipenessLabel::Unknown(other.to_string()),
        }
    }
}

impl From<&str> for SpoilageLabel {
    fn from(name: &str) -> Self {
        // the class names below are misspelled in the exported weights
        match name {
            "healthy" | "strwa_healthy" => SpoilageLabel::Healthy,
            "spoiled" | "starw_rotten" => SpoilageLabel::Spoiled,
            other => SpoilageLabel::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for RipenessLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RipenessLabel::Ripe => f.write_str("ripe"),
            RipenessLabel::Unripe => f.write_str("unripe"),
            RipenessLabel::Unknown(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for SpoilageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpoilageLabel::Healthy => f.write_str("healthy"),
            SpoilageLabel::Spoiled => f.write_str("spoiled"),
            SpoilageLabel::Unknown(name) => f.write_str(name),
        }
    }
}

/// Per-label detection counts for one model's output on one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTally<L: Eq + Hash> {
    counts: HashMap<L, usize>,
}

impl<L: Eq + Hash> Default for LabelTally<L> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }
}

impl<L> LabelTally<L>
where
    L: Eq + Hash + for<'a> From<&'a str>,
{
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = HashMap::new();
        for label in labels {
            *counts.entry(L::from(label)).or_insert(0) += 1;
        }
        Self { counts }
    }
}

impl<L: Eq + Hash> LabelTally<L> {
    pub fn get(&self, label: &L) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<L: Eq + Hash + fmt::Display> LabelTally<L> {
    /// Label name → count, for logs and debug payloads.
    pub fn to_named_counts(&self) -> std::collections::BTreeMap<String, usize> {
        self.counts
            .iter()
            .map(|(label, count)| (label.to_string(), *count))
            .collect()
    }
}

impl<L: Eq + Hash + fmt::Display> Serialize for LabelTally<L> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_named_counts().serialize(serializer)
    }
}
