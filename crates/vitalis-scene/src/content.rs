//! Educational text for structures, written for five audiences.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("reading level {0} is outside 1..=5")]
pub struct InvalidReadingLevel(pub u8);

/// Audience tier from 1 (child) to 5 (physician).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ReadingLevel(u8);

impl ReadingLevel {
    pub const CHILD: ReadingLevel = ReadingLevel(1);
    pub const PATIENT: ReadingLevel = ReadingLevel(2);
    pub const NURSING: ReadingLevel = ReadingLevel(3);
    pub const MEDICAL_STUDENT: ReadingLevel = ReadingLevel(4);
    pub const PHYSICIAN: ReadingLevel = ReadingLevel(5);

    pub fn new(level: u8) -> Option<Self> {
        (1..=5).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn audience(self) -> &'static str {
        match self.0 {
            1 => "child",
            2 => "patient",
            3 => "nursing",
            4 => "medical student",
            _ => "physician",
        }
    }
}

impl Default for ReadingLevel {
    fn default() -> Self {
        Self::PATIENT
    }
}

impl TryFrom<u8> for ReadingLevel {
    type Error = InvalidReadingLevel;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or(InvalidReadingLevel(level))
    }
}

impl From<ReadingLevel> for u8 {
    fn from(level: ReadingLevel) -> Self {
        level.0
    }
}

/// Text shown for one structure at one reading level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelContent {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl LevelContent {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            key_points: Vec::new(),
        }
    }

    pub fn with_point(mut self, point: impl Into<String>) -> Self {
        self.key_points.push(point.into());
        self
    }
}

/// Source of educational content, keyed by a structure's `content_id`.
pub trait ContentProvider: Send {
    fn content_for_level(&self, content_id: &str, level: ReadingLevel) -> Option<LevelContent>;
}

#[derive(Debug, Deserialize)]
struct ContentRecord {
    id: String,
    level: ReadingLevel,
    title: String,
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
}

/// In-memory content table.
#[derive(Clone, Debug, Default)]
pub struct StaticContentProvider {
    entries: FxHashMap<String, BTreeMap<ReadingLevel, LevelContent>>,
}

impl StaticContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a RON list of `(id, level, title, summary, key_points)` records.
    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        let records: Vec<ContentRecord> = ron::from_str(source)?;
        let mut provider = Self::new();
        for record in records {
            let content = LevelContent {
                title: record.title,
                summary: record.summary,
                key_points: record.key_points,
            };
            provider.insert(record.id, record.level, content);
        }
        Ok(provider)
    }

    pub fn insert(&mut self, content_id: impl Into<String>, level: ReadingLevel, content: LevelContent) {
        self.entries
            .entry(content_id.into())
            .or_default()
            .insert(level, content);
    }

    pub fn with(mut self, content_id: impl Into<String>, level: ReadingLevel, content: LevelContent) -> Self {
        self.insert(content_id, level, content);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentProvider for StaticContentProvider {
    fn content_for_level(&self, content_id: &str, level: ReadingLevel) -> Option<LevelContent> {
        self.entries.get(content_id)?.get(&level).cloned()
    }
}
