//! Datasets served by the memory backend.
//!
//! A dataset is a flat list of records plus a drill-down hierarchy of content
//! types. A child record belongs to a parent when the child's field named
//! after the parent's content type holds the parent's name:
//!
//! ```json
//! {
//!   "hierarchy": ["artist", "album", "track"],
//!   "records": [
//!     {"id": "a1", "name": "Muse", "type": "artist"},
//!     {"id": "b1", "name": "Drones", "type": "album", "data": {"artist": "Muse"}},
//!     {"id": "t1", "name": "Dead Inside", "type": "track",
//!      "data": {"artist": "Muse", "album": "Drones", "year": 2015}}
//!   ]
//! }
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use lens::Record;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};

fn default_hierarchy() -> Vec<String> {
    vec!["artist".into(), "album".into(), "track".into()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default = "default_hierarchy")]
    hierarchy: Vec<String>,
    #[serde(default)]
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset, checking that the hierarchy has no duplicates and
    /// that every record has an id and a type, unique per type.
    pub fn new(hierarchy: Vec<String>, records: Vec<Record>) -> Result<Self> {
        let dataset = Self { hierarchy, records };
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(s)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Dataset(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    fn validate(&self) -> Result<()> {
        let mut types = HashSet::new();
        for content_type in &self.hierarchy {
            if content_type.is_empty() || content_type.contains(['/', '?']) {
                return Err(Error::Dataset(format!(
                    "invalid content type '{}' in hierarchy",
                    content_type
                )));
            }
            if !types.insert(content_type.as_str()) {
                return Err(Error::Dataset(format!(
                    "content type '{}' appears twice in hierarchy",
                    content_type
                )));
            }
        }

        let mut keys = HashSet::new();
        for record in &self.records {
            if record.id.is_empty() {
                return Err(Error::Dataset(format!(
                    "record '{}' has no id",
                    record.name
                )));
            }
            if record.kind.is_empty() || record.kind.contains(['/', '?']) {
                return Err(Error::Dataset(format!(
                    "record '{}' has an invalid type '{}'",
                    record.id, record.kind
                )));
            }
            if !keys.insert((record.kind.as_str(), record.id.as_str())) {
                return Err(Error::Dataset(format!(
                    "duplicate {} id '{}'",
                    record.kind, record.id
                )));
            }
        }
        Ok(())
    }

    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Content types in hierarchy order, followed by any other types that
    /// occur in the records.
    pub fn content_types(&self) -> Vec<String> {
        let mut types = self.hierarchy.clone();
        for record in &self.records {
            if !types.contains(&record.kind) {
                types.push(record.kind.clone());
            }
        }
        types
    }

    pub fn has_type(&self, content_type: &str) -> bool {
        self.hierarchy.iter().any(|t| t == content_type)
            || self.records.iter().any(|r| r.kind == content_type)
    }

    pub fn records_of<'a, 'b>(&'a self, content_type: &'b str) -> impl Iterator<Item = &'a Record> + use<'a, 'b> {
        self.records.iter().filter(move |r| r.kind == content_type)
    }

    pub fn find(&self, content_type: &str, id: &str) -> Option<&Record> {
        self.records_of(content_type).find(|r| r.id == id)
    }

    /// Content type below `content_type` in the hierarchy.
    pub fn child_type(&self, content_type: &str) -> Option<&str> {
        let position = self.hierarchy.iter().position(|t| t == content_type)?;
        self.hierarchy.get(position + 1).map(String::as_str)
    }

    /// Properties a query on `content_type` may reference.
    pub fn identifiers(&self, content_type: &str) -> BTreeSet<String> {
        let mut identifiers: BTreeSet<String> =
            ["id", "name", "type"].iter().map(|s| s.to_string()).collect();
        for record in self.records_of(content_type) {
            identifiers.extend(record.data.keys().cloned());
        }
        identifiers
    }

    /// A small music library.
    pub fn sample() -> Self {
        let artists = [("a1", "Muse"), ("a2", "Radiohead")];
        let albums = [
            ("b1", "Absolution", "Muse", 2003),
            ("b2", "The Resistance", "Muse", 2009),
            ("b3", "In Rainbows", "Radiohead", 2007),
        ];
        let tracks = [
            ("t1", "Apocalypse Please", "Absolution", "Muse", 2003, 1),
            ("t2", "Time Is Running Out", "Absolution", "Muse", 2003, 3),
            ("t3", "Hysteria", "Absolution", "Muse", 2003, 8),
            ("t4", "Uprising", "The Resistance", "Muse", 2009, 1),
            ("t5", "Resistance", "The Resistance", "Muse", 2009, 2),
            ("t6", "15 Step", "In Rainbows", "Radiohead", 2007, 1),
            ("t7", "Nude", "In Rainbows", "Radiohead", 2007, 3),
            ("t8", "Reckoner", "In Rainbows", "Radiohead", 2007, 7),
        ];

        let mut records: Vec<Record> = artists
            .iter()
            .map(|(id, name)| Record::new(*id, *name, "artist").with("genre", "Rock"))
            .collect();
        records.extend(albums.iter().map(|(id, name, artist, year)| {
            Record::new(*id, *name, "album")
                .with("artist", *artist)
                .with("year", *year)
        }));
        records.extend(tracks.iter().map(|(id, name, album, artist, year, number)| {
            let mut record = Record::new(*id, *name, "track");
            record.data = json!({
                "album": album,
                "artist": artist,
                "genre": "Rock",
                "year": year,
                "number": number,
            })
            .as_object()
            .cloned()
            .unwrap_or_default();
            record
        }));

        Self {
            hierarchy: default_hierarchy(),
            records,
        }
    }
}
