//! Chart identities: cache keys, artifact paths and chart element ids.
//!
//! A chart artifact is named after the files it was drawn from and the time
//! the plugin's options last changed:
//!
//! ```text
//! <web_root>/uploads/files/graphs/datatype_<id>/Chart__<file_id>_<stamp>.svg
//! <web_root>/uploads/files/graphs/datatype_<id>/Chart__<id1>_<id2>_<id3>_<stamp>.svg
//! ```
//!
//! The first form is a per-record chart, the second the combined (rollup)
//! chart. Names are a pure function of their inputs, so repeated and
//! concurrent requests converge on the same path. Editing any active option
//! moves the stamp forward and so retires every earlier name without
//! deleting it.
//!
//! Chart element ids are the opposite: random per build, and never part of
//! the cache key. They only need to be unique within the rendered page.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::{
    CHART_ELEMENT_PREFIX, CHART_FILE_PREFIX, DATATYPE_DIR_PREFIX, GRAPHS_SUBDIR, HTML_EXTENSION,
    LOCKS_DIR, ROLLUP_KEY, SVG_EXTENSION,
};
use crate::models::{DatatypeId, FileId, RecordId};

/// Which chart of a page to build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChartTarget {
    /// The chart of one record.
    Record(RecordId),
    /// The combined chart over all records.
    Rollup,
}

impl FromStr for ChartTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(anyhow::anyhow!("Chart target cannot be empty")),
            ROLLUP_KEY => Ok(Self::Rollup),
            id => Ok(Self::Record(id.to_string())),
        }
    }
}

impl fmt::Display for ChartTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(id) => f.write_str(id),
            Self::Rollup => f.write_str(ROLLUP_KEY),
        }
    }
}

impl Serialize for ChartTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChartTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Cache key of one chart artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChartKey {
    file_ids: Vec<FileId>,
    last_changed: i64,
}

impl ChartKey {
    /// Key of a per-record chart.
    pub fn for_file(file_id: FileId, last_changed: i64) -> Self {
        Self {
            file_ids: vec![file_id],
            last_changed,
        }
    }

    /// Key of the combined chart. The contributing ids form a set: order and
    /// duplicates do not affect the key.
    pub fn for_rollup(file_ids: impl IntoIterator<Item = FileId>, last_changed: i64) -> Self {
        let mut file_ids: Vec<FileId> = file_ids.into_iter().collect();
        file_ids.sort_unstable();
        file_ids.dedup();
        Self {
            file_ids,
            last_changed,
        }
    }

    pub fn file_ids(&self) -> &[FileId] {
        &self.file_ids
    }

    pub fn last_changed(&self) -> i64 {
        self.last_changed
    }

    /// `10_11_12`
    pub fn id_segment(&self) -> String {
        self.file_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join("_")
    }

    /// `Chart__10_11_12_<stamp>`, also used as the build lock name.
    pub fn stem(&self) -> String {
        format!("{CHART_FILE_PREFIX}{}_{}", self.id_segment(), self.last_changed)
    }

    /// `Chart__10_11_12_<stamp>.svg`
    pub fn file_name(&self) -> String {
        format!("{}.{SVG_EXTENSION}", self.stem())
    }

    /// `Chart__10_11_12_<stamp>.html`: the intermediate page.
    ///
    /// Shares the stem with the artifact, so only the holder of the key's
    /// build permit ever writes or deletes it.
    pub fn page_name(&self) -> String {
        format!("{}.{HTML_EXTENSION}", self.stem())
    }
}

/// Layout of the graph cache below the web root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    web_root: PathBuf,
}

impl CacheLayout {
    pub fn new(web_root: impl Into<PathBuf>) -> Self {
        Self {
            web_root: web_root.into(),
        }
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    /// `<web_root>/uploads/files/graphs`
    pub fn graphs_root(&self) -> PathBuf {
        self.web_root.join(GRAPHS_SUBDIR)
    }

    /// `<web_root>/uploads/files/graphs/datatype_<id>`
    pub fn datatype_dir(&self, datatype_id: DatatypeId) -> PathBuf {
        self.graphs_root().join(format!("{DATATYPE_DIR_PREFIX}{datatype_id}"))
    }

    /// Lock directory of a datatype's cache.
    pub fn locks_dir(&self, datatype_id: DatatypeId) -> PathBuf {
        self.datatype_dir(datatype_id).join(LOCKS_DIR)
    }

    /// Final artifact path of `key`.
    pub fn artifact_path(&self, datatype_id: DatatypeId, key: &ChartKey) -> PathBuf {
        self.datatype_dir(datatype_id).join(key.file_name())
    }

    /// Intermediate chart page path of `key`.
    pub fn page_path(&self, datatype_id: DatatypeId, key: &ChartKey) -> PathBuf {
        self.datatype_dir(datatype_id).join(key.page_name())
    }

    /// URL path (`/uploads/...`) of a file below the web root, if it is one.
    pub fn url_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.web_root).ok()?;
        let segments: Vec<String> =
            relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
        Some(format!("/{}", segments.join("/")))
    }
}

/// A fresh chart element id: `Chart_` followed by 32 hex digits.
///
/// Only ASCII alphanumerics and underscores, so it can be used as a DOM id
/// and a CSS selector without escaping.
pub fn chart_element_id() -> String {
    format!("{CHART_ELEMENT_PREFIX}{}", Uuid::new_v4().simple())
}

/// Whether `id` can be used verbatim as a DOM id and selector.
pub fn is_selector_safe(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with(|c: char| c.is_ascii_digit())
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
