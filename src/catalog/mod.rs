pub mod validate;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub use validate::{RejectReason, Rejection};

/// Earliest release year accepted into a catalog.
pub const MIN_YEAR: i32 = 1920;
/// Latest release year accepted into a catalog.
pub const MAX_YEAR: i32 = 2020;
/// Number of genre clusters produced by the offline clustering step.
pub const CLUSTER_COUNT: u8 = 8;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog root must be a JSON array of song records")]
    NotAnArray,
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Audio features carried by each song, all in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
}

/// A validated song. Fields satisfy the catalog invariants
/// (year, cluster and feature ranges, positive duration, finite position).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongRecord {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub year: i32,
    pub duration_ms: u64,
    pub cluster: u8,
    pub features: Features,
    pub position: [f64; 3],
}

/// Process-unique identity of a loaded catalog, used as a memo key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CatalogId(u64);

static NEXT_CATALOG_ID: AtomicU64 = AtomicU64::new(1);

/// Inclusive year filter. `from > to` selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
}

impl YearRange {
    pub const fn new(from: i32, to: i32) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.from && year <= self.to
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(MIN_YEAR, MAX_YEAR)
    }
}

/// Outcome of ingesting a raw record sequence.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub loaded: usize,
    pub skipped: usize,
    pub rejections: Vec<Rejection>,
}

/// The immutable, validated song collection.
#[derive(Debug)]
pub struct SongCatalog {
    id: CatalogId,
    songs: Vec<SongRecord>,
}

impl SongCatalog {
    /// Wrap already-validated records. No checks are repeated here.
    pub fn new(songs: Vec<SongRecord>) -> Self {
        let id = CatalogId(NEXT_CATALOG_ID.fetch_add(1, Ordering::Relaxed));
        Self { id, songs }
    }

    /// Load a catalog from a JSON file, skipping invalid records.
    pub fn load(path: &Path, workers: usize) -> Result<(Self, IngestReport)> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loading catalog from {}", path.display());
        Self::from_json_str(&contents, workers)
    }

    /// Parse a JSON array of song records. Records that fail validation are
    /// skipped and counted; only a malformed document fails the whole load.
    pub fn from_json_str(json: &str, workers: usize) -> Result<(Self, IngestReport)> {
        let root: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Array(items) = root else {
            return Err(CatalogError::NotAnArray);
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;
        let (songs, rejections) = pool.install(|| validate::validate_all(items));

        for r in &rejections {
            log::warn!("Skipping record {}: {}", r.index, r.reason);
        }

        let report = IngestReport {
            loaded: songs.len(),
            skipped: rejections.len(),
            rejections,
        };
        log::info!(
            "Catalog ready: {} songs loaded, {} skipped",
            report.loaded,
            report.skipped
        );

        Ok((Self::new(songs), report))
    }

    pub fn id(&self) -> CatalogId {
        self.id
    }

    pub fn songs(&self) -> &[SongRecord] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Select the records whose year lies in `range`, in catalog order.
    pub fn filter(&self, range: YearRange) -> FilteredView<'_> {
        let songs = self.songs.iter().filter(|s| range.contains(s.year)).collect();
        FilteredView { range, songs }
    }
}

/// Non-owning, ordered subsequence of a catalog selected by year range.
#[derive(Debug, Clone)]
pub struct FilteredView<'c> {
    range: YearRange,
    songs: Vec<&'c SongRecord>,
}

impl<'c> FilteredView<'c> {
    /// Build a view over arbitrary records (tests, ad-hoc subsets).
    pub fn from_songs(range: YearRange, songs: Vec<&'c SongRecord>) -> Self {
        Self { range, songs }
    }

    pub fn range(&self) -> YearRange {
        self.range
    }

    pub fn songs(&self) -> &[&'c SongRecord] {
        &self.songs
    }

    pub fn get(&self, index: usize) -> Option<&'c SongRecord> {
        self.songs.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'c SongRecord> + '_ {
        self.songs.iter().copied()
    }
}
