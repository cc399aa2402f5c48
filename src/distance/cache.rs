//! Storage port for intermediate pairwise arrays.
//!
//! Pairwise arrays are O(n²). Caching the weights and rank arrays lets a run
//! be resumed, and lets callers keep them out of memory between stages.
//! Every read is validated against the current observation count.

use super::num_obs_condensed;
use crate::error::{Error, Result};
use std::collections::HashMap;

#[cfg(feature = "disk-cache")]
use std::path::{Path, PathBuf};

/// Kind of cached pairwise array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "disk-cache", derive(serde::Serialize, serde::Deserialize))]
pub enum CacheKind {
    /// Pair weights `length(i) × length(j)`.
    Weights,
    /// Scaled coverage distance ranks.
    CoverageRanks,
    /// Scaled k-mer distance ranks.
    KmerRanks,
}

impl CacheKind {
    /// Stable name used in file names and error messages.
    pub fn name(self) -> &'static str {
        match self {
            CacheKind::Weights => "weights",
            CacheKind::CoverageRanks => "coverage",
            CacheKind::KmerRanks => "kmer",
        }
    }
}

/// Get/put access to cached condensed arrays.
pub trait DistanceCache {
    /// Fetch the array of `kind`, if cached.
    ///
    /// Fails with [`Error::StaleCache`] if the cached array was computed for a
    /// different number of observations than `n_obs`.
    fn get(&self, kind: CacheKind, n_obs: usize) -> Result<Option<Vec<f64>>>;

    /// Store the array of `kind` for `n_obs` observations.
    fn put(&mut self, kind: CacheKind, n_obs: usize, values: &[f64]) -> Result<()>;

    /// Whether `get` returns what `put` stored. Callers may then release a
    /// stored array and read it back later.
    fn retains(&self) -> bool {
        true
    }
}

impl<C: DistanceCache + ?Sized> DistanceCache for &mut C {
    fn get(&self, kind: CacheKind, n_obs: usize) -> Result<Option<Vec<f64>>> {
        (**self).get(kind, n_obs)
    }

    fn put(&mut self, kind: CacheKind, n_obs: usize, values: &[f64]) -> Result<()> {
        (**self).put(kind, n_obs, values)
    }

    fn retains(&self) -> bool {
        (**self).retains()
    }
}

/// Check that a condensed array belongs to `n_obs` observations.
pub(crate) fn assert_num_obs(kind: CacheKind, n_obs: usize, values: &[f64]) -> Result<()> {
    let implied = num_obs_condensed(values.len()).ok_or(Error::InvalidCondensedLength {
        len: values.len(),
    })?;
    // An empty array fits both 0 and 1 observations.
    if implied == n_obs || (values.is_empty() && n_obs < 2) {
        return Ok(());
    }
    Err(Error::StaleCache {
        kind: kind.name(),
        expected: n_obs,
        found: implied,
    })
}

/// A cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl DistanceCache for NoCache {
    fn get(&self, _kind: CacheKind, _n_obs: usize) -> Result<Option<Vec<f64>>> {
        Ok(None)
    }

    fn put(&mut self, _kind: CacheKind, _n_obs: usize, _values: &[f64]) -> Result<()> {
        Ok(())
    }

    fn retains(&self) -> bool {
        false
    }
}

/// In-memory cache.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    arrays: HashMap<CacheKind, Vec<f64>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an array of `kind` is stored.
    pub fn contains(&self, kind: CacheKind) -> bool {
        self.arrays.contains_key(&kind)
    }
}

impl DistanceCache for MemoryCache {
    fn get(&self, kind: CacheKind, n_obs: usize) -> Result<Option<Vec<f64>>> {
        match self.arrays.get(&kind) {
            Some(values) => {
                assert_num_obs(kind, n_obs, values)?;
                log::debug!("cache hit: {}", kind.name());
                Ok(Some(values.clone()))
            }
            None => Ok(None),
        }
    }

    fn put(&mut self, kind: CacheKind, n_obs: usize, values: &[f64]) -> Result<()> {
        assert_num_obs(kind, n_obs, values)?;
        let _ = self.arrays.insert(kind, values.to_vec());
        Ok(())
    }
}

/// On-disk record for one cached array.
#[cfg(feature = "disk-cache")]
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CachedArray {
    kind: CacheKind,
    n_obs: usize,
    values: Vec<f64>,
}

/// On-disk cache: one bincode file per array kind inside a directory.
#[cfg(feature = "disk-cache")]
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

#[cfg(feature = "disk-cache")]
impl DiskCache {
    /// Use `dir` as cache directory, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| Error::Cache {
            message: format!("cannot create {}: {e}", dir.display()),
        })?;
        Ok(Self { dir })
    }

    fn path(&self, kind: CacheKind) -> PathBuf {
        self.dir.join(format!("{}.dists", kind.name()))
    }

    /// Remove every cached array.
    pub fn clear(&self) -> Result<()> {
        for kind in [CacheKind::Weights, CacheKind::CoverageRanks, CacheKind::KmerRanks] {
            let path = self.path(kind);
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| Error::Cache {
                    message: format!("cannot remove {}: {e}", path.display()),
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "disk-cache")]
impl DistanceCache for DiskCache {
    fn get(&self, kind: CacheKind, n_obs: usize) -> Result<Option<Vec<f64>>> {
        let path = self.path(kind);
        if !path.exists() {
            log::debug!("cache miss: {}", kind.name());
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| Error::Cache {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let record: CachedArray = bincode::deserialize(&bytes).map_err(|e| Error::Cache {
            message: format!("corrupt {}: {e}", path.display()),
        })?;
        if record.kind != kind {
            return Err(Error::Cache {
                message: format!("{} holds {} data", path.display(), record.kind.name()),
            });
        }
        if record.n_obs != n_obs {
            return Err(Error::StaleCache {
                kind: kind.name(),
                expected: n_obs,
                found: record.n_obs,
            });
        }
        assert_num_obs(kind, n_obs, &record.values)?;
        log::debug!("cache hit: {}", kind.name());
        Ok(Some(record.values))
    }

    fn put(&mut self, kind: CacheKind, n_obs: usize, values: &[f64]) -> Result<()> {
        assert_num_obs(kind, n_obs, values)?;
        let path = self.path(kind);
        let record = CachedArray {
            kind,
            n_obs,
            values: values.to_vec(),
        };
        let bytes = bincode::serialize(&record).map_err(|e| Error::Cache {
            message: e.to_string(),
        })?;
        std::fs::write(&path, bytes).map_err(|e| Error::Cache {
            message: format!("cannot write {}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cache_is_always_empty() {
        let mut c = NoCache;
        c.put(CacheKind::Weights, 3, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(c.get(CacheKind::Weights, 3).unwrap(), None);
        assert!(!c.retains());
        assert!(MemoryCache::new().retains());
    }

    #[test]
    fn memory_cache_validates_observation_count() {
        let mut c = MemoryCache::new();
        c.put(CacheKind::KmerRanks, 3, &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(
            c.get(CacheKind::KmerRanks, 3).unwrap(),
            Some(vec![0.1, 0.2, 0.3])
        );
        assert_eq!(
            c.get(CacheKind::KmerRanks, 4).unwrap_err(),
            Error::StaleCache {
                kind: "kmer",
                expected: 4,
                found: 3
            }
        );
        assert!(c.put(CacheKind::Weights, 4, &[1.0]).is_err());
    }

    #[cfg(feature = "disk-cache")]
    #[test]
    fn disk_cache_roundtrips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = DiskCache::open(dir.path()).unwrap();
        assert_eq!(c.get(CacheKind::CoverageRanks, 3).unwrap(), None);
        c.put(CacheKind::CoverageRanks, 3, &[0.5, 0.25, 0.0]).unwrap();

        let reopened = DiskCache::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get(CacheKind::CoverageRanks, 3).unwrap(),
            Some(vec![0.5, 0.25, 0.0])
        );
        assert!(matches!(
            reopened.get(CacheKind::CoverageRanks, 5),
            Err(Error::StaleCache { .. })
        ));

        reopened.clear().unwrap();
        assert_eq!(c.get(CacheKind::CoverageRanks, 3).unwrap(), None);
    }
}
