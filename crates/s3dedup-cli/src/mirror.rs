use s3dedup_core::hasher::{ContentHasher, HashError};
use s3dedup_core::ObjectRecord;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

/// Hashes objects from a local directory that mirrors the bucket, one file
/// per key.
pub struct MirrorHasher {
    root: PathBuf,
}

impl MirrorHasher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Mirror path of `key`. Keys that would resolve outside the root are
    /// refused.
    fn path_for(&self, key: &str) -> Result<PathBuf, HashError> {
        let relative = Path::new(key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(HashError::Unavailable(format!(
                "key '{}' escapes the mirror root",
                key
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ContentHasher for MirrorHasher {
    fn content_hash(&self, record: &ObjectRecord) -> Result<String, HashError> {
        let path = self.path_for(&record.key)?;
        let size = path
            .metadata()
            .map_err(|e| unavailable(&path, e))?
            .len();
        // A stale mirror copy must not prove identity.
        if size != record.size {
            return Err(HashError::Unavailable(format!(
                "{}: mirror has {} bytes, index has {}",
                path.display(),
                size,
                record.size
            )));
        }
        hash_file(&path).map_err(|e| unavailable(&path, e))
    }
}

/// Used when no mirror is configured: every request is unavailable, so
/// ambiguous partitions are reported as unresolved.
pub struct NoMirror;

impl ContentHasher for NoMirror {
    fn content_hash(&self, _record: &ObjectRecord) -> Result<String, HashError> {
        Err(HashError::Unavailable("no local mirror configured".to_string()))
    }
}

pub fn hasher_for(root: Option<&Path>) -> Box<dyn ContentHasher> {
    match root {
        Some(root) => Box::new(MirrorHasher::new(root)),
        None => Box::new(NoMirror),
    }
}

fn hash_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn unavailable(path: &Path, e: io::Error) -> HashError {
    HashError::Unavailable(format!("{}: {}", path.display(), e))
}
