use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{BaseDir, FileAccess, VfsError};

/// Per-operation call counters of a [`MemoryFs`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub exists: usize,
    pub mkdir: usize,
    pub read: usize,
    pub write: usize,
}

/// In-memory file access
///
/// Counts every call, can be told to fail reads or writes of given paths,
/// and can
/// yield to the scheduler once per call so that concurrently started
/// operations interleave the way real I/O would.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<HashMap<(BaseDir, String), String>>,
    dirs: RwLock<HashSet<(BaseDir, String)>>,
    failing_writes: RwLock<HashSet<String>>,
    failing_reads: RwLock<HashSet<String>>,
    suspend: bool,
    exists_calls: AtomicUsize,
    mkdir_calls: AtomicUsize,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

fn key(path: &str, base: BaseDir) -> (BaseDir, String) {
    (base, path.trim_matches('/').to_string())
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield once before completing each operation
    pub fn suspending(mut self) -> Self {
        self.suspend = true;
        self
    }

    /// Seed a file
    pub fn with_file(self, path: &str, base: BaseDir, content: &str) -> Self {
        self.put(path, base, content);
        self
    }

    pub fn put(&self, path: &str, base: BaseDir, content: &str) {
        self.files
            .write()
            .unwrap()
            .insert(key(path, base), content.to_string());
    }

    pub fn file(&self, path: &str, base: BaseDir) -> Option<String> {
        self.files.read().unwrap().get(&key(path, base)).cloned()
    }

    pub fn is_dir(&self, path: &str, base: BaseDir) -> bool {
        self.dirs.read().unwrap().contains(&key(path, base))
    }

    /// Make every later write to `path` fail, whatever the base
    pub fn fail_writes_to(&self, path: &str) {
        self.failing_writes
            .write()
            .unwrap()
            .insert(path.trim_matches('/').to_string());
    }

    pub fn heal_writes(&self) {
        self.failing_writes.write().unwrap().clear();
    }

    /// Make every later read of `path` fail, whatever the base
    pub fn fail_reads_from(&self, path: &str) {
        self.failing_reads
            .write()
            .unwrap()
            .insert(path.trim_matches('/').to_string());
    }

    pub fn heal_reads(&self) {
        self.failing_reads.write().unwrap().clear();
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            exists: self.exists_calls.load(Ordering::SeqCst),
            mkdir: self.mkdir_calls.load(Ordering::SeqCst),
            read: self.read_calls.load(Ordering::SeqCst),
            write: self.write_calls.load(Ordering::SeqCst),
        }
    }

    async fn pause(&self) {
        if self.suspend {
            tokio::task::yield_now().await;
        }
    }
}

impl FileAccess for MemoryFs {
    async fn exists(&self, path: &str, base: BaseDir) -> Result<bool, VfsError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let key = key(path, base);
        Ok(self.dirs.read().unwrap().contains(&key) || self.files.read().unwrap().contains_key(&key))
    }

    async fn mkdir(&self, path: &str, base: BaseDir) -> Result<(), VfsError> {
        self.mkdir_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.dirs.write().unwrap().insert(key(path, base));
        Ok(())
    }

    async fn read_text(&self, path: &str, base: BaseDir) -> Result<String, VfsError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self
            .failing_reads
            .read()
            .unwrap()
            .contains(path.trim_matches('/'))
        {
            return Err(VfsError::IoError(format!("{}: read refused", path)));
        }
        self.file(path, base)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    async fn write_text(&self, path: &str, base: BaseDir, content: &str) -> Result<(), VfsError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self
            .failing_writes
            .read()
            .unwrap()
            .contains(path.trim_matches('/'))
        {
            return Err(VfsError::IoError(format!("{}: write refused", path)));
        }
        self.put(path, base, content);
        Ok(())
    }
}
