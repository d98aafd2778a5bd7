//! On-disk page store: `{dir}/{key}.html`, expired by modification time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::PageCache;
use crate::log;

pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { dir: dir.into(), ttl }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.html"))
    }

    fn is_fresh(&self, path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age <= self.ttl)
    }
}

impl PageCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.is_file() {
            return None;
        }
        if !self.is_fresh(&path) {
            let _ = fs::remove_file(&path);
            return None;
        }
        fs::read_to_string(&path).ok()
    }

    fn put(&self, key: &str, html: &str) {
        let result =
            fs::create_dir_all(&self.dir).and_then(|()| fs::write(self.path_for(key), html));
        if let Err(e) = result {
            log!("cache"; "failed to write {}: {}", self.dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path().join("pages"), Duration::from_secs(60));

        assert!(cache.get("abc").is_none());
        cache.put("abc", "<p>cached</p>");
        assert!(dir.path().join("pages/abc.html").is_file());
        assert_eq!(cache.get("abc").as_deref(), Some("<p>cached</p>"));
    }

    #[test]
    fn test_file_expired_entry_is_removed() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path(), Duration::ZERO);
        cache.put("abc", "<p>old</p>");
        std::thread::sleep(Duration::from_millis(20));

        assert!(cache.get("abc").is_none());
        assert!(!dir.path().join("abc.html").exists());
    }
}
