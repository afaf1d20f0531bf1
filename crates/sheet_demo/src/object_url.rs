//! Preview URLs: process-local handles to in-memory image bytes.
//!
//! A URL keeps its blob alive until it is revoked. Nothing is reclaimed
//! automatically, so every owner must revoke what it created.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

const URL_PREFIX: &str = "blob:spritesheet-demo/";

/// The user's chosen image, read fully into memory.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, String> {
        let bytes =
            fs::read(path).map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(&name, bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewUrl(String);

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    blobs: HashMap<PreviewUrl, Arc<[u8]>>,
    created_total: u64,
    revoked_total: u64,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, file: &SelectedFile) -> PreviewUrl {
        let url = PreviewUrl(format!("{URL_PREFIX}{}", Uuid::new_v4()));
        self.blobs.insert(url.clone(), Arc::clone(&file.bytes));
        self.created_total += 1;
        log::debug!("Created {} for '{}' ({} bytes)", url, file.name, file.bytes.len());
        url
    }

    /// Release a URL. Revoking an unknown or already revoked URL is a no-op
    /// and returns false.
    pub fn revoke(&mut self, url: &PreviewUrl) -> bool {
        if self.blobs.remove(url).is_some() {
            self.revoked_total += 1;
            log::debug!("Revoked {}", url);
            true
        } else {
            log::debug!("Revoke of {} ignored, not live", url);
            false
        }
    }

    pub fn resolve(&self, url: &PreviewUrl) -> Option<Arc<[u8]>> {
        self.blobs.get(url).cloned()
    }

    pub fn is_live(&self, url: &PreviewUrl) -> bool {
        self.blobs.contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn created_total(&self) -> u64 {
        self.created_total
    }

    pub fn revoked_total(&self) -> u64 {
        self.revoked_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_issues_unique_live_urls() {
        let mut urls = ObjectUrlRegistry::new();
        let file = SelectedFile::new("sheet.png", vec![1, 2, 3]);
        let a = urls.create(&file);
        let b = urls.create(&file);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(URL_PREFIX));
        assert_eq!(urls.live_count(), 2);
        assert_eq!(urls.resolve(&a).as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn revoke_is_idempotent() {
        let mut urls = ObjectUrlRegistry::new();
        let url = urls.create(&SelectedFile::new("sheet.png", vec![0]));
        assert!(urls.revoke(&url));
        assert!(!urls.revoke(&url));
        assert!(!urls.is_live(&url));
        assert!(urls.resolve(&url).is_none());
        assert_eq!(urls.created_total(), 1);
        assert_eq!(urls.revoked_total(), 1);
    }

    #[test]
    fn from_path_reads_name_and_bytes() {
        let path = std::env::temp_dir().join(format!("sheet_url_test_{}.bin", std::process::id()));
        fs::write(&path, [9u8, 8, 7]).expect("write temp file");
        let file = SelectedFile::from_path(&path).expect("read");
        assert_eq!(&*file.bytes, &[9u8, 8, 7][..]);
        assert!(file.name.starts_with("sheet_url_test_"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = SelectedFile::from_path(Path::new("/definitely/not/here.png"))
            .expect_err("missing");
        assert!(err.contains("Failed to read"));
    }
}
