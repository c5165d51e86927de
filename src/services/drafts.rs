use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Unsent text keyed by a caller-chosen id, kept in one JSON file so drafts
/// survive a restart.
#[derive(Debug)]
pub struct DraftStore {
    path: Option<PathBuf>,
    drafts: BTreeMap<String, String>,
}

pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DIARYBOT_STATE_DIR") {
        return PathBuf::from(dir);
    }
    std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(|h| PathBuf::from(h).join(".diarybot"))
        .unwrap_or_else(|| PathBuf::from(".diarybot"))
}

impl DraftStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let drafts = if path.exists() {
            let s = fs::read_to_string(&path).with_context(|| format!("reading {path:?}"))?;
            if s.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&s).with_context(|| format!("parsing {path:?}"))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            drafts,
        })
    }

    /// A store that never touches disk (headless runs and tests).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            drafts: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.drafts.get(id).map(String::as_str)
    }

    pub fn set(&mut self, id: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            self.drafts.remove(id);
        } else {
            self.drafts.insert(id.to_string(), text.to_string());
        }
        self.save()
    }

    pub fn clear(&mut self, id: &str) -> Result<()> {
        self.set(id, "")
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {dir:?}"))?;
        }
        let text = serde_json::to_string_pretty(&self.drafts)?;
        // replace via a temp file; the old drafts stay intact until the write completes
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).with_context(|| format!("writing {tmp:?}"))?;
        fs::rename(&tmp, path).with_context(|| format!("replacing {path:?}"))?;
        tracing::debug!(path = %path.display(), drafts = self.drafts.len(), "drafts saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_survives_reopen_and_clear_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("drafts.json");
        let mut store = DraftStore::open(&path).unwrap();
        store.set("unsent-bot1", "slept badly").unwrap();

        let mut reopened = DraftStore::open(&path).unwrap();
        assert_eq!(reopened.get("unsent-bot1"), Some("slept badly"));
        assert_eq!(reopened.get("unsent-bot2"), None);

        reopened.clear("unsent-bot1").unwrap();
        let again = DraftStore::open(&path).unwrap();
        assert_eq!(again.get("unsent-bot1"), None);
    }

    #[test]
    fn ids_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        let mut store = DraftStore::open(&path).unwrap();
        store.set("a", "one").unwrap();
        store.set("b", "two").unwrap();
        store.clear("a").unwrap();
        let reopened = DraftStore::open(&path).unwrap();
        assert_eq!(reopened.get("a"), None);
        assert_eq!(reopened.get("b"), Some("two"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        fs::write(&path, "{not json").unwrap();
        assert!(DraftStore::open(&path).is_err());
    }

    #[test]
    fn in_memory_store_keeps_values_without_a_file() {
        let mut store = DraftStore::in_memory();
        store.set("x", "y").unwrap();
        assert_eq!(store.get("x"), Some("y"));
        assert!(store.path().is_none());
    }
}
