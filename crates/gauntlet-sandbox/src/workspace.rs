use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use gauntlet_core::{GauntletError, Result, WorkspaceSnapshot};

/// Creates and destroys isolated per-test workspaces.
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// `root` is the directory under which workspaces are created; when
    /// `None`, the system temp directory is used.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root: root.unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Copy the fixture tree into a fresh uniquely-named directory and
    /// return the handle. Fails fast with `FixtureNotFound` before any
    /// agent turn runs.
    pub fn acquire(&self, test_name: &str, fixture_path: &Path) -> Result<Workspace> {
        if !fixture_path.is_dir() {
            return Err(GauntletError::FixtureNotFound(fixture_path.to_path_buf()));
        }

        let unique = uuid::Uuid::new_v4().simple().to_string();
        let dir = self.root.join(format!("gauntlet-{test_name}-{unique}"));
        std::fs::create_dir_all(&dir)?;

        copy_tree(fixture_path, &dir)?;
        let initial = hash_tree(&dir)?;
        debug!(workspace = %dir.display(), files = initial.len(), "workspace acquired");

        Ok(Workspace {
            dir,
            initial,
            released: false,
        })
    }
}

/// An exclusively-owned ephemeral directory tree, seeded from a fixture.
/// Deleted on `release()`, and on drop as a fallback so no exit path
/// leaks a temp directory.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    initial: BTreeMap<String, String>,
    released: bool,
}

impl Workspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a workspace-relative path, rejecting absolute paths and
    /// any traversal outside the workspace.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let rel_path = Path::new(rel);
        if rel_path.is_absolute() {
            return Err(GauntletError::Workspace(format!(
                "absolute path not allowed: {rel}"
            )));
        }
        for component in rel_path.components() {
            if matches!(component, Component::ParentDir) {
                return Err(GauntletError::Workspace(format!(
                    "path escapes workspace: {rel}"
                )));
            }
        }
        Ok(self.dir.join(rel_path))
    }

    /// Capture the final state and the diff against the seeded fixture.
    pub fn snapshot(&self) -> Result<WorkspaceSnapshot> {
        let current = hash_tree(&self.dir)?;

        let added = current
            .keys()
            .filter(|k| !self.initial.contains_key(*k))
            .cloned()
            .collect();
        let removed = self
            .initial
            .keys()
            .filter(|k| !current.contains_key(*k))
            .cloned()
            .collect();
        let modified = current
            .iter()
            .filter(|(k, hash)| self.initial.get(*k).is_some_and(|h| h != *hash))
            .map(|(k, _)| k.clone())
            .collect();

        Ok(WorkspaceSnapshot {
            files: current.into_keys().collect(),
            added,
            modified,
            removed,
        })
    }

    /// Delete the workspace directory. Exactly-once: drop after an
    /// explicit release is a no-op.
    pub fn release(mut self) {
        self.delete();
    }

    fn delete(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            warn!(workspace = %self.dir.display(), error = %e, "failed to delete workspace");
        } else {
            debug!(workspace = %self.dir.display(), "workspace released");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.delete();
    }
}

// Follows symlinks so linked fixture content is materialized in the
// copy; a dangling link is an acquire error, not a silent skip.
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| GauntletError::Workspace(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| GauntletError::Workspace(e.to_string()))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Relative path → blake3 content hash, for every file under `dir`.
fn hash_tree(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut hashes = BTreeMap::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| GauntletError::Workspace(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| GauntletError::Workspace(e.to_string()))?
            .to_string_lossy()
            .into_owned();
        let content = std::fs::read(entry.path())?;
        hashes.insert(rel, blake3::hash(&content).to_hex().to_string());
    }
    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn acquire_copies_fixture_and_release_deletes() {
        let fixture = fixture_with(&[("openapi.yaml", "openapi: 3.1.0"), ("docs/readme.md", "x")]);
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(Some(root.path().to_path_buf()));

        let ws = manager.acquire("t1", fixture.path()).unwrap();
        let dir = ws.dir().to_path_buf();
        assert!(dir.join("openapi.yaml").exists());
        assert!(dir.join("docs/readme.md").exists());

        ws.release();
        assert!(!dir.exists());
    }

    #[test]
    fn drop_deletes_unreleased_workspace() {
        let fixture = fixture_with(&[("openapi.yaml", "x")]);
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(Some(root.path().to_path_buf()));

        let dir = {
            let ws = manager.acquire("t2", fixture.path()).unwrap();
            ws.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn missing_fixture_fails_fast() {
        let manager = WorkspaceManager::new(None);
        let err = manager
            .acquire("t3", Path::new("/nonexistent/fixture"))
            .unwrap_err();
        assert!(matches!(err, GauntletError::FixtureNotFound(_)));
    }

    #[test]
    fn concurrent_acquires_never_share_a_directory() {
        let fixture = fixture_with(&[("openapi.yaml", "x")]);
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(Some(root.path().to_path_buf()));

        let a = manager.acquire("same-name", fixture.path()).unwrap();
        let b = manager.acquire("same-name", fixture.path()).unwrap();
        assert_ne!(a.dir(), b.dir());
    }

    #[test]
    fn mutations_do_not_touch_the_fixture() {
        let fixture = fixture_with(&[("openapi.yaml", "original")]);
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(Some(root.path().to_path_buf()));

        let ws = manager.acquire("t4", fixture.path()).unwrap();
        std::fs::write(ws.dir().join("openapi.yaml"), "mutated").unwrap();

        let original = std::fs::read_to_string(fixture.path().join("openapi.yaml")).unwrap();
        assert_eq!(original, "original");
    }

    #[test]
    fn symlinked_fixture_content_is_materialized() {
        let fixture = fixture_with(&[("shared/openapi.yaml", "openapi: 3.1.0")]);
        std::os::unix::fs::symlink(
            fixture.path().join("shared/openapi.yaml"),
            fixture.path().join("openapi.yaml"),
        )
        .unwrap();
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(Some(root.path().to_path_buf()));

        let ws = manager.acquire("t7", fixture.path()).unwrap();
        let copied = ws.dir().join("openapi.yaml");
        assert!(copied.is_file());
        assert!(!copied.is_symlink());
        assert_eq!(
            std::fs::read_to_string(&copied).unwrap(),
            "openapi: 3.1.0"
        );
    }

    #[test]
    fn snapshot_diffs_against_seeded_state() {
        let fixture = fixture_with(&[("openapi.yaml", "spec"), ("gen.yaml", "cfg")]);
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(Some(root.path().to_path_buf()));

        let ws = manager.acquire("t5", fixture.path()).unwrap();
        std::fs::write(ws.dir().join("openapi.yaml"), "edited").unwrap();
        std::fs::write(ws.dir().join("overlay.yaml"), "new").unwrap();
        std::fs::remove_file(ws.dir().join("gen.yaml")).unwrap();

        let snap = ws.snapshot().unwrap();
        assert_eq!(snap.added, vec!["overlay.yaml"]);
        assert_eq!(snap.modified, vec!["openapi.yaml"]);
        assert_eq!(snap.removed, vec!["gen.yaml"]);
    }

    #[test]
    fn resolve_rejects_traversal() {
        let fixture = fixture_with(&[("openapi.yaml", "x")]);
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(Some(root.path().to_path_buf()));
        let ws = manager.acquire("t6", fixture.path()).unwrap();

        assert!(ws.resolve("../outside.txt").is_err());
        assert!(ws.resolve("/etc/passwd").is_err());
        assert!(ws.resolve("sdk/index.ts").is_ok());
    }
}
