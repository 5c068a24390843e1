//! Upload-directory watcher feeding the document queue.
//!
//! Existing files are queued first, then every file created in (or renamed
//! into) the directory. Hidden files are ignored. The watcher runs on
//! notify's own thread and stops when [`DirectoryWatcher`] is dropped.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ingest::{is_candidate, is_hidden};
use crate::queue::DocumentQueue;

/// Keeps the underlying watcher alive.
pub struct DirectoryWatcher {
    dir: PathBuf,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Candidate files already present in `dir`, sorted by path.
///
/// # Errors
///
/// Returns [`precis_core::Error::DirectoryNotFound`] if `dir` is not a
/// directory, or an I/O error if it cannot be listed.
pub fn scan_existing(dir: &Path) -> precis_core::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(precis_core::Error::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_candidate(path))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Paths from `event` that should be queued.
pub fn queued_paths(event: &Event) -> Vec<PathBuf> {
    let relevant = matches!(
        event.kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    );
    if !relevant {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| !is_hidden(path))
        .cloned()
        .collect()
}

/// Queue the existing files of `dir`, then watch it for new ones.
///
/// # Errors
///
/// Returns an error if `dir` is missing, the queue is closed, or the
/// platform watcher cannot be started.
pub async fn watch_directory(dir: &Path, queue: DocumentQueue) -> Result<DirectoryWatcher> {
    let existing = scan_existing(dir)?;
    info!(dir = %dir.display(), existing = existing.len(), "Queueing existing files");
    for path in existing {
        queue.submit(path).await?;
    }

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for path in queued_paths(&event) {
                debug!(path = %path.display(), "File added");
                if let Err(e) = queue.blocking_submit(&path) {
                    warn!(path = %path.display(), error = %e, "Could not queue file");
                }
            }
        }
        Err(e) => warn!(error = %e, "Watch error"),
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    info!(dir = %dir.display(), "Watching for new files");
    Ok(DirectoryWatcher {
        dir: dir.to_path_buf(),
        _watcher: watcher,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::error::Error as StdError;
    use std::time::Duration;

    use notify::event::{AccessKind, RemoveKind};

    use super::*;

    #[test]
    fn test_scan_skips_hidden_files_and_directories() -> std::result::Result<(), Box<dyn StdError>> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("b.txt"), "b")?;
        std::fs::write(dir.path().join("a.txt"), "a")?;
        std::fs::write(dir.path().join(".partial"), "x")?;
        std::fs::create_dir(dir.path().join("nested"))?;

        let found = scan_existing(dir.path())?;

        assert_eq!(found, vec![dir.path().join("a.txt"), dir.path().join("b.txt")]);
        Ok(())
    }

    #[test]
    fn test_scan_missing_directory() {
        let result = scan_existing(Path::new("/nonexistent/uploads"));
        assert!(matches!(result, Err(precis_core::Error::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_only_creations_and_renames_are_queued() {
        let path = PathBuf::from("/uploads/doc.txt");
        let hidden = PathBuf::from("/uploads/.doc.txt.swp");

        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(path.clone())
            .add_path(hidden);
        assert_eq!(queued_paths(&created), vec![path.clone()]);

        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To))).add_path(path.clone());
        assert_eq!(queued_paths(&renamed), vec![path.clone()]);

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.clone());
        assert!(queued_paths(&removed).is_empty());

        let read = Event::new(EventKind::Access(AccessKind::Read)).add_path(path);
        assert!(queued_paths(&read).is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_existing_then_new_files_are_queued() -> std::result::Result<(), Box<dyn StdError>> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("existing.txt"), "old")?;
        let (queue, mut rx) = DocumentQueue::detached(8);

        let _watcher = watch_directory(dir.path(), queue).await?;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.path, dir.path().join("existing.txt"));

        std::fs::write(dir.path().join("new.txt"), "new")?;
        let second = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await?
            .unwrap();
        assert_eq!(second.path.file_name().unwrap(), "new.txt");
        Ok(())
    }
}
