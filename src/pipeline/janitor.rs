//! Artifact cleanup.
//!
//! Removes compiler byproducts (`tikz-<n>.tex`, `.dvi`, `.log`, `.aux`, ...)
//! from an image directory. Final SVGs survive unless explicitly purged.
//! Deletion problems are reported, never raised.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::types::ArtifactKind;

#[derive(Debug, Clone, Default)]
pub struct JanitorReport {
    pub removed: Vec<PathBuf>,
    /// Final artifacts left in place
    pub kept: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl JanitorReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ArtifactJanitor;

impl ArtifactJanitor {
    /// Delete intermediate artifacts, keep final ones
    pub async fn sweep(image_dir: &Path) -> JanitorReport {
        Self::remove_matching(image_dir, |kind| kind == ArtifactKind::Intermediate).await
    }

    /// Delete every compiler-produced artifact, final SVGs included
    pub async fn purge(image_dir: &Path) -> JanitorReport {
        Self::remove_matching(image_dir, |_| true).await
    }

    async fn remove_matching(image_dir: &Path, doomed: impl Fn(ArtifactKind) -> bool) -> JanitorReport {
        let mut report = JanitorReport::default();

        let mut entries = match tokio::fs::read_dir(image_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                warn!("Cannot list {}: {}", image_dir.display(), e);
                report.failures.push((image_dir.to_path_buf(), e.to_string()));
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error reading {}: {}", image_dir.display(), e);
                    report.failures.push((image_dir.to_path_buf(), e.to_string()));
                    break;
                }
            };

            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let Some(kind) = ArtifactKind::classify(&name) else {
                continue;
            };

            if !doomed(kind) {
                report.kept += 1;
                continue;
            }

            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed {}", path.display());
                    report.removed.push(path);
                }
                Err(e) => {
                    warn!("Failed to remove {}: {}", path.display(), e);
                    report.failures.push((path, e.to_string()));
                }
            }
        }

        report.removed.sort();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn populate(dir: &Path) {
        fs::create_dir_all(dir.join("tikz-9.d")).unwrap();
        for name in [
            "tikz-1.tex",
            "tikz-1.dvi",
            "tikz-1.aux",
            "tikz-1.log",
            "tikz-1.svg",
            "tikz-2.svg",
            "photo.png",
            "tikz_3.tex",
        ] {
            fs::write(dir.join(name), "x").unwrap();
        }
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_sweep_keeps_finals() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        let report = ArtifactJanitor::sweep(temp.path()).await;
        assert_eq!(report.removed.len(), 4);
        assert_eq!(report.kept, 2);
        assert!(report.is_clean());
        assert_eq!(
            names(temp.path()),
            vec!["photo.png", "tikz-1.svg", "tikz-2.svg", "tikz-9.d", "tikz_3.tex"]
        );
    }

    #[tokio::test]
    async fn test_purge_removes_finals() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        let report = ArtifactJanitor::purge(temp.path()).await;
        assert_eq!(report.removed.len(), 6);
        assert_eq!(names(temp.path()), vec!["photo.png", "tikz-9.d", "tikz_3.tex"]);
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty_report() {
        let temp = TempDir::new().unwrap();
        let report = ArtifactJanitor::sweep(&temp.path().join("images")).await;
        assert!(report.removed.is_empty());
        assert!(report.is_clean());
    }
}
