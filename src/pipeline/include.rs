//! Include Expansion
//!
//! Flattens a root document by inlining `\input{..}` and `\include{..}`
//! directives. The set of already inlined files travels explicitly through
//! the traversal, so self and mutual references terminate.

use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use tracing::{debug, warn};

use crate::types::{Result, ResultExt, SlideError};

// Anchored: a directive after other text on the line (prose,
// `%` comments) is left to LaTeX instead of being inlined.
static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\\(?:include|input)\{([^}]+)\}").expect("valid include pattern")
});

/// Flattened source of one unit
#[derive(Debug, Default)]
pub struct SourceTree {
    pub content: String,
    /// Canonical paths inlined so far, in first-visit order (root first)
    pub visited: Vec<PathBuf>,
    /// Non-fatal resolution problems, one per dropped directive
    pub warnings: Vec<SlideError>,
}

/// Traversal state threaded through the recursion
#[derive(Default)]
struct Traversal {
    seen: HashSet<PathBuf>,
    order: Vec<PathBuf>,
    warnings: Vec<SlideError>,
}

impl Traversal {
    /// Record `path`; false if it was inlined before
    fn enter(&mut self, path: &Path) -> bool {
        if !self.seen.insert(path.to_path_buf()) {
            return false;
        }
        self.order.push(path.to_path_buf());
        true
    }
}

pub struct IncludeExpander;

impl IncludeExpander {
    /// Expand `root` into a single source string.
    ///
    /// Only an unreadable root (or an included file that exists but cannot be
    /// read) is an error; missing includes become warnings.
    pub fn expand(root: &Path) -> Result<SourceTree> {
        let canonical = fs::canonicalize(root).with_path(root)?;

        let mut traversal = Traversal::default();
        traversal.enter(&canonical);
        let content = Self::expand_file(&canonical, &mut traversal)?;

        debug!(
            "Expanded {} ({} files, {} warnings)",
            root.display(),
            traversal.order.len(),
            traversal.warnings.len()
        );

        Ok(SourceTree {
            content,
            visited: traversal.order,
            warnings: traversal.warnings,
        })
    }

    /// [`Self::expand`] on the blocking pool, for use inside the unit pipeline
    pub async fn expand_in_background(root: PathBuf) -> Result<SourceTree> {
        tokio::task::spawn_blocking(move || Self::expand(&root))
            .await
            .map_err(|e| SlideError::Io(std::io::Error::other(e.to_string())))?
    }

    fn expand_file(path: &Path, traversal: &mut Traversal) -> Result<String> {
        let text = fs::read_to_string(path).with_path(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut lines = Vec::new();
        for raw in text.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            let Some(name) = directive_target(line) else {
                lines.push(line.to_string());
                continue;
            };

            let candidate = dir.join(with_default_extension(name));
            let resolved = match fs::canonicalize(&candidate) {
                Ok(resolved) if resolved.is_file() => resolved,
                _ => {
                    warn!(
                        "Included file not found: {} (from {})",
                        candidate.display(),
                        path.display()
                    );
                    traversal.warnings.push(SlideError::IncludeResolution {
                        missing: candidate,
                        from: path.to_path_buf(),
                    });
                    continue;
                }
            };

            if traversal.enter(&resolved) {
                lines.push(Self::expand_file(&resolved, traversal)?);
            } else {
                debug!("Skipping already inlined {}", resolved.display());
                lines.push(String::new());
            }
        }

        Ok(lines.join("\n"))
    }
}

/// Referenced name when the trimmed line starts with an include directive
fn directive_target(line: &str) -> Option<&str> {
    DIRECTIVE_RE
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
}

/// `.tex` is appended only to names without an extension, so
/// `\input{table.data}` reads `table.data` rather than `table.data.tex`
fn with_default_extension(name: &str) -> PathBuf {
    let path = PathBuf::from(name);
    if path.extension().is_some() {
        path
    } else {
        PathBuf::from(format!("{}.tex", name))
    }
}
