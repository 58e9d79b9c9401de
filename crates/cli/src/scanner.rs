use ignore::WalkBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Which corpus a scanned file feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    JavaScript,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated; used as the chunk source id
    pub source_id: String,
    pub kind: SourceKind,
}

/// Scanner for JavaScript sources and Markdown docs in a project
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Scan the project (.gitignore aware). Files come back sorted by source id
    /// so chunk ids are stable across runs.
    pub fn scan(&self) -> Vec<SourceFile> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(move |entry| !Self::is_ignored_scope(entry.path(), &root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    let Some(kind) = Self::classify(path) else {
                        continue;
                    };

                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > MAX_FILE_SIZE_BYTES {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                MAX_FILE_SIZE_BYTES
                            );
                            continue;
                        }
                    }

                    files.push(SourceFile {
                        path: path.to_path_buf(),
                        source_id: self.source_id(path),
                        kind,
                    });
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        log::info!("Found {} source files", files.len());
        files
    }

    fn source_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn classify(path: &Path) -> Option<SourceKind> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        if MINIFIED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            log::debug!("Skipping minified bundle {}", path.display());
            return None;
        }

        let ext = path.extension()?.to_str()?.to_lowercase();
        if JAVASCRIPT_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceKind::JavaScript)
        } else if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceKind::Markdown)
        } else {
            None
        }
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        if let Ok(relative) = path.strip_prefix(root) {
            for component in relative.components() {
                if let std::path::Component::Normal(name) = component {
                    let lowered = name.to_string_lossy().to_lowercase();
                    if IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

const IGNORED_SCOPES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".cache",
    ".yarn",
    ".npm",
    "node_modules",
    "bower_components",
    ".next",
    ".parcel-cache",
    "coverage",
    "target",
];

const JAVASCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];
const MINIFIED_SUFFIXES: &[&str] = &[".min.js", ".min.mjs", ".min.cjs"];

const MAX_FILE_SIZE_BYTES: u64 = 2 * 1_048_576; // 2 MiB

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn scanned(root: &Path) -> Vec<(String, SourceKind)> {
        FileScanner::new(root)
            .scan()
            .into_iter()
            .map(|file| (file.source_id, file.kind))
            .collect()
    }

    #[test]
    fn picks_javascript_and_markdown_sorted() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/core")).unwrap();
        fs::write(temp.path().join("src/core/grid.mjs"), "class Grid {}").unwrap();
        fs::write(temp.path().join("src/index.js"), "export {};").unwrap();
        fs::write(temp.path().join("README.md"), "# Intro\nhi").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp.path().join("style.css"), "body {}").unwrap();

        assert_eq!(
            scanned(temp.path()),
            vec![
                ("README.md".to_string(), SourceKind::Markdown),
                ("src/core/grid.mjs".to_string(), SourceKind::JavaScript),
                ("src/index.js".to_string(), SourceKind::JavaScript),
            ]
        );
    }

    #[test]
    fn skips_node_modules_and_minified_bundles() {
        let temp = tempdir().unwrap();
        let deps = temp.path().join("node_modules").join("left-pad");
        fs::create_dir_all(&deps).unwrap();
        fs::write(deps.join("index.js"), "module.exports = 1;").unwrap();
        fs::write(temp.path().join("lib.min.js"), "a();b();").unwrap();
        fs::write(temp.path().join("lib.js"), "a();").unwrap();

        assert_eq!(
            scanned(temp.path()),
            vec![("lib.js".to_string(), SourceKind::JavaScript)]
        );
    }

    #[test]
    fn skips_oversized_files() {
        let temp = tempdir().unwrap();
        let big = vec![b';'; (MAX_FILE_SIZE_BYTES + 1) as usize];
        fs::write(temp.path().join("bundle.js"), big).unwrap();
        fs::write(temp.path().join("small.js"), "x;").unwrap();

        assert_eq!(
            scanned(temp.path()),
            vec![("small.js".to_string(), SourceKind::JavaScript)]
        );
    }
}
