//! Workspace loader: watches a directory for convention files and `prompts/*.md`
//! (component_design §4.4 "Workspace loader"), debounced and swapped atomically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, RwLock};

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Convention files surfaced at fixed priorities ahead of plugin-contributed sections.
const CONVENTION_FILES: &[(&str, &str, u32)] = &[
    ("SOUL.md", "soul", 310),
    ("IDENTITY.md", "identity_file", 320),
    ("AGENTS.md", "agents", 330),
];

const EXTRA_PRIORITY_FLOOR: u32 = 350;

#[derive(Debug, Clone)]
pub struct DynamicSection {
    pub name: String,
    pub priority: u32,
    pub content: String,
}

/// Content map built fresh on every (debounced) reload and swapped under a write lock.
pub struct WorkspaceLoader {
    root: PathBuf,
    sections: Arc<RwLock<Vec<DynamicSection>>>,
    _watcher: Option<RecommendedWatcher>,
}

impl WorkspaceLoader {
    /// Builds the loader and performs one synchronous initial load; does not watch.
    pub fn load_once(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let built = scan(&root);
        Self { root, sections: Arc::new(RwLock::new(built)), _watcher: None }
    }

    /// Starts watching `root` for changes, debouncing reloads by 500ms, and swapping
    /// the section list atomically under a write lock on each settled batch.
    pub fn watch(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let sections = Arc::new(RwLock::new(scan(&root)));

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        });

        let watcher = match watcher {
            Ok(mut w) => {
                if w.watch(&root, RecursiveMode::Recursive).is_err() {
                    tracing::warn!(path = %root.display(), "workspace watch failed to start");
                }
                Some(w)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to create workspace watcher");
                None
            }
        };

        let reload_root = root.clone();
        let reload_sections = sections.clone();
        tokio::spawn(async move {
            loop {
                let Some(_first) = rx.recv().await else { break };
                // Coalesce a burst of filesystem events into one reload.
                loop {
                    match tokio::time::timeout(DEBOUNCE, rx.recv()).await {
                        Ok(Some(_)) => continue,
                        _ => break,
                    }
                }
                let fresh = scan(&reload_root);
                *reload_sections.write().await = fresh;
                tracing::debug!(path = %reload_root.display(), "workspace prompt sections reloaded");
            }
        });

        Self { root, sections, _watcher: watcher }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn sections(&self) -> Vec<DynamicSection> {
        self.sections.read().await.clone()
    }
}

fn scan(root: &Path) -> Vec<DynamicSection> {
    let mut out = Vec::new();

    for (filename, key, priority) in CONVENTION_FILES {
        let path = root.join(filename);
        if let Ok(content) = std::fs::read_to_string(&path) {
            out.push(DynamicSection { name: key.to_string(), priority: *priority, content });
        }
    }

    let prompts_dir = root.join("prompts");
    let mut extras: Vec<(String, String)> = Vec::new();
    if let Ok(entries) = walkdir_collect(&prompts_dir) {
        extras = entries;
    }
    extras.sort_by(|a, b| a.0.cmp(&b.0));
    for (idx, (name, content)) in extras.into_iter().enumerate() {
        out.push(DynamicSection {
            name: format!("extra:{name}"),
            priority: EXTRA_PRIORITY_FLOOR + idx as u32,
            content,
        });
    }

    out
}

fn walkdir_collect(dir: &Path) -> std::io::Result<Vec<(String, String)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("md") {
            if let Ok(content) = std::fs::read_to_string(path) {
                let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("extra").to_string();
                out.push((name, content));
            }
        }
    }
    Ok(out)
}

/// Looks up dynamic sections by name for the `Section` trait adapter.
pub fn index_by_name(sections: &[DynamicSection]) -> HashMap<String, String> {
    sections.iter().map(|s| (s.name.clone(), s.content.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn scan_picks_up_convention_files_at_fixed_priorities() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("SOUL.md"), "soul text").unwrap();
        let sections = scan(dir.path());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].priority, 310);
        assert_eq!(sections[0].content, "soul text");
    }

    #[test]
    fn scan_sorts_extra_prompts_by_name() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join("prompts/b.md"), "b").unwrap();
        std::fs::write(dir.path().join("prompts/a.md"), "a").unwrap();
        let sections = scan(dir.path());
        let names: Vec<_> = sections.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["extra:a", "extra:b"]);
        assert_eq!(sections[0].priority, EXTRA_PRIORITY_FLOOR);
        assert_eq!(sections[1].priority, EXTRA_PRIORITY_FLOOR + 1);
    }

    #[test]
    fn scan_empty_workspace_yields_no_sections() {
        let dir = TempDir::new().unwrap();
        assert!(scan(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn load_once_reflects_initial_state() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("AGENTS.md"), "agents text").unwrap();
        let loader = WorkspaceLoader::load_once(dir.path());
        let sections = loader.sections().await;
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "agents");
    }
}
