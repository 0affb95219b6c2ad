//! Maps paths to the projects that declared interest in them.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;

use super::error::DaemonError;

/// A named project and the directories that belong to it. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectWatch {
    pub name: Arc<str>,
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_recursive() -> bool {
    true
}

impl ProjectWatch {
    pub fn new(
        name: impl Into<Arc<str>>,
        roots: Vec<PathBuf>,
        recursive: bool,
    ) -> Result<Self, DaemonError> {
        let watch = Self {
            name: name.into(),
            roots,
            recursive,
        };
        watch.validate()?;
        Ok(watch)
    }

    pub fn recursive(name: impl Into<Arc<str>>, roots: Vec<PathBuf>) -> Result<Self, DaemonError> {
        Self::new(name, roots, true)
    }

    /// Deserialized watches skip [ProjectWatch::new], so they get checked here.
    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.name.trim().is_empty() {
            return Err(DaemonError::InvalidProject {
                reason: "project name must not be empty".into(),
            });
        }
        if self.roots.is_empty() {
            return Err(DaemonError::InvalidProject {
                reason: format!("project '{}' has no roots", self.name),
            });
        }
        if let Some(root) = self.roots.iter().find(|r| !r.is_absolute()) {
            return Err(DaemonError::InvalidProject {
                reason: format!(
                    "root {} of project '{}' is not absolute",
                    root.display(),
                    self.name
                ),
            });
        }
        Ok(())
    }

    /// True if one of the roots is `path` or an ancestor of it. Comparison is per component, so
    /// `/a/b` contains `/a/b/c` but not `/a/bc`.
    pub fn contains(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }
}

/// Holds every configured watch for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Attributor {
    watches: Vec<ProjectWatch>,
}

impl Attributor {
    pub fn new(watches: Vec<ProjectWatch>) -> Self {
        Self { watches }
    }

    /// Watches with a root at or above `path`. Each watch shows up at most once even if several
    /// of its roots match.
    pub fn related(&self, path: &Path) -> Vec<&ProjectWatch> {
        attribute(path, &self.watches).collect()
    }
}

/// Watches among `watches` that `path` belongs to, in configuration order.
pub fn attribute<'a: 'p, 'p>(
    path: &'p Path,
    watches: &'a [ProjectWatch],
) -> impl Iterator<Item = &'a ProjectWatch> + 'p {
    watches.iter().filter(move |w| w.contains(path))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, path::PathBuf};

    use super::*;

    fn watch(name: &str, roots: &[&str]) -> ProjectWatch {
        ProjectWatch::recursive(name, roots.iter().map(PathBuf::from).collect()).unwrap()
    }

    #[test]
    fn prefix_is_component_wise() {
        let attributor = Attributor::new(vec![watch("Alpha", &["/a/b"])]);
        assert_eq!(attributor.related(Path::new("/a/b/c")).len(), 1);
        assert!(attributor.related(Path::new("/a/bc")).is_empty());
        assert!(attributor.related(Path::new("/a")).is_empty());
    }

    #[test]
    fn root_itself_is_related() {
        let attributor = Attributor::new(vec![watch("Alpha", &["/a"])]);
        let related = attributor.related(Path::new("/a"));
        assert_eq!(related.len(), 1);
        assert_eq!(&*related[0].name, "Alpha");
    }

    #[test]
    fn overlapping_roots_report_once() {
        let attributor = Attributor::new(vec![watch("Alpha", &["/a", "/a/sub"])]);
        let related = attributor.related(Path::new("/a/sub/file"));
        assert_eq!(related.len(), 1);
    }

    #[test]
    fn projects_sharing_a_root_are_all_reported() {
        let watches = vec![watch("Alpha", &["/shared"]), watch("Beta", &["/shared/x"])];
        let names: HashSet<_> = attribute(Path::new("/shared/x/y"), &watches)
            .map(|w| w.name.clone())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains("Alpha"));
        assert!(names.contains("Beta"));
    }

    #[test]
    fn every_result_has_a_matching_root() {
        let watches = vec![
            watch("Alpha", &["/a"]),
            watch("Beta", &["/b", "/a/b"]),
            watch("Gamma", &["/c"]),
        ];
        let attributor = Attributor::new(watches);
        for path in ["/a/b/c", "/b", "/c/d/e", "/d", "/a"] {
            let path = Path::new(path);
            for w in attributor.related(path) {
                assert!(w.roots.iter().any(|r| path.starts_with(r)), "{path:?} {w:?}");
            }
        }
    }

    #[test]
    fn unrelated_path_is_empty() {
        let watches = vec![watch("Alpha", &["/a"])];
        assert_eq!(attribute(Path::new("/c/irrelevant"), &watches).count(), 0);
    }

    #[test]
    fn validation() {
        assert!(ProjectWatch::recursive("", vec![PathBuf::from("/a")]).is_err());
        assert!(ProjectWatch::recursive("Alpha", vec![]).is_err());
        assert!(ProjectWatch::recursive("Alpha", vec![PathBuf::from("relative")]).is_err());
        assert!(ProjectWatch::new("Alpha", vec![PathBuf::from("/a")], false).is_ok());
    }

    #[test]
    fn deserialize_defaults_to_recursive() {
        let w: ProjectWatch = serde_json::from_str(r#"{"name":"Alpha","roots":["/a"]}"#).unwrap();
        assert!(w.recursive);
        assert_eq!(w.roots, vec![PathBuf::from("/a")]);
    }
}
