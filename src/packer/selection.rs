//! OptionSelection: the immutable snapshot handed to the command builder.

use super::catalog::{CatalogEntry, ExcludeRule, PackagingMode, Plugin, PythonFlag};

/// Upper bound for the default job count.
const DEFAULT_JOBS_CAP: u32 = 12;

/// Default output file name (matches the packaging tool's usual target).
pub const DEFAULT_OUTPUT_FILENAME: &str = "app.exe";

/// Set of selected entries from one catalog.
///
/// Insertion order is irrelevant: iteration always follows the catalog's
/// declaration order, so toggling A then B builds the same command as B then A.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected<E: CatalogEntry>(Vec<E>);

impl<E: CatalogEntry> Default for Selected<E> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<E: CatalogEntry> Selected<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: E) {
        if !self.0.contains(&entry) {
            self.0.push(entry);
        }
    }

    pub fn remove(&mut self, entry: E) {
        self.0.retain(|e| *e != entry);
    }

    pub fn contains(&self, entry: E) -> bool {
        self.0.contains(&entry)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Selected entries in catalog-declaration order.
    pub fn in_catalog_order(&self) -> impl Iterator<Item = E> + '_ {
        E::ALL.iter().copied().filter(|e| self.contains(*e))
    }
}

impl<E: CatalogEntry> FromIterator<E> for Selected<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut s = Self::new();
        for e in iter {
            s.insert(e);
        }
        s
    }
}

/// Everything the user chose for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSelection {
    /// Main script path (the only mandatory field)
    pub main_file: String,
    pub icon: String,
    pub output_filename: String,
    /// Onefile temp directory spec, e.g. `{TEMP}/20240101_120000_app`
    pub tempdir_spec: String,
    /// Folders to bundle, in the order they were added (already de-duplicated)
    pub include_dirs: Vec<String>,
    pub plugins: Selected<Plugin>,
    pub modes: Selected<PackagingMode>,
    pub python_flags: Selected<PythonFlag>,
    pub excludes: Selected<ExcludeRule>,
    pub mingw64: bool,
    pub lto: bool,
    pub jobs: u32,
}

impl Default for OptionSelection {
    /// The initial state of a fresh session: anti-bloat, standalone + onefile,
    /// LTO on, `app.exe` output.
    fn default() -> Self {
        Self {
            plugins: [Plugin::AntiBloat].into_iter().collect(),
            modes: [PackagingMode::Standalone, PackagingMode::Onefile]
                .into_iter()
                .collect(),
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            ..Self::empty()
        }
    }
}

impl OptionSelection {
    /// A selection with nothing enabled besides LTO and the default job count.
    pub fn empty() -> Self {
        Self {
            main_file: String::new(),
            icon: String::new(),
            output_filename: String::new(),
            tempdir_spec: String::new(),
            include_dirs: Vec::new(),
            plugins: Selected::new(),
            modes: Selected::new(),
            python_flags: Selected::new(),
            excludes: Selected::new(),
            mingw64: false,
            lto: true,
            jobs: default_jobs(),
        }
    }

    /// Append a folder unless it is already listed. Returns whether it was added.
    pub fn add_include_dir(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.include_dirs.iter().any(|p| *p == path) {
            return false;
        }
        self.include_dirs.push(path);
        true
    }

    pub fn remove_include_dir(&mut self, path: &str) -> bool {
        let before = self.include_dirs.len();
        self.include_dirs.retain(|p| p != path);
        before != self.include_dirs.len()
    }
}

/// Number of CPUs the host reports (at least 1).
pub fn max_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
        .max(1)
}

/// `min(12, cpus)`.
pub fn default_jobs() -> u32 {
    max_jobs().min(DEFAULT_JOBS_CAP)
}

/// Clamp a requested job count into `1..=max_jobs()`.
pub fn clamp_jobs(requested: u32) -> u32 {
    requested.clamp(1, max_jobs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_initial_state() {
        let sel = OptionSelection::default();
        assert!(sel.plugins.contains(Plugin::AntiBloat));
        assert_eq!(sel.plugins.len(), 1);
        assert!(sel.modes.contains(PackagingMode::Standalone));
        assert!(sel.modes.contains(PackagingMode::Onefile));
        assert!(!sel.modes.contains(PackagingMode::RemoveOutput));
        assert_eq!(sel.output_filename, "app.exe");
        assert!(sel.lto);
        assert!(!sel.mingw64);
        assert!(sel.jobs >= 1 && sel.jobs <= 12);
        assert!(sel.main_file.is_empty());
    }

    #[test]
    fn selected_iterates_in_catalog_order() {
        let mut s = Selected::new();
        s.insert(Plugin::Django);
        s.insert(Plugin::TkInter);
        s.insert(Plugin::Django);
        assert_eq!(s.len(), 2);
        let order: Vec<_> = s.in_catalog_order().collect();
        assert_eq!(order, vec![Plugin::TkInter, Plugin::Django]);
        s.remove(Plugin::TkInter);
        assert_eq!(s.in_catalog_order().collect::<Vec<_>>(), vec![Plugin::Django]);
    }

    #[test]
    fn include_dirs_are_deduplicated() {
        let mut sel = OptionSelection::empty();
        assert!(sel.add_include_dir("/a/assets"));
        assert!(sel.add_include_dir("/b/data"));
        assert!(!sel.add_include_dir("/a/assets"));
        assert_eq!(sel.include_dirs, vec!["/a/assets", "/b/data"]);
        assert!(sel.remove_include_dir("/a/assets"));
        assert!(!sel.remove_include_dir("/missing"));
    }

    #[test]
    fn jobs_clamped_to_host_range() {
        assert_eq!(clamp_jobs(0), 1);
        assert_eq!(clamp_jobs(u32::MAX), max_jobs());
        assert!(default_jobs() <= max_jobs());
    }
}
