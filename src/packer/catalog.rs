//! Option catalogs: the fixed vocabularies a selection is drawn from.
//!
//! Each catalog is an enum whose `ALL` slice is its declaration order. That
//! order drives token emission in the builder and row order when a catalog is
//! rendered, so both always see the same label set.

use std::fmt;

/// Static description of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Short machine name (also the CLI value)
    pub key: &'static str,
    /// Human-readable label
    pub label: &'static str,
    /// Exact command-line fragment emitted when selected
    pub flag: &'static str,
    pub help: &'static str,
}

/// Common surface of the four catalogs.
pub trait CatalogEntry: Copy + Eq + fmt::Debug + 'static {
    /// Every entry, in declaration order.
    const ALL: &'static [Self];

    fn descriptor(self) -> Descriptor;

    fn label(self) -> &'static str {
        self.descriptor().label
    }

    fn flag(self) -> &'static str {
        self.descriptor().flag
    }

    fn help(self) -> &'static str {
        self.descriptor().help
    }

    /// Resolve a free-form name (key, label or flag, case-insensitive).
    ///
    /// This is the external boundary (preset files); unknown names yield
    /// `None` and are expected to be skipped by the caller.
    fn from_label(raw: &str) -> Option<Self> {
        let needle = raw.trim();
        if needle.is_empty() {
            return None;
        }
        Self::ALL.iter().copied().find(|e| {
            let d = e.descriptor();
            d.key.eq_ignore_ascii_case(needle)
                || d.label.eq_ignore_ascii_case(needle)
                || d.flag.eq_ignore_ascii_case(needle)
        })
    }
}

/* ---- Plugins ---- */

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Plugin {
    AntiBloat,
    TkInter,
    #[value(name = "pyside6")]
    PySide6,
    #[value(name = "pyqt6")]
    PyQt6,
    Numpy,
    Pandas,
    Matplotlib,
    Django,
    Multiprocessing,
}

impl CatalogEntry for Plugin {
    const ALL: &'static [Self] = &[
        Plugin::AntiBloat,
        Plugin::TkInter,
        Plugin::PySide6,
        Plugin::PyQt6,
        Plugin::Numpy,
        Plugin::Pandas,
        Plugin::Matplotlib,
        Plugin::Django,
        Plugin::Multiprocessing,
    ];

    fn descriptor(self) -> Descriptor {
        match self {
            Plugin::AntiBloat => Descriptor {
                key: "anti-bloat",
                label: "Reduce size",
                flag: "--enable-plugin=anti-bloat",
                help: "Strip unneeded stdlib modules and dependencies to shrink the executable",
            },
            Plugin::TkInter => Descriptor {
                key: "tk-inter",
                label: "Tkinter support",
                flag: "--enable-plugin=tk-inter",
                help: "Enable the Tkinter plugin",
            },
            Plugin::PySide6 => Descriptor {
                key: "pyside6",
                label: "PySide6 support",
                flag: "--enable-plugin=pyside6",
                help: "Enable the PySide6 plugin",
            },
            Plugin::PyQt6 => Descriptor {
                key: "pyqt6",
                label: "PyQt6 support",
                flag: "--enable-plugin=pyqt6",
                help: "Enable the PyQt6 plugin",
            },
            Plugin::Numpy => Descriptor {
                key: "numpy",
                label: "Numpy support",
                flag: "--enable-plugin=numpy",
                help: "Optimized packaging support for Numpy",
            },
            Plugin::Pandas => Descriptor {
                key: "pandas",
                label: "Pandas support",
                flag: "--enable-plugin=pandas",
                help: "Optimized packaging support for Pandas",
            },
            Plugin::Matplotlib => Descriptor {
                key: "matplotlib",
                label: "Matplotlib support",
                flag: "--enable-plugin=matplotlib",
                help: "Optimized packaging support for Matplotlib",
            },
            Plugin::Django => Descriptor {
                key: "django",
                label: "Django support",
                flag: "--enable-plugin=django",
                help: "Plugin support for the Django web framework",
            },
            Plugin::Multiprocessing => Descriptor {
                key: "multiprocessing",
                label: "Multiprocessing support",
                flag: "--enable-plugin=multiprocessing",
                help: "Support multiprocessing related modules",
            },
        }
    }
}

/* ---- Packaging modes ---- */

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PackagingMode {
    Standalone,
    Onefile,
    RemoveOutput,
    #[value(name = "disable-console")]
    DisableConsole,
}

impl CatalogEntry for PackagingMode {
    const ALL: &'static [Self] = &[
        PackagingMode::Standalone,
        PackagingMode::Onefile,
        PackagingMode::RemoveOutput,
        PackagingMode::DisableConsole,
    ];

    fn descriptor(self) -> Descriptor {
        match self {
            PackagingMode::Standalone => Descriptor {
                key: "standalone",
                label: "Standalone",
                flag: "--standalone",
                help: "Bundle every dependency into the output directory",
            },
            PackagingMode::Onefile => Descriptor {
                key: "onefile",
                label: "Single file",
                flag: "--onefile",
                help: "Produce a single executable that unpacks itself at startup",
            },
            PackagingMode::RemoveOutput => Descriptor {
                key: "remove-output",
                label: "Remove build output",
                flag: "--remove-output",
                help: "Delete intermediate build directories after packaging",
            },
            PackagingMode::DisableConsole => Descriptor {
                key: "disable-console",
                label: "Disable console",
                flag: "--windows-disable-console",
                help: "Hide the console window (recommended for GUI programs)",
            },
        }
    }
}

/* ---- Interpreter flags ---- */

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PythonFlag {
    #[value(name = "no_asserts", alias = "no-asserts")]
    NoAsserts,
    #[value(name = "static_hashes", alias = "static-hashes")]
    StaticHashes,
}

impl CatalogEntry for PythonFlag {
    const ALL: &'static [Self] = &[PythonFlag::NoAsserts, PythonFlag::StaticHashes];

    fn descriptor(self) -> Descriptor {
        match self {
            PythonFlag::NoAsserts => Descriptor {
                key: "no_asserts",
                label: "Disable asserts",
                flag: "--python-flag=no_asserts",
                help: "Drop assert statements for faster execution",
            },
            PythonFlag::StaticHashes => Descriptor {
                key: "static_hashes",
                label: "Static hashes",
                flag: "--python-flag=static_hashes",
                help: "Use static hashing so hash values stay stable",
            },
        }
    }
}

/* ---- Exclusion rules ---- */

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ExcludeRule {
    Setuptools,
    Pydoc,
    #[value(name = "ipython")]
    IPython,
}

impl CatalogEntry for ExcludeRule {
    const ALL: &'static [Self] = &[
        ExcludeRule::Setuptools,
        ExcludeRule::Pydoc,
        ExcludeRule::IPython,
    ];

    fn descriptor(self) -> Descriptor {
        match self {
            ExcludeRule::Setuptools => Descriptor {
                key: "setuptools",
                label: "Exclude setuptools",
                flag: "--noinclude-setuptools-mode=error",
                help: "Exclude setuptools to avoid pulling in unused dependencies",
            },
            ExcludeRule::Pydoc => Descriptor {
                key: "pydoc",
                label: "Exclude pydoc",
                flag: "--noinclude-pydoc-mode=warning",
                help: "Exclude pydoc to reduce size",
            },
            ExcludeRule::IPython => Descriptor {
                key: "ipython",
                label: "Exclude IPython",
                flag: "--noinclude-IPython-mode=error",
                help: "Exclude IPython to avoid extra dependencies",
            },
        }
    }
}

/* ---- Catalog kinds ---- */

/// The four catalogs, addressable as a whole (used for listing).
#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CatalogKind {
    Plugins,
    Modes,
    PythonFlags,
    Excludes,
}

impl CatalogKind {
    /// All kinds, in the order their tokens appear in a command line.
    pub const fn variants() -> &'static [CatalogKind] {
        &[
            CatalogKind::Plugins,
            CatalogKind::Modes,
            CatalogKind::PythonFlags,
            CatalogKind::Excludes,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            CatalogKind::Plugins => "Plugins",
            CatalogKind::Modes => "Packaging modes",
            CatalogKind::PythonFlags => "Python flags",
            CatalogKind::Excludes => "Exclusions",
        }
    }

    /// Descriptors of every entry in this catalog, declaration order.
    pub fn descriptors(&self) -> Vec<Descriptor> {
        match self {
            CatalogKind::Plugins => descriptors_of::<Plugin>(),
            CatalogKind::Modes => descriptors_of::<PackagingMode>(),
            CatalogKind::PythonFlags => descriptors_of::<PythonFlag>(),
            CatalogKind::Excludes => descriptors_of::<ExcludeRule>(),
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CatalogKind::Plugins => "plugins",
            CatalogKind::Modes => "modes",
            CatalogKind::PythonFlags => "python-flags",
            CatalogKind::Excludes => "excludes",
        };
        f.write_str(s)
    }
}

fn descriptors_of<E: CatalogEntry>() -> Vec<Descriptor> {
    E::ALL.iter().map(|e| e.descriptor()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn from_label_accepts_key_label_and_flag() {
        assert_eq!(Plugin::from_label("anti-bloat"), Some(Plugin::AntiBloat));
        assert_eq!(Plugin::from_label(" pyside6 SUPPORT "), Some(Plugin::PySide6));
        assert_eq!(
            PackagingMode::from_label("--windows-disable-console"),
            Some(PackagingMode::DisableConsole)
        );
        assert_eq!(Plugin::from_label("cython"), None);
        assert_eq!(ExcludeRule::from_label(""), None);
    }

    #[test]
    fn value_names_match_descriptor_keys() {
        fn check<E: CatalogEntry + ValueEnum>() {
            for e in E::ALL {
                let pv = e.to_possible_value().unwrap();
                assert_eq!(pv.get_name(), e.descriptor().key);
            }
        }
        check::<Plugin>();
        check::<PackagingMode>();
        check::<PythonFlag>();
        check::<ExcludeRule>();
    }

    #[test]
    fn all_slices_cover_every_variant() {
        assert_eq!(Plugin::ALL.len(), Plugin::value_variants().len());
        assert_eq!(PackagingMode::ALL.len(), PackagingMode::value_variants().len());
        assert_eq!(PythonFlag::ALL.len(), PythonFlag::value_variants().len());
        assert_eq!(ExcludeRule::ALL.len(), ExcludeRule::value_variants().len());
    }

    #[test]
    fn every_descriptor_is_complete_and_unique() {
        for kind in CatalogKind::variants() {
            let descriptors = kind.descriptors();
            let mut keys: Vec<_> = descriptors.iter().map(|d| d.key).collect();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), descriptors.len(), "{kind}");
            for d in &descriptors {
                assert!(!d.label.is_empty() && !d.help.is_empty(), "{d:?}");
                assert!(d.flag.starts_with("--"), "{d:?}");
            }
        }
    }

    #[test]
    fn plugin_flags_follow_enable_plugin_template() {
        for p in Plugin::ALL {
            let d = p.descriptor();
            assert_eq!(d.flag, format!("--enable-plugin={}", d.key));
        }
    }

    #[test]
    fn kind_descriptors_preserve_declaration_order() {
        let keys: Vec<_> = CatalogKind::Modes
            .descriptors()
            .iter()
            .map(|d| d.key)
            .collect();
        assert_eq!(
            keys,
            vec!["standalone", "onefile", "remove-output", "disable-console"]
        );
        assert_eq!(CatalogKind::PythonFlags.to_string(), "python-flags");
    }
}
