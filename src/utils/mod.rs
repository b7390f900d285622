//! Utilities: logging setup (verbosity flags -> tracing filter) and the
//! onefile temp-dir spec generator.
//!
//! Key items:
//!   init_logging / derive_level
//!   tempdir::generate_spec

/// Logging helpers.
pub mod logging {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::EnvFilter;

    /// Map `-v` count and `--quiet` to a level.
    ///
    /// quiet -> error, 0 -> info, 1 -> debug, 2+ -> trace.
    pub fn derive_level(verbose: u8, quiet: bool) -> LevelFilter {
        if quiet {
            return LevelFilter::ERROR;
        }
        match verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Install the global subscriber. Logs go to stderr so stdout stays
    /// usable for the rendered command and JSON output. `RUST_LOG` wins over
    /// the flag-derived level when set.
    pub fn init_logging(level: LevelFilter) {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

/// Onefile temp directory spec generation.
pub mod tempdir {
    use anyhow::{Result, bail};
    use chrono::{DateTime, Local, TimeZone};
    use std::path::Path;

    /// `{TEMP}/<YYYYmmdd_HHMMSS>_<main file stem>` using the local clock.
    pub fn generate_spec(main_file: &str) -> Result<String> {
        spec_at(main_file, &Local::now())
    }

    pub fn spec_at<Tz: TimeZone>(main_file: &str, at: &DateTime<Tz>) -> Result<String>
    where
        Tz::Offset: std::fmt::Display,
    {
        let main = main_file.trim();
        if main.is_empty() {
            bail!("choose a main file before generating a temp dir spec");
        }
        let stem = Path::new(main)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string());
        Ok(format!("{{TEMP}}/{}_{stem}", at.format("%Y%m%d_%H%M%S")))
    }
}
