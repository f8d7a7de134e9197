use crate::config::{AppConfig, Section};
use std::io::IsTerminal;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// ================= level helpers =================

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

// ================= rotating writer for files =================

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendCount>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriterHandle;
    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.0.clone())
    }
}

#[derive(Clone)]
struct RotWriterHandle(Arc<Mutex<FileRotate<AppendCount>>>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

// ================= path helpers =================

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn create_rotating_writer(section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }

    let log_path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = log_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!(
                "Failed to initialize log file '{}': {e}",
                log_path.to_string_lossy()
            );
            return None;
        }
    }

    let max_bytes = section.max_size_mb.unwrap_or(100) as usize * 1024 * 1024;

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(section.max_backups.unwrap_or(3)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    );

    Some(RotWriter(Arc::new(Mutex::new(rot))))
}

// ================= public init =================

/// Initialize console (and optional file) logging from the application config.
///
/// Levels come from the "default" logging section; `RUST_LOG`, when set, acts
/// as a global upper bound. Relative log paths resolve under `base_dir`.
/// Later calls are no-ops once a subscriber is installed.
pub fn init_logging(cfg: &AppConfig, base_dir: &Path) {
    let section = cfg.logging.as_ref().and_then(|l| l.get("default"));

    let console_filter = section
        .and_then(|s| parse_tracing_level(&s.console_level))
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::INFO);

    // RUST_LOG acts as a global upper-bound for console/file if present.
    let env: Option<EnvFilter> = EnvFilter::try_from_default_env().ok();

    let console_layer = fmt::layer()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_filter(console_filter);

    // File fmt layer (JSON) if the default section names a file
    let file_layer = section.and_then(|s| {
        let writer = create_rotating_writer(s, base_dir)?;
        let level = parse_tracing_level(if s.file_level.trim().is_empty() {
            &s.console_level
        } else {
            &s.file_level
        })
        .map(LevelFilter::from_level)?;
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_writer(writer)
                .with_filter(level),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(env)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn section(file: &str) -> Section {
        Section {
            console_level: "info".to_string(),
            file: file.to_string(),
            file_level: String::new(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn parse_level_known_values() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        // Unrecognized values fall back to info rather than silencing logs
        assert_eq!(parse_tracing_level("loud"), Some(Level::INFO));
    }

    #[test]
    fn relative_log_path_resolves_under_base_dir() {
        let resolved = resolve_log_path("logs/app.log", Path::new("/srv/wikikit"));
        assert_eq!(resolved, PathBuf::from("/srv/wikikit/logs/app.log"));

        let absolute = resolve_log_path("/var/log/wikikit.log", Path::new("/srv/wikikit"));
        assert_eq!(absolute, PathBuf::from("/var/log/wikikit.log"));
    }

    #[test]
    fn empty_file_disables_file_writer() {
        let tmp = tempdir().unwrap();
        assert!(create_rotating_writer(&section(""), tmp.path()).is_none());
        assert!(create_rotating_writer(&section("   "), tmp.path()).is_none());
    }

    #[test]
    fn file_writer_creates_parent_dirs() {
        let tmp = tempdir().unwrap();
        let writer = create_rotating_writer(&section("logs/nested/app.log"), tmp.path());
        assert!(writer.is_some());
        assert!(tmp.path().join("logs/nested").is_dir());
        // not calling init_logging to avoid global subscriber side effects in tests
    }
}
