use once_cell::sync::OnceCell;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

static INIT: OnceCell<()> = OnceCell::new();

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn log_path() -> PathBuf {
    exe_dir().join("log.txt")
}

/// Installs the global subscriber: stderr plus an append-only `log.txt` next to the exe.
/// Safe to call more than once; only the first call has any effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let console = fmt::layer().with_writer(std::io::stderr).with_filter(filter());

        // File logging is best effort; a read-only install dir still gets console output.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path())
            .ok()
            .map(|mut f| {
                let _ = writeln!(f, "===== Grammify start =====");
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(f))
                    .with_filter(filter())
            });

        let _ = tracing_subscriber::registry()
            .with(console)
            .with(file)
            .try_init();
    });
}
