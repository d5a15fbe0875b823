//! Logging setup with indicatif integration
//!
//! Stage runners and per-item workers log from many threads at once, so the
//! non-TTY format carries the thread name at debug level.

use indicatif::MultiProgress;

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Name of the calling thread, or `-` for unnamed threads
fn thread_label() -> String {
    std::thread::current().name().unwrap_or("-").to_string()
}

/// Render one log line. Debug and trace lines include the thread name.
fn render(record: &log::Record, color: bool) -> String {
    let (pre, label, post) = level_style(record.level(), color);
    if record.level() >= log::Level::Debug {
        format!("[{pre}{label}{post}] {}: {}", thread_label(), record.args())
    } else {
        format!("[{pre}{label}{post}] {}", record.args())
    }
}

/// Logger that prints through indicatif MultiProgress to avoid mixing with stage lines.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            // only installed in TTY mode, so always colored
            let line = render(record, true);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Level filter used when `RUST_LOG` is unset
fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initialize logging with optional TTY mode (indicatif integration).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_level(quiet, debug));

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env).build();
        let max_level = logger.filter();
        if log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone()))).is_ok() {
            log::set_max_level(max_level);
        }
    } else {
        // Non-TTY: no ANSI colors
        let _ = env_logger::Builder::from_env(env)
            .format(|buf, record| writeln!(buf, "{}", render(record, false)))
            .try_init();
    }
}
