use std::{
    fmt::Arguments,
    io::Write,
    sync::{Arc, Mutex},
};

use log::{Level, LevelFilter, Log, Metadata, Record};

const TARGET: &str = "abadmin";

/// Writes records to stderr.
pub struct SimpleLogger {
    level: LevelFilter,
}

impl SimpleLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr(),
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Keeps formatted records in memory. Handy for embedding and for asserting
/// on what a component logged.
#[derive(Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl Log for MemoryLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

struct Discard;

impl Log for Discard {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        false
    }

    fn log(&self, _record: &Record) {}

    fn flush(&self) {}
}

/// Logging handle passed to every component that logs. Nothing in this crate
/// touches the process-wide `log` logger.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Log>,
}

impl Logger {
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self { sink }
    }

    pub fn stderr(level: LevelFilter) -> Self {
        Self::new(Arc::new(SimpleLogger::new(level)))
    }

    pub fn discard() -> Self {
        Self::new(Arc::new(Discard))
    }

    pub fn log(&self, level: Level, args: Arguments<'_>) {
        let record = Record::builder()
            .level(level)
            .target(TARGET)
            .args(args)
            .build();
        if self.sink.enabled(record.metadata()) {
            self.sink.log(&record);
        }
    }

    pub fn error(&self, args: Arguments<'_>) {
        self.log(Level::Error, args)
    }

    pub fn warn(&self, args: Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    pub fn info(&self, args: Arguments<'_>) {
        self.log(Level::Info, args)
    }

    pub fn debug(&self, args: Arguments<'_>) {
        self.log(Level::Debug, args)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
