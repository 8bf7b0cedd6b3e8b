//! Dump Logging
//!
//! Session-level events for dumps and walks, useful for:
//! - Correlating a dump file with the session that wrote it
//! - Spotting failed or truncated dumps
//!
//! Events are kept in memory and forwarded to the `log` facade, either as
//! human-readable lines or as JSON objects.
//!
//! Log Levels:
//! - ERROR: Dump failures
//! - INFO: Session start/end, walk summaries
//! - DEBUG: Batch progress

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Log level for dump events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Dump event types
#[derive(Debug, Clone, PartialEq)]
pub enum DumpEvent {
    /// Dump session started
    SessionStart { session: u64, mode: String },

    /// Dump session finished; `roots` counts the roots actually processed
    SessionEnd {
        session: u64,
        roots: usize,
        records: u64,
        bytes_written: u64,
        duration_ms: f64,
    },

    /// Dump session aborted
    DumpFailed { session: u64, error: String },

    /// One batch of a multi-object dump finished
    BatchProgress { session: u64, objects: usize },

    /// Reachability walk summary
    WalkSummary {
        walk: String,
        objects: usize,
        total_size: u64,
    },
}

/// Dump logger configuration
#[derive(Debug, Clone)]
pub struct DumpLoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Forward events to the `log` facade
    pub console: bool,

    /// Enable JSON format
    pub json: bool,

    /// Enable timestamps
    pub timestamps: bool,
}

impl Default for DumpLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
            json: false,
            timestamps: true,
        }
    }
}

/// Dump logger - keeps an event history and forwards formatted lines
pub struct DumpLogger {
    config: DumpLoggerConfig,
    events: Mutex<Vec<(Instant, DumpEvent)>>,
    enabled: AtomicBool,
}

impl DumpLogger {
    /// Create new dump logger
    pub fn new(config: DumpLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log a dump event
    pub fn log(&self, event: DumpEvent) {
        if !self.is_enabled() {
            return;
        }

        let event_level = self.event_level(&event);
        if event_level > self.config.level {
            return;
        }

        if self.config.console {
            self.output(event_level, &event);
        }

        if let Ok(mut events) = self.events.lock() {
            events.push((Instant::now(), event));
        }
    }

    /// Get log level for event
    fn event_level(&self, event: &DumpEvent) -> LogLevel {
        match event {
            DumpEvent::DumpFailed { .. } => LogLevel::Error,
            DumpEvent::SessionStart { .. }
            | DumpEvent::SessionEnd { .. }
            | DumpEvent::WalkSummary { .. } => LogLevel::Info,
            DumpEvent::BatchProgress { .. } => LogLevel::Debug,
        }
    }

    fn output(&self, level: LogLevel, event: &DumpEvent) {
        let body = if self.config.json {
            self.format_json(event)
        } else {
            self.format_human(event)
        };

        if self.config.timestamps {
            let now = chrono::Local::now();
            log::log!(target: "heapgraph", level.into(), "[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), body);
        } else {
            log::log!(target: "heapgraph", level.into(), "{}", body);
        }
    }

    /// Format in human-readable form
    fn format_human(&self, event: &DumpEvent) -> String {
        match event {
            DumpEvent::SessionStart { session, mode } => {
                format!("[dump] Session {} started (recursion: {})", session, mode)
            }
            DumpEvent::SessionEnd {
                session,
                roots,
                records,
                bytes_written,
                duration_ms,
            } => format!(
                "[dump] Session {} completed ({} roots, {} records, {} bytes, {:.2}ms)",
                session, roots, records, bytes_written, duration_ms
            ),
            DumpEvent::DumpFailed { session, error } => {
                format!("[dump] Session {} failed: {}", session, error)
            }
            DumpEvent::BatchProgress { session, objects } => {
                format!("[dump] Session {}: {} objects processed", session, objects)
            }
            DumpEvent::WalkSummary {
                walk,
                objects,
                total_size,
            } => format!(
                "[walk] {}: {} objects, {} bytes",
                walk, objects, total_size
            ),
        }
    }

    /// Format as a JSON object
    fn format_json(&self, event: &DumpEvent) -> String {
        let json = match event {
            DumpEvent::SessionStart { session, mode } => serde_json::json!({
                "type": "session_start",
                "session": session,
                "mode": mode
            }),
            DumpEvent::SessionEnd {
                session,
                roots,
                records,
                bytes_written,
                duration_ms,
            } => serde_json::json!({
                "type": "session_end",
                "session": session,
                "roots": roots,
                "records": records,
                "bytes_written": bytes_written,
                "duration_ms": duration_ms
            }),
            DumpEvent::DumpFailed { session, error } => serde_json::json!({
                "type": "dump_failed",
                "session": session,
                "error": error
            }),
            DumpEvent::BatchProgress { session, objects } => serde_json::json!({
                "type": "batch_progress",
                "session": session,
                "objects": objects
            }),
            DumpEvent::WalkSummary {
                walk,
                objects,
                total_size,
            } => serde_json::json!({
                "type": "walk_summary",
                "walk": walk,
                "objects": objects,
                "total_size": total_size
            }),
        };

        json.to_string()
    }

    /// Get all events
    pub fn get_events(&self) -> Vec<(Instant, DumpEvent)> {
        if let Ok(events) = self.events.lock() {
            events.clone()
        } else {
            Vec::new()
        }
    }

    /// Clear all events
    pub fn clear_events(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        if let Ok(events) = self.events.lock() {
            events.len()
        } else {
            0
        }
    }
}

impl Default for DumpLogger {
    fn default() -> Self {
        Self::new(DumpLoggerConfig::default())
    }
}

/// Global dump logger
lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<DumpLogger> = Mutex::new(DumpLogger::default());
}

/// Log a dump event to global logger
pub fn log_event(event: DumpEvent) {
    if let Ok(logger) = GLOBAL_LOGGER.lock() {
        logger.log(event);
    }
}

/// Configure global logger
pub fn configure_logger(config: DumpLoggerConfig) {
    if let Ok(mut logger) = GLOBAL_LOGGER.lock() {
        *logger = DumpLogger::new(config);
    }
}

/// Snapshot of the global logger's event history
pub fn get_events() -> Vec<(Instant, DumpEvent)> {
    if let Ok(logger) = GLOBAL_LOGGER.lock() {
        logger.get_events()
    } else {
        Vec::new()
    }
}

/// Get global logger event count
pub fn get_event_count() -> usize {
    if let Ok(logger) = GLOBAL_LOGGER.lock() {
        logger.event_count()
    } else {
        0
    }
}
