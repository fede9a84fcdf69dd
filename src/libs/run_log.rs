// The structured, append-only run log (`~/.chs-onboard/run.log`).
//
// Every record is one JSON object per line (see `schemas::log_record`).
// The main pipeline and the sudo keepalive thread both write here, so the
// sink and the current phase name sit behind a single mutex. Each record
// is also echoed to the console through the `log_*!` macros.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::libs::utilities::timestamps::current_timestamp;
use crate::schemas::log_record::{Fields, Level, LogRecord};
use crate::{log_error, log_info, log_warn};

struct LogInner {
    sink: Option<Box<dyn Write + Send>>,
    phase: String,
}

pub struct RunLog {
    inner: Mutex<LogInner>,
}

impl RunLog {
    /// Opens (creating if needed) the log file in append mode and writes the
    /// session-start record.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let log = Self::from_writer(Box::new(file));
        log.info("session_start", "chs-onboard started");
        Ok(log)
    }

    /// Log backed by an arbitrary writer.
    pub fn from_writer(sink: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Mutex::new(LogInner {
                sink: Some(sink),
                phase: String::new(),
            }),
        }
    }

    /// Console-only log; nothing is persisted.
    #[cfg(test)]
    pub fn console_only() -> Self {
        Self {
            inner: Mutex::new(LogInner {
                sink: None,
                phase: String::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        // A panic while holding the lock leaves the data usable; keep logging.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_phase(&self, phase: &str) {
        self.lock().phase = phase.to_string();
    }

    #[cfg(test)]
    pub fn phase(&self) -> String {
        self.lock().phase.clone()
    }

    fn write(&self, level: Level, step: &str, msg: &str, fields: Fields) {
        let mut inner = self.lock();
        let record = LogRecord {
            ts: current_timestamp(),
            level,
            phase: inner.phase.clone(),
            step: step.to_string(),
            msg: msg.to_string(),
            fields,
        };
        if let Some(sink) = inner.sink.as_mut() {
            // A log write failure must never take the run down with it.
            if let Ok(line) = serde_json::to_string(&record) {
                let _ = writeln!(sink, "{line}").and_then(|_| sink.flush());
            }
        }
    }

    pub fn info(&self, step: &str, msg: &str) {
        self.info_with(step, msg, Fields::new());
    }

    pub fn info_with(&self, step: &str, msg: &str, fields: Fields) {
        self.write(Level::Info, step, msg, fields);
        log_info!("{}", msg);
    }

    pub fn warn(&self, step: &str, msg: &str) {
        self.warn_with(step, msg, Fields::new());
    }

    pub fn warn_with(&self, step: &str, msg: &str, fields: Fields) {
        self.write(Level::Warn, step, msg, fields);
        log_warn!("{}", msg);
    }

    pub fn error_with(&self, step: &str, msg: &str, fields: Fields) {
        self.write(Level::Error, step, msg, fields);
        log_error!("{}", msg);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schemas::log_record::fields;
    use std::sync::Arc;
    use std::thread;

    /// Shared in-memory sink so tests can read back what was written.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        pub(crate) fn records(&self) -> Vec<LogRecord> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    #[test]
    fn records_carry_phase_step_and_fields() {
        let buffer = SharedBuffer::default();
        let log = RunLog::from_writer(Box::new(buffer.clone()));
        log.set_phase("phase1");
        log.info_with("homebrew", "command ok", fields(&[("cmd", "brew install jq")]));
        log.set_phase("phase3");
        log.warn("net_check", "public internet unreachable");

        let records = buffer.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phase, "phase1");
        assert_eq!(records[0].step, "homebrew");
        assert_eq!(records[0].level, Level::Info);
        assert_eq!(records[0].fields.get("cmd").map(String::as_str), Some("brew install jq"));
        assert_eq!(records[1].phase, "phase3");
        assert_eq!(records[1].level, Level::Warn);
        assert!(records[1].fields.is_empty());
    }

    #[test]
    fn empty_phase_and_fields_are_omitted() {
        let buffer = SharedBuffer::default();
        let log = RunLog::from_writer(Box::new(buffer.clone()));
        log.error_with("", "boom", Fields::new());
        let raw = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(!raw.contains("\"phase\""));
        assert!(!raw.contains("\"fields\""));
        assert!(raw.contains("\"level\":\"ERROR\""));
    }

    #[test]
    fn concurrent_writers_produce_whole_lines() {
        let buffer = SharedBuffer::default();
        let log = Arc::new(RunLog::from_writer(Box::new(buffer.clone())));
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..25 {
                        log.info(&format!("writer{n}"), &format!("message {i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(buffer.records().len(), 100);
    }

    #[test]
    fn open_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.log");
        drop(RunLog::open(&path).unwrap());
        let log = RunLog::open(&path).unwrap();
        log.info("done", "completed successfully");
        let lines = fs::read_to_string(&path).unwrap();
        assert_eq!(lines.lines().count(), 3);
    }
}
