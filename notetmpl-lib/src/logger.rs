//! Appends log records to the diagnostics file in the host's profile
//! directory. Logging never fails the caller: I/O errors are dropped.
use crate::config::LOG_FILENAME;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub struct AppLogger {
    /// `<profile dir>/templates-logs.txt`
    logs_file: PathBuf,
    /// Records above this level are discarded.
    level: LevelFilter,
    /// Serializes writers, so that records do not interleave.
    lock: Mutex<()>,
}

impl AppLogger {
    pub fn new(profile_dir: &Path, level: LevelFilter) -> Self {
        Self {
            logs_file: profile_dir.join(LOG_FILENAME),
            level,
            lock: Mutex::new(()),
        }
    }

    /// Installs the logger for the `log` facade. Records above `level` are
    /// discarded.
    pub fn init(profile_dir: &Path, level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger: &'static AppLogger = Box::leak(Box::new(AppLogger::new(profile_dir, level)));
        log::set_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    pub fn logs_file(&self) -> &Path {
        &self.logs_file
    }

    /// One record: timestamp line, message, two empty lines.
    fn format_record(now: OffsetDateTime, record: &Record<'_>) -> String {
        let timestamp = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());
        format!("[{}]\n{}: {}\n\n\n", timestamp, record.level(), record.args())
    }
}

impl log::Log for AppLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = Self::format_record(OffsetDateTime::now_utc(), record);
        let _guard = self.lock.lock();
        // Best effort.
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.logs_file)
        {
            let _ = file.write_all(entry.as_bytes());
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log};
    use std::fs;
    use time::macros::datetime;

    #[test]
    fn test_format_record() {
        let entry = AppLogger::format_record(
            datetime!(2021-08-12 17:04:54 UTC),
            &Record::builder()
                .level(Level::Error)
                .args(format_args!("Something broke"))
                .build(),
        );
        assert_eq!(entry, "[2021-08-12T17:04:54Z]\nERROR: Something broke\n\n\n");
    }

    #[test]
    fn test_appends() {
        let dir = std::env::temp_dir().join(format!("notetmpl-logger-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let logger = AppLogger::new(&dir, LevelFilter::Warn);
        let _ = fs::remove_file(logger.logs_file());

        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("filtered"))
                .build(),
        );
        for msg in ["first", "second"] {
            logger.log(
                &Record::builder()
                    .level(Level::Error)
                    .args(format_args!("{msg}"))
                    .build(),
            );
        }
        let written = fs::read_to_string(logger.logs_file()).unwrap();
        assert_eq!(written.matches("\n\n\n").count(), 2);
        assert!(written.contains("ERROR: first\n"));
        assert!(!written.contains("filtered"));
        assert!(written.find("first") < written.find("second"));
        fs::remove_dir_all(&dir).unwrap();

        // A missing directory is no error.
        logger.log(&Record::builder().level(Level::Error).args(format_args!("lost")).build());
    }
}
