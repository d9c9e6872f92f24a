//! Logger that keeps every record so tests can look for them.

use std::sync::{Mutex, Once, PoisonError};

use log::{Level, LevelFilter, Log, Metadata, Record};

static RECORDS: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
  fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
    true
  }

  fn log(&self, record: &Record<'_>) {
    let line = record.args().to_string();
    RECORDS.lock().unwrap_or_else(PoisonError::into_inner).push((record.level(), line));
  }

  fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

pub(crate) fn init() {
  static INIT: Once = Once::new();

  INIT.call_once(|| {
    if log::set_logger(&LOGGER).is_ok() {
      log::set_max_level(LevelFilter::Trace);
    }
  });
}

/// Records whose message contains `needle`.
pub(crate) fn records_mentioning(needle: &str) -> Vec<(Level, String)> {
  RECORDS.lock()
    .unwrap_or_else(PoisonError::into_inner)
    .iter()
    .filter(|(_, line)| line.contains(needle))
    .cloned()
    .collect()
}
