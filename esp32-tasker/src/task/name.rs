use core::fmt;
use core::ops::Deref;

use alloc::{format, string::String};

/// Task name as handed to the kernel.
///
/// `capacity` counts the NUL terminator, like `configMAX_TASK_NAME_LEN`,
/// so at most `capacity - 1` bytes survive. Longer names are truncated
/// silently at a character boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskName {
  buf: String,
}

impl TaskName {
  pub fn new(name: &str, capacity: usize) -> Self {
    let mut buf = String::with_capacity(name.len().min(capacity));

    let mut remaining = capacity;
    for c in name.chars() {
      if remaining <= c.len_utf8() {
        break
      }

      buf.push(c);
      remaining -= c.len_utf8();
    }

    Self { buf }
  }

  /// Name for a task launched without one: `task` followed by the uptime in milliseconds.
  pub fn synthesize(uptime_ms: u64, capacity: usize) -> Self {
    Self::new(&format!("task{}", uptime_ms), capacity)
  }

  pub fn as_str(&self) -> &str {
    &self.buf
  }
}

impl Deref for TaskName {
  type Target = str;

  fn deref(&self) -> &str {
    &self.buf
  }
}

impl fmt::Display for TaskName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.buf)
  }
}
