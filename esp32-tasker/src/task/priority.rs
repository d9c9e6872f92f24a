use core::fmt;

/// Task execution priority.
///
/// Low priority numbers denote low priority tasks. The kernel silently caps
/// priorities at `MAX_PRIORITIES - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskPriority {
  priority: u8,
}

impl TaskPriority {
  /// Priority of the kernel idle task (`tskIDLE_PRIORITY`).
  pub const IDLE: Self = Self::new(0);
  pub const LOW: Self = Self::new(1);
  pub const NORMAL: Self = Self::new(2);
  pub const HIGH: Self = Self::new(3);
  pub const HIGHER: Self = Self::new(4);
  pub const HIGHEST: Self = Self::new(5);

  /// Create a new `TaskPriority`.
  pub const fn new(priority: u8) -> Self {
    Self { priority }
  }

  /// Cap this priority to the highest one a kernel with `max_priorities` levels accepts.
  pub const fn capped(self, max_priorities: u8) -> Self {
    let highest = max_priorities.saturating_sub(1);
    if self.priority > highest {
      return Self::new(highest)
    }

    self
  }

  pub const fn get(&self) -> u8 {
    self.priority
  }
}

impl Default for TaskPriority {
  fn default() -> Self {
    Self::IDLE
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.priority.fmt(f)
  }
}

impl From<u8> for TaskPriority {
  fn from(priority: u8) -> Self {
    Self::new(priority)
  }
}
