use core::fmt;

use alloc::boxed::Box;

use crate::ticks::Ticks;

/// Callback run by a launched task.
pub type TaskCallback = Box<dyn FnMut() + Send + 'static>;

/// How the dispatcher drives the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
  /// Run the callback once, then delete the task.
  OneShot,
  /// Run the callback, feed the watchdog and sleep, forever.
  Periodic,
}

impl TaskMode {
  /// A period of zero means "run exactly once".
  pub const fn for_period(period_ms: u32) -> Self {
    if period_ms == 0 { Self::OneShot } else { Self::Periodic }
  }
}

/// Everything a new task needs to run, moved into the task on creation.
///
/// Exactly one descriptor exists per task and nothing else holds a
/// reference to it.
pub struct TaskDescriptor {
  pub(crate) callback: TaskCallback,
  pub(crate) period_ms: u32,
  pub(crate) mode: TaskMode,
}

impl TaskDescriptor {
  pub fn new(callback: TaskCallback, period_ms: u32) -> Self {
    Self { callback, period_ms, mode: TaskMode::for_period(period_ms) }
  }

  /// Build a descriptor with an explicit mode, bypassing the period rule.
  pub fn with_mode(callback: TaskCallback, period_ms: u32, mode: TaskMode) -> Self {
    Self { callback, period_ms, mode }
  }

  pub fn mode(&self) -> TaskMode {
    self.mode
  }

  pub fn period_ms(&self) -> u32 {
    self.period_ms
  }

  /// Delay between two periodic runs, never shorter than one tick.
  pub fn interval(&self, tick_period_ms: u32) -> Ticks {
    Ticks::from_millis(self.period_ms.max(1), tick_period_ms).at_least_one()
  }
}

impl fmt::Debug for TaskDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskDescriptor")
      .field("period_ms", &self.period_ms)
      .field("mode", &self.mode)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_period_is_one_shot() {
    let descriptor = TaskDescriptor::new(Box::new(|| {}), 0);
    assert_eq!(descriptor.mode(), TaskMode::OneShot);

    let descriptor = TaskDescriptor::new(Box::new(|| {}), 500);
    assert_eq!(descriptor.mode(), TaskMode::Periodic);
  }

  #[test]
  fn interval_is_floored_to_one_tick() {
    let descriptor = TaskDescriptor::with_mode(Box::new(|| {}), 0, TaskMode::Periodic);
    assert_eq!(descriptor.interval(1), Ticks::ONE);
    assert_eq!(descriptor.interval(10), Ticks::ONE);

    let descriptor = TaskDescriptor::new(Box::new(|| {}), 500);
    assert_eq!(descriptor.interval(10), Ticks::new(50));
  }
}
