use embedded_hal::blocking::delay::DelayMs;

use crate::kernel::Kernel;
use crate::ticks::Ticks;

/// The task that is currently executing, as seen from inside its body.
pub struct CurrentTask<'k, K: Kernel> {
  kernel: &'k K,
}

impl<'k, K: Kernel> CurrentTask<'k, K> {
  pub fn new(kernel: &'k K) -> Self {
    Self { kernel }
  }

  /// Delay the execution of the current task.
  pub fn delay(&mut self, delay: impl Into<Ticks>) {
    self.kernel.delay(delay.into())
  }

  /// Signal the task watchdog that this task is still alive.
  pub fn feed_watchdog(&mut self) {
    self.kernel.feed_watchdog()
  }
}

/// Delays are rounded down to whole ticks, but any nonzero delay blocks for
/// at least one tick.
impl<K: Kernel> DelayMs<u32> for CurrentTask<'_, K> {
  fn delay_ms(&mut self, ms: u32) {
    let ticks = Ticks::from_millis(ms, K::TICK_PERIOD_MS);
    self.delay(if ms == 0 { ticks } else { ticks.at_least_one() })
  }
}

impl<K: Kernel> DelayMs<u16> for CurrentTask<'_, K> {
  fn delay_ms(&mut self, ms: u16) {
    DelayMs::<u32>::delay_ms(self, u32::from(ms))
  }
}

#[cfg(all(test, feature = "std"))]
mod tests {
  use super::*;

  use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
  };

  use crate::kernel::host::{HostKernel, TaskState};
  use crate::task::{CoreAffinity, StackSize, TaskName, TaskPriority};

  #[test]
  fn delay_ms_blocks_the_task() {
    let kernel = HostKernel::new();
    let k = kernel.clone();
    let (tx, rx) = mpsc::channel();
    let name = TaskName::new("sleepy", HostKernel::MAX_TASK_NAME_LEN);

    kernel.create_task(Box::new(move || {
      let mut current = CurrentTask::new(&k);
      let start = Instant::now();
      DelayMs::<u32>::delay_ms(&mut current, 200);
      DelayMs::<u16>::delay_ms(&mut current, 20);
      tx.send(start.elapsed()).unwrap();
      k.delete_current()
    }), &name, StackSize::LIGHT, TaskPriority::LOW, CoreAffinity::Core0).unwrap();

    let deadline = Instant::now() + Duration::from_millis(150);
    let mut blocked = false;
    while !blocked && Instant::now() < deadline {
      blocked = kernel.task("sleepy").map(|t| t.state) == Some(TaskState::Blocked);
      thread::sleep(Duration::from_millis(2));
    }
    assert!(blocked);

    let elapsed = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(elapsed >= Duration::from_millis(220));
    assert!(elapsed < Duration::from_secs(2));
  }
}
