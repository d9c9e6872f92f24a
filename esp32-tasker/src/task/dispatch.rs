//! Body of every launched task.

use log::debug;

use crate::kernel::Kernel;

use super::{CurrentTask, TaskDescriptor, TaskMode};

/// Run `descriptor` on the calling task. Never returns.
pub(crate) fn dispatch<K: Kernel>(kernel: K, descriptor: TaskDescriptor) -> ! {
  match descriptor.mode {
    TaskMode::OneShot => run_once(&kernel, descriptor),
    TaskMode::Periodic => run_periodic(&kernel, descriptor),
  }
}

fn run_once<K: Kernel>(kernel: &K, descriptor: TaskDescriptor) -> ! {
  // NOTE: New scope so that the descriptor is dropped before the task is deleted.
  {
    let TaskDescriptor { mut callback, .. } = descriptor;
    callback();
  }

  delete_current(kernel)
}

fn run_periodic<K: Kernel>(kernel: &K, descriptor: TaskDescriptor) -> ! {
  let interval = descriptor.interval(K::TICK_PERIOD_MS);
  let TaskDescriptor { mut callback, .. } = descriptor;
  let mut current = CurrentTask::new(kernel);

  loop {
    callback();
    current.feed_watchdog();
    current.delay(interval);
  }
}

/// Log and delete the calling task.
pub(crate) fn delete_current<K: Kernel>(kernel: &K) -> ! {
  let name = kernel.current_task()
    .and_then(|handle| kernel.task_name(&handle))
    .unwrap_or_default();
  debug!("Task '{}' deleted from core id {}", name, kernel.current_core());

  kernel.delete_current()
}
