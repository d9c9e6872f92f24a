//! Boundary to the preemptive scheduler the tasks run on.
//!
//! The tasker never schedules anything itself. It packages a task and asks a
//! [`Kernel`] to create it, and the dispatcher calls back into the kernel to
//! sleep, feed the watchdog and delete itself.

use core::fmt;

use alloc::{boxed::Box, string::String};

use crate::{
  error::TaskerError,
  task::{CoreAffinity, StackSize, TaskName, TaskPriority},
  ticks::Ticks,
};

#[cfg(feature = "std")]
pub mod host;

/// Body of a new task. It owns everything the task needs and never returns.
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;

/// A preemptive, priority based, multi-core scheduler.
pub trait Kernel: Clone + Send + Sync + 'static {
  /// Handle of a task created by this kernel.
  type Handle: Clone + fmt::Debug + PartialEq + Send;

  /// Maximum task name length including the NUL terminator (`configMAX_TASK_NAME_LEN`).
  const MAX_TASK_NAME_LEN: usize;
  /// Number of priority levels (`configMAX_PRIORITIES`).
  const MAX_PRIORITIES: u8;
  /// Length of a tick in milliseconds (`portTICK_PERIOD_MS`).
  const TICK_PERIOD_MS: u32;

  /// Create a task running `entry`.
  ///
  /// Priorities above `MAX_PRIORITIES - 1` are capped. If the task cannot be
  /// created, `entry` is dropped and nothing is left behind.
  ///
  /// # Errors
  ///
  /// [`TaskerError::CreationRejected`] when there is not enough memory for
  /// the task control block and stack.
  fn create_task(
    &self,
    entry: TaskEntry,
    name: &TaskName,
    stack_size: StackSize,
    priority: TaskPriority,
    core: CoreAffinity,
  ) -> Result<(), TaskerError>;

  /// Block the calling task for `ticks`.
  fn delay(&self, ticks: Ticks);

  /// Tell the task watchdog the calling task is alive.
  fn feed_watchdog(&self);

  /// Handle of the calling task, `None` outside of a task.
  fn current_task(&self) -> Option<Self::Handle>;

  /// Name of the given task.
  fn task_name(&self, handle: &Self::Handle) -> Option<String>;

  /// Id of the core the given task runs on.
  fn task_core(&self, handle: &Self::Handle) -> Option<u32>;

  /// Id of the core executing the caller.
  fn current_core(&self) -> u32;

  /// Delete the given task.
  fn delete_task(&self, handle: &Self::Handle);

  /// Delete the calling task.
  fn delete_current(&self) -> !;

  /// Milliseconds since boot.
  fn uptime_millis(&self) -> u64;
}
