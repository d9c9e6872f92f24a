//! Launching and deleting tasks.
//!
//! # Examples
//!
//! ```
//! use esp32_tasker::{CoreAffinity, HostKernel, StackSize, TaskPriority, Tasker};
//!
//! let tasker = Tasker::new(HostKernel::new());
//!
//! // Poll every 500 ms on the application core.
//! let started = tasker.launch(
//!   || { /* read a sensor */ },
//!   Some("poll"),
//!   500,
//!   TaskPriority::LOW,
//!   StackSize::LIGHT,
//!   CoreAffinity::Core1,
//! );
//! assert!(started);
//!
//! // Run once on whichever core is free, then go away.
//! tasker.task().name("once").launch(|| { /* flush a buffer */ });
//! ```

use log::debug;

use crate::{config::TaskDefaults, kernel::Kernel};

mod affinity;
pub use affinity::CoreAffinity;
mod builder;
pub use builder::TaskBuilder;
mod current;
pub use current::CurrentTask;
mod descriptor;
pub use descriptor::{TaskCallback, TaskDescriptor, TaskMode};
mod dispatch;
mod name;
pub use name::TaskName;
mod priority;
pub use priority::TaskPriority;
mod stack;
pub use stack::StackSize;

/// Launches periodic and one-shot tasks on a [`Kernel`].
#[derive(Clone)]
pub struct Tasker<K: Kernel> {
  kernel: K,
  defaults: TaskDefaults,
}

impl<K: Kernel> Tasker<K> {
  pub fn new(kernel: K) -> Self {
    Self::with_defaults(kernel, TaskDefaults::default())
  }

  pub fn with_defaults(kernel: K, defaults: TaskDefaults) -> Self {
    Self { kernel, defaults }
  }

  pub fn kernel(&self) -> &K {
    &self.kernel
  }

  pub fn defaults(&self) -> &TaskDefaults {
    &self.defaults
  }

  /// Prepare a builder object for a new task.
  pub fn task(&self) -> TaskBuilder<'_, 'static, K> {
    TaskBuilder::new(self)
  }

  /// Launch `callback` as a task.
  ///
  /// With `period_ms == 0` the callback runs once and the task deletes
  /// itself. Otherwise it runs every `period_ms` milliseconds, feeding the
  /// watchdog after each run, until the task is deleted.
  ///
  /// Returns `false` only if the kernel had no memory for the task.
  pub fn launch<F>(
    &self,
    callback: F,
    name: Option<&str>,
    period_ms: u32,
    priority: TaskPriority,
    stack_size: StackSize,
    core: CoreAffinity,
  ) -> bool
  where
    F: FnMut() + Send + 'static,
  {
    let builder = self.task()
      .period_ms(period_ms)
      .priority(priority)
      .stack_size(stack_size)
      .core(core);

    match name {
      Some(name) => builder.name(name).launch(callback),
      None => builder.launch(callback),
    }
  }

  /// [`launch`](Self::launch) pinned to core 0.
  pub fn launch_on_core0<F>(
    &self,
    callback: F,
    name: Option<&str>,
    period_ms: u32,
    priority: TaskPriority,
    stack_size: StackSize,
  ) -> bool
  where
    F: FnMut() + Send + 'static,
  {
    self.launch(callback, name, period_ms, priority, stack_size, CoreAffinity::Core0)
  }

  /// [`launch`](Self::launch) pinned to core 1.
  pub fn launch_on_core1<F>(
    &self,
    callback: F,
    name: Option<&str>,
    period_ms: u32,
    priority: TaskPriority,
    stack_size: StackSize,
  ) -> bool
  where
    F: FnMut() + Send + 'static,
  {
    self.launch(callback, name, period_ms, priority, stack_size, CoreAffinity::Core1)
  }

  /// Handle of the calling task, if called from inside one.
  pub fn current_task(&self) -> Option<K::Handle> {
    self.kernel.current_task()
  }

  /// Delete the task behind `handle`, or the calling task for `None`.
  ///
  /// Deleting the calling task does not return.
  ///
  /// # Panics
  ///
  /// With `None`, the kernel may panic when the caller is not a task; the
  /// host kernel does.
  pub fn delete_task(&self, handle: Option<&K::Handle>) {
    let Some(handle) = handle else {
      self.delete_current()
    };

    let name = self.kernel.task_name(handle).unwrap_or_default();
    match self.kernel.task_core(handle) {
      Some(core) => debug!("Task '{}' deleted from core id {}", name, core),
      None => debug!("Task '{}' deleted", name),
    }

    self.kernel.delete_task(handle)
  }

  /// Delete the calling task.
  ///
  /// # Panics
  ///
  /// The kernel may panic when the caller is not a task; the host kernel does.
  pub fn delete_current(&self) -> ! {
    dispatch::delete_current(&self.kernel)
  }
}
