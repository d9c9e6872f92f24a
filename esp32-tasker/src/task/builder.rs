use core::fmt;
use core::time::Duration;

use alloc::boxed::Box;

use log::{debug, warn};

use crate::{
  error::TaskerError,
  kernel::{Kernel, TaskEntry},
};

use super::{
  dispatch::dispatch,
  CoreAffinity,
  StackSize,
  TaskDescriptor,
  TaskName,
  TaskPriority,
  Tasker,
};

/// Helper for launching a new task, created with [`Tasker::task`].
///
/// Anything not set explicitly falls back to the tasker's
/// [`TaskDefaults`](crate::config::TaskDefaults).
pub struct TaskBuilder<'t, 'n, K: Kernel> {
  tasker: &'t Tasker<K>,
  name: Option<&'n str>,
  period_ms: u32,
  stack_size: StackSize,
  priority: TaskPriority,
  core: CoreAffinity,
}

impl<'t, K: Kernel> TaskBuilder<'t, 'static, K> {
  pub(crate) fn new(tasker: &'t Tasker<K>) -> Self {
    let defaults = tasker.defaults();

    TaskBuilder {
      tasker,
      name: None,
      period_ms: 0,
      stack_size: defaults.stack_size,
      priority: defaults.priority,
      core: defaults.core,
    }
  }
}

impl<'t, 'n, K: Kernel> TaskBuilder<'t, 'n, K> {
  /// Set the task name.
  ///
  /// Without a name, the task is called `task` followed by the uptime in milliseconds.
  pub fn name<'m>(self, name: &'m str) -> TaskBuilder<'t, 'm, K> {
    TaskBuilder {
      tasker: self.tasker,
      name: Some(name),
      period_ms: self.period_ms,
      stack_size: self.stack_size,
      priority: self.priority,
      core: self.core,
    }
  }

  /// Run the callback every `period_ms` milliseconds. Zero runs it once.
  pub fn period_ms(mut self, period_ms: u32) -> Self {
    self.period_ms = period_ms;
    self
  }

  /// Run the callback every `period`, saturating at `u32::MAX` milliseconds.
  pub fn period(self, period: Duration) -> Self {
    let period_ms = period.as_millis().try_into().unwrap_or(u32::MAX);
    self.period_ms(period_ms)
  }

  /// Set the stack size in bytes.
  pub fn stack_size(mut self, stack_size: StackSize) -> Self {
    self.stack_size = stack_size;
    self
  }

  /// Set the task priority.
  pub fn priority(mut self, priority: TaskPriority) -> Self {
    self.priority = priority;
    self
  }

  /// Pin the task to a core.
  pub fn core(mut self, core: CoreAffinity) -> Self {
    self.core = core;
    self
  }

  /// Create and start the task.
  ///
  /// The callback is moved into the new task. If the kernel rejects the
  /// task, the callback is dropped right away.
  ///
  /// # Errors
  ///
  /// [`TaskerError::CreationRejected`] when the kernel is out of memory.
  pub fn start<F>(&self, callback: F) -> Result<(), TaskerError>
  where
    F: FnMut() + Send + 'static,
  {
    let kernel = self.tasker.kernel();

    let name = match self.name {
      Some(name) => TaskName::new(name, K::MAX_TASK_NAME_LEN),
      None => TaskName::synthesize(kernel.uptime_millis(), K::MAX_TASK_NAME_LEN),
    };

    let descriptor = TaskDescriptor::new(Box::new(callback), self.period_ms);
    let task_kernel = kernel.clone();
    let entry: TaskEntry = Box::new(move || dispatch(task_kernel, descriptor));

    let res = kernel.create_task(entry, &name, self.stack_size, self.priority, self.core);

    let period = PeriodLabel(self.period_ms);
    match res {
      Ok(()) => debug!("Task '{}'{} created on {}", name, period, self.core),
      Err(err) => warn!("Task '{}'{} was not created on {}: {}", name, period, self.core, err),
    }

    res
  }

  /// Create and start the task, returning whether the kernel accepted it.
  pub fn launch<F>(&self, callback: F) -> bool
  where
    F: FnMut() + Send + 'static,
  {
    self.start(callback).is_ok()
  }
}

struct PeriodLabel(u32);

impl fmt::Display for PeriodLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0 {
      0 => Ok(()),
      period_ms => write!(f, " (every {} ms)", period_ms),
    }
  }
}
