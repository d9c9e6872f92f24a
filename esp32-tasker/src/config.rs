//! Launch defaults.

use crate::task::{CoreAffinity, StackSize, TaskPriority};

/// Values a [`Tasker`](crate::Tasker) fills in for anything a launch leaves unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDefaults {
  pub priority: TaskPriority,
  pub stack_size: StackSize,
  pub core: CoreAffinity,
}

impl TaskDefaults {
  /// Idle priority, a light stack and no core affinity.
  pub const fn new() -> Self {
    Self {
      priority: TaskPriority::IDLE,
      stack_size: StackSize::LIGHT,
      core: CoreAffinity::NoAffinity,
    }
  }

  pub const fn priority(mut self, priority: TaskPriority) -> Self {
    self.priority = priority;
    self
  }

  pub const fn stack_size(mut self, stack_size: StackSize) -> Self {
    self.stack_size = stack_size;
    self
  }

  pub const fn core(mut self, core: CoreAffinity) -> Self {
    self.core = core;
    self
  }
}

impl Default for TaskDefaults {
  fn default() -> Self {
    Self::new()
  }
}
