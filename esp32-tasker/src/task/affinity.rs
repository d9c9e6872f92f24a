use core::fmt;

/// Core a task is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoreAffinity {
  /// The protocol CPU.
  Core0,
  /// The application CPU.
  Core1,
  /// Let the scheduler choose (`tskNO_AFFINITY`).
  #[default]
  NoAffinity,
}

impl CoreAffinity {
  /// The core id this affinity pins to, if any.
  pub const fn core_id(&self) -> Option<u32> {
    match self {
      Self::Core0 => Some(0),
      Self::Core1 => Some(1),
      Self::NoAffinity => None,
    }
  }
}

impl fmt::Display for CoreAffinity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.core_id() {
      Some(id) => write!(f, "core id {}", id),
      None => f.write_str("any available core id"),
    }
  }
}
