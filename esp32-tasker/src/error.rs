use core::fmt;

/// Basic error type for the library.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum TaskerError {
  /// The kernel could not allocate the task control block or stack.
  CreationRejected,
}

impl fmt::Display for TaskerError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::CreationRejected => f.write_str("insufficient heap for task control block and stack"),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for TaskerError {}
