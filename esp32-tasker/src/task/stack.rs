use core::fmt;

/// Task stack size in bytes.
///
/// The ESP-IDF port of FreeRTOS measures stacks in bytes rather than words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StackSize {
  bytes: u32,
}

impl StackSize {
  /// `configMINIMAL_STACK_SIZE` of the ESP32 port.
  pub const MINIMAL: Self = Self::bytes(768);
  /// Enough for callbacks that only touch a few locals.
  pub const LIGHT: Self = Self::bytes(2048);
  pub const MEDIUM: Self = Self::bytes(2 * 2048);
  /// For callbacks doing formatted output or deep call chains.
  pub const HEAVY: Self = Self::bytes(4 * 2048);

  pub const fn bytes(bytes: u32) -> Self {
    Self { bytes }
  }

  pub const fn get(&self) -> u32 {
    self.bytes
  }
}

impl Default for StackSize {
  fn default() -> Self {
    Self::LIGHT
  }
}

impl fmt::Display for StackSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} bytes", self.bytes)
  }
}

impl From<u32> for StackSize {
  fn from(bytes: u32) -> Self {
    Self::bytes(bytes)
  }
}
