/// Duration in kernel ticks.
///
/// The duration of a single tick depends on the tick period of the kernel
/// (`portTICK_PERIOD_MS`), so conversions take it as an argument.
///
/// Conversions from milliseconds round down to whole ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Ticks {
  pub(crate) ticks: u32,
}

impl Ticks {
  /// The longest representable delay (`portMAX_DELAY`).
  pub const MAX: Self = Self::new(u32::MAX);

  /// Smallest positive delay, one tick.
  pub const ONE: Self = Self::new(1);

  /// Create `Ticks` from raw ticks.
  pub const fn new(ticks: u32) -> Self {
    Self { ticks }
  }

  /// Create `Ticks` from milliseconds, rounding down to whole ticks.
  pub const fn from_millis(ms: u32, tick_period_ms: u32) -> Self {
    let tick_period_ms = if tick_period_ms == 0 { 1 } else { tick_period_ms };
    Self::new(ms / tick_period_ms)
  }

  /// Raise a zero delay to a single tick.
  pub const fn at_least_one(self) -> Self {
    if self.ticks == 0 { Self::ONE } else { self }
  }

  /// Length of this delay in milliseconds.
  pub const fn as_millis(&self, tick_period_ms: u32) -> u64 {
    self.ticks as u64 * tick_period_ms as u64
  }
}

impl From<Ticks> for u32 {
  fn from(ticks: Ticks) -> Self {
    ticks.ticks
  }
}

impl From<u32> for Ticks {
  fn from(ticks: u32) -> Self {
    Self::new(ticks)
  }
}
