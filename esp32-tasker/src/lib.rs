//! # Task launcher for the ESP32
//!
//! Thin convenience layer over the FreeRTOS scheduler of a dual-core ESP32.
//! A callback is launched either as a periodic task, pinned to a core and
//! running forever at a fixed cadence while feeding the task watchdog, or as a
//! one-shot task which runs once and then deletes itself.
//!
//! The scheduler is reached through the [`Kernel`] trait. With the `std`
//! feature, [`HostKernel`] runs every task as a host thread, which is what the
//! tests and the `host` example use.
//!
//! # Samples
//!
//! Launching a periodic task
//!
//! ```rust
//! # use esp32_tasker::*;
//! let tasker = Tasker::new(HostKernel::new());
//!
//! tasker.task()
//!   .name("blink")
//!   .period_ms(250)
//!   .priority(TaskPriority::LOW)
//!   .core(CoreAffinity::Core1)
//!   .start(|| { /* toggle the LED */ })
//!   .unwrap();
//! ```
//!
//! Launching a one-shot task with the defaults
//!
//! ```rust
//! # use esp32_tasker::*;
//! let tasker = Tasker::new(HostKernel::new());
//!
//! if !tasker.task().launch(|| { /* calibrate once */ }) {
//!   // Not enough heap; retry with a smaller stack or give up.
//! }
//! ```
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
mod error;
pub mod kernel;
pub mod task;
mod ticks;

#[cfg(all(test, feature = "std"))]
mod test_log;

pub use crate::config::TaskDefaults;
pub use crate::error::TaskerError;
#[cfg(feature = "std")]
pub use crate::kernel::host::HostKernel;
pub use crate::kernel::{Kernel, TaskEntry};
pub use crate::task::*;
pub use crate::ticks::Ticks;
