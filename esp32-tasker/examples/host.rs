use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use esp32_tasker::*;

static READINGS: AtomicU32 = AtomicU32::new(0);

fn read_sensor() {
  let n = READINGS.fetch_add(1, Ordering::Relaxed) + 1;
  println!("Sensor reading #{}", n);
}

fn main() {
  stderrlog::new()
    .module(module_path!())
    .module("esp32_tasker")
    .verbosity(4)
    .init()
    .unwrap();

  let kernel = HostKernel::new();
  let tasker = Tasker::new(kernel.clone());

  println!("Starting tasks ...");
  tasker.launch(read_sensor, Some("poll"), 500, TaskPriority::LOW, StackSize::LIGHT, CoreAffinity::Core1);
  tasker.task().name("hello").launch(|| println!("Hello from a one-shot task!"));
  tasker.launch_on_core0(|| println!("Unnamed one-shot task"), None, 0, TaskPriority::IDLE, StackSize::MINIMAL);

  // Far more stack than the heap can hold.
  let started = tasker.task().name("greedy").stack_size(StackSize::bytes(1 << 20)).launch(|| {});
  println!("Greedy task started: {}", started);

  thread::sleep(Duration::from_secs(2));

  for task in kernel.tasks() {
    println!(
      "{:<16} core {} prio {:>2} {:<12} {:?} ({} watchdog feeds)",
      task.name, task.core, task.priority, task.stack_size.to_string(), task.state, task.watchdog_feeds,
    );
  }
  println!("Free heap: {} of {} bytes", kernel.heap_free(), kernel.heap_size());
}
