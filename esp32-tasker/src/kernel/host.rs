//! Kernel backend built on `std::thread`.
//!
//! Mimics the Arduino ESP32 FreeRTOS port closely enough to run tasker code on
//! a host: two cores, 25 priority levels, a 1 ms tick, 16 byte task names and a
//! bounded heap that task stacks and control blocks are carved from.
//!
//! Deleted tasks do not vanish from the task table right away. The most
//! recent [`RETAINED_TASKS`] of them stay behind in [`TaskState::Deleted`] or
//! [`TaskState::Faulted`] so their history can be inspected.

use std::{
  cell::{Cell, RefCell},
  collections::BTreeMap,
  panic::{self, AssertUnwindSafe},
  sync::{Arc, Condvar, Mutex, PoisonError},
  thread,
  time::{Duration, Instant},
};

use critical_section::Mutex as CsMutex;
use log::{error, trace};

use crate::{
  error::TaskerError,
  task::{CoreAffinity, StackSize, TaskName, TaskPriority},
  ticks::Ticks,
};

use super::{Kernel, TaskEntry};

/// Heap available to tasks, roughly the DRAM of an ESP32.
pub const DEFAULT_HEAP_SIZE: usize = 320 * 1024;

/// Bytes taken by a task control block in addition to its stack.
pub const TASK_CONTROL_BLOCK_SIZE: usize = 352;

/// Number of deleted or faulted tasks kept in the task table.
pub const RETAINED_TASKS: usize = 32;

const CORE_COUNT: u32 = 2;

// Host threads need far more stack than the simulated one.
const MIN_HOST_STACK_SIZE: usize = 256 * 1024;

thread_local! {
  static CURRENT: Cell<Option<(usize, TaskId)>> = const { Cell::new(None) };
}

/// Unwind payload used to leave a deleted task.
struct TaskExit;

/// Identifier of a task created by a [`HostKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u32);

/// Task state as seen by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  /// Created, not yet started.
  Ready,
  Running,
  /// Waiting in a delay.
  Blocked,
  /// Deleted by itself or by another task.
  Deleted,
  /// Terminated by a panic in its body.
  Faulted,
}

impl TaskState {
  pub const fn is_live(&self) -> bool {
    matches!(self, Self::Ready | Self::Running | Self::Blocked)
  }
}

/// Snapshot of one entry in the task table.
#[derive(Debug, Clone)]
pub struct TaskStatus {
  pub id: TaskId,
  pub name: String,
  pub priority: TaskPriority,
  pub stack_size: StackSize,
  pub affinity: CoreAffinity,
  /// Core the task runs on; the kernel picks one for unpinned tasks.
  pub core: u32,
  pub state: TaskState,
  pub watchdog_feeds: u64,
  pub created_at: Instant,
  pub last_feed: Option<Instant>,
}

#[derive(Default)]
struct TaskSignal {
  deleted: Mutex<bool>,
  wake: Condvar,
}

impl TaskSignal {
  fn is_deleted(&self) -> bool {
    *self.deleted.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn raise(&self) {
    *self.deleted.lock().unwrap_or_else(PoisonError::into_inner) = true;
    self.wake.notify_all();
  }
}

struct TaskRecord {
  status: TaskStatus,
  heap_cost: usize,
  signal: Arc<TaskSignal>,
}

struct Registry {
  tasks: BTreeMap<TaskId, TaskRecord>,
  next_id: u32,
  next_core: u32,
  heap_free: usize,
}

impl Registry {
  fn retire(&mut self, id: TaskId, state: TaskState) {
    if let Some(record) = self.tasks.get_mut(&id) {
      if record.status.state.is_live() {
        record.status.state = state;
        self.heap_free += record.heap_cost;
      }
    }

    self.prune();
  }

  /// Drop the oldest retired tasks beyond `RETAINED_TASKS`.
  fn prune(&mut self) {
    let retired: Vec<TaskId> = self.tasks.iter()
      .filter(|(_, r)| !r.status.state.is_live())
      .map(|(id, _)| *id)
      .collect();

    let excess = retired.len().saturating_sub(RETAINED_TASKS);
    for id in &retired[..excess] {
      self.tasks.remove(id);
    }
  }
}

struct Inner {
  boot: Instant,
  heap_size: usize,
  registry: CsMutex<RefCell<Registry>>,
}

/// A FreeRTOS stand-in where every task is a host thread.
#[derive(Clone)]
pub struct HostKernel {
  inner: Arc<Inner>,
}

impl HostKernel {
  pub fn new() -> Self {
    Self::with_heap_size(DEFAULT_HEAP_SIZE)
  }

  /// Create a kernel with `heap_size` bytes available for task stacks and control blocks.
  pub fn with_heap_size(heap_size: usize) -> Self {
    let registry = Registry {
      tasks: BTreeMap::new(),
      next_id: 1,
      next_core: 0,
      heap_free: heap_size,
    };

    Self {
      inner: Arc::new(Inner {
        boot: Instant::now(),
        heap_size,
        registry: CsMutex::new(RefCell::new(registry)),
      }),
    }
  }

  /// Total heap this kernel was created with.
  pub fn heap_size(&self) -> usize {
    self.inner.heap_size
  }

  /// Heap not taken by live tasks.
  pub fn heap_free(&self) -> usize {
    critical_section::with(|cs| self.inner.registry.borrow_ref(cs).heap_free)
  }

  /// Live tasks and recently retired ones, in creation order.
  pub fn tasks(&self) -> Vec<TaskStatus> {
    critical_section::with(|cs| {
      self.inner.registry.borrow_ref(cs).tasks.values().map(|r| r.status.clone()).collect()
    })
  }

  /// The most recently created task called `name`.
  pub fn task(&self, name: &str) -> Option<TaskStatus> {
    critical_section::with(|cs| {
      self.inner.registry.borrow_ref(cs).tasks.values()
        .rev()
        .find(|r| r.status.name == name)
        .map(|r| r.status.clone())
    })
  }

  /// Number of tasks that have not been deleted or faulted.
  pub fn live_task_count(&self) -> usize {
    critical_section::with(|cs| {
      self.inner.registry.borrow_ref(cs).tasks.values().filter(|r| r.status.state.is_live()).count()
    })
  }

  /// Live tasks that have not fed the watchdog within `timeout`.
  ///
  /// On hardware the task watchdog would reset the chip for any of these.
  pub fn starved_tasks(&self, timeout: Duration) -> Vec<TaskStatus> {
    let now = Instant::now();

    self.tasks()
      .into_iter()
      .filter(|t| t.state.is_live())
      .filter(|t| now.duration_since(t.last_feed.unwrap_or(t.created_at)) > timeout)
      .collect()
  }

  fn key(&self) -> usize {
    Arc::as_ptr(&self.inner) as usize
  }

  fn current_id(&self) -> Option<TaskId> {
    let key = self.key();
    CURRENT.with(|current| current.get())
      .filter(|(k, _)| *k == key)
      .map(|(_, id)| id)
  }

  fn signal(&self, id: TaskId) -> Option<Arc<TaskSignal>> {
    critical_section::with(|cs| {
      self.inner.registry.borrow_ref(cs).tasks.get(&id).map(|r| Arc::clone(&r.signal))
    })
  }

  fn set_state(&self, id: TaskId, state: TaskState) {
    critical_section::with(|cs| {
      if let Some(record) = self.inner.registry.borrow_ref_mut(cs).tasks.get_mut(&id) {
        if record.status.state.is_live() {
          record.status.state = state;
        }
      }
    })
  }

  fn retire(&self, id: TaskId, state: TaskState) {
    critical_section::with(|cs| self.inner.registry.borrow_ref_mut(cs).retire(id, state))
  }

  fn exit(&self) -> ! {
    panic::resume_unwind(Box::new(TaskExit))
  }

  fn run(&self, id: TaskId, entry: TaskEntry) {
    CURRENT.with(|current| current.set(Some((self.key(), id))));
    self.set_state(id, TaskState::Running);

    let state = match panic::catch_unwind(AssertUnwindSafe(entry)) {
      Err(payload) if payload.is::<TaskExit>() => TaskState::Deleted,
      Err(_) => {
        error!("task {:?} panicked and was terminated", id);
        TaskState::Faulted
      },
      Ok(()) => {
        error!("task {:?} returned from its entry function", id);
        TaskState::Deleted
      },
    };

    self.retire(id, state);
    CURRENT.with(|current| current.set(None));
  }
}

impl Default for HostKernel {
  fn default() -> Self {
    Self::new()
  }
}

impl Kernel for HostKernel {
  type Handle = TaskId;

  const MAX_TASK_NAME_LEN: usize = 16;
  const MAX_PRIORITIES: u8 = 25;
  const TICK_PERIOD_MS: u32 = 1;

  fn create_task(
    &self,
    entry: TaskEntry,
    name: &TaskName,
    stack_size: StackSize,
    priority: TaskPriority,
    core: CoreAffinity,
  ) -> Result<(), TaskerError> {
    let heap_cost = stack_size.get() as usize + TASK_CONTROL_BLOCK_SIZE;
    let priority = priority.capped(Self::MAX_PRIORITIES);

    let id = critical_section::with(|cs| {
      let mut registry = self.inner.registry.borrow_ref_mut(cs);
      if registry.heap_free < heap_cost {
        return None
      }
      let next_id = registry.next_id.checked_add(1)?;
      registry.heap_free -= heap_cost;

      let id = TaskId(registry.next_id);
      registry.next_id = next_id;

      let running_core = match core.core_id() {
        Some(core_id) => core_id,
        None => {
          let core_id = registry.next_core;
          registry.next_core = (core_id + 1) % CORE_COUNT;
          core_id
        },
      };

      let status = TaskStatus {
        id,
        name: name.to_string(),
        priority,
        stack_size,
        affinity: core,
        core: running_core,
        state: TaskState::Ready,
        watchdog_feeds: 0,
        created_at: Instant::now(),
        last_feed: None,
      };
      registry.tasks.insert(id, TaskRecord { status, heap_cost, signal: Arc::default() });

      Some(id)
    });

    let Some(id) = id else {
      return Err(TaskerError::CreationRejected)
    };

    let kernel = self.clone();
    let spawned = thread::Builder::new()
      .name(name.to_string())
      .stack_size((stack_size.get() as usize).max(MIN_HOST_STACK_SIZE))
      .spawn(move || kernel.run(id, entry));

    match spawned {
      Ok(_) => {
        trace!("spawned {:?} '{}' with priority {} and {}", id, name, priority, stack_size);
        Ok(())
      },
      Err(err) => {
        error!("could not spawn a thread for task '{}': {}", name, err);
        critical_section::with(|cs| {
          let mut registry = self.inner.registry.borrow_ref_mut(cs);
          if let Some(record) = registry.tasks.remove(&id) {
            registry.heap_free += record.heap_cost;
          }
        });
        Err(TaskerError::CreationRejected)
      },
    }
  }

  fn delay(&self, ticks: Ticks) {
    let duration = Duration::from_millis(ticks.as_millis(Self::TICK_PERIOD_MS));

    let Some(id) = self.current_id() else {
      thread::sleep(duration);
      return
    };
    let Some(signal) = self.signal(id) else { self.exit() };

    self.set_state(id, TaskState::Blocked);

    let deadline = Instant::now().checked_add(duration);
    let mut deleted = signal.deleted.lock().unwrap_or_else(PoisonError::into_inner);
    while !*deleted {
      let timeout = match deadline {
        Some(deadline) => {
          let now = Instant::now();
          if now >= deadline {
            break
          }
          deadline - now
        },
        None => Duration::MAX,
      };

      deleted = match signal.wake.wait_timeout(deleted, timeout) {
        Ok((guard, _)) => guard,
        Err(poisoned) => poisoned.into_inner().0,
      };
    }

    if *deleted {
      drop(deleted);
      self.exit()
    }
    drop(deleted);

    self.set_state(id, TaskState::Running);
  }

  fn feed_watchdog(&self) {
    let Some(id) = self.current_id() else { return };

    if self.signal(id).map_or(true, |signal| signal.is_deleted()) {
      self.exit()
    }

    critical_section::with(|cs| {
      if let Some(record) = self.inner.registry.borrow_ref_mut(cs).tasks.get_mut(&id) {
        record.status.watchdog_feeds += 1;
        record.status.last_feed = Some(Instant::now());
      }
    })
  }

  fn current_task(&self) -> Option<TaskId> {
    self.current_id()
  }

  fn task_name(&self, handle: &TaskId) -> Option<String> {
    critical_section::with(|cs| {
      self.inner.registry.borrow_ref(cs).tasks.get(handle).map(|r| r.status.name.clone())
    })
  }

  fn task_core(&self, handle: &TaskId) -> Option<u32> {
    critical_section::with(|cs| {
      self.inner.registry.borrow_ref(cs).tasks.get(handle).map(|r| r.status.core)
    })
  }

  /// Threads not created by this kernel report core 0.
  fn current_core(&self) -> u32 {
    self.current_id()
      .and_then(|id| self.task_core(&id))
      .unwrap_or(0)
  }

  fn delete_task(&self, handle: &TaskId) {
    if self.current_id() == Some(*handle) {
      self.delete_current()
    }

    // Take the signal first, retiring may prune the record.
    let signal = critical_section::with(|cs| {
      let mut registry = self.inner.registry.borrow_ref_mut(cs);
      let signal = registry.tasks.get(handle).map(|r| Arc::clone(&r.signal));
      registry.retire(*handle, TaskState::Deleted);
      signal
    });

    if let Some(signal) = signal {
      signal.raise();
    }
  }

  /// # Panics
  ///
  /// Panics when called from a thread that is not a task of this kernel.
  fn delete_current(&self) -> ! {
    let Some(id) = self.current_id() else {
      panic!("delete_current called outside of a task")
    };

    let signal = self.signal(id);
    self.retire(id, TaskState::Deleted);
    if let Some(signal) = signal {
      signal.raise();
    }
    self.exit()
  }

  fn uptime_millis(&self) -> u64 {
    self.inner.boot.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::{atomic::{AtomicBool, AtomicU32, Ordering}, mpsc};

  fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
      if condition() {
        return true
      }
      thread::sleep(Duration::from_millis(2));
    }
    condition()
  }

  fn create(kernel: &HostKernel, name: &str, stack_size: StackSize, entry: TaskEntry) -> Result<(), TaskerError> {
    let name = TaskName::new(name, HostKernel::MAX_TASK_NAME_LEN);
    kernel.create_task(entry, &name, stack_size, TaskPriority::LOW, CoreAffinity::NoAffinity)
  }

  #[test]
  fn stacks_are_carved_from_the_heap() {
    let kernel = HostKernel::with_heap_size(4096);
    let k = kernel.clone();

    create(&kernel, "sleeper", StackSize::LIGHT, Box::new(move || {
      k.delay(Ticks::MAX);
    })).unwrap();

    assert_eq!(kernel.heap_free(), 4096 - 2048 - TASK_CONTROL_BLOCK_SIZE);
    assert_eq!(create(&kernel, "too-big", StackSize::LIGHT, Box::new(|| {})), Err(TaskerError::CreationRejected));
    assert!(kernel.task("too-big").is_none());
  }

  #[test]
  fn rejected_entries_are_dropped() {
    struct Flag(Arc<AtomicBool>);
    impl Drop for Flag {
      fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
      }
    }

    let kernel = HostKernel::with_heap_size(16);
    let dropped = Arc::new(AtomicBool::new(false));
    let flag = Flag(Arc::clone(&dropped));

    let res = create(&kernel, "nope", StackSize::MINIMAL, Box::new(move || drop(flag)));
    assert_eq!(res, Err(TaskerError::CreationRejected));
    assert!(dropped.load(Ordering::SeqCst));
  }

  #[test]
  fn priority_is_capped() {
    let kernel = HostKernel::new();
    let name = TaskName::new("urgent", HostKernel::MAX_TASK_NAME_LEN);
    let k = kernel.clone();
    kernel.create_task(Box::new(move || k.delete_current()), &name, StackSize::LIGHT, TaskPriority::new(200), CoreAffinity::Core0).unwrap();

    let status = kernel.task("urgent").unwrap();
    assert_eq!(status.priority, TaskPriority::new(24));
    assert_eq!(status.core, 0);
  }

  #[test]
  fn self_deletion_frees_the_heap() {
    let kernel = HostKernel::new();
    let k = kernel.clone();

    create(&kernel, "once", StackSize::MEDIUM, Box::new(move || k.delete_current())).unwrap();

    assert!(wait_until(Duration::from_secs(2), || kernel.task("once").unwrap().state == TaskState::Deleted));
    assert_eq!(kernel.heap_free(), DEFAULT_HEAP_SIZE);
    assert_eq!(kernel.live_task_count(), 0);
  }

  #[test]
  fn foreign_deletion_wakes_a_blocked_task() {
    let kernel = HostKernel::new();
    let k = kernel.clone();
    let (tx, rx) = mpsc::channel();

    create(&kernel, "blocked", StackSize::LIGHT, Box::new(move || {
      tx.send(k.current_task().unwrap()).unwrap();
      k.delay(Ticks::MAX);
    })).unwrap();

    let handle = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(kernel.task_name(&handle).as_deref(), Some("blocked"));

    kernel.delete_task(&handle);
    assert_eq!(kernel.task("blocked").unwrap().state, TaskState::Deleted);
    assert_eq!(kernel.heap_free(), DEFAULT_HEAP_SIZE);
  }

  #[test]
  fn a_panicking_task_faults_alone() {
    let kernel = HostKernel::new();
    let k = kernel.clone();
    let ticks = Arc::new(AtomicU32::new(0));
    let t = Arc::clone(&ticks);

    create(&kernel, "steady", StackSize::LIGHT, Box::new(move || loop {
      t.fetch_add(1, Ordering::SeqCst);
      k.feed_watchdog();
      k.delay(Ticks::new(2));
    })).unwrap();
    create(&kernel, "crash", StackSize::LIGHT, Box::new(|| panic!("boom"))).unwrap();

    assert!(wait_until(Duration::from_secs(2), || kernel.task("crash").unwrap().state == TaskState::Faulted));

    let before = ticks.load(Ordering::SeqCst);
    assert!(wait_until(Duration::from_secs(2), || ticks.load(Ordering::SeqCst) > before + 2));
    assert!(kernel.task("steady").unwrap().state.is_live());
    assert!(kernel.task("steady").unwrap().watchdog_feeds > 0);
  }

  #[test]
  fn unfed_tasks_are_reported_as_starved() {
    let kernel = HostKernel::new();
    let k = kernel.clone();

    create(&kernel, "lazy", StackSize::LIGHT, Box::new(move || k.delay(Ticks::MAX))).unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
      kernel.starved_tasks(Duration::from_millis(20)).iter().any(|t| t.name == "lazy")
    }));
  }

  #[test]
  fn unpinned_tasks_are_spread_over_both_cores() {
    let kernel = HostKernel::new();

    for name in ["a", "b"] {
      let k = kernel.clone();
      create(&kernel, name, StackSize::LIGHT, Box::new(move || k.delay(Ticks::MAX))).unwrap();
    }

    let a = kernel.task("a").unwrap();
    let b = kernel.task("b").unwrap();
    assert_eq!(a.affinity, CoreAffinity::NoAffinity);
    assert_ne!(a.core, b.core);
  }

  #[test]
  fn retired_tasks_are_pruned() {
    let kernel = HostKernel::new();
    let total = RETAINED_TASKS + 8;

    for i in 0..total {
      let k = kernel.clone();
      create(&kernel, &format!("t{}", i), StackSize::MINIMAL, Box::new(move || k.delete_current())).unwrap();
    }

    let last = format!("t{}", total - 1);
    assert!(wait_until(Duration::from_secs(5), || {
      kernel.live_task_count() == 0 && kernel.task(&last).is_some()
    }));
    assert_eq!(kernel.tasks().len(), RETAINED_TASKS);
    assert!(kernel.task("t0").is_none());
    assert_eq!(kernel.heap_free(), DEFAULT_HEAP_SIZE);
  }

  #[test]
  fn foreign_deletion_of_a_pruned_task_still_stops_it() {
    let kernel = HostKernel::new();
    let k = kernel.clone();
    let (tx, rx) = mpsc::channel();
    let beats = Arc::new(AtomicU32::new(0));
    let b = Arc::clone(&beats);

    create(&kernel, "oldest", StackSize::LIGHT, Box::new(move || {
      tx.send(k.current_task().unwrap()).unwrap();
      loop {
        b.fetch_add(1, Ordering::SeqCst);
        k.feed_watchdog();
        k.delay(Ticks::new(2));
      }
    })).unwrap();
    let handle = rx.recv_timeout(Duration::from_secs(2)).unwrap();

    for i in 0..RETAINED_TASKS {
      let k = kernel.clone();
      create(&kernel, &format!("r{}", i), StackSize::MINIMAL, Box::new(move || k.delete_current())).unwrap();
    }
    assert!(wait_until(Duration::from_secs(5), || kernel.live_task_count() == 1));

    kernel.delete_task(&handle);
    assert!(kernel.task("oldest").is_none());

    thread::sleep(Duration::from_millis(20));
    let seen = beats.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(beats.load(Ordering::SeqCst), seen);
  }

  #[test]
  fn running_out_of_ids_rejects_the_task() {
    let kernel = HostKernel::new();
    critical_section::with(|cs| kernel.inner.registry.borrow_ref_mut(cs).next_id = u32::MAX);

    assert_eq!(create(&kernel, "last", StackSize::LIGHT, Box::new(|| {})), Err(TaskerError::CreationRejected));
    assert!(kernel.tasks().is_empty());
    assert_eq!(kernel.heap_free(), DEFAULT_HEAP_SIZE);
  }

  #[test]
  fn task_core_reports_the_targets_core() {
    let kernel = HostKernel::new();
    let k = kernel.clone();
    let (tx, rx) = mpsc::channel();
    let name = TaskName::new("pinned", HostKernel::MAX_TASK_NAME_LEN);

    kernel.create_task(Box::new(move || {
      tx.send(k.current_task().unwrap()).unwrap();
      k.delay(Ticks::MAX);
    }), &name, StackSize::LIGHT, TaskPriority::LOW, CoreAffinity::Core1).unwrap();

    let handle = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(kernel.task_core(&handle), Some(1));
    assert_eq!(kernel.current_core(), 0);
    kernel.delete_task(&handle);
  }
}
