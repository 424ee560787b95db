// Concurrency wrappers for the shared containers.
//
// The tick loop, the interpreter and the planner all run on one thread,
// but the map handles, player states and command queues are built to be
// shared: external policy may push commands from another thread while the
// interpreter waits for them. Two small wrappers cover every case:
//
// - `Shared<T>`: a mutex with `get()` (clone out a snapshot) and `lock()`
//   (guard for in-place edits). Map handles are `Shared<Arc<Map>>`, so
//   swapping the pointer under the lock publishes a new immutable snapshot
//   atomically — readers see either the old or the new map, never a tear.
// - `CommandQueue`: a mutex-guarded FIFO of commands paired with a condvar
//   so the interpreter can block, bounded by a deadline, until a producer
//   pushes work.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Instant;

use crate::command::Command;

/// Mutex-guarded value with snapshot and in-place access.
#[derive(Debug, Default)]
pub struct Shared<T> {
    value: Mutex<T>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Shared<T> {
        Shared {
            value: Mutex::new(value),
        }
    }

    /// Lock for in-place reads/writes; releases on scope exit.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock().expect("lock poisoned")
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        *self.lock() = value;
    }
}

impl<T: Clone> Shared<T> {
    /// Clone out a consistent snapshot.
    pub fn get(&self) -> T {
        self.lock().clone()
    }
}

/// Per-player FIFO of commands, with a condvar for bounded waits.
#[derive(Debug, Default)]
pub struct CommandQueue {
    queue: Mutex<VecDeque<Command>>,
    available: Condvar,
}

impl CommandQueue {
    pub fn new() -> CommandQueue {
        CommandQueue::default()
    }

    /// Replace the whole queue with a new command sequence.
    pub fn set_commands(&self, commands: impl IntoIterator<Item = Command>) {
        let mut queue = self.queue.lock().expect("lock poisoned");
        queue.clear();
        queue.extend(commands);
        self.available.notify_all();
    }

    /// Append one command.
    pub fn push(&self, command: Command) {
        let mut queue = self.queue.lock().expect("lock poisoned");
        queue.push_back(command);
        self.available.notify_all();
    }

    /// Prepend a command so it executes before the current plan.
    pub fn push_front(&self, command: Command) {
        let mut queue = self.queue.lock().expect("lock poisoned");
        queue.push_front(command);
        self.available.notify_all();
    }

    pub fn clear(&self) {
        self.queue.lock().expect("lock poisoned").clear();
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().expect("lock poisoned").is_empty()
    }

    /// Take the head command for execution. A command that consumed a tick
    /// without completing is handed back via `restore_front`.
    pub fn pop_front(&self) -> Option<Command> {
        self.queue.lock().expect("lock poisoned").pop_front()
    }

    /// Hand back a partially-executed head command.
    pub fn restore_front(&self, command: Command) {
        self.queue
            .lock()
            .expect("lock poisoned")
            .push_front(command);
    }

    /// Block until the queue is non-empty or `deadline` passes. Returns
    /// whether work is available.
    pub fn wait_until_non_empty(&self, deadline: Instant) -> bool {
        let mut queue = self.queue.lock().expect("lock poisoned");
        while queue.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .available
                .wait_timeout(queue, deadline - now)
                .expect("lock poisoned");
            queue = guard;
        }
        true
    }
}
