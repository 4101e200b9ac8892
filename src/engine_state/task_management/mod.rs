//! # Task Management System
//!
//! This module provides a small worker pool for running terrain work off the
//! owning thread. It is designed to be simple and predictable: tasks are
//! fire-and-forget, results travel through shared result queues, and the owner
//! polls once per tick without ever blocking on a worker.
//!
//! ## Architecture Overview
//!
//! The task management system consists of several key components:
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed on a worker thread
//! - `TaskChannel`: Communication channel between the owning thread and one worker
//! - `TaskFailure`: Report of a task abandoned after repeated panics
//!
//! ## Worker Behavior
//! - Uses `std::thread` for true multi-threading, one OS thread per worker
//! - Each worker has a dedicated channel for task distribution
//! - Each worker runs its tasks under `catch_unwind`, so a panicking task is
//!   reported back instead of killing the worker
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and deposit output in the task's result queue
//! 4. Completions are collected on the owning thread in `process_completed_tasks()`
//! 5. A task that panicked is republished until it runs out of retries, then
//!    reported as a `TaskFailure`
//!
//! ## Performance Considerations
//! - **Task Granularity**: a zone's block data (16 chunks) or one chunk's mesh
//!   per task keeps scheduling overhead negligible
//! - **Memory**: each task owns shared handles to its chunks, never copies
//! - **Blocking**: tasks only block on chunk locks, which the owner holds briefly
//!
//! ## Example Usage
//! ```rust
//! use voxel_terrain::engine_state::task_management::{task::{Task, TaskKind}, TaskManager};
//!
//! struct Ping;
//! impl Task for Ping {
//!     fn process(&self) {}
//!     fn kind(&self) -> TaskKind {
//!         TaskKind::MeshExtraction { chunk: 0 }
//!     }
//! }
//!
//! let mut task_manager = TaskManager::new(2, 1);
//! task_manager.publish_task(Box::new(Ping));
//!
//! // In the owner's tick:
//! let failures = task_manager.process_completed_tasks();
//! assert!(failures.is_empty());
//! ```

pub mod task;

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use task::{Task, TaskFailure};

/// A task together with the number of times it has already run.
struct QueuedTask {
    task: Box<dyn Task>,
    attempts: u32,
}

/// What a worker sends back after running a task.
enum TaskCompletion {
    /// The task ran to completion
    Finished,
    /// The task panicked; it is handed back for a retry decision
    Panicked {
        queued: QueuedTask,
        message: String,
    },
}

/// A communication channel between the owning thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from the owner to the worker
/// - `result_receiver`: Receives completions from the worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `worker`: Handle to the worker thread, joined on shutdown
struct TaskChannel {
    task_sender: Sender<QueuedTask>,
    result_receiver: Receiver<TaskCompletion>,
    num_tasks_in_flight: usize,
    worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// The `TaskManager` is responsible for:
/// - Creating and managing worker threads
/// - Distributing tasks across available workers
/// - Handling task queuing when all workers are busy
/// - Retrying tasks that panic, and reporting those that keep panicking
/// - Shutting workers down when dropped
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<QueuedTask>,
    current_channel: usize,
    max_retries: u32,
    completed_tasks: u64,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Keeping it at 1 leaves every other task in the shared queue, where the next
/// idle worker picks it up.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Body of a worker thread: run tasks until the sender hangs up.
fn worker_loop(task_rx: Receiver<QueuedTask>, result_tx: Sender<TaskCompletion>) {
    while let Ok(mut queued) = task_rx.recv() {
        queued.attempts += 1;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| queued.task.process()));
        let completion = match outcome {
            Ok(()) => TaskCompletion::Finished,
            Err(payload) => TaskCompletion::Panicked {
                message: panic_message(payload.as_ref()),
                queued,
            },
        };
        if result_tx.send(completion).is_err() {
            break;
        }
    }
}

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create
    /// * `max_retries` - How many times a panicking task is republished before
    ///   it is reported as failed
    ///
    /// Workers that fail to spawn are logged and skipped. With no workers at
    /// all, published tasks run inline on the calling thread.
    pub fn new(num_workers: usize, max_retries: u32) -> Self {
        info!(
            "Available parallelism: {:?}, starting {} terrain workers",
            thread::available_parallelism(),
            num_workers
        );

        let mut channels = Vec::with_capacity(num_workers);
        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<QueuedTask>();
            let (result_tx, result_rx) = channel::<TaskCompletion>();

            let spawned = thread::Builder::new()
                .name(format!("terrain-worker-{index}"))
                .spawn(move || worker_loop(task_rx, result_tx));

            match spawned {
                Ok(worker) => channels.push(TaskChannel {
                    task_sender: task_tx,
                    result_receiver: result_rx,
                    num_tasks_in_flight: 0,
                    worker,
                }),
                Err(err) => error!("Failed to spawn terrain worker {index}: {err}"),
            }
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
            max_retries,
            completed_tasks: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the send failed because the worker is gone
    fn try_send_task(&mut self, task: QueuedTask, channel_idx: usize) -> Result<(), QueuedTask> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(()) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(err) => Err(err.0),
        }
    }

    /// Finds an available worker channel that can accept a new task.
    ///
    /// Implements round-robin scheduling starting from the channel after the
    /// last one used, skipping channels at `MAX_TASKS_IN_FLIGHT`.
    ///
    /// # Returns
    /// - `Some(usize)` index of an available channel
    /// - `None` if all channels are busy or there are no channels
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|offset| (self.current_channel + offset) % count)
            .find(|&idx| self.channels[idx].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT)
    }

    /// Runs a task on the calling thread, for pools without workers.
    fn run_inline(&mut self, mut queued: QueuedTask) -> Option<TaskFailure> {
        loop {
            queued.attempts += 1;
            match panic::catch_unwind(AssertUnwindSafe(|| queued.task.process())) {
                Ok(()) => {
                    self.completed_tasks += 1;
                    return None;
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    if let Some(failure) = self.retry_or_fail(&queued, &message) {
                        return Some(failure);
                    }
                }
            }
        }
    }

    /// Logs a panicked attempt and decides whether the task gets another.
    ///
    /// # Returns
    /// `None` when the task should run again, the failure report otherwise
    fn retry_or_fail(&self, queued: &QueuedTask, message: &str) -> Option<TaskFailure> {
        let kind = queued.task.kind();
        if queued.attempts <= self.max_retries {
            warn!(
                "Task {} panicked on attempt {} ({}), retrying",
                kind, queued.attempts, message
            );
            None
        } else {
            let failure = TaskFailure {
                kind,
                attempts: queued.attempts,
                message: message.to_string(),
            };
            error!("{failure}");
            Some(failure)
        }
    }

    /// Publishes a new task for execution.
    ///
    /// The task is executed as soon as a worker becomes available, or queued
    /// if all workers are busy.
    ///
    /// # Returns
    /// - `true` if the task was immediately handed to a worker (or run inline)
    /// - `false` if the task was queued
    pub fn publish_task(&mut self, task: Box<dyn Task>) -> bool {
        self.publish_queued(QueuedTask { task, attempts: 0 })
    }

    fn publish_queued(&mut self, queued: QueuedTask) -> bool {
        if self.channels.is_empty() {
            if let Some(failure) = self.run_inline(queued) {
                debug!("Inline task abandoned: {failure}");
            }
            return true;
        }

        // Keep FIFO order: nothing jumps ahead of already-queued work.
        if !self.queued_tasks.is_empty() {
            self.queued_tasks.push_back(queued);
            self.process_queued_tasks();
            return false;
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(queued, channel_idx) {
                Ok(()) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(queued) => {
                    self.queued_tasks.push_back(queued);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(queued);
                false
            }
        }
    }

    /// Hands queued tasks to idle workers, oldest first, until the queue is
    /// empty or every worker is busy.
    pub fn process_queued_tasks(&mut self) {
        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                break;
            };
            let Some(queued) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(queued, channel_idx) {
                Ok(()) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                }
                Err(queued) => {
                    // Worker disconnected: put the task back and stop.
                    error!("Terrain worker {channel_idx} disconnected");
                    self.queued_tasks.push_front(queued);
                    break;
                }
            }
        }
    }

    /// Collects completions from every worker.
    ///
    /// Tasks that panicked are republished while they have retries left. Must
    /// be called on the owning thread, typically once per tick.
    ///
    /// # Returns
    /// Tasks abandoned during this call
    pub fn process_completed_tasks(&mut self) -> Vec<TaskFailure> {
        let mut retries = Vec::new();
        let mut failures = Vec::new();

        for channel in &mut self.channels {
            while let Ok(completion) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                match completion {
                    TaskCompletion::Finished => self.completed_tasks += 1,
                    TaskCompletion::Panicked { queued, message } => {
                        retries.push((queued, message));
                    }
                }
            }
        }

        for (queued, message) in retries {
            match self.retry_or_fail(&queued, &message) {
                None => {
                    self.publish_queued(queued);
                }
                Some(failure) => failures.push(failure),
            }
        }

        self.process_queued_tasks();
        failures
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Tasks handed to workers and not yet collected.
    pub fn in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Tasks that ran to completion.
    pub fn completed(&self) -> u64 {
        self.completed_tasks
    }

    /// Returns `true` when nothing is queued or running.
    pub fn is_idle(&self) -> bool {
        self.queued() == 0 && self.in_flight() == 0
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        let mut workers = Vec::with_capacity(self.channels.len());
        for channel in self.channels.drain(..) {
            let TaskChannel {
                task_sender,
                worker,
                ..
            } = channel;
            drop(task_sender);
            workers.push(worker);
        }
        for worker in workers {
            if worker.join().is_err() {
                error!("Terrain worker exited by panic");
            }
        }
        debug!("Task manager shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResultQueue;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use task::TaskKind;

    struct Record {
        value: u32,
        out: ResultQueue<u32>,
    }

    impl Task for Record {
        fn process(&self) {
            self.out.push(self.value);
        }

        fn kind(&self) -> TaskKind {
            TaskKind::MeshExtraction { chunk: 0 }
        }
    }

    /// Panics until it has been run `panics` times.
    struct Flaky {
        runs: Arc<AtomicU32>,
        panics: u32,
    }

    impl Task for Flaky {
        fn process(&self) {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if run < self.panics {
                panic!("flaky run {run}");
            }
        }

        fn kind(&self) -> TaskKind {
            TaskKind::BlockGeneration { zone: 0 }
        }
    }

    fn drain_until_idle(manager: &mut TaskManager) -> Vec<TaskFailure> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut failures = Vec::new();
        while !manager.is_idle() && Instant::now() < deadline {
            failures.extend(manager.process_completed_tasks());
            thread::sleep(Duration::from_millis(1));
        }
        failures
    }

    #[test]
    fn every_published_task_runs_once() {
        let out = ResultQueue::new();
        let mut manager = TaskManager::new(3, 0);
        for value in 0..20 {
            manager.publish_task(Box::new(Record {
                value,
                out: out.clone(),
            }));
        }
        assert!(drain_until_idle(&mut manager).is_empty());

        let mut values = out.drain();
        values.sort_unstable();
        assert_eq!(values, (0..20).collect::<Vec<_>>());
        assert_eq!(manager.completed(), 20);
    }

    #[test]
    fn panicking_task_is_retried() {
        let runs = Arc::new(AtomicU32::new(0));
        let mut manager = TaskManager::new(1, 2);
        manager.publish_task(Box::new(Flaky {
            runs: runs.clone(),
            panics: 2,
        }));
        assert!(drain_until_idle(&mut manager).is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn task_that_keeps_panicking_is_reported() {
        let runs = Arc::new(AtomicU32::new(0));
        let mut manager = TaskManager::new(2, 1);
        manager.publish_task(Box::new(Flaky {
            runs: runs.clone(),
            panics: u32::MAX,
        }));
        let failures = drain_until_idle(&mut manager);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].attempts, 2);
        assert_eq!(failures[0].kind, TaskKind::BlockGeneration { zone: 0 });
        assert!(failures[0].message.starts_with("flaky run"));
    }

    #[test]
    fn pool_without_workers_runs_inline() {
        let out = ResultQueue::new();
        let mut manager = TaskManager::new(0, 0);
        assert!(manager.publish_task(Box::new(Record {
            value: 9,
            out: out.clone(),
        })));
        assert_eq!(out.drain(), vec![9]);
        assert!(manager.is_idle());
    }
}
