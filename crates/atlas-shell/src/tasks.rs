// SPDX-License-Identifier: CEPL-1.0
//! Closures posted from any thread, executed on the shell thread at the
//! top of each pump.

use tracing::warn;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable posting handle. Valid for the life of the process; tasks
/// posted after the shell is gone are dropped with a warning.
#[derive(Clone)]
pub struct AsyncQueue {
    tx: flume::Sender<Task>,
}

impl AsyncQueue {
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(task)).is_err() {
            warn!("async task dropped; shell no longer running");
        }
    }
}

/// Receiving side, owned by the shell.
pub(crate) struct TaskQueue {
    tx: flume::Sender<Task>,
    rx: flume::Receiver<Task>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        TaskQueue { tx, rx }
    }

    pub(crate) fn handle(&self) -> AsyncQueue {
        AsyncQueue {
            tx: self.tx.clone(),
        }
    }

    /// Runs the tasks queued at entry, in post order. Tasks posted while
    /// draining wait for the next drain, so a task that re-posts itself
    /// cannot wedge the pump.
    pub(crate) fn drain(&self) -> usize {
        let pending = self.rx.len();
        let mut ran = 0;
        for _ in 0..pending {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn tasks_run_in_post_order() {
        let queue = TaskQueue::new();
        let handle = queue.handle();

        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            handle.post(move || log.lock().unwrap().push(i));
        }

        assert_eq!(queue.drain(), 3);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn posts_cross_threads() {
        let queue = TaskQueue::new();
        let handle = queue.handle();

        let worker = std::thread::spawn(move || {
            handle.post(|| {});
            handle.post(|| {});
        });
        worker.join().unwrap();

        assert_eq!(queue.drain(), 2);
    }

    #[test]
    fn reposted_tasks_wait_for_the_next_drain() {
        let queue = TaskQueue::new();
        let handle = queue.handle();

        let again = handle.clone();
        handle.post(move || again.post(|| {}));

        assert_eq!(queue.drain(), 1);
        assert_eq!(queue.drain(), 1);
        assert_eq!(queue.drain(), 0);
    }
}
