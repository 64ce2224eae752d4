// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dedicated-thread executor standing in for the host's UI looper.

use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::channel::{MainThread, Task};

/// Runs posted tasks in order on one named thread.
///
/// Dropping the looper closes the queue; the thread drains what is left and
/// exits.
pub struct Looper {
    queue: Mutex<Option<Sender<Task>>>,
    worker: Option<JoinHandle<()>>,
}

impl Looper {
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Task>();
        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    task();
                }
                debug!("looper queue closed");
            })?;

        Ok(Self {
            queue: Mutex::new(Some(tx)),
            worker: Some(worker),
        })
    }
}

impl MainThread for Looper {
    fn post(&self, task: Task) {
        let sent = self
            .queue
            .lock()
            .ok()
            .and_then(|q| q.as_ref().map(|tx| tx.send(task).is_ok()))
            .unwrap_or(false);
        if !sent {
            warn!("task posted to a stopped looper was dropped");
        }
    }
}

impl Drop for Looper {
    fn drop(&mut self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.take();
        }
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn tasks_run_in_order_on_the_looper_thread() {
        let looper = Looper::spawn("beacon-test-main").expect("spawn looper");
        let (tx, rx) = mpsc::channel();
        for i in 0..3 {
            let tx = tx.clone();
            looper.post(Box::new(move || {
                let name = thread::current().name().map(str::to_owned);
                let _ = tx.send((i, name));
            }));
        }

        for expected in 0..3 {
            let (i, name) = rx.recv_timeout(Duration::from_secs(1)).expect("task ran");
            assert_eq!(i, expected);
            assert_eq!(name.as_deref(), Some("beacon-test-main"));
        }
    }

    #[test]
    fn drop_drains_pending_tasks() {
        let counter = Arc::new(Mutex::new(0));
        {
            let looper = Looper::spawn("beacon-test-drain").expect("spawn looper");
            for _ in 0..5 {
                let counter = Arc::clone(&counter);
                looper.post(Box::new(move || {
                    if let Ok(mut c) = counter.lock() {
                        *c += 1;
                    }
                }));
            }
        }
        assert_eq!(*counter.lock().expect("lock"), 5);
    }
}
