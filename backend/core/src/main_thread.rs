use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A host-visible side effect queued for the designated thread.
pub type MainTask = Box<dyn FnOnce() + Send + 'static>;

/// Consumer end of the designated-thread queue.
///
/// Created on the thread that owns host-visible output. Other threads post
/// work through a [`MainThreadHandle`]; the owner drains it with
/// [`MainThread::pump`] or [`MainThread::run`].
pub struct MainThread {
    owner: ThreadId,
    rx: mpsc::UnboundedReceiver<MainTask>,
    handle: MainThreadHandle,
}

/// Producer end of the designated-thread queue. Cheap to clone.
#[derive(Clone)]
pub struct MainThreadHandle {
    owner: ThreadId,
    tx: mpsc::UnboundedSender<MainTask>,
}

impl MainThread {
    /// Bind the queue to the calling thread.
    pub fn bind_current() -> Self {
        let owner = thread::current().id();
        let (tx, rx) = mpsc::unbounded_channel();
        debug!(thread = ?owner, "Designated thread bound");
        Self {
            owner,
            rx,
            handle: MainThreadHandle { owner, tx },
        }
    }

    pub fn handle(&self) -> MainThreadHandle {
        self.handle.clone()
    }

    /// Run every task queued so far. Returns how many ran.
    pub fn pump(&mut self) -> usize {
        self.assert_owner();
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Block the designated thread and run tasks until every handle,
    /// including the one held by `self`, is dropped. Must not be called from
    /// inside an async runtime.
    pub fn run(self) {
        self.assert_owner();
        let MainThread { mut rx, handle, .. } = self;
        drop(handle);
        while let Some(task) = rx.blocking_recv() {
            task();
        }
    }

    fn assert_owner(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "designated-thread queue drained from a foreign thread"
        );
    }
}

impl MainThreadHandle {
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Run `task` now if already on the designated thread, otherwise queue it.
    /// Fire-and-forget: no acknowledgement is returned.
    pub fn run_on_main<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_main_thread() {
            task();
            return;
        }
        if self.tx.send(Box::new(task)).is_err() {
            warn!("Designated thread queue closed; dropping task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_runs_inline_on_owner() {
        let main = MainThread::bind_current();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        main.handle().run_on_main(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queues_from_worker() {
        let mut main = MainThread::bind_current();
        let handle = main.handle();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();

        thread::spawn(move || {
            assert!(!handle.is_main_thread());
            handle.run_on_main(move || {
                h.fetch_add(1, Ordering::SeqCst);
            });
        })
        .join()
        .unwrap();

        // Nothing runs until the owner drains the queue.
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(main.pump(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_exits_when_handles_dropped() {
        let main = MainThread::bind_current();
        let handle = main.handle();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();

        let worker = thread::spawn(move || {
            for _ in 0..3 {
                let h = h.clone();
                handle.run_on_main(move || {
                    h.fetch_add(1, Ordering::SeqCst);
                });
            }
        });
        worker.join().unwrap();
        main.run();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
