//! Fan-out of roots to workers and fan-in of their events

use std::io;
use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::Receiver;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use super::SearchEvent;
use super::traversal::Traversal;

/// Bounds how many roots are searched at once.
///
/// Each running worker holds one open root and at most one decoder per
/// nesting level, so this is also the bound on open handles and decoder
/// processes.
#[derive(Debug, Clone)]
pub struct Limiter {
    pool: Arc<ThreadPool>,
    workers: usize,
}

impl Limiter {
    /// A limiter running `workers` roots at a time; `0` uses the host's
    /// available parallelism.
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            workers
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ztgrep-worker-{}", i))
            .panic_handler(|_| log::error!("search worker panicked"))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.pool.spawn(job);
    }
}

/// Number of workers that have been handed a root and not yet finished.
#[derive(Debug, Default)]
struct Outstanding {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Outstanding {
    fn enter(self: &Arc<Self>) -> WorkerGuard {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        WorkerGuard(Arc::clone(self))
    }

    /// Block until every entered worker has left.
    fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self.idle.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Marks one worker as finished when dropped, including on panic.
struct WorkerGuard(Arc<Outstanding>);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count -= 1;
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

pub(super) fn start(
    traversal: Arc<Traversal>,
    roots: Vec<String>,
    limiter: &Limiter,
) -> io::Result<Receiver<SearchEvent>> {
    // Zero capacity: a worker's send completes only when the consumer takes
    // the event.
    let (sender, receiver) = crossbeam_channel::bounded(0);
    let limiter = limiter.clone();
    let outstanding = Arc::new(Outstanding::default());

    let dispatch = move || {
        let total = roots.len();
        for root in roots {
            let guard = outstanding.enter();
            let traversal = Arc::clone(&traversal);
            let mut sink = sender.clone();
            limiter.spawn(move || {
                let _guard = guard;
                traversal.search_root(&root, &mut sink);
                log::debug!("finished {}", root);
            });
        }
        outstanding.wait();
        log::debug!("all {} roots searched", total);
        drop(sender);
    };

    thread::Builder::new()
        .name("ztgrep-dispatch".to_string())
        .spawn(dispatch)?;
    Ok(receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_limiter_uses_requested_workers() {
        assert_eq!(Limiter::new(3).unwrap().workers(), 3);
        assert!(Limiter::new(0).unwrap().workers() >= 1);
    }

    #[test]
    fn test_outstanding_wait_returns_when_all_guards_drop() {
        let outstanding = Arc::new(Outstanding::default());
        let guards: Vec<_> = (0..4).map(|_| outstanding.enter()).collect();

        let waiter = {
            let outstanding = Arc::clone(&outstanding);
            thread::spawn(move || outstanding.wait())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        drop(guards);
        waiter.join().unwrap();
    }

    #[test]
    fn test_wait_with_nothing_outstanding() {
        Outstanding::default().wait();
    }

    #[test]
    fn test_limiter_runs_spawned_jobs() {
        let limiter = Limiter::new(2).unwrap();
        let outstanding = Arc::new(Outstanding::default());
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..8 {
            let guard = outstanding.enter();
            let tx = tx.clone();
            limiter.spawn(move || {
                let _guard = guard;
                tx.send(i).unwrap();
            });
        }
        outstanding.wait();
        drop(tx);
        let mut seen: Vec<i32> = rx.iter().collect();
        seen.sort();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }
}
