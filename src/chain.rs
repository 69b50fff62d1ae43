#[path = "worker.rs"]
mod worker;

use crate::error::{Error, Result};
use crate::gate::{self, Passage, Signal, Wait};
use crate::sync::Mutex;
use std::io;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;
use tracing::{debug, trace, trace_span};

pub use self::worker::{current_position, Worker};

/// Runs `action` once on each of `n` concurrently started threads, strictly in
/// order of thread position from 0 through `n - 1`.
///
/// Returns after every invocation has completed. No two invocations overlap.
/// Fails with [`Error::InvalidArgument`] without calling `action` if `n` is 0.
///
/// ```
/// use std::sync::Mutex;
///
/// fn main() -> ochain::Result<()> {
///     let log = Mutex::new(Vec::new());
///
///     ochain::run_chain(5, || {
///         let position = ochain::current_position().unwrap();
///         log.lock().unwrap().push(position);
///     })?;
///
///     assert_eq!(*log.lock().unwrap(), [0, 1, 2, 3, 4]);
///     Ok(())
/// }
/// ```
pub fn run_chain<F>(n: usize, action: F) -> Result<()>
where
    F: Fn() + Sync,
{
    Chain::new(n).run(|_| action())
}

/// One-shot chain of workers that hand off to each other in position order.
///
/// Every worker is an OS thread, and all of them start at once. The worker at
/// position 0 acts immediately. Every other worker waits on a gate that only
/// its predecessor opens, after the predecessor's action is done. There is no
/// central scheduler; each worker talks only to its successor.
///
/// # Skeleton
///
/// ```
/// use ochain::Chain;
/// use std::time::Duration;
///
/// fn main() -> ochain::Result<()> {
///     Chain::new(4)
///         .name("paragraph")
///         .wait_timeout(Duration::from_secs(10))
///         .run(|worker| {
///             println!("paragraph #{}", worker.position);
///             if worker.is_last() {
///                 println!("-- end --");
///             }
///         })
/// }
/// ```
///
/// <details>
/// <summary style="padding-left:3em"><a><em>▷&emsp;Click to show output</em></a></summary>
///
/// ```text
/// paragraph #0
/// paragraph #1
/// paragraph #2
/// paragraph #3
/// -- end --
/// ```
/// </details>
///
/// <br>
///
/// # Failure
///
/// If an action panics, or a worker gives up waiting because of
/// [`wait_timeout`](Chain::wait_timeout), every later worker returns without
/// running its action and the run reports the position where the chain broke.
pub struct Chain {
    len: usize,
    name: String,
    wait_timeout: Option<Duration>,
    stack_size: Option<usize>,
}

#[cfg(test)]
struct _Test
where
    Chain: Send + Sync;

/// Everything one position needs, moved into its thread.
struct Link {
    position: usize,
    /// Gate opened by the predecessor. None at position 0.
    wait: Option<Wait>,
    /// Gate of the successor. None at the last position.
    signal: Option<Signal>,
}

impl Chain {
    /// Makes a chain of `len` workers with no wait timeout.
    pub fn new(len: usize) -> Self {
        Chain {
            len,
            name: "ochain".to_owned(),
            wait_timeout: None,
            stack_size: None,
        }
    }

    /// Prefix for worker thread names. The worker at position `p` is named
    /// `"{prefix}-{p}"`.
    pub fn name(mut self, prefix: impl Into<String>) -> Self {
        self.name = prefix.into();
        self
    }

    /// Bounds how long a worker waits once its predecessor's turn has begun.
    /// Time spent while earlier positions are still running does not count,
    /// so a long chain of short turns never trips it. Without this a stalled
    /// worker blocks the whole chain forever.
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Stack size in bytes for each worker thread.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Runs the chain, calling `action` once per worker in position order.
    ///
    /// Blocks until every worker thread has terminated.
    pub fn run<F>(self, action: F) -> Result<()>
    where
        F: Fn(&Worker) + Sync,
    {
        if self.len == 0 {
            return Err(Error::InvalidArgument { workers: self.len });
        }

        let links = self.links();
        let critical = Mutex::new(());
        debug!(workers = self.len, name = %self.name, "starting chain");

        let (spawn_error, mut outcomes) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.len);
            let mut spawn_error = None;

            // Spawn from the tail. Position 0 is the only worker that acts
            // without waiting, so it must be the last one to exist. On failure
            // the remaining links drop here, and their signal halves abandon
            // the gates of workers already parked.
            for link in links.into_iter().rev() {
                let position = link.position;
                match self.spawn(scope, link, &critical, &action) {
                    Ok(handle) => handles.push((position, handle)),
                    Err(source) => {
                        spawn_error = Some(Error::ResourceExhaustion { position, source });
                        break;
                    }
                }
            }

            let outcomes: Vec<(usize, Result<()>)> = handles
                .into_iter()
                .map(|(position, handle)| match handle.join() {
                    Ok(outcome) => (position, outcome),
                    Err(_) => (position, Err(Error::WorkerPanicked { position })),
                })
                .collect();
            (spawn_error, outcomes)
        });

        if let Some(error) = spawn_error {
            return Err(error);
        }

        // A stopped worker abandons everyone after it, so the lowest failing
        // position is the cause.
        outcomes.sort_by_key(|(position, _)| *position);
        for (_, outcome) in outcomes {
            outcome?;
        }

        debug!(workers = self.len, "chain finished");
        Ok(())
    }

    /// Creates every gate up front and deals out their halves.
    fn links(&self) -> Vec<Link> {
        let mut links = Vec::with_capacity(self.len);
        let mut wait = None;
        for position in 0..self.len {
            let (signal, next) = if position + 1 < self.len {
                let (signal, admit) = gate::gate();
                (Some(signal), Some(admit))
            } else {
                (None, None)
            };
            links.push(Link {
                position,
                wait: wait.take(),
                signal,
            });
            wait = next;
        }
        links
    }

    fn spawn<'scope, 'env, F>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        link: Link,
        critical: &'env Mutex<()>,
        action: &'env F,
    ) -> io::Result<ScopedJoinHandle<'scope, Result<()>>>
    where
        F: Fn(&Worker) + Sync,
    {
        let name = format!("{}-{}", self.name, link.position);
        let mut builder = thread::Builder::new().name(name);
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        let worker = Worker::new(link.position, self.len);
        let timeout = self.wait_timeout;
        builder.spawn_scoped(scope, move || link.run(&worker, timeout, critical, action))
    }
}

impl Link {
    fn run<F>(
        self,
        worker: &Worker,
        timeout: Option<Duration>,
        critical: &Mutex<()>,
        action: &F,
    ) -> Result<()>
    where
        F: Fn(&Worker) + Sync,
    {
        let position = self.position;
        let _span = trace_span!("worker", position).entered();
        let _enter = worker::enter(position);

        #[cfg(test)]
        tests::jitter();

        if let Some(wait) = self.wait {
            trace!("waiting for predecessor");
            match wait.wait(timeout) {
                Passage::Granted => {}
                // Dropping our own signal half passes the stop along.
                Passage::Abandoned => return Err(Error::Abandoned { position }),
                Passage::TimedOut => return Err(Error::Timeout { position }),
            }
        }

        // Our turn has begun; the successor's timeout counts from here.
        if let Some(signal) = &self.signal {
            signal.arm();
        }

        let _guard = critical.lock();
        action(worker);
        if let Some(signal) = self.signal {
            trace!("handing off to successor");
            signal.signal();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    /// Random delay before each worker reaches its gate, so that successors
    /// are often signaled before they start waiting.
    pub(super) fn jitter() {
        match fastrand::u8(0..4) {
            0 => {}
            1 => thread::yield_now(),
            _ => thread::sleep(Duration::from_micros(fastrand::u64(0..300))),
        }
    }

    fn shape(chain: &Chain) -> Vec<(usize, bool, bool)> {
        chain
            .links()
            .iter()
            .map(|link| (link.position, link.wait.is_some(), link.signal.is_some()))
            .collect()
    }

    #[test]
    fn links_of_single_worker() {
        assert_eq!(shape(&Chain::new(1)), [(0, false, false)]);
    }

    #[test]
    fn links_of_three_workers() {
        assert_eq!(
            shape(&Chain::new(3)),
            [(0, false, true), (1, true, true), (2, true, false)],
        );
    }

    #[test]
    fn zero_workers() {
        let error = Chain::new(0).run(|_| unreachable!()).unwrap_err();
        assert!(matches!(error, Error::InvalidArgument { workers: 0 }));
    }

    #[test]
    fn thread_names() {
        let names = std::sync::Mutex::new(Vec::new());
        Chain::new(2)
            .name("relay")
            .run(|_| {
                let name = thread::current().name().map(str::to_owned);
                names.lock().unwrap().push(name.unwrap());
            })
            .unwrap();
        assert_eq!(*names.lock().unwrap(), ["relay-0", "relay-1"]);
    }

    #[test]
    fn worker_fields() {
        let seen = std::sync::Mutex::new(Vec::new());
        Chain::new(3)
            .run(|worker| {
                let entry = (worker.position, worker.len, worker.is_last());
                seen.lock().unwrap().push(entry);
            })
            .unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            [(0, 3, false), (1, 3, false), (2, 3, true)],
        );
    }

    #[test]
    fn total_order_with_delayed_waiters() {
        (0..1000).into_par_iter().for_each(|_| {
            let n = fastrand::usize(1..=12);
            let log = std::sync::Mutex::new(Vec::with_capacity(n));
            Chain::new(n)
                .run(|worker| log.lock().unwrap().push(worker.position))
                .unwrap();
            assert_eq!(log.into_inner().unwrap(), (0..n).collect::<Vec<_>>());
        });
    }

    #[test]
    fn short_turns_under_longer_timeout() {
        let log = std::sync::Mutex::new(Vec::new());
        Chain::new(6)
            .wait_timeout(Duration::from_millis(100))
            .run(|worker| {
                thread::sleep(Duration::from_millis(30));
                log.lock().unwrap().push(worker.position);
            })
            .unwrap();
        assert_eq!(*log.lock().unwrap(), [0, 1, 2, 3, 4, 5]);
    }
}
