//! One-shot gate between two neighbouring positions of a chain.
//!
//! A gate is created as a pair of halves. The `Signal` half belongs to the
//! worker one position earlier and the `Wait` half to the worker it admits.
//! Both halves are consumed by value, so a gate is signaled at most once and
//! waited on at most once.

use crate::sync::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Unsignaled,
    /// The signaling worker has been admitted and is taking its turn.
    Armed,
    Signaled,
    /// The signal half was dropped without signaling.
    Abandoned,
}

impl State {
    fn is_pending(self) -> bool {
        matches!(self, State::Unsignaled | State::Armed)
    }
}

/// How a wait on a gate ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Passage {
    Granted,
    Abandoned,
    TimedOut,
}

struct Inner {
    state: Mutex<State>,
    cond: Condvar,
}

pub(crate) struct Signal {
    inner: Arc<Inner>,
}

pub(crate) struct Wait {
    inner: Arc<Inner>,
}

pub(crate) fn gate() -> (Signal, Wait) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State::Unsignaled),
        cond: Condvar::new(),
    });
    let signal = Signal {
        inner: Arc::clone(&inner),
    };
    (signal, Wait { inner })
}

impl Inner {
    fn settle(&self, to: State) {
        let mut state = self.state.lock();
        if state.is_pending() {
            *state = to;
            // There is never more than one waiter.
            self.cond.notify_one();
        }
    }
}

impl Signal {
    /// Marks that the signaling worker has started its turn. A timed wait
    /// only starts counting from here.
    pub(crate) fn arm(&self) {
        let mut state = self.inner.state.lock();
        if *state == State::Unsignaled {
            *state = State::Armed;
            self.inner.cond.notify_one();
        }
    }

    /// Opens the gate. Returns immediately whether or not the waiter has
    /// started waiting yet.
    pub(crate) fn signal(self) {
        self.inner.settle(State::Signaled);
    }
}

impl Drop for Signal {
    fn drop(&mut self) {
        // No-op after `signal`, which already closed the state machine.
        self.inner.settle(State::Abandoned);
    }
}

impl Wait {
    /// Blocks until the gate is signaled or abandoned.
    ///
    /// With a `timeout`, the wait gives up once the gate has been armed for
    /// that long. Time spent before the signaler is armed does not count.
    pub(crate) fn wait(self, timeout: Option<Duration>) -> Passage {
        let inner = &*self.inner;
        let state = inner.state.lock();
        let state = match timeout {
            Some(timeout) => {
                let state = inner.cond.wait_while(state, |state| *state == State::Unsignaled);
                inner
                    .cond
                    .wait_timeout_while(state, timeout, |state| *state == State::Armed)
            }
            None => inner.cond.wait_while(state, |state| state.is_pending()),
        };
        match *state {
            State::Signaled => Passage::Granted,
            State::Abandoned => Passage::Abandoned,
            State::Unsignaled | State::Armed => Passage::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn signal_before_wait() {
        let (signal, wait) = gate();
        signal.signal();
        assert_eq!(wait.wait(None), Passage::Granted);
    }

    #[test]
    fn signal_from_other_thread() {
        let (signal, wait) = gate();
        let signaler = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signal.signal();
        });
        assert_eq!(wait.wait(None), Passage::Granted);
        signaler.join().unwrap();
    }

    #[test]
    fn dropped_signal_abandons() {
        let (signal, wait) = gate();
        let dropper = thread::spawn(move || drop(signal));
        assert_eq!(wait.wait(None), Passage::Abandoned);
        dropper.join().unwrap();
    }

    #[test]
    fn timeout_counts_from_arm() {
        let (signal, wait) = gate();
        let signaler = thread::spawn(move || {
            // Longer than the timeout, but the gate is not armed yet.
            thread::sleep(Duration::from_millis(100));
            signal.arm();
            signal.signal();
        });
        assert_eq!(
            wait.wait(Some(Duration::from_millis(20))),
            Passage::Granted,
        );
        signaler.join().unwrap();
    }

    #[test]
    fn armed_then_dropped_abandons() {
        let (signal, wait) = gate();
        signal.arm();
        drop(signal);
        assert_eq!(wait.wait(Some(Duration::from_secs(5))), Passage::Abandoned);
    }

    #[test]
    fn signal_after_arm_without_timeout() {
        let (signal, wait) = gate();
        let signaler = thread::spawn(move || {
            signal.arm();
            thread::sleep(Duration::from_millis(10));
            signal.signal();
        });
        assert_eq!(wait.wait(None), Passage::Granted);
        signaler.join().unwrap();
    }

    #[test]
    fn timeout_without_signal() {
        let (signal, wait) = gate();
        signal.arm();
        assert_eq!(
            wait.wait(Some(Duration::from_millis(10))),
            Passage::TimedOut,
        );
        // Nobody is left to wake.
        signal.signal();
    }

    #[test]
    fn signal_within_timeout() {
        let (signal, wait) = gate();
        signal.signal();
        assert_eq!(wait.wait(Some(Duration::from_secs(5))), Passage::Granted);
    }

    #[test]
    fn racing_signal_is_never_lost() {
        for _ in 0..2000 {
            let (signal, wait) = gate();
            let signal_delay = fastrand::u64(0..20);
            let wait_delay = fastrand::u64(0..20);
            let signaler = thread::spawn(move || {
                for _ in 0..signal_delay {
                    thread::yield_now();
                }
                signal.signal();
            });
            for _ in 0..wait_delay {
                thread::yield_now();
            }
            assert_eq!(wait.wait(None), Passage::Granted);
            signaler.join().unwrap();
        }
    }
}
