use std::sync::{Condvar as StdCondvar, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Non-poisoning mutex.
pub(crate) struct Mutex<T: ?Sized> {
    std: StdMutex<T>,
}

impl<T> Mutex<T> {
    pub(crate) fn new(value: T) -> Self {
        Mutex {
            std: StdMutex::new(value),
        }
    }

    pub(crate) fn into_inner(self) -> T {
        self.std.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized> Mutex<T> {
    pub(crate) fn lock(&self) -> MutexGuard<T> {
        self.std.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Non-poisoning condition variable, paired with a guard from `Mutex::lock`.
pub(crate) struct Condvar {
    std: StdCondvar,
}

impl Condvar {
    pub(crate) fn new() -> Self {
        Condvar {
            std: StdCondvar::new(),
        }
    }

    /// Blocks while `condition` holds. The check and the suspend happen under
    /// the same lock, so a notification cannot slip in between them.
    pub(crate) fn wait_while<'a, T, F>(
        &self,
        guard: MutexGuard<'a, T>,
        condition: F,
    ) -> MutexGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        self.std
            .wait_while(guard, condition)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Like `wait_while` but gives up after `timeout`. The caller inspects the
    /// guarded value to tell whether the condition cleared.
    pub(crate) fn wait_timeout_while<'a, T, F>(
        &self,
        guard: MutexGuard<'a, T>,
        timeout: Duration,
        condition: F,
    ) -> MutexGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        match self.std.wait_timeout_while(guard, timeout, condition) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    pub(crate) fn notify_one(&self) {
        self.std.notify_one();
    }
}
