use std::cell::Cell;
use std::fmt::{self, Debug};

thread_local! {
    static POSITION: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Handle given to the action of one chain worker.
///
/// ```
/// use ochain::Chain;
///
/// fn main() -> ochain::Result<()> {
///     Chain::new(3).run(|worker| {
///         println!("worker {} of {}", worker.position, worker.len);
///     })
/// }
/// ```
#[readonly::make]
pub struct Worker {
    /// Position of this worker in the chain, from 0 through `len - 1`.
    /// Actions run in ascending order of position.
    ///
    /// This field is read-only; writing to its value will not compile.
    pub position: usize,

    /// Number of workers in the chain.
    pub len: usize,
}

impl Debug for Worker {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Worker")
            .field("position", &self.position)
            .field("len", &self.len)
            .finish()
    }
}

impl Worker {
    pub(super) fn new(position: usize, len: usize) -> Self {
        Worker { position, len }
    }

    /// Whether this worker runs the final action of the chain.
    pub fn is_last(&self) -> bool {
        self.position + 1 == self.len
    }
}

/// Position of the chain worker running on the current thread.
///
/// Returns `None` when called from a thread that is not a chain worker.
///
/// ```
/// assert_eq!(ochain::current_position(), None);
///
/// ochain::run_chain(2, || {
///     let position = ochain::current_position().unwrap();
///     println!("hello from position {}", position);
/// })
/// .unwrap();
/// ```
pub fn current_position() -> Option<usize> {
    POSITION.with(Cell::get)
}

/// Binds a position to the current thread until dropped.
pub(super) struct Enter {
    previous: Option<usize>,
}

pub(super) fn enter(position: usize) -> Enter {
    let previous = POSITION.with(|current| current.replace(Some(position)));
    Enter { previous }
}

impl Drop for Enter {
    fn drop(&mut self) {
        POSITION.with(|current| current.set(self.previous));
    }
}
