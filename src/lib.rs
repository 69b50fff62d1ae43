//! Run one action on each of N threads in a fixed order, with every thread
//! handing off only to the next.
//!
//! # Use case
//!
//! Suppose a fixed number of threads each own one step of some output, for
//! example one paragraph of a document. All of them are started together and
//! the operating system schedules them however it likes, but the steps must
//! happen in a known order: thread 0 first, then thread 1, and so on.
//!
//! A global barrier or a central dispatcher would do it, but neither is needed.
//! It is enough for each thread to wait for a signal from its predecessor and
//! to signal its successor once its own step is done.
//!
//! # Objective
//!
//!   - We have a chain of positions 0..N, one thread per position.
//!
//!   - The action of position p runs strictly after that of p-1 and strictly
//!     before that of p+1, and no two actions overlap.
//!
//!   - The only coordination is between neighbours: one one-shot gate per
//!     position, opened by the predecessor, waited on by the owner. A signal
//!     that arrives before its waiter starts waiting is never lost.
//!
//!   - The chain runs exactly once and then is gone.
//!
//! ```
//! fn main() -> ochain::Result<()> {
//!     ochain::run_chain(3, || {
//!         println!("hello from position {}", ochain::current_position().unwrap());
//!     })
//! }
//! ```

mod chain;
mod error;
mod gate;
pub mod manpage;
mod sync;

pub use crate::chain::{current_position, run_chain, Chain, Worker};
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use termcolor::WriteColor;
