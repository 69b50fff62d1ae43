//! Prints the semaphore manual page, one paragraph per chain worker.
//!
//! Seven threads start at once and each owns one paragraph. The page still
//! comes out in reading order because every thread waits for the one before
//! it.
//!
//! ```
//! use ochain::manpage::Manpage;
//! use termcolor::Buffer;
//!
//! fn main() -> ochain::Result<()> {
//!     let output = Manpage::new(Buffer::no_color()).print()?;
//!     let text = String::from_utf8(output.into_inner()).unwrap();
//!     assert!(text.starts_with("A semaphore S is an unsigned-integer-valued variable."));
//!     Ok(())
//! }
//! ```

use crate::chain::Chain;
use crate::error::{Error, Result};
use crate::sync::Mutex;
use std::io::{self, Write};
use termcolor::ColorChoice::Auto;
use termcolor::{ColorSpec, StandardStream, WriteColor};

/// Paragraphs of the page, in reading order.
pub const PARAGRAPHS: [&str; 7] = [
    "A semaphore S is an unsigned-integer-valued variable.\n\
     Two operations are of primary interest:",
    "P(S): If processes have been blocked waiting on this semaphore,\n \
     wake one of them, else S <- S + 1.",
    "V(S): If S > 0 then S <- S - 1, else suspend execution of the calling process.\n \
     The calling process is said to be blocked on the semaphore S.",
    "A semaphore S has the following properties:",
    "1. P(S) and V(S) are atomic instructions. Specifically, no\n \
     instructions can be interleaved between the test that S > 0 and the\n \
     decrement of S or the suspension of the calling process.",
    "2. A semaphore must be given an non-negative initial value.",
    "3. The V(S) operation must wake one of the suspended processes. The\n \
     definition does not specify which process will be awakened.",
];

/// Writer of the manual page.
pub struct Manpage<W> {
    stream: Mutex<W>,
}

#[cfg(test)]
struct _Test
where
    Manpage<termcolor::Buffer>: Send + Sync;

impl Manpage<StandardStream> {
    /// Makes a manpage whose output goes to stdout.
    pub fn stdout() -> Self {
        Self::new(StandardStream::stdout(Auto))
    }

    /// Makes a manpage whose output goes to stderr.
    pub fn stderr() -> Self {
        Self::new(StandardStream::stderr(Auto))
    }
}

impl<W: WriteColor + Send> Manpage<W> {
    /// Makes a manpage that writes into `stream`.
    pub fn new(stream: W) -> Self {
        Manpage {
            stream: Mutex::new(stream),
        }
    }

    /// Writes one paragraph followed by a blank line. The first line of the
    /// paragraph is bold.
    ///
    /// Positions past the end of the page write nothing.
    pub fn show_paragraph(&self, position: usize) -> io::Result<()> {
        let paragraph = match PARAGRAPHS.get(position) {
            Some(paragraph) => paragraph,
            None => return Ok(()),
        };
        let (head, rest) = match paragraph.split_once('\n') {
            Some((head, rest)) => (head, Some(rest)),
            None => (*paragraph, None),
        };

        let stream = &mut *self.stream.lock();
        let mut spec = ColorSpec::new();
        spec.set_bold(true);
        stream.set_color(&spec)?;
        write!(stream, "{}", head)?;
        stream.reset()?;
        if let Some(rest) = rest {
            write!(stream, "\n{}", rest)?;
        }
        writeln!(stream, "\n")?;
        stream.flush()
    }

    /// Prints the whole page with one chain worker per paragraph and hands
    /// back the stream.
    pub fn print(self) -> Result<W> {
        self.print_with(|chain| chain)
    }

    /// Like `print`, with the chain adjusted by `configure` before it runs,
    /// for example to set a wait timeout or a stack size. Worker threads are
    /// named `manpage-{p}` unless `configure` renames them.
    ///
    /// ```
    /// use ochain::manpage::Manpage;
    /// use std::time::Duration;
    ///
    /// fn main() -> ochain::Result<()> {
    ///     Manpage::stdout().print_with(|chain| chain.wait_timeout(Duration::from_secs(5)))?;
    ///     Ok(())
    /// }
    /// ```
    pub fn print_with(self, configure: impl FnOnce(Chain) -> Chain) -> Result<W> {
        let failed = Mutex::new(None);
        let chain = configure(Chain::new(PARAGRAPHS.len()).name("manpage"));
        chain.run(|worker| {
            if let Err(error) = self.show_paragraph(worker.position) {
                failed.lock().get_or_insert(error);
            }
        })?;
        match failed.into_inner() {
            Some(error) => Err(Error::Output(error)),
            None => Ok(self.stream.into_inner()),
        }
    }
}
