//! User-facing command output.
//!
//! Results go to stdout; logs go to stderr through `tracing`.

use std::fmt;
use std::io::{self, Write};

/// Write one line to stdout. A closed pipe is not an error worth reporting.
pub fn line(args: fmt::Arguments<'_>) {
    let _ = writeln!(io::stdout().lock(), "{args}");
}
