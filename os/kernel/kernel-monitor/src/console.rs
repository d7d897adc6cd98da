//! # Console device interface

use alloc::string::String;
use core::fmt;

/// The terminal the monitor talks to.
///
/// Output goes through [`fmt::Write`]; input is read one line at a time.
/// `read_line` blocks the calling thread until a full line is available.
pub trait Console: fmt::Write {
    /// Print `prompt`, then read one line of input. A trailing line terminator
    /// may be left in place; the tokenizer treats it as whitespace.
    ///
    /// Returns `None` once the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Write formatted output, ignoring sink errors.
///
/// Console output is best-effort: a failing device must not abort a command.
#[doc(hidden)]
#[inline]
pub fn write_best_effort<W: fmt::Write + ?Sized>(out: &mut W, args: fmt::Arguments) {
    let _ = out.write_fmt(args);
}

/// `writeln!` onto a console-like sink, dropping write errors.
macro_rules! outln {
    ($out:expr) => {
        $crate::console::write_best_effort($out, ::core::format_args!("\n"))
    };
    ($out:expr, $($arg:tt)*) => {
        $crate::console::write_best_effort(
            $out,
            ::core::format_args!("{}\n", ::core::format_args!($($arg)*)),
        )
    };
}
