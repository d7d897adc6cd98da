use alloc::string::String;
use thiserror::Error;

/// Everything a monitor command can fail with.
///
/// The [`Display`](core::fmt::Display) text is exactly what the console shows
/// to the user.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum MonitorError {
    /// An address token was neither decimal nor `0x`-prefixed lowercase hex.
    #[error("Support only addresses represented in Lowercase Hex or Decimal")]
    InvalidAddress,

    /// The input line had more tokens than the tokenizer accepts.
    #[error("Too many arguments (max {max})")]
    TooManyArguments { max: usize },

    /// Wrong argument count or a malformed flag; carries the usage line.
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// No registered command has this name.
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    /// `setperm` was given a permission letter other than `P`, `W` or `U`.
    #[error("Permission {0} not supported")]
    UnsupportedPermission(String),

    /// A range command was given `start > end`.
    #[error("Invalid range: start {start:x} lies above end {end:x}")]
    InvertedRange { start: u64, end: u64 },

    /// The page walker could not produce an entry slot, even when asked to allocate.
    #[error("No page table entry for {0:x}")]
    NoPageTableEntry(u64),
}
