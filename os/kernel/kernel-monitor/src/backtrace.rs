//! # Frame-Pointer Stack Unwinder
//!
//! With frame pointers enabled every call frame starts with a two-word record:
//!
//! ```text
//!  higher addresses (callers)
//!   ┌────────────────────┐
//!   │ arg 3              │  fp + 40
//!   │ arg 2              │  fp + 32
//!   │ arg 1              │  fp + 24
//!   │ arg 0              │  fp + 16
//!   │ return address     │  fp + 8
//!   │ saved caller fp    │  fp      ◄── current frame pointer
//!   └────────────────────┘
//!  lower addresses (callees)
//! ```
//!
//! [`Unwinder`] follows the saved-fp links until it reaches a null frame
//! pointer. Unwinding a corrupted stack is routine in a debug console, so
//! the walk is bounded: it stops after a maximum depth, when a frame pointer
//! leaves [`StackBounds`], is misaligned, or fails to move towards the stack
//! base. The reason is available from [`Unwinder::stop`].

use crate::address::{VirtualAddress, WORD_SIZE};
use crate::memory::MemoryReader;
use core::fmt;
use log::warn;

/// Number of argument words printed per frame.
pub const ARG_WORDS: usize = 4;

/// Words in one inspected frame record: saved fp, return address, arguments.
const RECORD_WORDS: u64 = 2 + ARG_WORDS as u64;

/// Default depth limit.
pub const DEFAULT_MAX_FRAMES: usize = 64;

/// One unwound call frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub frame_pointer: u64,
    pub return_address: u64,
    /// The four words above the return address, printed verbatim.
    pub args: [u64; ARG_WORDS],
}

/// The address range a frame record must lie in, `[low, high)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StackBounds {
    pub low: u64,
    pub high: u64,
}

impl StackBounds {
    /// Accept any address. The depth and ordering guards still apply.
    pub const ANY: Self = Self {
        low: 0,
        high: u64::MAX,
    };

    #[must_use]
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    /// Whether the whole frame record at `fp` lies inside the bounds.
    #[must_use]
    pub const fn contains_record(&self, fp: u64) -> bool {
        match fp.checked_add(RECORD_WORDS * WORD_SIZE) {
            Some(end) => fp >= self.low && end <= self.high,
            None => false,
        }
    }
}

impl Default for StackBounds {
    fn default() -> Self {
        Self::ANY
    }
}

/// Why an [`Unwinder`] stopped producing frames.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Stop {
    /// Reached the terminating null frame pointer.
    Complete,
    /// Produced the maximum number of frames.
    DepthLimit(usize),
    /// The frame pointer lies outside the stack bounds.
    OutOfBounds(u64),
    /// The frame pointer is not word aligned.
    Misaligned(u64),
    /// The saved frame pointer does not point above the current one.
    NotAscending { current: u64, saved: u64 },
}

impl Stop {
    /// `true` for a clean end of the chain.
    #[inline]
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Complete => f.write_str("end of frame chain"),
            Self::DepthLimit(n) => write!(f, "depth limit of {n} frames reached"),
            Self::OutOfBounds(fp) => write!(f, "frame pointer {fp:016x} outside the stack"),
            Self::Misaligned(fp) => write!(f, "frame pointer {fp:016x} is misaligned"),
            Self::NotAscending { current, saved } => write!(
                f,
                "saved frame pointer {saved:016x} does not lie above {current:016x}"
            ),
        }
    }
}

/// Iterator over the frame-pointer chain, innermost frame first.
pub struct Unwinder<'a, M: MemoryReader + ?Sized> {
    memory: &'a M,
    next: u64,
    previous: Option<u64>,
    bounds: StackBounds,
    remaining: usize,
    max_frames: usize,
    stop: Option<Stop>,
}

impl<'a, M: MemoryReader + ?Sized> Unwinder<'a, M> {
    /// Unwind starting at the frame record at `frame_pointer`.
    #[must_use]
    pub const fn new(memory: &'a M, frame_pointer: u64) -> Self {
        Self {
            memory,
            next: frame_pointer,
            previous: None,
            bounds: StackBounds::ANY,
            remaining: DEFAULT_MAX_FRAMES,
            max_frames: DEFAULT_MAX_FRAMES,
            stop: None,
        }
    }

    /// Unwind from the frame of whoever called `memory.frame_pointer()`.
    #[must_use]
    pub fn from_current(memory: &'a M) -> Self {
        Self::new(memory, memory.frame_pointer())
    }

    #[must_use]
    pub const fn with_bounds(mut self, bounds: StackBounds) -> Self {
        self.bounds = bounds;
        self
    }

    #[must_use]
    pub const fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.remaining = max_frames;
        self.max_frames = max_frames;
        self
    }

    /// Why the walk ended; `None` while frames may still follow.
    #[inline]
    #[must_use]
    pub const fn stop(&self) -> Option<Stop> {
        self.stop
    }

    fn finish(&mut self, stop: Stop) -> Option<Frame> {
        if !stop.is_complete() {
            warn!("backtrace stopped early: {stop}");
        }
        self.stop = Some(stop);
        None
    }

    fn word(&self, fp: u64, index: u64) -> u64 {
        self.memory
            .read_word(VirtualAddress::new(fp + index * WORD_SIZE))
    }
}

impl<M: MemoryReader + ?Sized> Iterator for Unwinder<'_, M> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.stop.is_some() {
            return None;
        }

        let fp = self.next;
        if fp == 0 {
            return self.finish(Stop::Complete);
        }
        if self.remaining == 0 {
            return self.finish(Stop::DepthLimit(self.max_frames));
        }
        if let Some(current) = self.previous
            && fp <= current
        {
            return self.finish(Stop::NotAscending { current, saved: fp });
        }
        if fp % WORD_SIZE != 0 {
            return self.finish(Stop::Misaligned(fp));
        }
        if !self.bounds.contains_record(fp) {
            return self.finish(Stop::OutOfBounds(fp));
        }

        let frame = Frame {
            frame_pointer: fp,
            return_address: self.word(fp, 1),
            args: core::array::from_fn(|i| self.word(fp, 2 + i as u64)),
        };

        self.previous = Some(fp);
        self.next = self.word(fp, 0);
        self.remaining -= 1;
        Some(frame)
    }
}
