//! # Kernel Monitor
//!
//! An interactive, line-oriented debug console that lives inside the kernel.
//! It lets a developer inspect and poke at live kernel state without a reboot:
//! stack traces, virtual-memory mappings, page permission bits and raw memory.
//!
//! ## Overview
//!
//! ```text
//! Monitor::run
//!     ↓  Console::read_line("K> ")
//! Args::tokenize            (whitespace split, max 16 tokens)
//!     ↓
//! CommandRegistry::dispatch (exact name match, registration order)
//!     ↓
//! ┌───────────┬──────────┬──────────────┬─────────┬─────────┬──────┐
//! │ backtrace │ kerninfo │ showmappings │ setperm │ checkvm │ help │
//! └───────────┴──────────┴──────────────┴─────────┴─────────┴──────┘
//!       │                       │             │          │
//!   Unwinder              PageWalker    PageTableLock  MemoryReader
//!   SymbolResolver
//! ```
//!
//! ## Collaborators
//!
//! The monitor does not own any of the structures it inspects. Everything it
//! touches comes in through a [`Machine`]:
//!
//! | Trait / type | Provides |
//! |--------------|----------|
//! | [`PageWalker`] | page-table walk returning the entry slot for a VA, optionally creating tables |
//! | [`PageTableLock`] | serializes `setperm` against other page-table mutators |
//! | [`MemoryReader`] | the current frame pointer and raw word reads |
//! | [`SymbolResolver`] | function / file / line for an instruction address |
//! | [`KernelLayout`] | special kernel section symbols for `kerninfo` |
//!
//! Console input and output go through the [`Console`] trait.
//!
//! ## Error model
//!
//! Handlers return `Result<Flow, MonitorError>`. Every error is printed on the
//! console and the loop continues; only [`Flow::Exit`] ends a session.
//! Dereferencing an unmapped address in `checkvm` is *not* an error the
//! monitor can recover from. It faults the caller, as with any raw memory access
//! from kernel mode.
//!
//! ## Example
//!
//! ```rust
//! use kernel_monitor::{Args, parse_address};
//!
//! let args = Args::tokenize("  showmappings  0x1000 0x2000 ", 16).unwrap();
//! assert_eq!(args.iter().collect::<Vec<_>>(), ["showmappings", "0x1000", "0x2000"]);
//! assert_eq!(parse_address(args.get(1).unwrap()), Ok(0x1000));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

#[macro_use]
mod console;

pub mod address;
mod args;
pub mod backtrace;
mod command;
pub mod commands;
mod error;
pub mod inspect;
mod layout;
mod lock;
pub mod memory;
mod monitor;
mod page_entry;
pub mod symbols;

pub use crate::address::{PhysicalAddress, VirtualAddress, parse_address};
pub use crate::args::{Args, MAX_ARGS};
pub use crate::backtrace::{Frame, StackBounds, Stop, Unwinder};
pub use crate::command::{Command, CommandRegistry, Flow, Handler, Session, TrapFrame};
pub use crate::console::Console;
pub use crate::error::MonitorError;
pub use crate::inspect::{PageMappingView, PageWalker, PermissionUpdate};
pub use crate::layout::KernelLayout;
pub use crate::lock::{PageTableGuard, PageTableLock};
pub use crate::memory::MemoryReader;
pub use crate::monitor::{Machine, Monitor, MonitorConfig};
pub use crate::page_entry::{PageEntryBits, Permission, PermissionBits, Toggle};
pub use crate::symbols::{Symbol, SymbolInfo, SymbolResolver, SymbolTable};
