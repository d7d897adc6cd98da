//! # Built-in Commands
//!
//! | Command | Arguments | Effect |
//! |---------|-----------|--------|
//! | `help` | – | list every command with its description |
//! | `kerninfo` | – | kernel image symbols and footprint |
//! | `backtrace` | – | unwind the frame-pointer chain |
//! | `showmappings` | `start end` | page mappings and `P`/`W`/`U` bits over a VA range |
//! | `setperm` | `vaddr 0\|1 P\|W\|U` | clear or set one permission bit |
//! | `checkvm` | `start end` | raw word dump over a VA range |
//! | `exit` | – | leave the monitor |
//!
//! Address arguments are decimal or `0x`-prefixed lowercase hex.

mod stack;
mod vm;

pub use stack::backtrace;
pub use vm::{checkvm, setperm, showmappings};

use crate::args::Args;
use crate::command::{Command, CommandRegistry, Flow, Session};
use crate::error::MonitorError;

/// The built-in commands in listing order.
pub const BUILTIN: &[Command] = &[
    Command::new("help", "Display this list of commands", help),
    Command::new("kerninfo", "Display information about the kernel", kerninfo),
    Command::new("backtrace", "Display stack backtrace", backtrace),
    Command::new(
        "showmappings",
        "Display physical page mappings within certain range of virtual addresses",
        showmappings,
    ),
    Command::new(
        "setperm",
        "Set permission bit in page table entry for given virtual address",
        setperm,
    ),
    Command::new(
        "checkvm",
        "Dump memory contents within certain virtual address range",
        checkvm,
    ),
    Command::new("exit", "Leave the kernel monitor", exit),
];

/// A registry holding [`BUILTIN`].
#[must_use]
pub fn builtin() -> CommandRegistry {
    CommandRegistry::new(BUILTIN.iter().copied())
}

/// Exactly `N` operands after the command name, or the usage error.
fn operands<'l, const N: usize>(
    args: &Args<'l>,
    usage: &'static str,
) -> Result<[&'l str; N], MonitorError> {
    if args.len() != N + 1 {
        return Err(MonitorError::Usage(usage));
    }
    let mut out = [""; N];
    for (slot, token) in out.iter_mut().zip(args.iter().skip(1)) {
        *slot = token;
    }
    Ok(out)
}

/// `help`
///
/// # Errors
/// Never fails.
pub fn help(_args: &Args<'_>, session: &mut Session<'_, '_>) -> Result<Flow, MonitorError> {
    for command in session.registry() {
        outln!(session, "{} - {}", command.name, command.description);
    }
    Ok(Flow::Continue)
}

/// `kerninfo`
///
/// # Errors
/// Never fails.
pub fn kerninfo(_args: &Args<'_>, session: &mut Session<'_, '_>) -> Result<Flow, MonitorError> {
    let layout = session.machine().layout;

    outln!(session, "Special kernel symbols:");
    outln!(session, "  _start                  {:016x} (phys)", layout.start);
    for (name, va) in [
        ("entry", layout.entry),
        ("etext", layout.etext),
        ("edata", layout.edata),
        ("end", layout.end),
    ] {
        outln!(
            session,
            "  {name:<6} {va:016x} (virt)  {:016x} (phys)",
            layout.physical(va)
        );
    }
    outln!(
        session,
        "Kernel executable memory footprint: {}KB",
        layout.footprint_kib()
    );
    Ok(Flow::Continue)
}

/// `exit`
///
/// # Errors
/// Never fails.
pub fn exit(_args: &Args<'_>, _session: &mut Session<'_, '_>) -> Result<Flow, MonitorError> {
    Ok(Flow::Exit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_are_unique() {
        for (i, a) in BUILTIN.iter().enumerate() {
            assert!(
                BUILTIN[i + 1..].iter().all(|b| b.name != a.name),
                "duplicate command {}",
                a.name
            );
        }
    }

    #[test]
    fn operands_checks_arity() {
        let args = Args::tokenize("checkvm 0x10 0x20", 16).unwrap();
        assert_eq!(operands::<2>(&args, "u"), Ok(["0x10", "0x20"]));
        assert_eq!(operands::<3>(&args, "u"), Err(MonitorError::Usage("u")));
        assert_eq!(operands::<1>(&args, "u"), Err(MonitorError::Usage("u")));
    }
}
