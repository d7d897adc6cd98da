use super::operands;
use crate::address::parse_virtual;
use crate::args::Args;
use crate::command::{Flow, Session};
use crate::error::MonitorError;
use crate::inspect;
use crate::page_entry::{Permission, Toggle};
use alloc::string::ToString;

/// `showmappings start end`
///
/// # Errors
/// Usage, address and inverted-range errors.
pub fn showmappings(args: &Args<'_>, session: &mut Session<'_, '_>) -> Result<Flow, MonitorError> {
    let [start, end] = operands(args, "showmappings start_addr end_addr")?;
    let start = parse_virtual(start)?;
    let end = parse_virtual(end)?;

    let mut table = session.machine().page_table.lock();
    inspect::for_each_mapping(&mut *table, start, end, |view| outln!(session, "{view}"))?;
    Ok(Flow::Continue)
}

/// `setperm vaddr 0|1 P|W|U`
///
/// An unsupported permission letter or toggle is reported, but the entry's
/// permission bits are still shown before and after (unchanged).
///
/// # Errors
/// Usage and address errors, or a walker that cannot allocate.
pub fn setperm(args: &Args<'_>, session: &mut Session<'_, '_>) -> Result<Flow, MonitorError> {
    const USAGE: &str = "setperm vaddr [0|1] [P|W|U]";

    let [addr, toggle, letter] = operands(args, USAGE)?;
    let va = parse_virtual(addr)?;

    let permission = Permission::from_token(letter);
    if permission.is_none() {
        session.report(&MonitorError::UnsupportedPermission(letter.to_string()));
    }
    let toggle = Toggle::from_token(toggle);

    let update = {
        let mut table = session.machine().page_table.lock();
        inspect::set_permission(&mut *table, va, permission.zip(toggle))?
    };

    outln!(session, "Permissions for {addr}:");
    outln!(session, "{} ->", update.before.permission_bits());
    if toggle.is_none() {
        session.report(&MonitorError::Usage(USAGE));
    }
    outln!(session, "{}", update.after.permission_bits());
    Ok(Flow::Continue)
}

/// `checkvm start end`
///
/// Reads every word in range without checking the mapping first.
///
/// # Errors
/// Usage and address errors.
pub fn checkvm(args: &Args<'_>, session: &mut Session<'_, '_>) -> Result<Flow, MonitorError> {
    let [start, end] = operands(args, "checkvm start_addr end_addr")?;
    let start = parse_virtual(start)?;
    let end = parse_virtual(end)?;

    let memory = session.machine().memory;
    inspect::for_each_word(memory, start, end, |addr, word| {
        outln!(session, "vaddr: {addr:x}, value: {word:x}");
    });
    Ok(Flow::Continue)
}
