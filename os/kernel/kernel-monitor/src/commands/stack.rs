use crate::args::Args;
use crate::backtrace::Unwinder;
use crate::command::{Flow, Session};
use crate::error::MonitorError;

/// `backtrace`: one line per frame, innermost first, plus the source position
/// when the return address resolves to a symbol.
///
/// ```text
///   rbp 00000000001fff80  rip 0000000000101234  args 0000000000000001 ...
///         kern/monitor.rs:120: run_command+52
/// ```
///
/// # Errors
/// Never fails; a truncated walk is reported inline.
pub fn backtrace(_args: &Args<'_>, session: &mut Session<'_, '_>) -> Result<Flow, MonitorError> {
    let machine = session.machine();
    let mut unwinder = Unwinder::from_current(machine.memory)
        .with_bounds(machine.stack)
        .with_max_frames(session.config().max_frames());

    for frame in unwinder.by_ref() {
        let [a0, a1, a2, a3] = frame.args;
        outln!(
            session,
            "  rbp {:016x}  rip {:016x}  args {a0:016x} {a1:016x} {a2:016x} {a3:016x}",
            frame.frame_pointer,
            frame.return_address
        );

        if let Some(info) = machine.symbols.resolve(frame.return_address) {
            outln!(
                session,
                "\t{}:{}: {}+{}",
                info.file,
                info.line,
                info.function,
                info.offset_of(frame.return_address)
            );
        }
    }

    if let Some(stop) = unwinder.stop().filter(|stop| !stop.is_complete()) {
        outln!(session, "  backtrace stopped: {stop}");
    }
    Ok(Flow::Continue)
}
