//! # Command Registry & Dispatcher

use crate::args::Args;
use crate::console::Console;
use crate::error::MonitorError;
use crate::monitor::{Machine, MonitorConfig};
use alloc::string::ToString;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use log::debug;

/// Opaque snapshot of the processor state the monitor was entered with.
///
/// The monitor forwards it to every handler untouched; handlers that know the
/// concrete type may downcast it.
pub type TrapFrame = dyn Any;

/// What the console loop does after a command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Leave the monitor.
    Exit,
}

impl Flow {
    /// Integer status: `0` to continue, `-1` to leave the monitor.
    #[inline]
    #[must_use]
    pub const fn status(self) -> i32 {
        match self {
            Self::Continue => 0,
            Self::Exit => -1,
        }
    }
}

impl From<Flow> for i32 {
    #[inline]
    fn from(flow: Flow) -> Self {
        flow.status()
    }
}

/// A command implementation.
///
/// `args[0]` is the command name. Errors are printed by the dispatcher and
/// never end the session.
pub type Handler = fn(&Args<'_>, &mut Session<'_, '_>) -> Result<Flow, MonitorError>;

/// A named, described command.
#[derive(Copy, Clone)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: Handler,
}

impl Command {
    #[must_use]
    pub const fn new(name: &'static str, description: &'static str, handler: Handler) -> Self {
        Self {
            name,
            description,
            handler,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// The ordered, immutable set of commands a monitor understands.
///
/// Lookup is a linear scan by exact name; the first match wins. Iteration
/// yields commands in registration order.
#[derive(Clone, Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    /// Build a registry from commands in the order they should be listed.
    #[must_use]
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }

    /// Append one more command at construction time.
    #[must_use]
    pub fn with(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run the command named by `args[0]`.
    ///
    /// A blank line is a no-op. An unknown name or a failing handler is
    /// reported on the console; in both cases the session continues.
    pub fn dispatch(&self, args: &Args<'_>, session: &mut Session<'_, '_>) -> Flow {
        let Some(name) = args.command() else {
            return Flow::Continue;
        };

        let Some(command) = self.find(name) else {
            session.report(&MonitorError::UnknownCommand(name.to_string()));
            return Flow::Continue;
        };

        debug!("running `{name}` with {} argument(s)", args.len() - 1);
        match (command.handler)(args, session) {
            Ok(flow) => flow,
            Err(err) => {
                debug!("`{name}` failed: {err:?}");
                session.report(&err);
                Flow::Continue
            }
        }
    }
}

impl<'a> IntoIterator for &'a CommandRegistry {
    type Item = &'a Command;
    type IntoIter = core::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Everything a handler can reach while one command runs.
///
/// Writing to a session writes to the console.
pub struct Session<'s, 'm> {
    registry: &'s CommandRegistry,
    console: &'s mut dyn Console,
    machine: &'s Machine<'m>,
    config: &'s MonitorConfig,
    trap_frame: Option<&'s TrapFrame>,
}

impl<'s, 'm> Session<'s, 'm> {
    #[must_use]
    pub fn new(
        registry: &'s CommandRegistry,
        console: &'s mut dyn Console,
        machine: &'s Machine<'m>,
        config: &'s MonitorConfig,
        trap_frame: Option<&'s TrapFrame>,
    ) -> Self {
        Self {
            registry,
            console,
            machine,
            config,
            trap_frame,
        }
    }

    /// The commands of the running monitor.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &'s CommandRegistry {
        self.registry
    }

    #[inline]
    #[must_use]
    pub fn machine(&self) -> &'s Machine<'m> {
        self.machine
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &'s MonitorConfig {
        self.config
    }

    /// The state the monitor was entered with, if any.
    #[inline]
    #[must_use]
    pub fn trap_frame(&self) -> Option<&'s TrapFrame> {
        self.trap_frame
    }

    /// Print an error on the console.
    pub fn report(&mut self, err: &MonitorError) {
        outln!(self, "{err}");
    }
}

impl fmt::Write for Session<'_, '_> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.console.write_str(s)
    }
}
