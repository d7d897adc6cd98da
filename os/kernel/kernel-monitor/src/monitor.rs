//! # Console Loop

use crate::args::{Args, MAX_ARGS};
use crate::backtrace::{DEFAULT_MAX_FRAMES, StackBounds};
use crate::command::{CommandRegistry, Flow, Session, TrapFrame};
use crate::commands;
use crate::console::Console;
use crate::inspect::PageWalker;
use crate::layout::KernelLayout;
use crate::lock::PageTableLock;
use crate::memory::MemoryReader;
use crate::symbols::SymbolResolver;
use log::debug;

/// The kernel state the monitor inspects, borrowed from its owners.
pub struct Machine<'m> {
    /// Page walker rooted at the kernel page directory, behind its lock.
    pub page_table: &'m PageTableLock<dyn PageWalker + 'm>,
    /// Frame pointer source and raw word reads.
    pub memory: &'m dyn MemoryReader,
    /// Debug symbols for `backtrace`.
    pub symbols: &'m dyn SymbolResolver,
    /// Section symbols for `kerninfo`.
    pub layout: KernelLayout,
    /// Where `backtrace` may find frame records.
    pub stack: StackBounds,
}

/// Tunables of a [`Monitor`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MonitorConfig {
    prompt: &'static str,
    max_args: usize,
    max_frames: usize,
    banner: bool,
}

impl MonitorConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prompt: "K> ",
            max_args: MAX_ARGS,
            max_frames: DEFAULT_MAX_FRAMES,
            banner: true,
        }
    }

    #[must_use]
    pub const fn with_prompt(mut self, prompt: &'static str) -> Self {
        self.prompt = prompt;
        self
    }

    #[must_use]
    pub const fn with_max_args(mut self, max_args: usize) -> Self {
        self.max_args = max_args;
        self
    }

    #[must_use]
    pub const fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Whether [`Monitor::run`] greets the user first.
    #[must_use]
    pub const fn with_banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }

    #[inline]
    #[must_use]
    pub const fn prompt(&self) -> &'static str {
        self.prompt
    }

    #[inline]
    #[must_use]
    pub const fn max_args(&self) -> usize {
        self.max_args
    }

    #[inline]
    #[must_use]
    pub const fn max_frames(&self) -> usize {
        self.max_frames
    }

    #[inline]
    #[must_use]
    pub const fn banner(&self) -> bool {
        self.banner
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The kernel monitor: a command registry bound to one machine.
pub struct Monitor<'m> {
    registry: CommandRegistry,
    machine: Machine<'m>,
    config: MonitorConfig,
}

impl<'m> Monitor<'m> {
    /// A monitor with the built-in commands and the default configuration.
    #[must_use]
    pub fn new(machine: Machine<'m>) -> Self {
        Self {
            registry: commands::builtin(),
            machine,
            config: MonitorConfig::new(),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Tokenize and dispatch one line.
    ///
    /// A line with too many tokens is reported and not dispatched.
    pub fn run_command(
        &self,
        line: &str,
        console: &mut dyn Console,
        trap_frame: Option<&TrapFrame>,
    ) -> Flow {
        let mut session = Session::new(
            &self.registry,
            console,
            &self.machine,
            &self.config,
            trap_frame,
        );

        match Args::tokenize(line, self.config.max_args) {
            Ok(args) => self.registry.dispatch(&args, &mut session),
            Err(err) => {
                session.report(&err);
                Flow::Continue
            }
        }
    }

    /// Read and run commands until one asks to leave or input runs out.
    ///
    /// Blocks on `console.read_line` between commands.
    pub fn run(&self, console: &mut dyn Console, trap_frame: Option<&TrapFrame>) {
        if self.config.banner {
            outln!(console, "Welcome to the kernel monitor!");
            outln!(console, "Type 'help' for a list of commands.");
        }

        while let Some(line) = console.read_line(self.config.prompt) {
            if self.run_command(&line, console, trap_frame) == Flow::Exit {
                debug!("leaving the kernel monitor");
                return;
            }
        }
        debug!("console input closed");
    }
}
