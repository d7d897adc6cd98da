#![allow(dead_code)]

use kernel_monitor::{
    Console, KernelLayout, Machine, MemoryReader, Monitor, MonitorConfig, PageEntryBits,
    PageTableLock, PageWalker, PhysicalAddress, StackBounds, Symbol, SymbolTable, VirtualAddress,
};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Console fed from a fixed script; everything printed lands in `output`.
#[derive(Default)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    pub output: String,
    pub prompts: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            input: lines.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl fmt::Write for ScriptedConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.input.pop_front()
    }
}

/// Page tables as a flat map keyed by page base.
///
/// A key exists iff the table chain down to that page exists; allocating
/// walks insert a zeroed entry.
#[derive(Default)]
pub struct FlatPageTable {
    pub entries: BTreeMap<u64, PageEntryBits>,
}

impl FlatPageTable {
    pub fn map(&mut self, va: u64, pa: u64, writable: bool, user: bool) {
        self.entries.insert(
            va,
            PageEntryBits::new()
                .with_present(true)
                .with_writable(writable)
                .with_user_access(user)
                .with_physical_address(PhysicalAddress::new(pa)),
        );
    }

    pub fn entry(&self, va: u64) -> Option<PageEntryBits> {
        self.entries.get(&va).copied()
    }
}

impl PageWalker for FlatPageTable {
    fn walk(&mut self, va: VirtualAddress, create: bool) -> Option<&mut PageEntryBits> {
        let key = va.page_base().as_u64();
        if create {
            Some(self.entries.entry(key).or_insert_with(PageEntryBits::new))
        } else {
            self.entries.get_mut(&key)
        }
    }
}

/// Sparse word-addressed memory; unknown words read as zero.
#[derive(Default)]
pub struct MemoryImage {
    pub words: BTreeMap<u64, u64>,
    pub frame_pointer: u64,
}

impl MemoryImage {
    /// Lay out a frame record at `fp`.
    pub fn push_frame(&mut self, fp: u64, saved_fp: u64, ret: u64, args: [u64; 4]) {
        self.words.insert(fp, saved_fp);
        self.words.insert(fp + 8, ret);
        for (i, arg) in (0u64..).zip(args) {
            self.words.insert(fp + 16 + i * 8, arg);
        }
    }
}

impl MemoryReader for MemoryImage {
    fn frame_pointer(&self) -> u64 {
        self.frame_pointer
    }

    fn read_word(&self, addr: VirtualAddress) -> u64 {
        self.words.get(&addr.as_u64()).copied().unwrap_or(0)
    }
}

pub const SYMBOLS: &[Symbol<'static>] = &[
    Symbol {
        name: "run_command",
        start: 0x1000,
        end: 0x1100,
        file: "kern/monitor.rs",
        line: 100,
        lines: &[(0x1000, 101), (0x1010, 105)],
    },
    Symbol {
        name: "monitor",
        start: 0x1100,
        end: 0x1200,
        file: "kern/monitor.rs",
        line: 200,
        lines: &[],
    },
    Symbol {
        name: "kernel_init",
        start: 0x1200,
        end: 0x1300,
        file: "kern/init.rs",
        line: 30,
        lines: &[(0x1230, 42)],
    },
];

/// A machine made of test doubles.
pub struct Rig {
    pub tables: PageTableLock<FlatPageTable>,
    pub memory: MemoryImage,
    pub layout: KernelLayout,
    pub stack: StackBounds,
    pub config: MonitorConfig,
}

impl Default for Rig {
    fn default() -> Self {
        Self {
            tables: PageTableLock::new(FlatPageTable::default()),
            memory: MemoryImage::default(),
            layout: KernelLayout::default(),
            stack: StackBounds::ANY,
            config: MonitorConfig::new().with_banner(false),
        }
    }
}

impl Rig {
    pub fn with_monitor<R>(&self, f: impl FnOnce(&Monitor<'_>) -> R) -> R {
        let symbols = SymbolTable::new(SYMBOLS);
        let machine = Machine {
            page_table: &self.tables,
            memory: &self.memory,
            symbols: &symbols,
            layout: self.layout,
            stack: self.stack,
        };
        let monitor = Monitor::new(machine).with_config(self.config);
        f(&monitor)
    }

    /// Run a full session over `lines` and return the console.
    pub fn session(&self, lines: &[&str]) -> ScriptedConsole {
        let mut console = ScriptedConsole::new(lines);
        self.with_monitor(|monitor| monitor.run(&mut console, None));
        console
    }

    /// Run a full session and return its output lines.
    pub fn run(&self, lines: &[&str]) -> Vec<String> {
        self.session(lines)
            .output
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    pub fn entry(&self, va: u64) -> Option<PageEntryBits> {
        self.tables.with_lock(|t| t.entry(va))
    }
}
