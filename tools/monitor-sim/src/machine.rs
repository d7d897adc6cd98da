//! A small simulated x86-64 kernel: four-level page tables, a stack holding a
//! three-frame call chain, and a symbol table for the text section.

use kernel_monitor::address::PAGE_SIZE;
use kernel_monitor::{
    KernelLayout, Machine, MemoryReader, PageEntryBits, PageTableLock, PageWalker,
    PhysicalAddress, StackBounds, Symbol, SymbolTable, VirtualAddress,
};
use log::debug;
use std::collections::BTreeMap;

const ENTRIES: usize = 512;

/// Where the simulated kernel is linked.
pub const KERNEL_BASE: u64 = 0xffff_8000_0000_0000;
/// Physical load address of the image.
pub const LOAD_ADDRESS: u64 = 0x0010_0000;

const ENTRY: u64 = KERNEL_BASE + LOAD_ADDRESS + 0x0c;
const ETEXT: u64 = KERNEL_BASE + 0x0010_8000;
const EDATA: u64 = KERNEL_BASE + 0x0011_2000;
const END: u64 = KERNEL_BASE + 0x0011_6000;

/// Boot stack, grows down from `STACK_TOP`.
const STACK_BOTTOM: u64 = KERNEL_BASE + 0x001f_8000;
const STACK_TOP: u64 = KERNEL_BASE + 0x0020_0000;

/// Physical addresses handed out for intermediate tables.
const TABLE_FRAMES: u64 = 0x0010_0000_0000;

const KERNEL_MAIN: u64 = KERNEL_BASE + 0x0010_0100;
const MONITOR_ENTRY: u64 = KERNEL_BASE + 0x0010_0400;
const TRAP_DISPATCH: u64 = KERNEL_BASE + 0x0010_0900;

static SYMBOLS: &[Symbol<'static>] = &[
    Symbol {
        name: "kernel_main",
        start: KERNEL_MAIN,
        end: KERNEL_MAIN + 0x300,
        file: "kernel/src/main.rs",
        line: 48,
        lines: &[(KERNEL_MAIN, 49), (KERNEL_MAIN + 0x80, 61), (KERNEL_MAIN + 0x1c0, 77)],
    },
    Symbol {
        name: "monitor_entry",
        start: MONITOR_ENTRY,
        end: MONITOR_ENTRY + 0x500,
        file: "kernel/src/monitor.rs",
        line: 12,
        lines: &[(MONITOR_ENTRY, 13), (MONITOR_ENTRY + 0x40, 18)],
    },
    Symbol {
        name: "trap_dispatch",
        start: TRAP_DISPATCH,
        end: TRAP_DISPATCH + 0x200,
        file: "kernel/src/interrupts/trap.rs",
        line: 30,
        lines: &[(TRAP_DISPATCH, 31), (TRAP_DISPATCH + 0x38, 35)],
    },
];

/// PML4, PDPT, PD and PT indices of `va`.
#[allow(clippy::cast_possible_truncation)]
const fn split_indices(va: VirtualAddress) -> [usize; 4] {
    let v = va.as_u64();
    [
        ((v >> 39) & 0x1ff) as usize,
        ((v >> 30) & 0x1ff) as usize,
        ((v >> 21) & 0x1ff) as usize,
        ((v >> 12) & 0x1ff) as usize,
    ]
}

type Table = [PageEntryBits; ENTRIES];

/// Four-level page tables in a table arena; table 0 is the PML4.
///
/// A table's physical address is `TABLE_FRAMES + index * PAGE_SIZE`.
pub struct SimPageTable {
    tables: Vec<Box<Table>>,
}

impl SimPageTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: vec![Box::new([PageEntryBits::new(); ENTRIES])],
        }
    }

    /// Number of tables allocated so far, PML4 included.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn table_index(entry: PageEntryBits) -> usize {
        ((entry.physical_address().as_u64() - TABLE_FRAMES) / PAGE_SIZE) as usize
    }

    /// Follow `table[index]` to the next level, allocating it if asked to.
    fn next_table(&mut self, table: usize, index: usize, create: bool) -> Option<usize> {
        let entry = self.tables[table][index];
        if entry.present() {
            return Some(Self::table_index(entry));
        }
        if !create {
            return None;
        }

        let next = self.tables.len();
        self.tables.push(Box::new([PageEntryBits::new(); ENTRIES]));
        self.tables[table][index] = PageEntryBits::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
            .with_physical_address(PhysicalAddress::new(
                TABLE_FRAMES + next as u64 * PAGE_SIZE,
            ));
        Some(next)
    }

    /// Map `[va, va + len)` to `[pa, pa + len)` with 4 KiB pages.
    pub fn map_range(&mut self, va: u64, pa: u64, len: u64, writable: bool) {
        for offset in (0..len).step_by(4096) {
            let va = VirtualAddress::new(va + offset);
            if let Some(entry) = self.walk(va, true) {
                *entry = PageEntryBits::new()
                    .with_present(true)
                    .with_writable(writable)
                    .with_physical_address(PhysicalAddress::new(pa + offset));
            }
        }
    }
}

impl Default for SimPageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PageWalker for SimPageTable {
    fn walk(&mut self, va: VirtualAddress, create: bool) -> Option<&mut PageEntryBits> {
        let [i4, i3, i2, i1] = split_indices(va);
        let mut table = 0;
        for index in [i4, i3, i2] {
            table = self.next_table(table, index, create)?;
        }
        Some(&mut self.tables[table][i1])
    }

    fn invalidate(&mut self, va: VirtualAddress) {
        debug!("invlpg {va:?}");
    }
}

/// Sparse kernel memory; unwritten words read as zero.
#[derive(Default)]
pub struct SimMemory {
    words: BTreeMap<u64, u64>,
    frame_pointer: u64,
}

impl SimMemory {
    pub fn store(&mut self, addr: u64, word: u64) {
        self.words.insert(addr, word);
    }

    /// Push a frame record: saved frame pointer, return address, four args.
    fn push_frame(&mut self, fp: u64, saved_fp: u64, return_address: u64, args: [u64; 4]) {
        self.store(fp, saved_fp);
        self.store(fp + 8, return_address);
        for (slot, arg) in (2..).zip(args) {
            self.store(fp + slot * 8, arg);
        }
    }
}

impl MemoryReader for SimMemory {
    fn frame_pointer(&self) -> u64 {
        self.frame_pointer
    }

    fn read_word(&self, addr: VirtualAddress) -> u64 {
        self.words.get(&addr.as_u64()).copied().unwrap_or(0)
    }
}

/// Everything the simulated kernel owns.
pub struct SimKernel {
    tables: PageTableLock<SimPageTable>,
    memory: SimMemory,
    symbols: SymbolTable<'static>,
}

impl SimKernel {
    /// Boot the simulation: map the image and the stack, then lay out
    /// `kernel_main -> monitor_entry -> trap_dispatch` on the stack.
    #[must_use]
    pub fn boot() -> Self {
        let mut tables = SimPageTable::new();
        let text = ETEXT - (KERNEL_BASE + LOAD_ADDRESS);
        tables.map_range(KERNEL_BASE + LOAD_ADDRESS, LOAD_ADDRESS, text, false);
        tables.map_range(ETEXT, ETEXT - KERNEL_BASE, END - ETEXT, true);
        tables.map_range(
            STACK_BOTTOM,
            STACK_BOTTOM - KERNEL_BASE,
            STACK_TOP - STACK_BOTTOM,
            true,
        );
        debug!("simulated page tables use {} tables", tables.table_count());

        let mut memory = SimMemory::default();
        let outer = STACK_TOP - 0x40;
        let middle = STACK_TOP - 0x140;
        let inner = STACK_TOP - 0x200;
        memory.push_frame(outer, 0, KERNEL_MAIN + 0x1c4, [0; 4]);
        memory.push_frame(middle, outer, MONITOR_ENTRY + 0x4a, [EDATA, 0x10, 0, 0]);
        memory.push_frame(inner, middle, TRAP_DISPATCH + 0x3c, [3, 0x0e, 0, 0]);
        memory.frame_pointer = inner;

        memory.store(ETEXT, 0x0000_0000_cafe_babe);
        memory.store(ETEXT + 8, 0x0123_4567_89ab_cdef);
        memory.store(ETEXT + 16, 0xffff_ffff_ffff_ffff);

        Self {
            tables: PageTableLock::new(tables),
            memory,
            symbols: SymbolTable::new(SYMBOLS),
        }
    }

    /// The view the monitor gets of this kernel.
    #[must_use]
    pub fn machine(&self) -> Machine<'_> {
        Machine {
            page_table: &self.tables,
            memory: &self.memory,
            symbols: &self.symbols,
            layout: KernelLayout {
                start: LOAD_ADDRESS + 0x0c,
                entry: ENTRY,
                etext: ETEXT,
                edata: EDATA,
                end: END,
                kernel_base: KERNEL_BASE,
            },
            stack: StackBounds::new(STACK_BOTTOM, STACK_TOP),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_allocates_the_chain_once() {
        let mut tables = SimPageTable::new();
        let va = VirtualAddress::new(KERNEL_BASE + 0x1234);
        assert!(tables.walk(va, false).is_none());
        assert_eq!(tables.table_count(), 1);

        tables.walk(va, true).unwrap().set_present(true);
        assert_eq!(tables.table_count(), 4);
        assert!(tables.walk(va, false).unwrap().present());

        // Same PT, different slot.
        assert!(tables.walk(VirtualAddress::new(KERNEL_BASE + 0x2000), true).is_some());
        assert_eq!(tables.table_count(), 4);
    }

    #[test]
    fn boot_maps_image_and_stack() {
        let kernel = SimKernel::boot();
        let mut tables = kernel.tables.lock();

        let text = *tables.walk(VirtualAddress::new(ENTRY), false).unwrap();
        assert!(text.present() && !text.writable());
        assert_eq!(text.physical_address().as_u64(), LOAD_ADDRESS);

        let stack = *tables.walk(VirtualAddress::new(STACK_TOP - 8), false).unwrap();
        assert!(stack.present() && stack.writable());
        assert!(tables.walk(VirtualAddress::new(STACK_TOP), false).is_none());
    }
}
