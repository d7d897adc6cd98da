//! # Virtual-Memory Inspector
//!
//! The operations behind `showmappings`, `setperm` and `checkvm`:
//!
//! - [`for_each_mapping`] reports every page of a VA range as mapped or not,
//!   with its physical frame and `P`/`W`/`U` bits. Walks never allocate.
//! - [`set_permission`] flips one permission bit in the entry for a VA. The walk
//!   runs in allocating mode, so a missing table chain is created first.
//! - [`for_each_word`] reads raw machine words over a VA range.
//!
//! Views are derived from the entry on every query and never cached.
//!
//! ## Hazards
//!
//! `for_each_word` dereferences whatever it is given. An unmapped address
//! faults the caller. `set_permission` assumes the caller holds the page-table
//! lock; see [`PageTableLock`](crate::PageTableLock).

use crate::address::{PAGE_SIZE, PhysicalAddress, VirtualAddress, WORD_SIZE};
use crate::error::MonitorError;
use crate::memory::MemoryReader;
use crate::page_entry::{PageEntryBits, Permission, Toggle};
use core::fmt;
use log::trace;

/// The page-table walk primitive.
pub trait PageWalker {
    /// Find the entry slot for `va` in this walker's root table.
    ///
    /// Without `create`, returns `None` when part of the table chain is
    /// missing. With `create`, missing intermediate tables are allocated and
    /// `None` only signals that allocation failed.
    fn walk(&mut self, va: VirtualAddress, create: bool) -> Option<&mut PageEntryBits>;

    /// Drop any cached translation of `va` after its entry changed.
    fn invalidate(&mut self, va: VirtualAddress) {
        let _ = va;
    }
}

/// One page of a mapping dump.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PageMappingView {
    /// Page-aligned virtual address.
    pub virtual_address: VirtualAddress,
    /// Frame address, or `None` if there is no entry for the page.
    pub physical_address: Option<PhysicalAddress>,
    pub present: bool,
    pub writable: bool,
    pub user_access: bool,
}

impl PageMappingView {
    /// A page without a page-table entry.
    #[must_use]
    pub const fn unmapped(va: VirtualAddress) -> Self {
        Self {
            virtual_address: va,
            physical_address: None,
            present: false,
            writable: false,
            user_access: false,
        }
    }

    #[must_use]
    pub const fn from_entry(va: VirtualAddress, entry: PageEntryBits) -> Self {
        Self {
            virtual_address: va,
            physical_address: Some(entry.physical_address()),
            present: entry.present(),
            writable: entry.writable(),
            user_access: entry.user_access(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        self.physical_address.is_some()
    }
}

impl fmt::Display for PageMappingView {
    /// `page mapping 1000 -> 3000: PTE_P 1, PTE_W 2, PTE_U 4`
    /// or `page mapping 2000 -> NULL`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(pa) = self.physical_address else {
            return write!(f, "page mapping {:x} -> NULL", self.virtual_address);
        };
        write!(
            f,
            "page mapping {:x} -> {:x}: PTE_P {:x}, PTE_W {:x}, PTE_U {:x}",
            self.virtual_address,
            pa,
            u8::from(self.present),
            u8::from(self.writable) << 1,
            u8::from(self.user_access) << 2
        )
    }
}

/// Page bases from `start` (already aligned) through the page holding `end`.
#[derive(Clone, Debug)]
pub struct Pages {
    next: Option<VirtualAddress>,
    end: VirtualAddress,
}

impl Iterator for Pages {
    type Item = VirtualAddress;

    fn next(&mut self) -> Option<VirtualAddress> {
        let va = self.next.filter(|va| *va <= self.end)?;
        self.next = va.checked_add(PAGE_SIZE);
        Some(va)
    }
}

/// Iterate the pages covering `[start, end]`, starting at `start`'s page base.
#[must_use]
pub const fn pages(start: VirtualAddress, end: VirtualAddress) -> Pages {
    Pages {
        next: Some(start.page_base()),
        end,
    }
}

/// Visit a [`PageMappingView`] for every page in `[start, end]`.
///
/// Returns the number of pages visited.
///
/// # Errors
/// [`MonitorError::InvertedRange`] if `start > end`.
pub fn for_each_mapping<W, F>(
    walker: &mut W,
    start: VirtualAddress,
    end: VirtualAddress,
    mut visit: F,
) -> Result<usize, MonitorError>
where
    W: PageWalker + ?Sized,
    F: FnMut(PageMappingView),
{
    if start > end {
        return Err(MonitorError::InvertedRange {
            start: start.as_u64(),
            end: end.as_u64(),
        });
    }

    let mut count = 0;
    for va in pages(start, end) {
        let view = match walker.walk(va, false) {
            Some(entry) => PageMappingView::from_entry(va, *entry),
            None => PageMappingView::unmapped(va),
        };
        visit(view);
        count += 1;
    }
    Ok(count)
}

/// Entry state around a `setperm`.
#[derive(Copy, Clone, Debug)]
pub struct PermissionUpdate {
    pub before: PageEntryBits,
    pub after: PageEntryBits,
}

impl PermissionUpdate {
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        self.before.into_bits() != self.after.into_bits()
    }
}

/// Walk to the entry for `va` (allocating tables as needed) and apply `change`.
///
/// With `change == None` the entry is only read, which still creates the
/// table chain.
///
/// # Errors
/// [`MonitorError::NoPageTableEntry`] if the walker cannot produce a slot.
pub fn set_permission<W>(
    walker: &mut W,
    va: VirtualAddress,
    change: Option<(Permission, Toggle)>,
) -> Result<PermissionUpdate, MonitorError>
where
    W: PageWalker + ?Sized,
{
    let entry = walker
        .walk(va, true)
        .ok_or(MonitorError::NoPageTableEntry(va.as_u64()))?;

    let before = *entry;
    if let Some((permission, toggle)) = change {
        entry.set_permission(permission, toggle.enable());
    }
    let update = PermissionUpdate {
        before,
        after: *entry,
    };

    if update.changed() {
        trace!(
            "pte for {va:?}: {:#018x} -> {:#018x}",
            update.before.into_bits(),
            update.after.into_bits()
        );
        walker.invalidate(va);
    }
    Ok(update)
}

/// Visit `(address, word)` for every word from `start` through `end`.
///
/// Steps one machine word at a time without aligning `start`. Nothing is
/// visited when `start > end`. Returns the number of words read.
pub fn for_each_word<M, F>(
    memory: &M,
    start: VirtualAddress,
    end: VirtualAddress,
    mut visit: F,
) -> usize
where
    M: MemoryReader + ?Sized,
    F: FnMut(VirtualAddress, u64),
{
    let mut count = 0;
    let mut next = Some(start);
    while let Some(addr) = next.filter(|a| *a <= end) {
        visit(addr, memory.read_word(addr));
        next = addr.checked_add(WORD_SIZE);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    /// Flat map from page base to entry; an entry exists iff the "chain" does.
    #[derive(Default)]
    struct Tables {
        entries: BTreeMap<u64, PageEntryBits>,
        invalidated: Vec<u64>,
        exhausted: bool,
    }

    impl PageWalker for Tables {
        fn walk(&mut self, va: VirtualAddress, create: bool) -> Option<&mut PageEntryBits> {
            let key = va.page_base().as_u64();
            if create && !self.exhausted {
                Some(self.entries.entry(key).or_insert_with(PageEntryBits::new))
            } else {
                self.entries.get_mut(&key)
            }
        }

        fn invalidate(&mut self, va: VirtualAddress) {
            self.invalidated.push(va.as_u64());
        }
    }

    fn prw_user(pa: u64) -> PageEntryBits {
        PageEntryBits::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
            .with_physical_address(PhysicalAddress::new(pa))
    }

    #[test]
    fn mapped_then_unmapped_page() {
        let mut tables = Tables::default();
        tables.entries.insert(0x1000, prw_user(0x0030_0000));

        let mut lines = Vec::new();
        let n = for_each_mapping(
            &mut tables,
            VirtualAddress::new(0x1234),
            VirtualAddress::new(0x2000),
            |view| lines.push(view.to_string()),
        )
        .unwrap();

        assert_eq!(n, 2);
        assert_eq!(
            lines,
            [
                "page mapping 1000 -> 300000: PTE_P 1, PTE_W 2, PTE_U 4",
                "page mapping 2000 -> NULL",
            ]
        );
    }

    #[test]
    fn single_page_range() {
        let mut tables = Tables::default();
        let n = for_each_mapping(
            &mut tables,
            VirtualAddress::new(0x1000),
            VirtualAddress::new(0x1000),
            |_| {},
        )
        .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn inverted_range_is_reported() {
        let mut tables = Tables::default();
        let err = for_each_mapping(
            &mut tables,
            VirtualAddress::new(0x3000),
            VirtualAddress::new(0x1000),
            |_| panic!("nothing to visit"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            MonitorError::InvertedRange {
                start: 0x3000,
                end: 0x1000
            }
        );
    }

    #[test]
    fn dump_stops_at_top_of_address_space() {
        let mut tables = Tables::default();
        let n = for_each_mapping(
            &mut tables,
            VirtualAddress::new(u64::MAX - 0x1fff),
            VirtualAddress::new(u64::MAX),
            |_| {},
        )
        .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn non_allocating_walk_leaves_tables_alone() {
        let mut tables = Tables::default();
        for_each_mapping(
            &mut tables,
            VirtualAddress::new(0),
            VirtualAddress::new(0x4000),
            |view| assert!(!view.is_mapped()),
        )
        .unwrap();
        assert!(tables.entries.is_empty());
    }

    #[test]
    fn set_and_clear_writable_round_trip() {
        let mut tables = Tables::default();
        let original = PageEntryBits::new()
            .with_present(true)
            .with_user_access(true)
            .with_physical_address(PhysicalAddress::new(0x7000));
        tables.entries.insert(0x2000, original);
        let va = VirtualAddress::new(0x2000);

        let up = set_permission(&mut tables, va, Some((Permission::Writable, Toggle::Set))).unwrap();
        assert!(!up.before.writable());
        assert!(up.after.writable());
        assert_eq!(
            up.after.into_bits(),
            original.into_bits() | Permission::Writable.mask()
        );

        let down =
            set_permission(&mut tables, va, Some((Permission::Writable, Toggle::Clear))).unwrap();
        assert_eq!(down.after.into_bits(), original.into_bits());
        assert_eq!(tables.invalidated, [0x2000, 0x2000]);
    }

    #[test]
    fn read_only_update_allocates_but_does_not_change() {
        let mut tables = Tables::default();
        let va = VirtualAddress::new(0x9abc);
        let up = set_permission(&mut tables, va, None).unwrap();
        assert!(!up.changed());
        assert!(tables.entries.contains_key(&0x9000));
        assert!(tables.invalidated.is_empty());
    }

    #[test]
    fn exhausted_walker_is_an_error() {
        let mut tables = Tables {
            exhausted: true,
            ..Tables::default()
        };
        let err = set_permission(&mut tables, VirtualAddress::new(0x1000), None).unwrap_err();
        assert_eq!(err, MonitorError::NoPageTableEntry(0x1000));
    }

    struct Words(BTreeMap<u64, u64>);

    impl MemoryReader for Words {
        fn frame_pointer(&self) -> u64 {
            0
        }

        fn read_word(&self, addr: VirtualAddress) -> u64 {
            self.0.get(&addr.as_u64()).copied().unwrap_or(0)
        }
    }

    #[test]
    fn word_dump_is_inclusive() {
        let mem = Words(BTreeMap::from([(0x100, 1), (0x108, 2), (0x110, 3)]));
        let mut seen = Vec::new();
        let n = for_each_word(
            &mem,
            VirtualAddress::new(0x100),
            VirtualAddress::new(0x110),
            |a, w| seen.push((a.as_u64(), w)),
        );
        assert_eq!(n, 3);
        assert_eq!(seen, [(0x100, 1), (0x108, 2), (0x110, 3)]);
    }

    #[test]
    fn word_dump_with_inverted_range_reads_nothing() {
        let mem = Words(BTreeMap::new());
        let n = for_each_word(
            &mem,
            VirtualAddress::new(0x200),
            VirtualAddress::new(0x100),
            |_, _| panic!("nothing to read"),
        );
        assert_eq!(n, 0);
    }
}
