//! # Debug Symbol Resolution
//!
//! [`SymbolResolver`] maps an instruction address back to the enclosing
//! function and source position. [`SymbolTable`] is a ready-made resolver over
//! a static, address-sorted table, e.g. one generated at build time from the
//! kernel's debug info.

/// Source-level description of an instruction address.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SymbolInfo<'a> {
    /// Name of the enclosing function.
    pub function: &'a str,
    /// Address of the function's first instruction.
    pub function_start: u64,
    /// Source file the instruction was compiled from.
    pub file: &'a str,
    /// Source line of the instruction.
    pub line: u32,
}

impl SymbolInfo<'_> {
    /// Distance of `addr` from the start of the function.
    #[inline]
    #[must_use]
    pub const fn offset_of(&self, addr: u64) -> u64 {
        addr.wrapping_sub(self.function_start)
    }
}

/// Looks up [`SymbolInfo`] for instruction addresses.
pub trait SymbolResolver {
    /// Resolve `addr`, or `None` if no symbol covers it.
    fn resolve(&self, addr: u64) -> Option<SymbolInfo<'_>>;
}

/// A resolver that never knows anything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    #[inline]
    fn resolve(&self, _addr: u64) -> Option<SymbolInfo<'_>> {
        None
    }
}

/// One function in a [`SymbolTable`].
#[derive(Copy, Clone, Debug)]
pub struct Symbol<'a> {
    pub name: &'a str,
    /// First instruction address.
    pub start: u64,
    /// One past the last instruction address.
    pub end: u64,
    pub file: &'a str,
    /// Line of the function's declaration.
    pub line: u32,
    /// `(address, line)` pairs inside the function, sorted by address.
    pub lines: &'a [(u64, u32)],
}

impl Symbol<'_> {
    #[inline]
    #[must_use]
    pub const fn contains(&self, addr: u64) -> bool {
        self.start <= addr && addr < self.end
    }

    /// Source line for `addr`: the last line entry at or below it, or the
    /// declaration line if the function carries no line table.
    #[must_use]
    pub fn line_of(&self, addr: u64) -> u32 {
        let upto = self.lines.partition_point(|&(a, _)| a <= addr);
        match upto.checked_sub(1) {
            Some(i) => self.lines[i].1,
            None => self.line,
        }
    }
}

/// A [`SymbolResolver`] over functions sorted by start address.
#[derive(Copy, Clone, Debug)]
pub struct SymbolTable<'a> {
    symbols: &'a [Symbol<'a>],
}

impl<'a> SymbolTable<'a> {
    /// Wrap an address-sorted, non-overlapping table.
    #[must_use]
    pub fn new(symbols: &'a [Symbol<'a>]) -> Self {
        debug_assert!(
            symbols.windows(2).all(|w| w[0].end <= w[1].start),
            "symbol table must be sorted and non-overlapping"
        );
        Self { symbols }
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for SymbolTable<'_> {
    fn resolve(&self, addr: u64) -> Option<SymbolInfo<'_>> {
        let upto = self.symbols.partition_point(|s| s.start <= addr);
        let symbol = self.symbols.get(upto.checked_sub(1)?)?;
        symbol.contains(addr).then(|| SymbolInfo {
            function: symbol.name,
            function_start: symbol.start,
            file: symbol.file,
            line: symbol.line_of(addr),
        })
    }
}
