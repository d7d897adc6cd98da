/// Addresses of the kernel image's special linker symbols.
///
/// All addresses are virtual; physical addresses are derived by subtracting
/// [`kernel_base`](Self::kernel_base), which matches a kernel linked at a
/// fixed offset above its load address.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct KernelLayout {
    /// Physical entry point as seen by the boot loader (`_start`).
    pub start: u64,
    /// Virtual entry point (`entry`).
    pub entry: u64,
    /// End of the text section (`etext`).
    pub etext: u64,
    /// End of initialized data (`edata`).
    pub edata: u64,
    /// End of the image, BSS included (`end`).
    pub end: u64,
    /// Virtual base the kernel is linked at.
    pub kernel_base: u64,
}

impl KernelLayout {
    /// Physical address of a kernel virtual address.
    #[inline]
    #[must_use]
    pub const fn physical(&self, va: u64) -> u64 {
        va.wrapping_sub(self.kernel_base)
    }

    /// Memory footprint of the image in KiB, rounded up.
    #[must_use]
    pub const fn footprint_kib(&self) -> u64 {
        self.end.saturating_sub(self.entry).div_ceil(1024)
    }
}
