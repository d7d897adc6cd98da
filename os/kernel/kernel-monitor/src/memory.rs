//! # Raw Memory Access
//!
//! The stack unwinder and `checkvm` read machine words straight out of the
//! current address space. [`MemoryReader`] is that seam; the kernel plugs in
//! [`live::LiveMemory`], tests plug in a memory image.

use crate::address::VirtualAddress;

/// Source of the current frame pointer and of raw word reads.
pub trait MemoryReader {
    /// Frame pointer (`rbp`) of the code asking for it.
    fn frame_pointer(&self) -> u64;

    /// Read the machine word at `addr`.
    ///
    /// Implementations backed by real memory fault on unmapped addresses.
    /// The monitor never validates `addr` before reading.
    fn read_word(&self, addr: VirtualAddress) -> u64;
}

#[cfg(all(feature = "live", target_arch = "x86_64"))]
pub mod live {
    //! Reads the running CPU's registers and memory.

    use super::MemoryReader;
    use crate::address::VirtualAddress;

    /// Direct access to the current address space.
    #[derive(Debug)]
    pub struct LiveMemory {
        _private: (),
    }

    impl LiveMemory {
        /// # Safety
        /// Every read through this handle dereferences the given address as-is.
        /// The kernel must be built with frame pointers for `backtrace`, and any
        /// unmapped address handed to `checkvm` page-faults the caller.
        #[must_use]
        pub const unsafe fn new() -> Self {
            Self { _private: () }
        }
    }

    impl MemoryReader for LiveMemory {
        #[inline(never)]
        fn frame_pointer(&self) -> u64 {
            let rbp: u64;
            unsafe {
                core::arch::asm!("mov {}, rbp", out(reg) rbp, options(nomem, nostack, preserves_flags));
            }
            rbp
        }

        #[inline]
        #[allow(clippy::cast_possible_truncation)]
        fn read_word(&self, addr: VirtualAddress) -> u64 {
            let ptr = core::ptr::with_exposed_provenance::<u64>(addr.as_u64() as usize);
            // SAFETY: accepted hazard of kernel-mode inspection, see `LiveMemory::new`.
            // `checkvm` does not align its start address.
            unsafe { core::ptr::read_unaligned(ptr) }
        }
    }
}
