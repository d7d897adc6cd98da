//! # Page Table Entry Bits
//!
//! The monitor only reads three permission bits and the frame address of an
//! entry, and only ever flips one permission bit at a time.
//!
//! | Bits   | Name            | Monitor mnemonic |
//! |--------|-----------------|------------------|
//! | 0      | Present         | `PTE_P` / `P`    |
//! | 1      | Writable        | `PTE_W` / `W`    |
//! | 2      | User accessible | `PTE_U` / `U`    |
//! | 3–11   | caching, A/D, PS, G, OS bits | – |
//! | 12–51  | physical frame  | –                |
//! | 52–63  | OS bits, PKU, NX | –               |

use crate::address::PhysicalAddress;
use bitfield_struct::bitfield;
use core::fmt;

/// A raw x86-64 page table entry.
#[bitfield(u64)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    pub present: bool,
    /// Writable (RW, bit 1).
    pub writable: bool,
    /// User/Supervisor (US, bit 2).
    pub user_access: bool,
    /// Write-Through (PWT, bit 3).
    pub write_through: bool,
    /// Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,
    /// Accessed (A, bit 5).
    pub accessed: bool,
    /// Dirty (D, bit 6).
    pub dirty: bool,
    /// Page Size (PS, bit 7).
    pub large_page: bool,
    /// Global (G, bit 8).
    pub global_translation: bool,

    /// OS-available (bits 9..=11).
    #[bits(3)]
    pub os_available_low: u8,

    /// Physical frame bits [51:12].
    #[bits(40)]
    frame_bits: u64,

    /// OS-available / protection key (bits 52..=62).
    #[bits(11)]
    pub os_available_high: u16,

    /// No-Execute (NX, bit 63).
    pub no_execute: bool,
}

impl PageEntryBits {
    const FRAME_MASK: u64 = (1 << 40) - 1;

    /// Page-aligned physical address held in the entry.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame_bits() << 12)
    }

    /// Store the page-aligned part of `pa`; the low 12 bits are dropped.
    #[inline]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        self.set_frame_bits((pa.as_u64() >> 12) & Self::FRAME_MASK);
    }

    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, pa: PhysicalAddress) -> Self {
        self.set_physical_address(pa);
        self
    }

    /// Whether `permission` is set.
    #[inline]
    #[must_use]
    pub const fn has(self, permission: Permission) -> bool {
        match permission {
            Permission::Present => self.present(),
            Permission::Writable => self.writable(),
            Permission::User => self.user_access(),
        }
    }

    /// Set or clear exactly one permission bit, leaving all others alone.
    #[inline]
    pub const fn set_permission(&mut self, permission: Permission, enable: bool) {
        match permission {
            Permission::Present => self.set_present(enable),
            Permission::Writable => self.set_writable(enable),
            Permission::User => self.set_user_access(enable),
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_permission(mut self, permission: Permission, enable: bool) -> Self {
        self.set_permission(permission, enable);
        self
    }

    /// View of the three permission bits for printing.
    #[inline]
    #[must_use]
    pub const fn permission_bits(self) -> PermissionBits {
        PermissionBits(self)
    }
}

/// One of the permission bits `setperm` can change.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Permission {
    /// `P`
    Present,
    /// `W`
    Writable,
    /// `U`
    User,
}

impl Permission {
    /// Resolve a permission letter (`P`, `W` or `U`).
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "P" => Some(Self::Present),
            "W" => Some(Self::Writable),
            "U" => Some(Self::User),
            _ => None,
        }
    }

    /// Bit mask of this permission inside a raw entry.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u64 {
        match self {
            Self::Present => 1 << 0,
            Self::Writable => 1 << 1,
            Self::User => 1 << 2,
        }
    }
}

/// Whether `setperm` sets (`1`) or clears (`0`) a bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Toggle {
    Clear,
    Set,
}

impl Toggle {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "0" => Some(Self::Clear),
            "1" => Some(Self::Set),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn enable(self) -> bool {
        matches!(self, Self::Set)
    }
}

/// Formats as `PTE_P 1, PTE_W 2, PTE_U 0`: each bit is shown masked in place.
#[derive(Copy, Clone)]
pub struct PermissionBits(PageEntryBits);

impl fmt::Display for PermissionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.0.into_bits();
        write!(
            f,
            "PTE_P {:x}, PTE_W {:x}, PTE_U {:x}",
            raw & Permission::Present.mask(),
            raw & Permission::Writable.mask(),
            raw & Permission::User.mask()
        )
    }
}
