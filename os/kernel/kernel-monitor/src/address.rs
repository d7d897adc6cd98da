//! # Addresses and the Address Parser
//!
//! Two zero-cost newtypes keep virtual and physical addresses apart, and
//! [`parse_address`] turns a console token into a number.
//!
//! ## Accepted syntax
//!
//! | Token | Base | Digits |
//! |-------|------|--------|
//! | `0x…` | 16   | `0-9`, `a-f` |
//! | other | 10   | `0-9` |
//!
//! Uppercase hex digits are rejected. Values wrap silently on overflow.

use crate::error::MonitorError;
use core::fmt;

/// Size of one page in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// Size of one machine word in bytes.
pub const WORD_SIZE: u64 = size_of::<u64>() as u64;

/// A virtual (page-table translated) address.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

/// A physical memory address.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Round down to the base of the enclosing page.
    ///
    /// ```rust
    /// # use kernel_monitor::VirtualAddress;
    /// assert_eq!(VirtualAddress::new(0x1fff).page_base(), VirtualAddress::new(0x1000));
    /// assert_eq!(VirtualAddress::new(0x2000).page_base(), VirtualAddress::new(0x2000));
    /// ```
    #[inline]
    #[must_use]
    pub const fn page_base(self) -> Self {
        Self(self.0 & !(PAGE_SIZE - 1))
    }

    /// Byte offset into the enclosing page.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0 & (PAGE_SIZE - 1)
    }

    /// Advance by `bytes`, or `None` past the top of the address space.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, bytes: u64) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA({:#018x})", self.0)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA({:#018x})", self.0)
    }
}

impl fmt::LowerHex for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Parse a decimal or `0x`-prefixed lowercase hexadecimal address.
///
/// ```rust
/// # use kernel_monitor::{parse_address, MonitorError};
/// assert_eq!(parse_address("26"), Ok(26));
/// assert_eq!(parse_address("0x1a"), Ok(26));
/// assert_eq!(parse_address("1a"), Err(MonitorError::InvalidAddress));
/// ```
///
/// # Errors
/// [`MonitorError::InvalidAddress`] for an empty token, an empty hex body,
/// or any character outside the digit set of the selected base.
pub fn parse_address(token: &str) -> Result<u64, MonitorError> {
    let (digits, radix) = match token.strip_prefix("0x") {
        Some(rest) => (rest, 16),
        None => (token, 10),
    };

    if digits.is_empty() {
        return Err(MonitorError::InvalidAddress);
    }

    digits.bytes().try_fold(0u64, |acc, b| {
        let digit = match b {
            b'0'..=b'9' => u64::from(b - b'0'),
            b'a'..=b'f' if radix == 16 => u64::from(b - b'a') + 10,
            _ => return Err(MonitorError::InvalidAddress),
        };
        Ok(acc.wrapping_mul(radix).wrapping_add(digit))
    })
}

/// Parse a token into a [`VirtualAddress`].
///
/// # Errors
/// See [`parse_address`].
#[inline]
pub fn parse_virtual(token: &str) -> Result<VirtualAddress, MonitorError> {
    parse_address(token).map(VirtualAddress::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_and_hex() {
        assert_eq!(parse_address("26"), Ok(26));
        assert_eq!(parse_address("0x1a"), Ok(26));
        assert_eq!(parse_address("0"), Ok(0));
        assert_eq!(parse_address("0xf0100000"), Ok(0xf010_0000));
        assert_eq!(parse_address("0x00ff"), Ok(0xff));
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["", "0x", "0xz", "0xg1", "1a", "12z", "0x1A", "0X10", "-1", " 1", "1_000"] {
            assert_eq!(
                parse_address(bad),
                Err(MonitorError::InvalidAddress),
                "token {bad:?} should not parse"
            );
        }
    }

    #[test]
    fn overflow_wraps() {
        // 2^64 + 1
        assert_eq!(parse_address("0x10000000000000001"), Ok(1));
        assert_eq!(parse_address("18446744073709551616"), Ok(0));
    }

    #[test]
    fn page_helpers() {
        let va = VirtualAddress::new(0xdead_beef);
        assert_eq!(va.page_base().as_u64(), 0xdead_b000);
        assert_eq!(va.page_offset(), 0xeef);
        assert_eq!(VirtualAddress::new(u64::MAX).checked_add(1), None);
        assert_eq!(
            VirtualAddress::new(0x1000).checked_add(PAGE_SIZE),
            Some(VirtualAddress::new(0x2000))
        );
    }
}
