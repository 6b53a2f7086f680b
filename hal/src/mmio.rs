// Licensed under the Apache-2.0 license

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, Ordering};

/// Access width of a single register operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Half,
    Word,
    Double,
}

impl Width {
    /// Width of a DMA packet given its log2 size in bytes.
    pub fn from_log2(lg: u8) -> Option<Width> {
        match lg {
            0 => Some(Width::Byte),
            1 => Some(Width::Half),
            2 => Some(Width::Word),
            3 => Some(Width::Double),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Half => 2,
            Width::Word => 4,
            Width::Double => 8,
        }
    }

    pub fn mask(self) -> u64 {
        match self {
            Width::Double => u64::MAX,
            _ => (1u64 << (8 * self.bytes())) - 1,
        }
    }
}

/// Single-access register I/O at absolute addresses.
///
/// Every call performs exactly one access of the named width. There is no
/// byte swapping and no caching.
pub trait Mmio {
    fn read8(&self, addr: usize) -> u8;
    fn read16(&self, addr: usize) -> u16;
    fn read32(&self, addr: usize) -> u32;
    fn read64(&self, addr: usize) -> u64;

    fn write8(&self, addr: usize, val: u8);
    fn write16(&self, addr: usize, val: u16);
    fn write32(&self, addr: usize, val: u32);
    fn write64(&self, addr: usize, val: u64);

    /// Atomically stores `val` and returns the previous word.
    fn swap32(&self, addr: usize, val: u32) -> u32;

    fn read(&self, width: Width, addr: usize) -> u64 {
        match width {
            Width::Byte => self.read8(addr).into(),
            Width::Half => self.read16(addr).into(),
            Width::Word => self.read32(addr).into(),
            Width::Double => self.read64(addr),
        }
    }

    /// Writes the low `width` bytes of `val`.
    fn write(&self, width: Width, addr: usize, val: u64) {
        match width {
            Width::Byte => self.write8(addr, val as u8),
            Width::Half => self.write16(addr, val as u16),
            Width::Word => self.write32(addr, val as u32),
            Width::Double => self.write64(addr, val),
        }
    }
}

impl<M: Mmio + ?Sized> Mmio for &M {
    fn read8(&self, addr: usize) -> u8 {
        (**self).read8(addr)
    }
    fn read16(&self, addr: usize) -> u16 {
        (**self).read16(addr)
    }
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }
    fn read64(&self, addr: usize) -> u64 {
        (**self).read64(addr)
    }
    fn write8(&self, addr: usize, val: u8) {
        (**self).write8(addr, val)
    }
    fn write16(&self, addr: usize, val: u16) {
        (**self).write16(addr, val)
    }
    fn write32(&self, addr: usize, val: u32) {
        (**self).write32(addr, val)
    }
    fn write64(&self, addr: usize, val: u64) {
        (**self).write64(addr, val)
    }
    fn swap32(&self, addr: usize, val: u32) -> u32 {
        (**self).swap32(addr, val)
    }
}

/// Volatile pointer access to the physical address space.
#[derive(Clone, Copy, Default)]
pub struct RealMmio<'a>(PhantomData<&'a mut ()>);

impl RealMmio<'_> {
    /// # Safety
    ///
    /// Every address later passed to the returned value must be a valid,
    /// naturally aligned device or memory location for the access width.
    pub const unsafe fn new() -> Self {
        RealMmio(PhantomData)
    }
}

impl Mmio for RealMmio<'_> {
    fn read8(&self, addr: usize) -> u8 {
        unsafe { core::ptr::read_volatile(addr as *const u8) }
    }
    fn read16(&self, addr: usize) -> u16 {
        unsafe { core::ptr::read_volatile(addr as *const u16) }
    }
    fn read32(&self, addr: usize) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }
    fn read64(&self, addr: usize) -> u64 {
        unsafe { core::ptr::read_volatile(addr as *const u64) }
    }
    fn write8(&self, addr: usize, val: u8) {
        unsafe { core::ptr::write_volatile(addr as *mut u8, val) }
    }
    fn write16(&self, addr: usize, val: u16) {
        unsafe { core::ptr::write_volatile(addr as *mut u16, val) }
    }
    fn write32(&self, addr: usize, val: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, val) }
    }
    fn write64(&self, addr: usize, val: u64) {
        unsafe { core::ptr::write_volatile(addr as *mut u64, val) }
    }
    fn swap32(&self, addr: usize, val: u32) -> u32 {
        // amoswap.w
        unsafe { AtomicU32::from_ptr(addr as *mut u32) }.swap(val, Ordering::AcqRel)
    }
}
