// Licensed under the Apache-2.0 license

//! Byte-addressed scratch memory that records every write, for unit tests.

use crate::mmio::{Mmio, Width};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Default)]
pub struct FakeMmio {
    mem: RefCell<HashMap<usize, u8>>,
    writes: RefCell<Vec<(usize, Width, u64)>>,
}

impl FakeMmio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets memory without recording a write.
    pub fn poke(&self, width: Width, addr: usize, val: u64) {
        let mut mem = self.mem.borrow_mut();
        for i in 0..width.bytes() {
            mem.insert(addr + i, (val >> (8 * i)) as u8);
        }
    }

    pub fn peek(&self, width: Width, addr: usize) -> u64 {
        let mem = self.mem.borrow();
        (0..width.bytes()).fold(0, |acc, i| {
            acc | (u64::from(mem.get(&(addr + i)).copied().unwrap_or(0)) << (8 * i))
        })
    }

    pub fn writes(&self) -> Vec<(usize, Width, u64)> {
        self.writes.borrow().clone()
    }

    pub fn wrote(&self, addr: usize) -> bool {
        self.writes.borrow().iter().any(|(a, _, _)| *a == addr)
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    fn store(&self, width: Width, addr: usize, val: u64) {
        self.writes.borrow_mut().push((addr, width, val));
        self.poke(width, addr, val);
    }
}

impl Mmio for FakeMmio {
    fn read8(&self, addr: usize) -> u8 {
        self.peek(Width::Byte, addr) as u8
    }
    fn read16(&self, addr: usize) -> u16 {
        self.peek(Width::Half, addr) as u16
    }
    fn read32(&self, addr: usize) -> u32 {
        self.peek(Width::Word, addr) as u32
    }
    fn read64(&self, addr: usize) -> u64 {
        self.peek(Width::Double, addr)
    }
    fn write8(&self, addr: usize, val: u8) {
        self.store(Width::Byte, addr, val.into())
    }
    fn write16(&self, addr: usize, val: u16) {
        self.store(Width::Half, addr, val.into())
    }
    fn write32(&self, addr: usize, val: u32) {
        self.store(Width::Word, addr, val.into())
    }
    fn write64(&self, addr: usize, val: u64) {
        self.store(Width::Double, addr, val)
    }
    fn swap32(&self, addr: usize, val: u32) -> u32 {
        let old = self.read32(addr);
        self.store(Width::Word, addr, val.into());
        old
    }
}

/// CSR state captured in memory.
#[derive(Default)]
pub struct FakeCsr {
    pub hart: usize,
    pub mie: RefCell<usize>,
    pub mstatus: RefCell<usize>,
    pub mtvec: RefCell<usize>,
    pub order: RefCell<Vec<&'static str>>,
}

impl crate::irq::Csr for FakeCsr {
    fn hart_id(&self) -> usize {
        self.hart
    }
    fn enable_machine_external_interrupts(&self) {
        *self.mie.borrow_mut() |= 1 << 11;
        self.order.borrow_mut().push("mie");
    }
    fn enable_machine_interrupts(&self) {
        *self.mstatus.borrow_mut() |= 1 << 3;
        self.order.borrow_mut().push("mstatus");
    }
    fn set_trap_vector(&self, value: usize) {
        *self.mtvec.borrow_mut() = value;
    }
    fn cycles(&self) -> u64 {
        1234
    }
}
