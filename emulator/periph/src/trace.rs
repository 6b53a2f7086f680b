/*++

Licensed under the Apache-2.0 license.

File Name:

    trace.rs

Abstract:

    Mmio wrapper that records every access made through it.

--*/

use dsp_hal::{Mmio, Width};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read { addr: usize, width: Width },
    Write { addr: usize, width: Width, val: u64 },
    Swap { addr: usize, val: u32 },
}

pub struct TracingBus<M: Mmio> {
    inner: M,
    log: Mutex<Vec<Access>>,
}

impl<M: Mmio> TracingBus<M> {
    pub fn new(inner: M) -> Self {
        TracingBus {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    fn log(&self) -> MutexGuard<'_, Vec<Access>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, access: Access) {
        self.log().push(access);
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.log().clone()
    }

    /// Values written to `addr`, in order.
    pub fn writes_to(&self, addr: usize) -> Vec<u64> {
        self.log()
            .iter()
            .filter_map(|access| match access {
                Access::Write { addr: a, val, .. } if *a == addr => Some(*val),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.log().clear();
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<M: Mmio> Mmio for TracingBus<M> {
    fn read8(&self, addr: usize) -> u8 {
        self.record(Access::Read { addr, width: Width::Byte });
        self.inner.read8(addr)
    }
    fn read16(&self, addr: usize) -> u16 {
        self.record(Access::Read { addr, width: Width::Half });
        self.inner.read16(addr)
    }
    fn read32(&self, addr: usize) -> u32 {
        self.record(Access::Read { addr, width: Width::Word });
        self.inner.read32(addr)
    }
    fn read64(&self, addr: usize) -> u64 {
        self.record(Access::Read { addr, width: Width::Double });
        self.inner.read64(addr)
    }
    fn write8(&self, addr: usize, val: u8) {
        self.record(Access::Write { addr, width: Width::Byte, val: val.into() });
        self.inner.write8(addr, val)
    }
    fn write16(&self, addr: usize, val: u16) {
        self.record(Access::Write { addr, width: Width::Half, val: val.into() });
        self.inner.write16(addr, val)
    }
    fn write32(&self, addr: usize, val: u32) {
        self.record(Access::Write { addr, width: Width::Word, val: val.into() });
        self.inner.write32(addr, val)
    }
    fn write64(&self, addr: usize, val: u64) {
        self.record(Access::Write { addr, width: Width::Double, val });
        self.inner.write64(addr, val)
    }
    fn swap32(&self, addr: usize, val: u32) -> u32 {
        self.record(Access::Swap { addr, val });
        self.inner.swap32(addr, val)
    }
}
