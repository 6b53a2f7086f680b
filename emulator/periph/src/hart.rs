/*++

Licensed under the Apache-2.0 license.

File Name:

    hart.rs

Abstract:

    Machine-mode CSR state of one emulated hart.

--*/

use dsp_hal::Csr;
use dsp_registers::csr::{MIE, MSTATUS};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tock_registers::LocalRegisterCopy;

pub struct EmulatedHart {
    id: usize,
    mie: AtomicUsize,
    mstatus: AtomicUsize,
    mtvec: AtomicUsize,
    mcycle: AtomicU64,
}

impl EmulatedHart {
    pub fn new(id: usize) -> Self {
        EmulatedHart {
            id,
            mie: AtomicUsize::new(0),
            mstatus: AtomicUsize::new(0),
            mtvec: AtomicUsize::new(0),
            mcycle: AtomicU64::new(0),
        }
    }

    pub fn mie(&self) -> LocalRegisterCopy<usize, MIE::Register> {
        LocalRegisterCopy::new(self.mie.load(Ordering::Acquire))
    }

    pub fn mstatus(&self) -> LocalRegisterCopy<usize, MSTATUS::Register> {
        LocalRegisterCopy::new(self.mstatus.load(Ordering::Acquire))
    }

    pub fn mtvec(&self) -> usize {
        self.mtvec.load(Ordering::Acquire)
    }

    /// True when a machine external interrupt would be taken.
    pub fn external_interrupts_enabled(&self) -> bool {
        self.mie().is_set(MIE::MEIE) && self.mstatus().is_set(MSTATUS::MIE)
    }
}

impl Csr for EmulatedHart {
    fn hart_id(&self) -> usize {
        self.id
    }

    fn enable_machine_external_interrupts(&self) {
        self.mie.fetch_or(MIE::MEIE::SET.value, Ordering::AcqRel);
    }

    fn enable_machine_interrupts(&self) {
        self.mstatus.fetch_or(MSTATUS::MIE::SET.value, Ordering::AcqRel);
    }

    fn set_trap_vector(&self, value: usize) {
        self.mtvec.store(value, Ordering::Release);
    }

    fn cycles(&self) -> u64 {
        self.mcycle.fetch_add(1, Ordering::AcqRel)
    }
}
