// Licensed under the Apache-2.0 license

//! PLIC routing and trap classification for DMA completion interrupts.

use crate::mmio::Mmio;
use dsp_registers::csr::{
    Exception, Interrupt, MACHINE_EXTERNAL_INTERRUPT, MCAUSE_CODE_MASK, MCAUSE_INTERRUPT, MTVEC,
};
use dsp_registers::plic;
use tock_registers::LocalRegisterCopy;

/// Machine-mode CSR access of the current hart.
pub trait Csr {
    fn hart_id(&self) -> usize;
    /// Sets mie.MEIE.
    fn enable_machine_external_interrupts(&self);
    /// Sets mstatus.MIE.
    fn enable_machine_interrupts(&self);
    fn set_trap_vector(&self, value: usize);
    fn cycles(&self) -> u64;
}

/// View of the platform interrupt controller. Context index = core index.
pub struct Plic<'m, M: Mmio> {
    mmio: &'m M,
    base: usize,
}

impl<'m, M: Mmio> Plic<'m, M> {
    pub fn new(mmio: &'m M, base: usize) -> Self {
        Plic { mmio, base }
    }

    /// Enables `source` for `context`. This overwrites the whole enable word,
    /// so any other source sharing the word is disabled.
    pub fn enable(&self, source: u32, context: usize) {
        let word = self.base + plic::enable(context) + 4 * (source as usize / 32);
        self.mmio.write32(word, 1 << (source % 32));
    }

    pub fn set_priority(&self, source: u32, level: u32) {
        self.mmio.write32(self.base + plic::priority(source), level);
    }

    pub fn claim(&self, context: usize) -> u32 {
        self.mmio.read32(self.base + plic::claim_complete(context))
    }

    pub fn complete(&self, context: usize, source: u32) {
        self.mmio
            .write32(self.base + plic::claim_complete(context), source);
    }
}

/// What a trap turned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapOutcome {
    /// A DMA completion resolved the tracker entry for this transaction.
    Completed(u16),
    /// A DMA completion arrived for a transaction nobody is tracking.
    Stale(u16),
    /// The claimed interrupt source is not this core's DMA source. The claim
    /// is left incomplete.
    Foreign(u32),
    /// This core's DMA source fired but its window held no completion, for
    /// example after `wait_for_core` already serviced it. The claim is
    /// completed and nothing is resolved.
    Spurious(u32),
    /// Unhandled trap. The process must exit with this code.
    Fatal(i32),
}

/// Handler the global trap entry dispatches to.
pub trait TrapService: Sync {
    fn handle_trap(&self, cause: usize, hart: usize) -> TrapOutcome;
}

pub fn is_machine_external_interrupt(cause: usize) -> bool {
    cause == MACHINE_EXTERNAL_INTERRUPT
}

/// Exit status for an unhandled trap: the low 31 bits of `mcause`, negated
/// when `mcause` is negative as a signed word.
pub fn exit_code_for_cause(cause: usize) -> i32 {
    let code = (cause & ((1 << 31) - 1)) as i32;
    if (cause as isize) < 0 {
        -code
    } else {
        code
    }
}

/// Logs an unhandled trap and returns its exit status.
pub fn fatal_trap(cause: usize) -> TrapOutcome {
    let code = cause & MCAUSE_CODE_MASK;
    if cause & MCAUSE_INTERRUPT != 0 {
        match Interrupt::try_from(code) {
            Ok(irq) => log::error!("unhandled interrupt {:?}", irq),
            Err(_) => log::error!("unhandled interrupt {:#x}", code),
        }
    } else {
        match Exception::try_from(code) {
            Ok(exception) => log::error!("unhandled exception {:?}", exception),
            Err(_) => log::error!("unhandled exception {:#x}", code),
        }
    }
    TrapOutcome::Fatal(exit_code_for_cause(cause))
}

/// Points mtvec at `entry` in direct mode.
pub fn install_trap_vector(csr: &impl Csr, entry: usize) {
    let mut mtvec = LocalRegisterCopy::<usize, MTVEC::Register>::new(entry);
    mtvec.modify(MTVEC::MODE::Direct);
    csr.set_trap_vector(mtvec.get());
}
