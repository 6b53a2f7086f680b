// Licensed under the Apache-2.0 license

//! Machine-mode glue: CSR access, the global trap entry and the trap service
//! it dispatches to.

use crate::irq::{self, Csr, TrapOutcome, TrapService};
use core::arch::asm;
use core::cell::Cell;
use critical_section::Mutex;
use dsp_registers::csr::{MIE, MSTATUS};

core::arch::global_asm!(include_str!("trap.s"));

extern "C" {
    fn dsp_trap_entry();
}

static TRAP_SERVICE: Mutex<Cell<Option<&'static dyn TrapService>>> = Mutex::new(Cell::new(None));

/// CSRs of the executing hart.
#[derive(Clone, Copy, Default)]
pub struct MachineCsr;

impl Csr for MachineCsr {
    fn hart_id(&self) -> usize {
        let hart: usize;
        unsafe { asm!("csrr {}, mhartid", out(reg) hart) };
        hart
    }

    fn enable_machine_external_interrupts(&self) {
        let bits = MIE::MEIE::SET.value;
        unsafe { asm!("csrs mie, {}", in(reg) bits) };
    }

    fn enable_machine_interrupts(&self) {
        let bits = MSTATUS::MIE::SET.value;
        unsafe { asm!("csrs mstatus, {}", in(reg) bits) };
    }

    fn set_trap_vector(&self, value: usize) {
        unsafe { asm!("csrw mtvec, {}", in(reg) value) };
    }

    fn cycles(&self) -> u64 {
        let cycles: u64;
        unsafe { asm!("csrr {}, mcycle", out(reg) cycles) };
        cycles
    }
}

/// Registers the handler that every trap on every hart is routed to.
pub fn set_trap_service(service: &'static dyn TrapService) {
    critical_section::with(|cs| TRAP_SERVICE.borrow(cs).set(Some(service)));
}

/// Points mtvec at the global trap entry.
pub fn install_trap_entry() {
    irq::install_trap_vector(&MachineCsr, dsp_trap_entry as usize);
}

#[no_mangle]
extern "C" fn dsp_trap_handler(epc: usize, cause: usize, _tval: usize) -> usize {
    let service = critical_section::with(|cs| TRAP_SERVICE.borrow(cs).get());
    let outcome = match service {
        Some(service) => service.handle_trap(cause, MachineCsr.hart_id()),
        None => irq::fatal_trap(cause),
    };
    if let TrapOutcome::Fatal(code) = outcome {
        dsp_romtime::process_exit(code);
    }
    epc
}
