// Licensed under the Apache-2.0 license

//! Machine-mode CSR fields used by the interrupt layer.

use num_enum::TryFromPrimitive;
use tock_registers::register_bitfields;

/// Set in `mcause` when the trap was caused by an interrupt.
pub const MCAUSE_INTERRUPT: usize = 1 << (usize::BITS - 1);
pub const MCAUSE_CODE_MASK: usize = !MCAUSE_INTERRUPT;

register_bitfields![usize,
    pub MIE [
        MSIE OFFSET(3) NUMBITS(1) [],
        MTIE OFFSET(7) NUMBITS(1) [],
        MEIE OFFSET(11) NUMBITS(1) [],
    ],
    pub MSTATUS [
        MIE OFFSET(3) NUMBITS(1) [],
        MPIE OFFSET(7) NUMBITS(1) [],
    ],
    pub MTVEC [
        MODE OFFSET(0) NUMBITS(2) [
            Direct = 0,
            Vectored = 1,
        ],
    ],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(usize)]
pub enum Interrupt {
    SupervisorSoft = 1,
    MachineSoft = 3,
    SupervisorTimer = 5,
    MachineTimer = 7,
    SupervisorExternal = 9,
    MachineExternal = 11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(usize)]
pub enum Exception {
    InstructionMisaligned = 0,
    InstructionFault = 1,
    IllegalInstruction = 2,
    Breakpoint = 3,
    LoadMisaligned = 4,
    LoadFault = 5,
    StoreMisaligned = 6,
    StoreFault = 7,
    UserEnvCall = 8,
    SupervisorEnvCall = 9,
    MachineEnvCall = 11,
    InstructionPageFault = 12,
    LoadPageFault = 13,
    StorePageFault = 15,
}

/// `mcause` value delivered for a machine external interrupt.
pub const MACHINE_EXTERNAL_INTERRUPT: usize =
    MCAUSE_INTERRUPT | Interrupt::MachineExternal as usize;
