// Licensed under the Apache-2.0 license

//! RISC-V Platform-Level Interrupt Controller.
//! <https://github.com/riscv/riscv-plic-spec/blob/master/riscv-plic.adoc>

pub const PLIC_ADDR: usize = 0x0C00_0000;

/// Interrupt source priorities, one 32-bit word per source.
pub const PRIORITY_OFFSET: usize = 0x00_0000;
/// Pending bits, one bit per source.
pub const PENDING_OFFSET: usize = 0x00_1000;
/// Enable bits, one 0x80 block per context.
pub const ENABLE_OFFSET: usize = 0x00_2000;
pub const ENABLE_CONTEXT_STRIDE: usize = 0x80;
/// Threshold and claim/complete registers, one 4K page per context.
pub const CONTEXT_OFFSET: usize = 0x20_0000;
pub const CONTEXT_STRIDE: usize = 0x1000;
pub const THRESHOLD: usize = 0x0;
pub const CLAIM_COMPLETE: usize = 0x4;

/// Number of sources covered by the emulated and real controllers.
pub const SOURCE_COUNT: usize = 32;

pub const fn priority(source: u32) -> usize {
    PRIORITY_OFFSET + 4 * source as usize
}

pub const fn enable(context: usize) -> usize {
    ENABLE_OFFSET + ENABLE_CONTEXT_STRIDE * context
}

pub const fn threshold(context: usize) -> usize {
    CONTEXT_OFFSET + CONTEXT_STRIDE * context + THRESHOLD
}

pub const fn claim_complete(context: usize) -> usize {
    CONTEXT_OFFSET + CONTEXT_STRIDE * context + CLAIM_COMPLETE
}
