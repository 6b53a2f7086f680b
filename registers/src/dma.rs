// Licensed under the Apache-2.0 license

//! DSP DMA engine.
//!
//! The engine decodes three kinds of windows:
//! - a global block at offset 0,
//! - one interrupt window per core at `CORE_WINDOW_OFFSET + core * CORE_WINDOW_STRIDE`,
//! - one descriptor window per channel at `CHANNEL_WINDOW_OFFSET + channel * CHANNEL_WINDOW_STRIDE`.

use tock_registers::register_bitfields;

pub const DMA_ADDR: usize = 0x0881_2000;

/// Write 1 to reset the engine. Drops every in-flight transaction.
pub const RESET: usize = 0x00;
/// Number of in-flight transactions. RO.
pub const INFLIGHT_STATUS: usize = 0x01;

pub const CORE_WINDOW_OFFSET: usize = 0x10;
pub const CORE_WINDOW_STRIDE: usize = 0x10;

// Per-core interrupt window
/// Ack to the engine that the interrupt was taken. WO.
pub const INT_SERVICED: usize = 0x00;
/// A completion is pending for this core. RO.
pub const INT_VALID: usize = 0x01;
/// Transaction id of the pending completion (16 bit). RO.
pub const INT_TRANSACTION_ID: usize = 0x02;
/// The pending transaction faulted. RO.
pub const INT_IS_ERROR: usize = 0x04;
/// Address the faulting transaction was accessing (64 bit). RO.
pub const INT_ADDRESS: usize = 0x08;

pub const CHANNEL_WINDOW_OFFSET: usize = 0x100;
pub const CHANNEL_WINDOW_STRIDE: usize = 0x40;
pub const CHANNEL_COUNT: u32 = 7;

// Per-channel descriptor window
pub const START: usize = 0x00;
pub const CORE_ID: usize = 0x04;
pub const TRANSACTION_ID: usize = 0x08;
pub const PERIPHERAL_ID: usize = 0x0A;
pub const TRANSACTION_PRIORITY: usize = 0x0C;
pub const MODE: usize = 0x0E;
pub const ADDR_READ: usize = 0x10;
pub const ADDR_WRITE: usize = 0x18;
pub const NUM_PACKETS: usize = 0x20;
pub const LG_WIDTH: usize = 0x22;
pub const READ_STRIDE: usize = 0x24;
pub const WRITE_STRIDE: usize = 0x26;
/// Non-zero while a core owns the channel. Claimed with an atomic swap.
pub const BUSY: usize = 0x28;

register_bitfields![u8,
    /// Channel mode byte
    pub Mode [
        InterruptEnable OFFSET(0) NUMBITS(1) [],
        AddressGate OFFSET(1) NUMBITS(1) [],
    ],
];

/// Reset value of the mode byte for memory-to-memory descriptors.
pub const MODE_MEM_TO_MEM_DEFAULT: u8 = 0b01;
/// Reset value of the mode byte for memory-to-peripheral descriptors.
pub const MODE_MEM_TO_PERIPH_DEFAULT: u8 = 0b11;
