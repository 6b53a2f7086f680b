// Licensed under the Apache-2.0 license

//! 2D convolution engine.
//!
//! The 25 kernel taps of a 5x5 kernel are packed as signed bytes across
//! KERNEL_REG0 (taps 0..8), KERNEL_REG1 (tap 8), KERNEL_REG2 (taps 9..16,
//! byte addressed), KERNEL_REG3 (taps 16..24) and KERNEL_REG4 (tap 24).

pub const STATUS: usize = 0x00;
/// 1 when idle or done. Software writes 0 to start.
pub const READY: usize = 0x08;
pub const SRC_ADDR: usize = 0x10;
pub const DEST_ADDR: usize = 0x20;
pub const INPUT_HEIGHT: usize = 0x40;
pub const INPUT_WIDTH: usize = 0x60;
pub const KERNEL_REG0: usize = 0x70;
pub const KERNEL_REG1: usize = 0x78;
pub const KERNEL_REG2: usize = 0x79;
pub const KERNEL_REG2_LEN: usize = 7;
pub const KERNEL_REG3: usize = 0x80;
pub const KERNEL_REG4: usize = 0x88;
pub const KERNEL_SIZE: usize = 0x90;
pub const USE_RELU: usize = 0x98;
/// 0 is the reset value and means a stride of 1.
pub const STRIDE: usize = 0xA0;

pub const BLOCK_SIZE: usize = 0xA8;
