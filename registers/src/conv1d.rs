// Licensed under the Apache-2.0 license

//! 1D FP32 convolution accelerator.
//!
//! INPUT, OUTPUT and KERNEL are 64-bit FIFO ports carrying two FP32 words
//! per access, low word first.

pub const INPUT: usize = 0x00;
pub const OUTPUT: usize = 0x20;
pub const KERNEL: usize = 0x40;
pub const STATUS: usize = 0x6A;
pub const START: usize = 0x6C;
pub const OUT_COUNT: usize = 0x70;
pub const LENGTH: usize = 0x78;
pub const DILATION: usize = 0x7C;
pub const READ_CHECK: usize = 0x8D;
/// 0 selects an 8-tap kernel, 1 a 16-tap kernel.
pub const KERNEL_LEN: usize = 0x8E;
pub const MMIO_RESET: usize = 0x8F;

pub const BLOCK_SIZE: usize = 0x90;
