// Licensed under the Apache-2.0 license

//! Register maps for the DSP accelerator tiles and the RISC-V machine CSRs
//! the drivers touch.
//!
//! Offsets are byte offsets from the start of each block. Block bases come
//! from `dsp-config` so that a board port can move them.

#![no_std]

pub mod conv1d;
pub mod conv2d;
pub mod csr;
pub mod dma;
pub mod plic;
