// Licensed under the Apache-2.0 license

//! Driver for the 1D FP32 convolution accelerator.
//!
//! Values are raw IEEE-754 words. The INPUT, KERNEL and OUTPUT ports move two
//! words per 64-bit access, low word first.

use crate::error::ConvError;
use crate::mmio::Mmio;
use dsp_registers::conv1d;

pub struct Conv1d<M: Mmio> {
    mmio: M,
    base: usize,
}

fn pack(pair: &[u32]) -> u64 {
    let lo = u64::from(pair[0]);
    let hi = pair.get(1).copied().map_or(0, u64::from);
    lo | (hi << 32)
}

impl<M: Mmio> Conv1d<M> {
    pub fn new(mmio: M, base: usize) -> Self {
        Conv1d { mmio, base }
    }

    /// Clears the parameter registers and holds the engine in reset.
    pub fn init(&self) {
        self.mmio.write64(self.base + conv1d::INPUT, 0);
        self.mmio.write64(self.base + conv1d::OUTPUT, 0);
        self.mmio.write64(self.base + conv1d::KERNEL, 0);
        self.mmio.write8(self.base + conv1d::START, 0);
        self.mmio.write32(self.base + conv1d::OUT_COUNT, 0);
        self.mmio.write32(self.base + conv1d::LENGTH, 0);
        self.mmio.write16(self.base + conv1d::DILATION, 0);
        self.mmio.write8(self.base + conv1d::KERNEL_LEN, 0);
        self.mmio.write8(self.base + conv1d::MMIO_RESET, 1);
    }

    /// Releases reset and streams the input and the kernel into the engine.
    /// An odd input tail is padded with a zero word.
    pub fn set_params(&self, input: &[u32], dilation: u16, kernel: &[u32]) -> Result<(), ConvError> {
        let kernel_len = match kernel.len() {
            8 => 0,
            16 => 1,
            len => return Err(ConvError::UnsupportedKernelLength(len)),
        };
        self.mmio.write8(self.base + conv1d::MMIO_RESET, 0);
        for pair in input.chunks(2) {
            self.mmio.write64(self.base + conv1d::INPUT, pack(pair));
        }
        self.mmio
            .write32(self.base + conv1d::LENGTH, input.len() as u32);
        self.mmio.write16(self.base + conv1d::DILATION, dilation);
        for pair in kernel.chunks(2) {
            self.mmio.write64(self.base + conv1d::KERNEL, pack(pair));
        }
        self.mmio.write8(self.base + conv1d::KERNEL_LEN, kernel_len);
        Ok(())
    }

    pub fn start(&self) {
        self.mmio.write8(self.base + conv1d::START, 1);
    }

    /// Fills `output` from the OUTPUT port and returns the final status.
    pub fn read_output(&self, output: &mut [u32]) -> u8 {
        for pair in output.chunks_mut(2) {
            let word = self.mmio.read64(self.base + conv1d::OUTPUT);
            pair[0] = word as u32;
            if let Some(hi) = pair.get_mut(1) {
                *hi = (word >> 32) as u32;
            }
        }
        self.status()
    }

    pub fn status(&self) -> u8 {
        self.mmio.read8(self.base + conv1d::STATUS)
    }

    pub fn out_count(&self) -> u32 {
        self.mmio.read32(self.base + conv1d::OUT_COUNT)
    }

    pub fn read_check(&self) -> u8 {
        self.mmio.read8(self.base + conv1d::READ_CHECK)
    }
}
