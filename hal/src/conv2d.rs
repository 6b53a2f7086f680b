// Licensed under the Apache-2.0 license

//! Driver for the 2D image convolution engine.

use crate::error::ConvError;
use crate::mmio::Mmio;
use dsp_config::WaitLimit;
use dsp_registers::conv2d;

/// Job description for one convolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conv2dConfig {
    /// Address of the `height x width` u8 input image.
    pub src_addr: u64,
    /// Address of the i16 output image.
    pub dest_addr: u64,
    pub height: u64,
    pub width: u64,
    /// 3 or 5.
    pub kernel_size: u8,
    pub use_relu: bool,
    /// 0 and 1 both mean a stride of 1.
    pub stride: u8,
}

fn pack_taps(taps: &[i8]) -> u64 {
    taps.iter()
        .enumerate()
        .fold(0, |acc, (i, tap)| acc | (u64::from(*tap as u8) << (8 * i)))
}

pub struct Conv2d<M: Mmio> {
    mmio: M,
    base: usize,
}

impl<M: Mmio> Conv2d<M> {
    pub fn new(mmio: M, base: usize) -> Self {
        Conv2d { mmio, base }
    }

    fn clear_kernel_reg2(&self) {
        for i in 0..conv2d::KERNEL_REG2_LEN {
            self.mmio.write8(self.base + conv2d::KERNEL_REG2 + i, 0);
        }
    }

    /// Resets every register. The engine is left idle with a 3x3 kernel.
    pub fn init(&self) {
        self.mmio.write8(self.base + conv2d::STATUS, 0);
        self.mmio.write8(self.base + conv2d::READY, 1);
        self.mmio.write64(self.base + conv2d::SRC_ADDR, 0);
        self.mmio.write64(self.base + conv2d::DEST_ADDR, 0);
        self.mmio.write64(self.base + conv2d::INPUT_HEIGHT, 0);
        self.mmio.write64(self.base + conv2d::INPUT_WIDTH, 0);
        self.mmio.write64(self.base + conv2d::KERNEL_REG0, 0);
        self.mmio.write8(self.base + conv2d::KERNEL_REG1, 0);
        self.clear_kernel_reg2();
        self.mmio.write64(self.base + conv2d::KERNEL_REG3, 0);
        self.mmio.write8(self.base + conv2d::KERNEL_REG4, 0);
        self.mmio.write8(self.base + conv2d::KERNEL_SIZE, 3);
        self.mmio.write8(self.base + conv2d::USE_RELU, 0);
        self.mmio.write8(self.base + conv2d::STRIDE, 0);
    }

    pub fn configure(&self, config: &Conv2dConfig) {
        self.mmio.write64(self.base + conv2d::SRC_ADDR, config.src_addr);
        self.mmio.write64(self.base + conv2d::DEST_ADDR, config.dest_addr);
        self.mmio.write64(self.base + conv2d::INPUT_HEIGHT, config.height);
        self.mmio.write64(self.base + conv2d::INPUT_WIDTH, config.width);
        self.mmio
            .write8(self.base + conv2d::KERNEL_SIZE, config.kernel_size);
        self.mmio
            .write8(self.base + conv2d::USE_RELU, config.use_relu.into());
        self.mmio.write8(self.base + conv2d::STRIDE, config.stride);
    }

    /// Loads a `size x size` kernel in row-major order.
    pub fn set_kernel(&self, kernel: &[i8], size: u8) -> Result<(), ConvError> {
        if size != 3 && size != 5 {
            return Err(ConvError::UnsupportedKernelSize(size));
        }
        let need = usize::from(size) * usize::from(size);
        if kernel.len() < need {
            return Err(ConvError::KernelTooShort {
                need,
                got: kernel.len(),
            });
        }
        self.mmio.write8(self.base + conv2d::KERNEL_SIZE, size);
        self.mmio
            .write64(self.base + conv2d::KERNEL_REG0, pack_taps(&kernel[..8]));
        self.mmio
            .write8(self.base + conv2d::KERNEL_REG1, kernel[8] as u8);
        if size == 3 {
            self.clear_kernel_reg2();
            self.mmio.write64(self.base + conv2d::KERNEL_REG3, 0);
            self.mmio.write8(self.base + conv2d::KERNEL_REG4, 0);
            return Ok(());
        }
        // KERNEL_REG2 is not 8-byte aligned
        for (i, tap) in kernel[9..16].iter().enumerate() {
            self.mmio
                .write8(self.base + conv2d::KERNEL_REG2 + i, *tap as u8);
        }
        self.mmio
            .write64(self.base + conv2d::KERNEL_REG3, pack_taps(&kernel[16..24]));
        self.mmio
            .write8(self.base + conv2d::KERNEL_REG4, kernel[24] as u8);
        Ok(())
    }

    pub fn start(&self) {
        self.mmio.write8(self.base + conv2d::READY, 0);
    }

    pub fn is_ready(&self) -> bool {
        self.mmio.read8(self.base + conv2d::READY) & 1 != 0
    }

    pub fn status(&self) -> u8 {
        self.mmio.read8(self.base + conv2d::STATUS)
    }

    /// Polls READY. If the budget runs out the engine is forced idle and
    /// [`ConvError::Timeout`] is returned.
    pub fn wait_complete(&self, limit: WaitLimit) -> Result<(), ConvError> {
        let mut spins = 0u64;
        while !self.is_ready() {
            if limit.exhausted(spins) {
                log::warn!("2D convolution timed out after {} polls", spins);
                self.mmio.write8(self.base + conv2d::READY, 1);
                return Err(ConvError::Timeout);
            }
            spins += 1;
        }
        Ok(())
    }

    /// Runs one convolution from reset to completion.
    pub fn perform_convolution(
        &self,
        config: &Conv2dConfig,
        kernel: &[i8],
        limit: WaitLimit,
    ) -> Result<(), ConvError> {
        self.init();
        self.configure(config);
        self.set_kernel(kernel, config.kernel_size)?;
        self.start();
        self.wait_complete(limit)
    }
}
