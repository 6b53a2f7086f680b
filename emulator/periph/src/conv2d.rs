/*++

Licensed under the Apache-2.0 license.

File Name:

    conv2d.rs

Abstract:

    2D image convolution engine. Writing READY=0 schedules a job; when it
    is due the bus runs it against memory and READY returns to 1.

--*/

use crate::{read_le, write_le};
use dsp_hal::Width;
use dsp_registers::conv2d;

/// Snapshot of the engine registers for one job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conv2dJob {
    pub src_addr: u64,
    pub dest_addr: u64,
    pub height: usize,
    pub width: usize,
    pub size: usize,
    pub kernel: Vec<i8>,
    pub relu: bool,
    pub stride: usize,
}

impl Conv2dJob {
    pub fn out_dims(&self) -> (usize, usize) {
        let dim = |n: usize| {
            if n >= self.size {
                (n - self.size) / self.stride + 1
            } else {
                0
            }
        };
        (dim(self.height), dim(self.width))
    }

    /// Valid (unpadded) convolution of a row-major u8 image.
    pub fn run(&self, image: &[u8]) -> Vec<i16> {
        let (out_h, out_w) = self.out_dims();
        let mut out = Vec::with_capacity(out_h * out_w);
        for oy in 0..out_h {
            for ox in 0..out_w {
                let mut acc = 0i32;
                for ky in 0..self.size {
                    for kx in 0..self.size {
                        let y = oy * self.stride + ky;
                        let x = ox * self.stride + kx;
                        let pixel = image.get(y * self.width + x).copied().unwrap_or(0);
                        acc += i32::from(pixel) * i32::from(self.kernel[ky * self.size + kx]);
                    }
                }
                if self.relu {
                    acc = acc.max(0);
                }
                out.push(acc.clamp(i16::MIN.into(), i16::MAX.into()) as i16);
            }
        }
        out
    }
}

pub struct Conv2dAccel {
    regs: [u8; conv2d::BLOCK_SIZE],
    latency: u64,
    deadline: Option<u64>,
    stuck: bool,
}

impl Conv2dAccel {
    pub fn new(latency: u64) -> Self {
        let mut regs = [0; conv2d::BLOCK_SIZE];
        regs[conv2d::READY] = 1;
        regs[conv2d::KERNEL_SIZE] = 3;
        Conv2dAccel {
            regs,
            latency,
            deadline: None,
            stuck: false,
        }
    }

    /// A stuck engine accepts jobs but never finishes them.
    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    fn job(&self) -> Conv2dJob {
        let size = if self.regs[conv2d::KERNEL_SIZE] == 5 { 5 } else { 3 };
        let kernel = self.regs[conv2d::KERNEL_REG0..conv2d::KERNEL_REG0 + size * size]
            .iter()
            .map(|b| *b as i8)
            .collect();
        Conv2dJob {
            src_addr: read_le(&self.regs, conv2d::SRC_ADDR, Width::Double),
            dest_addr: read_le(&self.regs, conv2d::DEST_ADDR, Width::Double),
            height: read_le(&self.regs, conv2d::INPUT_HEIGHT, Width::Double) as usize,
            width: read_le(&self.regs, conv2d::INPUT_WIDTH, Width::Double) as usize,
            size,
            kernel,
            relu: self.regs[conv2d::USE_RELU] & 1 != 0,
            stride: usize::from(self.regs[conv2d::STRIDE]).max(1),
        }
    }

    /// The scheduled job, once its deadline has passed.
    pub fn due(&self, now: u64) -> Option<Conv2dJob> {
        match self.deadline {
            Some(deadline) if deadline <= now => Some(self.job()),
            _ => None,
        }
    }

    pub fn finish(&mut self) {
        self.deadline = None;
        self.regs[conv2d::READY] = 1;
        self.regs[conv2d::STATUS] = 1;
    }

    pub fn read(&mut self, width: Width, offset: usize) -> u64 {
        read_le(&self.regs, offset, width)
    }

    pub fn write(&mut self, width: Width, offset: usize, val: u64, now: u64) {
        if offset == conv2d::READY {
            if val & 1 == 0 {
                self.regs[conv2d::READY] = 0;
                self.regs[conv2d::STATUS] = 0;
                if !self.stuck {
                    self.deadline = Some(now.saturating_add(self.latency));
                }
            } else {
                // forced idle
                self.regs[conv2d::READY] = 1;
                self.deadline = None;
            }
            return;
        }
        write_le(&mut self.regs, offset, width, val);
    }
}
