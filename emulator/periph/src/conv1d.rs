/*++

Licensed under the Apache-2.0 license.

File Name:

    conv1d.rs

Abstract:

    1D FP32 convolution accelerator. START computes the full convolution
    of the streamed input with the kernel; OUTPUT pops two results per
    64-bit read.

--*/

use crate::{read_le, write_le};
use dsp_hal::Width;
use dsp_registers::conv1d;
use std::collections::VecDeque;

pub const STATUS_IDLE: u8 = 0;
pub const STATUS_DONE: u8 = 1;

pub struct Conv1dAccel {
    regs: [u8; conv1d::BLOCK_SIZE],
    input: Vec<u32>,
    kernel: Vec<u32>,
    output: VecDeque<u32>,
    in_reset: bool,
}

impl Conv1dAccel {
    pub fn new() -> Self {
        Conv1dAccel {
            regs: [0; conv1d::BLOCK_SIZE],
            input: Vec::new(),
            kernel: Vec::new(),
            output: VecDeque::new(),
            in_reset: false,
        }
    }

    fn reset(&mut self) {
        self.input.clear();
        self.kernel.clear();
        self.output.clear();
        self.regs[conv1d::STATUS] = STATUS_IDLE;
    }

    fn compute(&mut self) {
        let length = read_le(&self.regs, conv1d::LENGTH, Width::Word) as usize;
        let dilation = read_le(&self.regs, conv1d::DILATION, Width::Half).max(1) as usize;
        let taps = if self.regs[conv1d::KERNEL_LEN] & 1 != 0 { 16 } else { 8 };

        let input: Vec<f32> = (0..length)
            .map(|i| f32::from_bits(self.input.get(i).copied().unwrap_or(0)))
            .collect();
        let kernel: Vec<f32> = (0..taps)
            .map(|i| f32::from_bits(self.kernel.get(i).copied().unwrap_or(0)))
            .collect();

        let out_len = if length == 0 { 0 } else { length + (taps - 1) * dilation };
        self.output.clear();
        for n in 0..out_len {
            let mut acc = 0.0f32;
            for (k, w) in kernel.iter().enumerate() {
                let Some(i) = n.checked_sub(k * dilation) else {
                    break;
                };
                if let Some(x) = input.get(i) {
                    acc += x * w;
                }
            }
            self.output.push_back(acc.to_bits());
        }
        write_le(&mut self.regs, conv1d::OUT_COUNT, Width::Word, out_len as u64);
        self.regs[conv1d::STATUS] = STATUS_DONE;
        self.regs[conv1d::READ_CHECK] = (!self.output.is_empty()).into();
        log::debug!("conv1d: {} inputs, {} taps -> {} outputs", length, taps, out_len);
    }

    fn pop_pair(&mut self) -> u64 {
        let lo = self.output.pop_front().unwrap_or(0);
        let hi = self.output.pop_front().unwrap_or(0);
        self.regs[conv1d::READ_CHECK] = (!self.output.is_empty()).into();
        u64::from(lo) | (u64::from(hi) << 32)
    }

    pub fn read(&mut self, width: Width, offset: usize) -> u64 {
        match offset {
            conv1d::OUTPUT if width == Width::Double => self.pop_pair(),
            _ => read_le(&self.regs, offset, width),
        }
    }

    pub fn write(&mut self, width: Width, offset: usize, val: u64) {
        match offset {
            conv1d::MMIO_RESET => {
                self.in_reset = val & 1 != 0;
                if self.in_reset {
                    self.reset();
                }
            }
            conv1d::INPUT | conv1d::KERNEL if width == Width::Double => {
                if self.in_reset {
                    return;
                }
                let fifo = if offset == conv1d::INPUT {
                    &mut self.input
                } else {
                    &mut self.kernel
                };
                fifo.push(val as u32);
                fifo.push((val >> 32) as u32);
            }
            conv1d::OUTPUT => {}
            conv1d::START => {
                if val & 1 != 0 && !self.in_reset {
                    self.compute();
                }
            }
            _ => write_le(&mut self.regs, offset, width, val),
        }
    }
}
