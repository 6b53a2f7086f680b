/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    Root bus of the emulated SoC. Decodes addresses to RAM, the DMA
    engine, the PLIC and the two convolution engines, and advances the
    clock by one tick on every access.

--*/

use crate::conv1d::Conv1dAccel;
use crate::conv2d::Conv2dAccel;
use crate::dma::{DmaEngine, Transfer};
use crate::plic::Plic;
use dsp_config::{DmaInterruptConfig, DspMemoryMap};
use dsp_hal::{Mmio, Width};
use dsp_registers::{conv1d, conv2d};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct BusArgs {
    pub map: DspMemoryMap,
    pub irq: DmaInterruptConfig,
    pub ram_offset: usize,
    pub ram_size: usize,
    /// Ticks from START to completion of a DMA transfer.
    pub dma_latency: u64,
    /// Ticks from READY=0 to completion of a 2D convolution.
    pub conv2d_latency: u64,
    /// Channels wired to a peripheral. Their mode register resets to
    /// interrupt and address gating enabled.
    pub peripheral_channels: Vec<u32>,
}

impl Default for BusArgs {
    fn default() -> Self {
        BusArgs {
            map: DspMemoryMap::default(),
            irq: DmaInterruptConfig::default(),
            ram_offset: 0x8000_0000,
            ram_size: 0x1_0000,
            dma_latency: 32,
            conv2d_latency: 8,
            peripheral_channels: Vec::new(),
        }
    }
}

enum Target {
    Ram(usize),
    Dma(usize),
    Plic(usize),
    Conv1d(usize),
    Conv2d(usize),
    Unmapped,
}

struct BusState {
    clock: u64,
    map: DspMemoryMap,
    ram_offset: usize,
    ram: Vec<u8>,
    dma: DmaEngine,
    plic: Plic,
    conv1d: Conv1dAccel,
    conv2d: Conv2dAccel,
    faults: Vec<usize>,
}

impl BusState {
    fn in_ram(&self, addr: usize, width: Width) -> bool {
        addr >= self.ram_offset
            && addr
                .checked_add(width.bytes())
                .is_some_and(|end| end <= self.ram_offset + self.ram.len())
    }

    fn decode(&self, addr: usize, width: Width) -> Target {
        let within = |base: usize, size: usize| addr >= base && addr - base < size;
        if self.in_ram(addr, width) {
            Target::Ram(addr - self.ram_offset)
        } else if within(self.map.dma_offset, self.dma.size()) {
            Target::Dma(addr - self.map.dma_offset)
        } else if within(self.map.plic_offset, Plic::SIZE) {
            Target::Plic(addr - self.map.plic_offset)
        } else if within(self.map.conv1d_offset, conv1d::BLOCK_SIZE) {
            Target::Conv1d(addr - self.map.conv1d_offset)
        } else if within(self.map.conv2d_offset, conv2d::BLOCK_SIZE) {
            Target::Conv2d(addr - self.map.conv2d_offset)
        } else {
            Target::Unmapped
        }
    }

    fn load(&mut self, width: Width, addr: usize) -> u64 {
        match self.decode(addr, width) {
            Target::Ram(off) => crate::read_le(&self.ram, off, width),
            Target::Dma(off) => self.dma.read(width, off),
            Target::Plic(off) => self.plic.read(width, off),
            Target::Conv1d(off) => self.conv1d.read(width, off),
            Target::Conv2d(off) => self.conv2d.read(width, off),
            Target::Unmapped => {
                log::warn!("bus: unmapped read at {:#x}", addr);
                self.faults.push(addr);
                0
            }
        }
    }

    fn store(&mut self, width: Width, addr: usize, val: u64) {
        match self.decode(addr, width) {
            Target::Ram(off) => crate::write_le(&mut self.ram, off, width, val),
            Target::Dma(off) => {
                if let Some(source) = self.dma.write(width, off, val, self.clock) {
                    self.plic.raise(source);
                }
            }
            Target::Plic(off) => self.plic.write(width, off, val),
            Target::Conv1d(off) => self.conv1d.write(width, off, val),
            Target::Conv2d(off) => self.conv2d.write(width, off, val, self.clock),
            Target::Unmapped => {
                log::warn!("bus: unmapped write at {:#x}", addr);
                self.faults.push(addr);
            }
        }
    }

    /// Copies the packets of `transfer`. Returns the first address rejected
    /// by address gating.
    fn copy(&mut self, transfer: &Transfer) -> Result<(), u64> {
        let Some(width) = Width::from_log2(transfer.logw) else {
            return Err(transfer.addr_r);
        };
        for i in 0..u64::from(transfer.len) {
            let src = transfer.addr_r.wrapping_add(i * u64::from(transfer.inc_r));
            let dst = transfer.addr_w.wrapping_add(i * u64::from(transfer.inc_w));
            if transfer.gated {
                if !self.in_ram(src as usize, width) {
                    return Err(src);
                }
                if !self.in_ram(dst as usize, width) {
                    return Err(dst);
                }
            }
            let val = self.load(width, src as usize);
            self.store(width, dst as usize, val);
        }
        Ok(())
    }

    fn tick(&mut self) {
        self.clock += 1;
        for transfer in self.dma.due(self.clock) {
            let fault = self.copy(&transfer).err();
            if let Some(source) = self.dma.finish(transfer.channel, fault) {
                self.plic.raise(source);
            }
        }
        if let Some(job) = self.conv2d.due(self.clock) {
            let image: Vec<u8> = (0..job.height * job.width)
                .map(|i| self.load(Width::Byte, job.src_addr as usize + i) as u8)
                .collect();
            for (i, pixel) in job.run(&image).into_iter().enumerate() {
                self.store(Width::Half, job.dest_addr as usize + 2 * i, pixel as u16 as u64);
            }
            self.conv2d.finish();
        }
    }
}

/// Thread-safe emulated SoC bus.
pub struct EmulatedBus {
    state: Mutex<BusState>,
}

impl EmulatedBus {
    pub fn new(args: BusArgs) -> Self {
        let dma = DmaEngine::new(
            args.map.clone(),
            args.irq,
            args.dma_latency,
            &args.peripheral_channels,
        );
        EmulatedBus {
            state: Mutex::new(BusState {
                clock: 0,
                map: args.map,
                ram_offset: args.ram_offset,
                ram: vec![0; args.ram_size],
                dma,
                plic: Plic::new(),
                conv1d: Conv1dAccel::new(),
                conv2d: Conv2dAccel::new(args.conv2d_latency),
                faults: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_ticked(&self, width: Width, addr: usize) -> u64 {
        let mut state = self.state();
        state.tick();
        state.load(width, addr)
    }

    fn write_ticked(&self, width: Width, addr: usize, val: u64) {
        let mut state = self.state();
        state.tick();
        state.store(width, addr, val);
    }

    /// Advances the clock by one tick without a bus access.
    pub fn step(&self) {
        self.state().tick();
    }

    pub fn clock(&self) -> u64 {
        self.state().clock
    }

    /// True when the PLIC would interrupt `hart`.
    pub fn external_interrupt_pending(&self, hart: usize) -> bool {
        self.state().plic.interrupt_pending(hart)
    }

    /// Raises an arbitrary PLIC source, as another device would.
    pub fn raise_interrupt(&self, source: u32) {
        self.state().plic.raise(source);
    }

    pub fn set_conv2d_stuck(&self, stuck: bool) {
        self.state().conv2d.set_stuck(stuck);
    }

    pub fn ram_offset(&self) -> usize {
        self.state().ram_offset
    }

    /// Copies `data` into memory without advancing the clock.
    pub fn load_memory(&self, addr: usize, data: &[u8]) {
        let mut state = self.state();
        for (i, byte) in data.iter().enumerate() {
            state.store(Width::Byte, addr + i, (*byte).into());
        }
    }

    /// Reads memory without advancing the clock.
    pub fn dump_memory(&self, addr: usize, len: usize) -> Vec<u8> {
        let mut state = self.state();
        (0..len)
            .map(|i| state.load(Width::Byte, addr + i) as u8)
            .collect()
    }

    /// Addresses of unmapped accesses since the last call.
    pub fn take_faults(&self) -> Vec<usize> {
        std::mem::take(&mut self.state().faults)
    }
}

impl Mmio for EmulatedBus {
    fn read8(&self, addr: usize) -> u8 {
        self.read_ticked(Width::Byte, addr) as u8
    }
    fn read16(&self, addr: usize) -> u16 {
        self.read_ticked(Width::Half, addr) as u16
    }
    fn read32(&self, addr: usize) -> u32 {
        self.read_ticked(Width::Word, addr) as u32
    }
    fn read64(&self, addr: usize) -> u64 {
        self.read_ticked(Width::Double, addr)
    }
    fn write8(&self, addr: usize, val: u8) {
        self.write_ticked(Width::Byte, addr, val.into())
    }
    fn write16(&self, addr: usize, val: u16) {
        self.write_ticked(Width::Half, addr, val.into())
    }
    fn write32(&self, addr: usize, val: u32) {
        self.write_ticked(Width::Word, addr, val.into())
    }
    fn write64(&self, addr: usize, val: u64) {
        self.write_ticked(Width::Double, addr, val)
    }
    fn swap32(&self, addr: usize, val: u32) -> u32 {
        let mut state = self.state();
        state.tick();
        match state.decode(addr, Width::Word) {
            Target::Dma(off) => state.dma.swap32(off, val),
            _ => {
                let old = state.load(Width::Word, addr) as u32;
                state.store(Width::Word, addr, val.into());
                old
            }
        }
    }
}
