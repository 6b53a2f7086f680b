/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    Register model of the multi-channel DMA engine. The bus owns the
    memory the transfers touch, so the engine only tracks descriptors,
    deadlines and the per-core interrupt windows.

--*/

use crate::{read_le, write_le};
use dsp_config::{DmaInterruptConfig, DspMemoryMap, MAX_CORES};
use dsp_hal::Width;
use dsp_registers::dma;
use std::collections::VecDeque;
use tock_registers::LocalRegisterCopy;

/// Descriptor of a transfer that reached its deadline.
#[derive(Clone, Copy, Debug)]
pub struct Transfer {
    pub channel: u32,
    pub addr_r: u64,
    pub addr_w: u64,
    pub inc_r: u16,
    pub inc_w: u16,
    pub len: u16,
    pub logw: u8,
    pub gated: bool,
}

/// Completion reported to a core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Event {
    transaction_id: u16,
    fault: Option<u64>,
}

struct Channel {
    regs: [u8; dma::CHANNEL_WINDOW_STRIDE],
    deadline: Option<u64>,
    mode_reset: u8,
}

impl Channel {
    fn new(mode_reset: u8) -> Self {
        let mut channel = Channel {
            regs: [0; dma::CHANNEL_WINDOW_STRIDE],
            deadline: None,
            mode_reset,
        };
        channel.regs[dma::MODE] = mode_reset;
        channel
    }

    fn field(&self, offset: usize, width: Width) -> u64 {
        read_le(&self.regs, offset, width)
    }

    fn mode(&self) -> LocalRegisterCopy<u8, dma::Mode::Register> {
        LocalRegisterCopy::new(self.regs[dma::MODE])
    }
}

#[derive(Default)]
struct CoreWindow {
    regs: [u8; dma::CORE_WINDOW_STRIDE],
    queue: VecDeque<Event>,
}

impl CoreWindow {
    fn valid(&self) -> bool {
        self.regs[dma::INT_VALID] != 0
    }

    fn present(&mut self, event: Event) {
        self.regs[dma::INT_VALID] = 1;
        write_le(
            &mut self.regs,
            dma::INT_TRANSACTION_ID,
            Width::Half,
            event.transaction_id.into(),
        );
        self.regs[dma::INT_IS_ERROR] = event.fault.is_some().into();
        write_le(&mut self.regs, dma::INT_ADDRESS, Width::Double, event.fault.unwrap_or(0));
    }
}

pub struct DmaEngine {
    map: DspMemoryMap,
    irq: DmaInterruptConfig,
    latency: u64,
    channels: Vec<Channel>,
    cores: Vec<CoreWindow>,
}

impl DmaEngine {
    pub fn new(
        map: DspMemoryMap,
        irq: DmaInterruptConfig,
        latency: u64,
        peripheral_channels: &[u32],
    ) -> Self {
        let channels = (0..map.dma_channel_count)
            .map(|ch| {
                if peripheral_channels.contains(&ch) {
                    Channel::new(dma::MODE_MEM_TO_PERIPH_DEFAULT)
                } else {
                    Channel::new(dma::MODE_MEM_TO_MEM_DEFAULT)
                }
            })
            .collect();
        let cores = (0..MAX_CORES).map(|_| CoreWindow::default()).collect();
        DmaEngine {
            map,
            irq,
            latency,
            channels,
            cores,
        }
    }

    pub fn size(&self) -> usize {
        self.map.dma_channel_offset + self.channels.len() * self.map.dma_channel_stride
    }

    pub fn inflight(&self) -> u8 {
        self.channels.iter().filter(|c| c.deadline.is_some()).count() as u8
    }

    fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            *channel = Channel::new(channel.mode_reset);
        }
        for core in self.cores.iter_mut() {
            *core = CoreWindow::default();
        }
    }

    /// Decodes a window-relative offset into (core, offset) or (channel, offset).
    fn decode(&self, offset: usize) -> Window {
        if offset < self.map.dma_core_window_offset {
            Window::Global(offset)
        } else if offset < self.map.dma_channel_offset {
            let rel = offset - self.map.dma_core_window_offset;
            let core = rel / self.map.dma_core_window_stride;
            if core < MAX_CORES {
                Window::Core(core, rel % self.map.dma_core_window_stride)
            } else {
                Window::None
            }
        } else {
            let rel = offset - self.map.dma_channel_offset;
            let channel = rel / self.map.dma_channel_stride;
            if channel < self.channels.len() {
                Window::Channel(channel, rel % self.map.dma_channel_stride)
            } else {
                Window::None
            }
        }
    }

    pub fn read(&mut self, width: Width, offset: usize) -> u64 {
        match self.decode(offset) {
            Window::Global(dma::INFLIGHT_STATUS) if width == Width::Byte => self.inflight().into(),
            Window::Core(core, off) => read_le(&self.cores[core].regs, off, width),
            Window::Channel(ch, off) => self.channels[ch].field(off, width),
            _ => 0,
        }
    }

    /// Returns the PLIC source to raise, if the write presented a queued
    /// completion.
    pub fn write(&mut self, width: Width, offset: usize, val: u64, now: u64) -> Option<u32> {
        match self.decode(offset) {
            Window::Global(dma::RESET) if val & 1 != 0 => {
                log::debug!("dma: engine reset");
                self.reset();
                None
            }
            Window::Core(core, dma::INT_SERVICED) if val & 1 != 0 => self.serviced(core),
            Window::Channel(ch, dma::START) if val & 1 != 0 => {
                self.start(ch, now);
                None
            }
            Window::Channel(ch, off) => {
                write_le(&mut self.channels[ch].regs, off, width, val);
                None
            }
            _ => None,
        }
    }

    pub fn swap32(&mut self, offset: usize, val: u32) -> u32 {
        match self.decode(offset) {
            Window::Channel(ch, off) => {
                let channel = &mut self.channels[ch];
                let old = read_le(&channel.regs, off, Width::Word) as u32;
                write_le(&mut channel.regs, off, Width::Word, val.into());
                old
            }
            _ => 0,
        }
    }

    fn start(&mut self, ch: usize, now: u64) {
        let channel = &mut self.channels[ch];
        if channel.deadline.is_some() {
            log::warn!("dma: channel {} started while active", ch);
            return;
        }
        channel.deadline = Some(now.saturating_add(self.latency));
    }

    fn serviced(&mut self, core: usize) -> Option<u32> {
        let window = &mut self.cores[core];
        window.regs[dma::INT_VALID] = 0;
        let next = window.queue.pop_front()?;
        window.present(next);
        self.irq.source(core)
    }

    /// Transfers whose deadline passed at `now`, oldest channel first.
    pub fn due(&self, now: u64) -> Vec<Transfer> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.deadline.is_some_and(|d| d <= now))
            .map(|(ch, c)| Transfer {
                channel: ch as u32,
                addr_r: c.field(dma::ADDR_READ, Width::Double),
                addr_w: c.field(dma::ADDR_WRITE, Width::Double),
                inc_r: c.field(dma::READ_STRIDE, Width::Half) as u16,
                inc_w: c.field(dma::WRITE_STRIDE, Width::Half) as u16,
                len: c.field(dma::NUM_PACKETS, Width::Half) as u16,
                logw: c.regs[dma::LG_WIDTH],
                gated: c.mode().is_set(dma::Mode::AddressGate),
            })
            .collect()
    }

    /// Retires a transfer. `fault` is the address that failed, if any.
    /// Returns the PLIC source to raise.
    pub fn finish(&mut self, channel: u32, fault: Option<u64>) -> Option<u32> {
        let channel = &mut self.channels[channel as usize];
        channel.deadline = None;
        write_le(&mut channel.regs, dma::BUSY, Width::Word, 0);
        let event = Event {
            transaction_id: channel.field(dma::TRANSACTION_ID, Width::Half) as u16,
            fault,
        };
        if !channel.mode().is_set(dma::Mode::InterruptEnable) {
            if let Some(addr) = fault {
                log::warn!(
                    "dma: transaction {} faulted at {:#x} with interrupts off",
                    event.transaction_id,
                    addr
                );
            }
            return None;
        }
        let core = usize::from(channel.regs[dma::CORE_ID]);
        let Some(window) = self.cores.get_mut(core) else {
            log::warn!("dma: completion for unknown core {}", core);
            return None;
        };
        if window.valid() {
            window.queue.push_back(event);
            return None;
        }
        window.present(event);
        self.irq.source(core)
    }
}

enum Window {
    Global(usize),
    Core(usize, usize),
    Channel(usize, usize),
    None,
}
