// Licensed under the Apache-2.0 license

#![cfg_attr(target_arch = "riscv64", no_std)]

use dsp_registers::{dma, plic};

/// Maximum number of cores the DMA interrupt routing table can describe.
pub const MAX_CORES: usize = 9;

/// Configures the memory map of the accelerator SoC.
/// These are the defaults that can be overridden and provided to the drivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DspMemoryMap {
    pub dma_offset: usize,
    pub dma_core_window_offset: usize,
    pub dma_core_window_stride: usize,
    pub dma_channel_offset: usize,
    pub dma_channel_stride: usize,
    pub dma_channel_count: u32,
    pub plic_offset: usize,
    /// Board specific. The 1D convolution tile is placed by SoC integration.
    pub conv1d_offset: usize,
    /// Board specific. The 2D convolution tile is placed by SoC integration.
    pub conv2d_offset: usize,
}

impl Default for DspMemoryMap {
    fn default() -> Self {
        DspMemoryMap {
            dma_offset: dma::DMA_ADDR,
            dma_core_window_offset: dma::CORE_WINDOW_OFFSET,
            dma_core_window_stride: dma::CORE_WINDOW_STRIDE,
            dma_channel_offset: dma::CHANNEL_WINDOW_OFFSET,
            dma_channel_stride: dma::CHANNEL_WINDOW_STRIDE,
            dma_channel_count: dma::CHANNEL_COUNT,
            plic_offset: plic::PLIC_ADDR,
            conv1d_offset: 0x0880_0000,
            conv2d_offset: 0x0880_1000,
        }
    }
}

impl DspMemoryMap {
    /// Base of the interrupt window for `core`.
    pub fn dma_core_window(&self, core: usize) -> usize {
        self.dma_offset + self.dma_core_window_offset + core * self.dma_core_window_stride
    }

    /// Base of the descriptor window for `channel`.
    pub fn dma_channel_window(&self, channel: u32) -> usize {
        self.dma_offset + self.dma_channel_offset + channel as usize * self.dma_channel_stride
    }
}

/// Routing of the DMA completion interrupt to each core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DmaInterruptConfig {
    /// PLIC source that carries core `i`'s DMA completion.
    pub sources: [u32; MAX_CORES],
    pub core_count: usize,
    /// PLIC priority, 1 (low) to 7 (high).
    pub priority: u32,
}

impl Default for DmaInterruptConfig {
    fn default() -> Self {
        let mut sources = [0; MAX_CORES];
        sources[0] = 4;
        sources[1] = 5;
        DmaInterruptConfig {
            sources,
            core_count: 2,
            priority: 5,
        }
    }
}

impl DmaInterruptConfig {
    /// PLIC source for `core`, or `None` if the core is not routed.
    pub fn source(&self, core: usize) -> Option<u32> {
        if core < self.core_count.min(MAX_CORES) {
            Some(self.sources[core])
        } else {
            None
        }
    }
}

/// Bound on a busy-wait loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitLimit {
    /// Spin until the condition holds.
    #[default]
    Unbounded,
    /// Give up after this many polls.
    Spins(u64),
}

impl WaitLimit {
    /// True once `spins` polls have used up the budget.
    pub fn exhausted(&self, spins: u64) -> bool {
        match self {
            WaitLimit::Unbounded => false,
            WaitLimit::Spins(limit) => spins >= *limit,
        }
    }
}

/// Default wait for DMA completion. The engine is expected to always finish,
/// so the wait is unbounded unless a caller asks otherwise.
pub const DMA_WAIT_LIMIT: WaitLimit = WaitLimit::Unbounded;

/// Polls of the READY bit before the 2D convolution engine is forced idle.
pub const CONV2D_WAIT_LIMIT: WaitLimit = WaitLimit::Spins(100_000_000);
