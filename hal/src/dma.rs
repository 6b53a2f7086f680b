// Licensed under the Apache-2.0 license

//! DMA channel driver.
//!
//! A core claims a channel through the channel's busy word, writes the
//! descriptor, registers an optional completion with the tracker and pulses
//! START. Completion is observed either by polling the global in-flight
//! counter or through the per-core interrupt window.

use crate::error::DmaError;
use crate::irq::{self, Csr, Plic, TrapOutcome, TrapService};
use crate::mmio::Mmio;
use crate::tracker::{Completion, CompletionTracker};
use dsp_config::{DmaInterruptConfig, DspMemoryMap, WaitLimit, MAX_CORES};
use dsp_registers::dma;
use tock_registers::LocalRegisterCopy;

/// Outstanding tracked transactions. One per channel leaves room for a
/// stale id on every channel.
pub const DEFAULT_TRACKER_CAPACITY: usize = 16;

/// One DMA descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DmaTransaction {
    /// Core whose interrupt window receives the completion.
    pub core: u8,
    pub transaction_id: u16,
    pub transaction_priority: u8,
    /// Only used by memory-to-peripheral transfers.
    pub peripheral_id: u8,
    pub addr_r: u64,
    pub addr_w: u64,
    /// Per-packet stride in bytes.
    pub inc_r: u16,
    pub inc_w: u16,
    /// Packet count.
    pub len: u16,
    /// log2 of the packet width in bytes.
    pub logw: u8,
    pub do_interrupt: bool,
    pub do_address_gate: bool,
}

impl DmaTransaction {
    /// Mode byte for the channel window.
    pub fn mode(&self) -> u8 {
        let mut mode = LocalRegisterCopy::<u8, dma::Mode::Register>::new(0);
        mode.modify(
            dma::Mode::InterruptEnable.val(self.do_interrupt.into())
                + dma::Mode::AddressGate.val(self.do_address_gate.into()),
        );
        mode.get()
    }
}

/// Cycle counter of the calling hart.
pub fn ticks(csr: &impl Csr) -> u64 {
    csr.cycles()
}

pub struct Dma<'a, M: Mmio, const N: usize = DEFAULT_TRACKER_CAPACITY> {
    mmio: M,
    map: DspMemoryMap,
    irq: DmaInterruptConfig,
    tracker: CompletionTracker<'a, N>,
}

impl<'a, M: Mmio, const N: usize> Dma<'a, M, N> {
    pub fn new(mmio: M) -> Self {
        Self::with_config(mmio, DspMemoryMap::default(), DmaInterruptConfig::default())
    }

    pub fn with_config(mmio: M, map: DspMemoryMap, irq: DmaInterruptConfig) -> Self {
        Dma {
            mmio,
            map,
            irq,
            tracker: CompletionTracker::new(),
        }
    }

    pub fn mmio(&self) -> &M {
        &self.mmio
    }

    pub fn tracker(&self) -> &CompletionTracker<'a, N> {
        &self.tracker
    }

    pub fn plic(&self) -> Plic<'_, M> {
        Plic::new(&self.mmio, self.map.plic_offset)
    }

    fn channel_window(&self, channel: u32) -> Result<usize, DmaError> {
        if channel >= self.map.dma_channel_count {
            return Err(DmaError::InvalidChannel(channel));
        }
        Ok(self.map.dma_channel_window(channel))
    }

    fn core_window(&self, core: usize) -> Result<usize, DmaError> {
        if core >= MAX_CORES {
            return Err(DmaError::InvalidCore(core));
        }
        Ok(self.map.dma_core_window(core))
    }

    /// Claims `channel` for the calling core.
    ///
    /// The previous busy word is non-zero when another core holds the
    /// channel. Without `retry` that is reported as [`DmaError::ChannelBusy`];
    /// with `retry` the swap is repeated until it succeeds.
    pub fn acquire_channel(&self, channel: u32, retry: bool) -> Result<(), DmaError> {
        let busy = self.channel_window(channel)? + dma::BUSY;
        if self.mmio.swap32(busy, 1) == 0 {
            return Ok(());
        }
        if !retry {
            return Err(DmaError::ChannelBusy(channel));
        }
        while self.mmio.swap32(busy, 1) != 0 {
            core::hint::spin_loop();
        }
        Ok(())
    }

    /// Gives up a channel that was claimed but never started.
    pub fn release_channel(&self, channel: u32) -> Result<(), DmaError> {
        let window = self.channel_window(channel)?;
        self.mmio.write8(window + dma::BUSY, 0);
        Ok(())
    }

    /// Writes the fields shared by both descriptor kinds. The channel must be
    /// held by the caller.
    pub fn configure_common(&self, channel: u32, tx: &DmaTransaction) -> Result<(), DmaError> {
        let window = self.channel_window(channel)?;
        self.mmio.write8(window + dma::CORE_ID, tx.core);
        self.mmio.write16(window + dma::TRANSACTION_ID, tx.transaction_id);
        self.mmio
            .write8(window + dma::TRANSACTION_PRIORITY, tx.transaction_priority);
        self.mmio.write8(window + dma::LG_WIDTH, tx.logw);
        self.mmio.write64(window + dma::ADDR_READ, tx.addr_r);
        self.mmio.write64(window + dma::ADDR_WRITE, tx.addr_w);
        self.mmio.write16(window + dma::NUM_PACKETS, tx.len);
        Ok(())
    }

    pub fn configure_memory_to_memory(
        &self,
        channel: u32,
        tx: &DmaTransaction,
        retry: bool,
    ) -> Result<(), DmaError> {
        self.acquire_channel(channel, retry)?;
        self.configure_common(channel, tx)?;
        let window = self.channel_window(channel)?;
        self.mmio.write16(window + dma::READ_STRIDE, tx.inc_r);
        self.mmio.write16(window + dma::WRITE_STRIDE, tx.inc_w);
        let mode = tx.mode();
        if mode != dma::MODE_MEM_TO_MEM_DEFAULT {
            self.mmio.write8(window + dma::MODE, mode);
        }
        Ok(())
    }

    pub fn configure_memory_to_peripheral(
        &self,
        channel: u32,
        tx: &DmaTransaction,
        retry: bool,
    ) -> Result<(), DmaError> {
        self.acquire_channel(channel, retry)?;
        self.configure_common(channel, tx)?;
        let window = self.channel_window(channel)?;
        // strides reset to 0
        if tx.inc_r != 0 {
            self.mmio.write16(window + dma::READ_STRIDE, tx.inc_r);
        }
        if tx.inc_w != 0 {
            self.mmio.write16(window + dma::WRITE_STRIDE, tx.inc_w);
        }
        self.mmio.write8(window + dma::PERIPHERAL_ID, tx.peripheral_id);
        let mode = tx.mode();
        if mode != dma::MODE_MEM_TO_PERIPH_DEFAULT {
            self.mmio.write8(window + dma::MODE, mode);
        }
        Ok(())
    }

    /// Starts the configured descriptor on `channel`.
    ///
    /// The completion is registered before START is written so that an
    /// interrupt raised right after the start always finds its entry. If the
    /// tracker is full the channel is released and nothing is started.
    pub fn start(
        &self,
        channel: u32,
        transaction_id: u16,
        completion: Option<&'a Completion>,
    ) -> Result<(), DmaError> {
        let window = self.channel_window(channel)?;
        if let Some(completion) = completion {
            completion.reset();
            if let Err(err) = self.tracker.insert(transaction_id, completion) {
                self.mmio.write8(window + dma::BUSY, 0);
                return Err(err);
            }
        }
        self.mmio.write8(window + dma::START, 1);
        Ok(())
    }

    /// Number of transactions in flight on the engine.
    pub fn status(&self) -> u8 {
        self.mmio.read8(self.map.dma_offset + dma::INFLIGHT_STATUS)
    }

    /// Resets the engine, dropping every in-flight transaction.
    pub fn reset(&self) {
        self.mmio.write8(self.map.dma_offset + dma::RESET, 1);
    }

    /// Forgets every tracked transaction. Their completions stay pending.
    pub fn teardown(&self) -> usize {
        let dropped = self.tracker.drain();
        if dropped != 0 {
            log::debug!("dropped {} tracked DMA transactions", dropped);
        }
        dropped
    }

    /// Spins until the in-flight counter reads zero `min_idle` times in a
    /// row.
    pub fn wait_poll(&self, min_idle: u32, limit: WaitLimit) -> Result<(), DmaError> {
        let mut spins = 0u64;
        loop {
            let mut idle = 0;
            while idle < min_idle && self.status() == 0 {
                idle += 1;
                spins += 1;
            }
            if idle == min_idle {
                return Ok(());
            }
            spins += 1;
            if limit.exhausted(spins) {
                return Err(DmaError::Timeout);
            }
        }
    }

    /// Spins until the trap handler resolves `completion`.
    pub fn wait_interrupt(&self, completion: &Completion, limit: WaitLimit) -> Result<(), DmaError> {
        let mut spins = 0u64;
        while !completion.is_complete() {
            if limit.exhausted(spins) {
                return Err(DmaError::Timeout);
            }
            spins += 1;
            core::hint::spin_loop();
        }
        Ok(())
    }

    /// Like [`Self::wait_interrupt`], but also services `core`'s interrupt
    /// window directly when it shows a pending completion. This covers
    /// interrupts the trap handler missed. The PLIC claim is left to the trap
    /// handler.
    pub fn wait_for_core(
        &self,
        core: usize,
        completion: &Completion,
        limit: WaitLimit,
    ) -> Result<(), DmaError> {
        let window = self.core_window(core)?;
        let mut spins = 0u64;
        while !completion.is_complete() {
            critical_section::with(|_| {
                if self.mmio.read8(window + dma::INT_VALID) != 0 {
                    let (transaction_id, failed) = self.read_core_window(window);
                    self.mmio.write8(window + dma::INT_SERVICED, 1);
                    if !self.tracker.resolve_with(transaction_id, failed) {
                        log::warn!(
                            "core {} serviced untracked DMA transaction {}",
                            core,
                            transaction_id
                        );
                    }
                }
            });
            if completion.is_complete() {
                break;
            }
            if limit.exhausted(spins) {
                return Err(DmaError::Timeout);
            }
            spins += 1;
        }
        Ok(())
    }

    fn read_core_window(&self, window: usize) -> (u16, bool) {
        let transaction_id = self.mmio.read16(window + dma::INT_TRANSACTION_ID);
        let failed = self.mmio.read8(window + dma::INT_IS_ERROR) != 0;
        if failed {
            let addr = self.mmio.read64(window + dma::INT_ADDRESS);
            log::error!("DMA transaction {} faulted at {:#x}", transaction_id, addr);
        }
        (transaction_id, failed)
    }

    /// Routes each core's DMA completion source to that core and enables
    /// machine external interrupts on the calling hart.
    pub fn configure_interrupts(&self, csr: &impl Csr) {
        let plic = self.plic();
        for core in 0..self.irq.core_count.min(MAX_CORES) {
            let source = self.irq.sources[core];
            plic.enable(source, core);
            plic.set_priority(source, self.irq.priority);
        }
        csr.enable_machine_external_interrupts();
        csr.enable_machine_interrupts();
    }

    /// Services one trap taken on `hart`.
    pub fn handle_trap(&self, cause: usize, hart: usize) -> TrapOutcome {
        if !irq::is_machine_external_interrupt(cause) {
            return irq::fatal_trap(cause);
        }
        let plic = self.plic();
        let claimed = plic.claim(hart);
        if self.irq.source(hart) != Some(claimed) {
            log::warn!("hart {} claimed foreign interrupt {}", hart, claimed);
            return TrapOutcome::Foreign(claimed);
        }
        let window = self.map.dma_core_window(hart);
        if self.mmio.read8(window + dma::INT_VALID) == 0 {
            log::debug!("hart {} took DMA interrupt with an empty window", hart);
            plic.complete(hart, claimed);
            return TrapOutcome::Spurious(claimed);
        }
        let (transaction_id, failed) = self.read_core_window(window);
        plic.complete(hart, claimed);
        self.mmio.write8(window + dma::INT_SERVICED, 1);
        if self.tracker.resolve_with(transaction_id, failed) {
            TrapOutcome::Completed(transaction_id)
        } else {
            log::warn!("no tracked DMA transaction {}", transaction_id);
            TrapOutcome::Stale(transaction_id)
        }
    }
}

impl<M: Mmio + Sync, const N: usize> TrapService for Dma<'_, M, N> {
    fn handle_trap(&self, cause: usize, hart: usize) -> TrapOutcome {
        Dma::handle_trap(self, cause, hart)
    }
}
