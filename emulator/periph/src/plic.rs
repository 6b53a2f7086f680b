/*++

Licensed under the Apache-2.0 license.

File Name:

    plic.rs

Abstract:

    Platform-Level Interrupt Controller with one context per core.

--*/

use dsp_config::MAX_CORES;
use dsp_hal::Width;
use dsp_registers::plic;

pub struct Plic {
    priority: [u32; plic::SOURCE_COUNT],
    pending: u32,
    claimed: u32,
    enable: [u32; MAX_CORES],
    threshold: [u32; MAX_CORES],
}

impl Plic {
    pub const SIZE: usize = 0x400_0000;

    pub fn new() -> Self {
        Plic {
            priority: [0; plic::SOURCE_COUNT],
            pending: 0,
            claimed: 0,
            enable: [0; MAX_CORES],
            threshold: [0; MAX_CORES],
        }
    }

    /// Latches an edge on `source`.
    pub fn raise(&mut self, source: u32) {
        if (source as usize) < plic::SOURCE_COUNT && source != 0 {
            self.pending |= 1 << source;
        }
    }

    fn eligible(&self, context: usize) -> u32 {
        let mut mask = self.pending & self.enable[context] & !self.claimed;
        for source in 0..plic::SOURCE_COUNT {
            if self.priority[source] <= self.threshold[context] {
                mask &= !(1 << source);
            }
        }
        mask
    }

    /// True if `context` would receive an external interrupt.
    pub fn interrupt_pending(&self, context: usize) -> bool {
        context < MAX_CORES && self.eligible(context) != 0
    }

    fn claim(&mut self, context: usize) -> u32 {
        let eligible = self.eligible(context);
        let best = (0..plic::SOURCE_COUNT)
            .filter(|source| eligible & (1 << source) != 0)
            .max_by(|a, b| self.priority[*a].cmp(&self.priority[*b]).then(b.cmp(a)));
        match best {
            Some(source) => {
                self.pending &= !(1 << source);
                self.claimed |= 1 << source;
                source as u32
            }
            None => 0,
        }
    }

    fn complete(&mut self, context: usize, source: u32) {
        // completions for sources not enabled on the context are ignored
        if (source as usize) < plic::SOURCE_COUNT && self.enable[context] & (1 << source) != 0 {
            self.claimed &= !(1 << source);
        }
    }

    pub fn read(&mut self, width: Width, offset: usize) -> u64 {
        if width != Width::Word {
            return 0;
        }
        match offset {
            o if o < plic::PENDING_OFFSET => self
                .priority
                .get(o / 4)
                .copied()
                .unwrap_or(0)
                .into(),
            plic::PENDING_OFFSET => self.pending.into(),
            o if (plic::ENABLE_OFFSET..plic::CONTEXT_OFFSET).contains(&o) => {
                let rel = o - plic::ENABLE_OFFSET;
                match (rel / plic::ENABLE_CONTEXT_STRIDE, rel % plic::ENABLE_CONTEXT_STRIDE) {
                    (context, 0) if context < MAX_CORES => self.enable[context].into(),
                    _ => 0,
                }
            }
            o if o >= plic::CONTEXT_OFFSET => {
                let rel = o - plic::CONTEXT_OFFSET;
                let context = rel / plic::CONTEXT_STRIDE;
                if context >= MAX_CORES {
                    return 0;
                }
                match rel % plic::CONTEXT_STRIDE {
                    plic::THRESHOLD => self.threshold[context].into(),
                    plic::CLAIM_COMPLETE => self.claim(context).into(),
                    _ => 0,
                }
            }
            _ => 0,
        }
    }

    pub fn write(&mut self, width: Width, offset: usize, val: u64) {
        if width != Width::Word {
            return;
        }
        let val = val as u32;
        match offset {
            o if o < plic::PENDING_OFFSET => {
                if let Some(priority) = self.priority.get_mut(o / 4) {
                    *priority = val & 0x7;
                }
            }
            o if (plic::ENABLE_OFFSET..plic::CONTEXT_OFFSET).contains(&o) => {
                let rel = o - plic::ENABLE_OFFSET;
                if let (context, 0) = (rel / plic::ENABLE_CONTEXT_STRIDE, rel % plic::ENABLE_CONTEXT_STRIDE) {
                    if context < MAX_CORES {
                        self.enable[context] = val;
                    }
                }
            }
            o if o >= plic::CONTEXT_OFFSET => {
                let rel = o - plic::CONTEXT_OFFSET;
                let context = rel / plic::CONTEXT_STRIDE;
                if context >= MAX_CORES {
                    return;
                }
                match rel % plic::CONTEXT_STRIDE {
                    plic::THRESHOLD => self.threshold[context] = val & 0x7,
                    plic::CLAIM_COMPLETE => self.complete(context, val),
                    _ => {}
                }
            }
            _ => {}
        }
    }
}
