// Licensed under the Apache-2.0 license

//! Drivers for the DSP accelerator tiles: the multi-channel DMA engine with
//! its per-core completion interrupts, and the 1D and 2D convolution engines.
//!
//! Every driver is generic over [`Mmio`] so that it runs unchanged against
//! real hardware ([`RealMmio`]) and against the host emulator.

#![cfg_attr(target_arch = "riscv64", no_std)]

pub mod conv1d;
pub mod conv2d;
pub mod dma;
pub mod error;
pub mod irq;
pub mod mmio;
#[cfg(target_arch = "riscv64")]
pub mod riscv;
pub mod tracker;
pub mod verify;

#[cfg(test)]
mod fake;

pub use conv1d::Conv1d;
pub use conv2d::{Conv2d, Conv2dConfig};
pub use dma::{ticks, Dma, DmaTransaction, DEFAULT_TRACKER_CAPACITY};
pub use error::{ConvError, DmaError};
pub use irq::{exit_code_for_cause, install_trap_vector, Csr, Plic, TrapOutcome, TrapService};
pub use mmio::{Mmio, RealMmio, Width};
pub use tracker::{Completion, CompletionTracker};
pub use verify::{verify, ReportPolicy};
