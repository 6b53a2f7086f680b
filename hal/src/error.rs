// Licensed under the Apache-2.0 license

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DmaError {
    #[error("DMA channel {0} does not exist")]
    InvalidChannel(u32),
    #[error("core {0} has no DMA interrupt window")]
    InvalidCore(usize),
    #[error("DMA channel {0} is held by another core")]
    ChannelBusy(u32),
    #[error("completion tracker is full")]
    TrackerFull,
    #[error("timed out waiting for the DMA engine")]
    Timeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConvError {
    #[error("unsupported 1D kernel length {0}, expected 8 or 16")]
    UnsupportedKernelLength(usize),
    #[error("unsupported 2D kernel size {0}, expected 3 or 5")]
    UnsupportedKernelSize(u8),
    #[error("kernel has {got} taps, {need} needed")]
    KernelTooShort { need: usize, got: usize },
    #[error("convolution engine did not become ready")]
    Timeout,
}

impl ConvError {
    /// Negative return code reported to C-style callers.
    pub fn code(&self) -> i32 {
        match self {
            ConvError::Timeout => -2,
            _ => -1,
        }
    }
}
