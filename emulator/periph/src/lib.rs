/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Host-side models of the DSP accelerator SoC, used to run the drivers
    in tests.

--*/

mod bus;
mod conv1d;
mod conv2d;
mod dma;
mod hart;
mod plic;
mod trace;

pub use bus::{BusArgs, EmulatedBus};
pub use hart::EmulatedHart;
pub use trace::{Access, TracingBus};

use dsp_hal::Width;

/// Little-endian read from a byte-addressed register file. Bytes past the
/// end read as zero.
fn read_le(bytes: &[u8], offset: usize, width: Width) -> u64 {
    (0..width.bytes()).fold(0, |acc, i| {
        let byte = bytes.get(offset + i).copied().unwrap_or(0);
        acc | (u64::from(byte) << (8 * i))
    })
}

/// Little-endian write into a byte-addressed register file. Bytes past the
/// end are dropped.
fn write_le(bytes: &mut [u8], offset: usize, width: Width, val: u64) {
    for i in 0..width.bytes() {
        if let Some(byte) = bytes.get_mut(offset + i) {
            *byte = (val >> (8 * i)) as u8;
        }
    }
}
