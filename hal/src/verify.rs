// Licensed under the Apache-2.0 license

use crate::mmio::{Mmio, Width};

/// When [`verify`] reports through `log`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportPolicy {
    Always,
    #[default]
    OnMismatch,
    Never,
}

/// Reads `address` at `width` and compares it with `expected`. Returns true
/// on a match.
pub fn verify<M: Mmio>(
    mmio: &M,
    index: usize,
    expected: u64,
    address: usize,
    width: Width,
    policy: ReportPolicy,
) -> bool {
    let actual = mmio.read(width, address);
    if actual != expected {
        if policy != ReportPolicy::Never {
            log::warn!(
                "[transaction {}] {:#x} does not match reference value {:#x} at {:#x}",
                index,
                actual,
                expected,
                address
            );
        }
        return false;
    }
    if policy == ReportPolicy::Always {
        log::info!("[transaction {}] success ({:#x})", index, expected);
    }
    true
}
