// Licensed under the Apache-2.0 license

//! Table of in-flight DMA transactions waiting for a completion interrupt.
//!
//! The trap handler resolves entries while the waiting core queries them, so
//! the table only changes inside a critical section. The completion itself
//! is an atomic owned by the waiter.

use crate::error::DmaError;
use arrayvec::ArrayVec;
use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, Ordering};
use critical_section::Mutex;

const PENDING: u8 = 0;
const DONE: u8 = 1;
const FAILED: u8 = 2;

/// Completion flag for one transaction.
#[derive(Debug, Default)]
pub struct Completion {
    state: AtomicU8,
}

impl Completion {
    pub const fn new() -> Self {
        Completion {
            state: AtomicU8::new(PENDING),
        }
    }

    /// True once the transaction finished, with or without an error.
    pub fn is_complete(&self) -> bool {
        self.state.load(Ordering::Acquire) != PENDING
    }

    /// True if the engine reported an error for the transaction.
    pub fn failed(&self) -> bool {
        self.state.load(Ordering::Acquire) == FAILED
    }

    pub fn complete(&self) {
        self.state.store(DONE, Ordering::Release);
    }

    pub fn fail(&self) {
        self.state.store(FAILED, Ordering::Release);
    }

    pub fn reset(&self) {
        self.state.store(PENDING, Ordering::Release);
    }
}

#[derive(Clone, Copy)]
struct Entry<'a> {
    transaction_id: u16,
    completion: &'a Completion,
}

pub struct CompletionTracker<'a, const N: usize> {
    entries: Mutex<RefCell<ArrayVec<Entry<'a>, N>>>,
}

impl<'a, const N: usize> CompletionTracker<'a, N> {
    pub const fn new() -> Self {
        CompletionTracker {
            entries: Mutex::new(RefCell::new(ArrayVec::new_const())),
        }
    }

    /// Appends an entry at the tail. Ids are not deduplicated.
    pub fn insert(&self, transaction_id: u16, completion: &'a Completion) -> Result<(), DmaError> {
        critical_section::with(|cs| {
            self.entries
                .borrow_ref_mut(cs)
                .try_push(Entry {
                    transaction_id,
                    completion,
                })
                .map_err(|_| DmaError::TrackerFull)
        })
    }

    /// Marks the oldest entry for `transaction_id` complete and removes it.
    /// Returns false if no entry matched.
    pub fn resolve(&self, transaction_id: u16) -> bool {
        self.resolve_with(transaction_id, false)
    }

    /// Like [`Self::resolve`], marking the completion failed when `failed`.
    pub fn resolve_with(&self, transaction_id: u16, failed: bool) -> bool {
        critical_section::with(|cs| {
            let mut entries = self.entries.borrow_ref_mut(cs);
            let Some(index) = entries
                .iter()
                .position(|e| e.transaction_id == transaction_id)
            else {
                return false;
            };
            let entry = entries.remove(index);
            if failed {
                entry.completion.fail();
            } else {
                entry.completion.complete();
            }
            true
        })
    }

    /// Completion state of the entry for `transaction_id`, false if absent.
    pub fn query(&self, transaction_id: u16) -> bool {
        critical_section::with(|cs| {
            self.entries
                .borrow_ref(cs)
                .iter()
                .find(|e| e.transaction_id == transaction_id)
                .is_some_and(|e| e.completion.is_complete())
        })
    }

    /// Drops every entry without touching the completions. Returns how many
    /// were dropped.
    pub fn drain(&self) -> usize {
        critical_section::with(|cs| {
            let mut entries = self.entries.borrow_ref_mut(cs);
            let dropped = entries.len();
            entries.clear();
            dropped
        })
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.entries.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for CompletionTracker<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
