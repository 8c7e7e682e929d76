//! The fixed-size, `MAX_NPROCESS`-entry process table.
//!
//! Grounded on the teaching workspace's `#[cfg(not(feature = "alloc"))]`
//! `ProcessArray` branch: a plain array plus a linear scan, no heap. This
//! spec's process table never grows past `MAX_NPROCESS` and has no
//! counterpart to the teacher's heap-backed `BTreeMap` branch, so that
//! branch is not carried forward.

use spin::Mutex;

use crate::config::MAX_NPROCESS;
use crate::error::ProcessError;

use super::pcb::{self, Pcb, ProcessId, ProcessState};

/// Fixed-size table of [`Pcb`] entries, touched only from inside a trap
/// handler — the `Mutex` makes that discipline
/// explicit in the type system rather than relying on interrupts-off
/// alone, and lets the same code run under host-side unit tests.
pub struct ProcessTable {
    entries: Mutex<[Pcb; MAX_NPROCESS]>,
    next_pid: Mutex<u32>,
}

impl ProcessTable {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new([Pcb::unused(); MAX_NPROCESS]),
            next_pid: Mutex::new(1),
        }
    }

    /// Find a free slot, stamp it with a freshly (monotonically) assigned
    /// pid in `state`, and return the pid. Fatal when the table is full.
    pub fn alloc(&self, state: ProcessState) -> Result<ProcessId, ProcessError> {
        let mut entries = self.entries.lock();
        let index = entries
            .iter()
            .position(|e| e.state() == ProcessState::Unused)
            .ok_or(ProcessError::TableFull)?;
        let mut next_pid = self.next_pid.lock();
        let pid = ProcessId::new(*next_pid);
        *next_pid += 1;
        pcb::occupy(&mut entries[index], pid, state);
        Ok(pid)
    }

    pub fn with<R>(&self, pid: ProcessId, f: impl FnOnce(&Pcb) -> R) -> Result<R, ProcessError> {
        let entries = self.entries.lock();
        entries
            .iter()
            .find(|e| e.pid() == pid && e.state() != ProcessState::Unused)
            .map(f)
            .ok_or(ProcessError::NotFound { pid: pid.as_u32() })
    }

    pub fn with_mut<R>(&self, pid: ProcessId, f: impl FnOnce(&mut Pcb) -> R) -> Result<R, ProcessError> {
        let mut entries = self.entries.lock();
        entries
            .iter_mut()
            .find(|e| e.pid() == pid && e.state() != ProcessState::Unused)
            .map(f)
            .ok_or(ProcessError::NotFound { pid: pid.as_u32() })
    }

    /// Release a slot back to `Unused`.
    pub fn release(&self, pid: ProcessId) -> Result<(), ProcessError> {
        self.with_mut(pid, |entry| entry.set_state(ProcessState::Unused))
    }

    /// The first entry in `WaitToSend` whose `receiver_pid` is `target`.
    /// The first match wins.
    pub fn find_waiting_sender(&self, target: ProcessId) -> Option<ProcessId> {
        let entries = self.entries.lock();
        entries
            .iter()
            .find(|e| e.state() == ProcessState::WaitToSend && e.receiver_pid() == Some(target))
            .map(|e| e.pid())
    }

    /// Rotate from just past `from_index` through the table, returning the
    /// index of the first runnable entry. `from_index` wraps.
    pub fn next_runnable_index(&self, from_index: usize) -> Option<usize> {
        let entries = self.entries.lock();
        let len = entries.len();
        (1..=len)
            .map(|offset| (from_index + offset) % len)
            .find(|&i| entries[i].state().is_runnable())
    }

    pub fn index_of(&self, pid: ProcessId) -> Option<usize> {
        let entries = self.entries.lock();
        entries.iter().position(|e| e.pid() == pid && e.state() != ProcessState::Unused)
    }

    pub fn pid_at(&self, index: usize) -> Option<ProcessId> {
        let entries = self.entries.lock();
        let entry = &entries[index];
        (entry.state() != ProcessState::Unused).then(|| entry.pid())
    }

    pub fn state_at(&self, index: usize) -> ProcessState {
        self.entries.lock()[index].state()
    }

    pub fn set_state_at(&self, index: usize, state: ProcessState) {
        self.entries.lock()[index].set_state(state);
    }

    /// Count of entries with status other than `Unused`, for diagnostics
    /// and tests.
    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.state() != ProcessState::Unused)
            .count()
    }

    /// Count of entries with status `Running` — must never exceed one.
    pub fn running_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.state() == ProcessState::Running)
            .count()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide singleton.
pub static PROCESS_TABLE: ProcessTable = ProcessTable::new();

/// Serializes host-side tests that exercise `PROCESS_TABLE` directly
/// (rather than a private local instance), since `cargo test` runs tests in
/// parallel threads and this singleton has no real-hardware equivalent of
/// "only one hart, interrupts off" to keep them from interleaving.
#[cfg(test)]
pub(crate) static PROCESS_TABLE_TEST_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_assigns_monotonic_pids() {
        let table = ProcessTable::new();
        let a = table.alloc(ProcessState::Ready).unwrap();
        let b = table.alloc(ProcessState::Ready).unwrap();
        assert!(b.as_u32() > a.as_u32());
    }

    #[test]
    fn alloc_past_capacity_is_an_error() {
        let table = ProcessTable::new();
        for _ in 0..MAX_NPROCESS {
            table.alloc(ProcessState::Ready).unwrap();
        }
        assert_eq!(table.alloc(ProcessState::Ready), Err(ProcessError::TableFull));
    }

    #[test]
    fn release_then_alloc_reuses_the_slot() {
        let table = ProcessTable::new();
        for _ in 0..MAX_NPROCESS {
            table.alloc(ProcessState::Ready).unwrap();
        }
        let reused_index = table.index_of(ProcessId::new(1)).unwrap();
        table.release(ProcessId::new(1)).unwrap();
        let fresh = table.alloc(ProcessState::Ready).unwrap();
        assert_eq!(table.index_of(fresh).unwrap(), reused_index);
    }

    #[test]
    fn at_most_one_running_entry() {
        let table = ProcessTable::new();
        table.alloc(ProcessState::Running).unwrap();
        table.alloc(ProcessState::Ready).unwrap();
        assert_eq!(table.running_count(), 1);
    }

    #[test]
    fn find_waiting_sender_matches_receiver_pid() {
        let table = ProcessTable::new();
        let sender = table.alloc(ProcessState::Ready).unwrap();
        table.with_mut(sender, |e| e.set_wait_to_send(ProcessId::new(9))).unwrap();
        assert_eq!(table.find_waiting_sender(ProcessId::new(9)), Some(sender));
        assert_eq!(table.find_waiting_sender(ProcessId::new(10)), None);
    }

    #[test]
    fn next_runnable_index_rotates_and_skips_non_runnable() {
        let table = ProcessTable::new();
        let a = table.alloc(ProcessState::Running).unwrap();
        let b = table.alloc(ProcessState::Ready).unwrap();
        let ia = table.index_of(a).unwrap();
        let ib = table.index_of(b).unwrap();
        assert_eq!(table.next_runnable_index(ia), Some(ib));
    }
}
