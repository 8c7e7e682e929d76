//! Process control block.

use core::fmt;

/// Process id. Monotonically assigned; privileged servers get ids below
/// [`crate::config::GPID_USER_START`], user applications at or above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl ProcessId {
    pub const fn new(pid: u32) -> Self {
        Self(pid)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Privileged servers are never preempted; pids below
    /// `GPID_SHELL` are privileged.
    pub fn is_privileged(self) -> bool {
        self.0 < crate::config::GPID_SHELL
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process status. Exactly the states the spec names — no `Zombie`,
/// no `Sleeping`: this core has no reaping and no timed sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Slot is free.
    Unused,
    /// ELF image is being fetched block-by-block by the loader.
    Loading,
    /// Runnable, never yet dispatched.
    Ready,
    /// The single currently-executing entry.
    Running,
    /// Runnable, was preempted or yielded.
    Runnable,
    /// Blocked in `send`, waiting for the receiver to call `recv`.
    WaitToSend,
    /// Blocked in `recv`, waiting for a sender.
    WaitToRecv,
}

impl ProcessState {
    /// The states [`crate::sched`]'s rotation treats as runnable.
    pub fn is_runnable(self) -> bool {
        matches!(self, Self::Ready | Self::Running | Self::Runnable)
    }
}

/// One entry in the fixed-size process table.
#[derive(Debug, Clone, Copy)]
pub struct Pcb {
    pid: ProcessId,
    state: ProcessState,
    /// Saved kernel stack pointer, restored on resumption from trap.
    ksp: usize,
    /// Saved trap program counter.
    trap_pc: usize,
    /// Valid only while `state == WaitToSend`.
    receiver_pid: Option<ProcessId>,
}

impl Pcb {
    pub const fn unused() -> Self {
        Self {
            pid: ProcessId(0),
            state: ProcessState::Unused,
            ksp: 0,
            trap_pc: 0,
            receiver_pid: None,
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn ksp(&self) -> usize {
        self.ksp
    }

    pub fn set_ksp(&mut self, ksp: usize) {
        self.ksp = ksp;
    }

    pub fn trap_pc(&self) -> usize {
        self.trap_pc
    }

    pub fn set_trap_pc(&mut self, pc: usize) {
        self.trap_pc = pc;
    }

    pub fn receiver_pid(&self) -> Option<ProcessId> {
        self.receiver_pid
    }

    /// Transition to `WaitToSend`, recording the target receiver.
    pub fn set_wait_to_send(&mut self, receiver_pid: ProcessId) {
        self.state = ProcessState::WaitToSend;
        self.receiver_pid = Some(receiver_pid);
    }

    pub fn set_state(&mut self, state: ProcessState) {
        if state != ProcessState::WaitToSend {
            self.receiver_pid = None;
        }
        self.state = state;
    }

    fn occupy(&mut self, pid: ProcessId, state: ProcessState) {
        self.pid = pid;
        self.state = state;
        self.ksp = 0;
        self.trap_pc = 0;
        self.receiver_pid = None;
    }
}

impl Default for Pcb {
    fn default() -> Self {
        Self::unused()
    }
}

/// Construct a fresh entry occupying a table slot (used only by
/// [`super::table::ProcessTable::alloc`], which is why `occupy` stays
/// private: nothing outside the table should hand out a pid).
pub(super) fn occupy(entry: &mut Pcb, pid: ProcessId, state: ProcessState) {
    entry.occupy(pid, state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_unused() {
        let pcb = Pcb::unused();
        assert_eq!(pcb.state(), ProcessState::Unused);
        assert!(!pcb.state().is_runnable());
    }

    #[test]
    fn wait_to_send_carries_receiver() {
        let mut pcb = Pcb::unused();
        pcb.set_wait_to_send(ProcessId::new(3));
        assert_eq!(pcb.state(), ProcessState::WaitToSend);
        assert_eq!(pcb.receiver_pid(), Some(ProcessId::new(3)));
    }

    #[test]
    fn leaving_wait_to_send_clears_receiver() {
        let mut pcb = Pcb::unused();
        pcb.set_wait_to_send(ProcessId::new(3));
        pcb.set_state(ProcessState::Runnable);
        assert_eq!(pcb.receiver_pid(), None);
    }

    #[test]
    fn privileged_pid_below_shell() {
        assert!(ProcessId::new(crate::config::GPID_SHELL - 1).is_privileged());
        assert!(!ProcessId::new(crate::config::GPID_SHELL).is_privileged());
    }
}
