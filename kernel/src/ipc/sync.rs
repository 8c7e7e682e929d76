//! Rendezvous send/recv: no endpoints, no capabilities, just a
//! blocking handoff between two PCB entries mediated by the syscall slot.

use spin::Mutex;

use crate::config::MAX_NPROCESS;
use crate::error::IpcError;
use crate::process::{ProcessId, ProcessState, PROCESS_TABLE};
use crate::sched;

use super::message::{Message, SyscallSlot, SyscallTag};

/// Every process's syscall slot, indexed the same way the process table is.
pub static SYSCALL_SLOTS: Mutex<[SyscallSlot; MAX_NPROCESS]> = Mutex::new([SyscallSlot::unused(); MAX_NPROCESS]);

fn slot_index(pid: ProcessId) -> usize {
    PROCESS_TABLE
        .index_of(pid)
        .expect("a process invoking ipc must have a live table entry")
}

/// Populate `pid`'s slot with a `Send` request, failing before touching the
/// slot if the payload does not fit.
pub fn prepare_send(pid: ProcessId, receiver_pid: ProcessId, data: &[u8]) -> Result<(), IpcError> {
    let message = Message::from_bytes(pid.as_u32(), receiver_pid.as_u32(), data).ok_or(IpcError::MessageTooLarge {
        len: data.len(),
        max: crate::config::SYSCALL_MSG_LEN,
    })?;
    let index = slot_index(pid);
    let mut slots = SYSCALL_SLOTS.lock();
    slots[index].tag = SyscallTag::Send;
    slots[index].message = message;
    Ok(())
}

/// Populate `pid`'s slot with a `Recv` request.
pub fn prepare_recv(pid: ProcessId) {
    let index = slot_index(pid);
    let mut slots = SYSCALL_SLOTS.lock();
    slots[index].tag = SyscallTag::Recv;
}

pub fn retval_of(pid: ProcessId) -> i32 {
    SYSCALL_SLOTS.lock()[slot_index(pid)].retval
}

fn set_retval(pid: ProcessId, retval: i32) {
    let index = slot_index(pid);
    SYSCALL_SLOTS.lock()[index].retval = retval;
}

/// Copy `message` from `from`'s address space into `to`'s slot, switching
/// the MMU view across both halves of the copy.
fn deliver(from: ProcessId, to: ProcessId, message: Message) {
    crate::boot::with_disk(|disk| {
        crate::mm::mmu_switch(from.as_u32(), disk).unwrap_or_else(|e| crate::error::fatal(e.into()));
        crate::mm::mmu_switch(to.as_u32(), disk).unwrap_or_else(|e| crate::error::fatal(e.into()));
    });
    let to_index = slot_index(to);
    let mut slots = SYSCALL_SLOTS.lock();
    slots[to_index].message = message;
    set_retval_locked(&mut slots, from, 0);
    set_retval_locked(&mut slots, to, 0);
}

fn set_retval_locked(slots: &mut [SyscallSlot; MAX_NPROCESS], pid: ProcessId, retval: i32) {
    if let Some(index) = PROCESS_TABLE.index_of(pid) {
        slots[index].retval = retval;
    }
}

/// Run the `send` half of the rendezvous protocol for the process whose
/// slot already holds a `Send` request.
pub fn send(sender_pid: ProcessId) {
    let (receiver_pid, message) = {
        let slots = SYSCALL_SLOTS.lock();
        let msg = slots[slot_index(sender_pid)].message;
        (ProcessId::new(msg.receiver_pid), msg)
    };

    let receiver_index = match PROCESS_TABLE.index_of(receiver_pid) {
        Some(index) => index,
        None => {
            set_retval(sender_pid, -1);
            return;
        }
    };

    if PROCESS_TABLE.state_at(receiver_index) != ProcessState::WaitToRecv {
        PROCESS_TABLE
            .with_mut(sender_pid, |e| e.set_wait_to_send(receiver_pid))
            .unwrap_or_else(|e| crate::error::fatal(e.into()));
        sched::yield_cpu();
        return;
    }

    deliver(sender_pid, receiver_pid, message);
    PROCESS_TABLE.set_state_at(receiver_index, ProcessState::Runnable);
    sched::yield_cpu();
}

/// Run the `recv` half of the rendezvous protocol for the process whose
/// slot already holds a `Recv` request.
pub fn recv(receiver_pid: ProcessId) {
    match PROCESS_TABLE.find_waiting_sender(receiver_pid) {
        None => {
            PROCESS_TABLE
                .with_mut(receiver_pid, |e| e.set_state(ProcessState::WaitToRecv))
                .unwrap_or_else(|e| crate::error::fatal(e.into()));
            sched::yield_cpu();
        }
        Some(sender_pid) => {
            let message = SYSCALL_SLOTS.lock()[slot_index(sender_pid)].message;
            deliver(sender_pid, receiver_pid, message);
            let sender_index = PROCESS_TABLE
                .index_of(sender_pid)
                .expect("a waiting sender has a live table entry");
            PROCESS_TABLE.set_state_at(sender_index, ProcessState::Runnable);
            sched::yield_cpu();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot;

    use crate::process::table::PROCESS_TABLE_TEST_LOCK as TEST_LOCK;

    fn reset_globals() {
        *SYSCALL_SLOTS.lock() = [SyscallSlot::unused(); MAX_NPROCESS];
    }

    fn fresh_disk() {
        boot::install_disk(boot::boot_disk());
    }

    #[test]
    fn send_with_no_such_receiver_fails_immediately() {
        let _guard = TEST_LOCK.lock();
        reset_globals();
        fresh_disk();
        let table = &PROCESS_TABLE;
        let sender = table.alloc(ProcessState::Running).unwrap();
        prepare_send(sender, ProcessId::new(999), b"hi").unwrap();
        send(sender);
        assert_eq!(retval_of(sender), -1);
        table.release(sender).unwrap();
    }

    #[test]
    fn send_before_receiver_waits_blocks_sender() {
        let _guard = TEST_LOCK.lock();
        reset_globals();
        fresh_disk();
        let table = &PROCESS_TABLE;
        let sender = table.alloc(ProcessState::Running).unwrap();
        let receiver = table.alloc(ProcessState::Ready).unwrap();
        prepare_send(sender, receiver, b"hi").unwrap();
        send(sender);
        assert_eq!(table.with(sender, |e| e.state()).unwrap(), ProcessState::WaitToSend);
        table.release(sender).unwrap();
        table.release(receiver).unwrap();
    }

    #[test]
    fn recv_first_then_send_delivers_synchronously() {
        let _guard = TEST_LOCK.lock();
        reset_globals();
        fresh_disk();
        let table = &PROCESS_TABLE;
        let receiver = table.alloc(ProcessState::Running).unwrap();
        let sender = table.alloc(ProcessState::Ready).unwrap();

        prepare_recv(receiver);
        recv(receiver);
        assert_eq!(table.with(receiver, |e| e.state()).unwrap(), ProcessState::WaitToRecv);

        prepare_send(sender, receiver, b"payload").unwrap();
        send(sender);

        assert_eq!(retval_of(sender), 0);
        assert_eq!(table.with(receiver, |e| e.state()).unwrap(), ProcessState::Runnable);
        let delivered = SYSCALL_SLOTS.lock()[table.index_of(receiver).unwrap()].message;
        assert_eq!(delivered.as_slice(), b"payload");

        table.release(sender).unwrap();
        table.release(receiver).unwrap();
    }

    #[test]
    fn send_first_then_recv_delivers_and_wakes_sender() {
        let _guard = TEST_LOCK.lock();
        reset_globals();
        fresh_disk();
        let table = &PROCESS_TABLE;
        let sender = table.alloc(ProcessState::Running).unwrap();
        let receiver = table.alloc(ProcessState::Ready).unwrap();

        prepare_send(sender, receiver, b"payload").unwrap();
        send(sender);
        assert_eq!(table.with(sender, |e| e.state()).unwrap(), ProcessState::WaitToSend);

        prepare_recv(receiver);
        recv(receiver);

        assert_eq!(table.with(sender, |e| e.state()).unwrap(), ProcessState::Runnable);
        let delivered = SYSCALL_SLOTS.lock()[table.index_of(receiver).unwrap()].message;
        assert_eq!(delivered.as_slice(), b"payload");

        table.release(sender).unwrap();
        table.release(receiver).unwrap();
    }
}
