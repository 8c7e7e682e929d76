//! Synchronous rendezvous messaging.
//!
//! No endpoints, no capabilities, no async channels: a process sends by
//! naming a receiver pid directly, and the two sides hand the message off
//! the moment both are present. `sync` holds the protocol, `message` the
//! wire format, `error` the syscall-local failure shape.

pub mod error;
pub mod message;
pub mod sync;

pub use error::IpcError;
pub use message::{Message, SyscallTag};

use crate::process::ProcessId;

/// Nothing to warm up: the syscall-slot table is statically initialized.
pub fn init() {
    log::info!("[IPC] rendezvous messaging ready");
}

/// `send(receiver_pid, bytes)`: the calling process's half of the
/// rendezvous protocol. Returns the syscall's retval once the protocol
/// settles without blocking; a process left in `WaitToSend` picks its
/// retval up from its own slot when the scheduler resumes it.
pub fn send(sender_pid: ProcessId, receiver_pid: ProcessId, bytes: &[u8]) -> i32 {
    if let Err(_e) = sync::prepare_send(sender_pid, receiver_pid, bytes) {
        return -1;
    }
    sync::send(sender_pid);
    sync::retval_of(sender_pid)
}

/// `recv()`: the calling process's half of the rendezvous protocol.
pub fn recv(receiver_pid: ProcessId) -> i32 {
    sync::prepare_recv(receiver_pid);
    sync::recv(receiver_pid);
    sync::retval_of(receiver_pid)
}

/// `exit(status)`: free every frame the process owns, best-effort notify
/// the process-manager server, and return the slot to `Unused`. Never
/// returns to the caller — there is no process left to return to.
pub fn exit(pid: ProcessId, status: i32) -> ! {
    crate::mm::mmu_free(pid.as_u32());

    let process_manager = ProcessId::new(crate::config::GPID_PROCESS);
    if pid != process_manager {
        let (body, len) = message::encode_proc_exit(status);
        let _ = send(pid, process_manager, &body[..len]);
    }

    crate::process::PROCESS_TABLE
        .release(pid)
        .unwrap_or_else(|e| crate::error::fatal(e.into()));

    crate::sched::yield_cpu();
    unreachable!("a released PCB slot is never rescheduled")
}
