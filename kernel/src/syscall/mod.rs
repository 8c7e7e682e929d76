//! Syscall dispatcher.
//!
//! Invoked by the trap handler on an environment call or a software
//! interrupt. Reads the calling process's slot tag, clears it back to
//! `Unused` before doing anything else so a second trap mid-dispatch can
//! never see a stale tag, then runs the one protocol the tag named.

use crate::error::IpcError;
use crate::ipc::message::SyscallTag;
use crate::ipc::sync::SYSCALL_SLOTS;
use crate::process::{ProcessId, PROCESS_TABLE};

/// Run the syscall named by `pid`'s slot tag.
///
/// Fatal if the tag is not `Send` or `Recv` — the dispatcher is only ever
/// entered because a syscall trap fired, so an `Unused` tag means the slot
/// was never populated and something upstream is broken.
pub fn dispatch(pid: ProcessId) {
    let tag = {
        let index = PROCESS_TABLE
            .index_of(pid)
            .unwrap_or_else(|| crate::error::fatal(crate::error::ProcessError::NotFound { pid: pid.as_u32() }.into()));
        let mut slots = SYSCALL_SLOTS.lock();
        let tag = slots[index].tag;
        slots[index].tag = SyscallTag::Unused;
        tag
    };

    match tag {
        SyscallTag::Send => crate::ipc::sync::send(pid),
        SyscallTag::Recv => crate::ipc::sync::recv(pid),
        SyscallTag::Unused => crate::error::fatal(IpcError::InvalidSyscallTag.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot;
    use crate::ipc::message::SyscallSlot;
    use crate::ipc::sync::prepare_send;
    use crate::process::{table::PROCESS_TABLE_TEST_LOCK, ProcessState};

    #[test]
    fn dispatch_clears_tag_before_running_the_protocol() {
        let _guard = PROCESS_TABLE_TEST_LOCK.lock();
        *SYSCALL_SLOTS.lock() = [SyscallSlot::unused(); crate::config::MAX_NPROCESS];
        boot::install_disk(boot::boot_disk());

        let sender = PROCESS_TABLE.alloc(ProcessState::Running).unwrap();
        let receiver = PROCESS_TABLE.alloc(ProcessState::Ready).unwrap();
        prepare_send(sender, receiver, b"hi").unwrap();

        dispatch(sender);

        let index = PROCESS_TABLE.index_of(sender).unwrap();
        assert_eq!(SYSCALL_SLOTS.lock()[index].tag, SyscallTag::Unused);

        PROCESS_TABLE.release(sender).unwrap();
        PROCESS_TABLE.release(receiver).unwrap();
    }
}
