//! The syscall-slot message format.

use crate::config::SYSCALL_MSG_LEN;

/// What the syscall dispatcher found in a process's slot.
///
/// `Unused` is the resting state a process leaves its slot in between
/// syscalls, and the only value the dispatcher clears the tag back to
/// before a syscall actually runs — so the dispatcher never observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallTag {
    Unused,
    Send,
    Recv,
}

/// An inline message carried entirely inside a syscall slot, with no
/// out-of-band buffer or capability.
#[derive(Debug, Clone, Copy)]
pub struct Message {
    pub sender_pid: u32,
    pub receiver_pid: u32,
    pub len: usize,
    pub bytes: [u8; SYSCALL_MSG_LEN],
}

impl Message {
    pub const fn empty() -> Self {
        Self {
            sender_pid: 0,
            receiver_pid: 0,
            len: 0,
            bytes: [0u8; SYSCALL_MSG_LEN],
        }
    }

    /// Build a message from a caller-supplied buffer, failing if it does not
    /// fit.
    pub fn from_bytes(sender_pid: u32, receiver_pid: u32, data: &[u8]) -> Option<Self> {
        if data.len() > SYSCALL_MSG_LEN {
            return None;
        }
        let mut bytes = [0u8; SYSCALL_MSG_LEN];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self {
            sender_pid,
            receiver_pid,
            len: data.len(),
            bytes,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// One per-process syscall slot: the tag a process sets before
/// trapping in, and the message plus return value the kernel leaves behind.
#[derive(Debug, Clone, Copy)]
pub struct SyscallSlot {
    pub tag: SyscallTag,
    pub message: Message,
    pub retval: i32,
}

impl SyscallSlot {
    pub const fn unused() -> Self {
        Self {
            tag: SyscallTag::Unused,
            message: Message::empty(),
            retval: 0,
        }
    }
}

impl Default for SyscallSlot {
    fn default() -> Self {
        Self::unused()
    }
}

/// Opcode carried in an `exit` notification's message body.
pub const OPCODE_PROC_EXIT: u8 = 1;

/// Encode a `PROC_EXIT` notification: one opcode byte followed by the exit
/// status as four little-endian bytes.
pub fn encode_proc_exit(status: i32) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];
    buf[0] = OPCODE_PROC_EXIT;
    buf[1..5].copy_from_slice(&status.to_le_bytes());
    (buf, 5)
}
