//! Unified kernel error type.
//!
//! The externally-visible error model has exactly three shapes: fatal halt,
//! process termination, and a syscall-local -1 return. Internally, though,
//! individual subsystems compose with `?` against one `KernelError` enum
//! that wraps each per-subsystem error enum into a single top-level type.

use core::fmt;

/// Top-level kernel error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    Mm(MmError),
    Process(ProcessError),
    Sched(SchedError),
    Ipc(IpcError),
    Trap(TrapError),
}

/// Memory-management errors (frame cache, frame allocator, translation
/// engines).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// No free frame left in the 256-entry mapping table.
    FramesExhausted,
    /// `frame_id` is outside `0..NUM_FRAMES`.
    InvalidFrame { frame_id: u32 },
    /// A disk read or write failed; this is always fatal.
    DiskIoFailed { block_no: u32 },
    /// A virtual page number is outside the addressable window.
    InvalidPageNumber { page_no: u32 },
    /// The requested page is not mapped for the given pid.
    Unmapped { pid: u32, page_no: u32 },
}

/// Process-table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// The process table has no free slot (`MAX_NPROCESS` reached).
    TableFull,
    /// No PCB entry with the given pid.
    NotFound { pid: u32 },
    /// Requested a transition the current state does not permit.
    InvalidTransition { from: &'static str, to: &'static str },
}

/// Scheduler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// No PCB entry is `READY`, `RUNNING`, or `RUNNABLE`; fatal.
    NoRunnableProcess,
}

/// IPC errors (collapse to -1 at the syscall boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcError {
    MessageTooLarge { len: usize, max: usize },
    ReceiverNotFound { pid: u32 },
    /// The syscall dispatcher read a slot tag that was neither `Send` nor
    /// `Recv`; any other tag is fatal.
    InvalidSyscallTag,
}

/// Trap-dispatch errors; both variants are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapError {
    UnknownCause { mcause: u32 },
    FatalException { mcause: u32, pid: u32 },
}

/// Result type alias for fallible kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mm(e) => write!(f, "mm error: {:?}", e),
            Self::Process(e) => write!(f, "process error: {:?}", e),
            Self::Sched(e) => write!(f, "scheduler error: {:?}", e),
            Self::Ipc(e) => write!(f, "ipc error: {:?}", e),
            Self::Trap(e) => write!(f, "trap error: {:?}", e),
        }
    }
}

impl From<MmError> for KernelError {
    fn from(e: MmError) -> Self {
        Self::Mm(e)
    }
}

impl From<ProcessError> for KernelError {
    fn from(e: ProcessError) -> Self {
        Self::Process(e)
    }
}

impl From<SchedError> for KernelError {
    fn from(e: SchedError) -> Self {
        Self::Sched(e)
    }
}

impl From<IpcError> for KernelError {
    fn from(e: IpcError) -> Self {
        Self::Ipc(e)
    }
}

impl From<TrapError> for KernelError {
    fn from(e: TrapError) -> Self {
        Self::Trap(e)
    }
}

/// Halt with a diagnostic; there is no recovery path.
///
/// On real hardware this parks the hart with `wfi` after logging. Host unit
/// tests never run bare metal, so there `fatal` panics instead, which lets
/// `#[should_panic]` tests assert a code path is unrecoverable without
/// hanging the test process.
#[cfg(target_os = "none")]
pub fn fatal(error: KernelError) -> ! {
    log::error!("[FATAL] {}", error);
    crate::arch::riscv32::halt()
}

#[cfg(not(target_os = "none"))]
pub fn fatal(error: KernelError) -> ! {
    panic!("[FATAL] {}", error)
}

/// Construct a `KernelError` variant without spelling out the full path.
#[macro_export]
macro_rules! kernel_error {
    (Mm::$variant:ident $fields:tt) => {
        $crate::error::KernelError::Mm($crate::error::MmError::$variant $fields)
    };
    (Process::$variant:ident $fields:tt) => {
        $crate::error::KernelError::Process($crate::error::ProcessError::$variant $fields)
    };
    (Sched::$variant:ident) => {
        $crate::error::KernelError::Sched($crate::error::SchedError::$variant)
    };
    (Ipc::$variant:ident $fields:tt) => {
        $crate::error::KernelError::Ipc($crate::error::IpcError::$variant $fields)
    };
    (Trap::$variant:ident $fields:tt) => {
        $crate::error::KernelError::Trap($crate::error::TrapError::$variant $fields)
    };
}
