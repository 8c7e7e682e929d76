//! Process control blocks and the fixed-size process table.

pub mod pcb;
pub mod table;

pub use pcb::{Pcb, ProcessId, ProcessState};
pub use table::PROCESS_TABLE;

use crate::config::GPID_PROCESS;
use crate::error::ProcessError;

/// Boot the process table with pid 1 (the process-manager server,
/// `GPID_PROCESS`) already `Running`; every other entry starts `Unused`.
pub fn init() {
    let pid = PROCESS_TABLE
        .alloc(ProcessState::Running)
        .expect("process table has room for the first process");
    debug_assert_eq!(pid.as_u32(), GPID_PROCESS);
    log::info!("[PROCESS] process-manager server running as pid {pid}");
}

/// Allocate a fresh PCB slot in `Ready` state, e.g. for a newly-loaded app;
/// the scheduler builds its initial trap frame on first dispatch.
pub fn spawn() -> Result<ProcessId, ProcessError> {
    PROCESS_TABLE.alloc(ProcessState::Ready)
}
