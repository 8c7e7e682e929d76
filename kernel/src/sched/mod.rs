//! Round-robin scheduler.
//!
//! Exactly one entry is `Running` at a time; `yield_cpu` rotates to the
//! next runnable entry, switches the MMU into its address space, resets the
//! timer, and — on a first dispatch out of `Ready` — builds its initial
//! machine state from the fixed `APPS_ARG` region.

use spin::Mutex;

use crate::error::SchedError;
use crate::process::{ProcessId, ProcessState, PROCESS_TABLE};

/// Table index of the entry currently `Running`. Touched only from inside
/// the trap handler on real hardware; the `Mutex` is the same
/// interrupts-disabled-made-explicit idiom as [`crate::mm`]'s `MMU`.
static CURRENT_INDEX: Mutex<usize> = Mutex::new(0);

/// Seed the scheduler with pid 1 already `Running` at index 0, matching [`crate::process::init`].
pub fn init() {
    *CURRENT_INDEX.lock() = 0;
}

pub fn current_pid() -> ProcessId {
    let index = *CURRENT_INDEX.lock();
    PROCESS_TABLE
        .pid_at(index)
        .expect("the scheduler's current index always names a live entry")
}

/// Hand off to the scheduler's idle loop. Real dispatch happens inside the
/// trap handler `wfi` wakes into; this never returns.
pub fn start() -> ! {
    #[cfg(target_os = "none")]
    {
        crate::arch::riscv32::enable_interrupts();
    }
    loop {
        #[cfg(target_os = "none")]
        // SAFETY: `wfi` idles the hart with no preconditions; every trap
        // it wakes into re-enters through the installed trap vector.
        unsafe {
            core::arch::asm!("wfi")
        }
        #[cfg(not(target_os = "none"))]
        break;
    }
    #[cfg(not(target_os = "none"))]
    unreachable!("sched::start only returns its fallback loop under host builds, which never call it")
}

/// Rotate to the next runnable entry. Fatal if none exists.
pub fn yield_cpu() -> ProcessId {
    try_yield_cpu().unwrap_or_else(|e| crate::error::fatal(e.into()))
}

fn try_yield_cpu() -> Result<ProcessId, SchedError> {
    let mut current_index = CURRENT_INDEX.lock();

    if PROCESS_TABLE.state_at(*current_index) == ProcessState::Running {
        PROCESS_TABLE.set_state_at(*current_index, ProcessState::Runnable);
    }

    let next_index = PROCESS_TABLE
        .next_runnable_index(*current_index)
        .ok_or(SchedError::NoRunnableProcess)?;
    let was_ready = PROCESS_TABLE.state_at(next_index) == ProcessState::Ready;
    PROCESS_TABLE.set_state_at(next_index, ProcessState::Running);
    *current_index = next_index;

    let next_pid = PROCESS_TABLE
        .pid_at(next_index)
        .expect("a runnable entry always has a pid");

    crate::boot::with_disk(|disk| crate::mm::mmu_switch(next_pid.as_u32(), disk)).unwrap_or_else(|e| crate::error::fatal(e.into()));

    #[cfg(target_os = "none")]
    {
        crate::arch::riscv32::timer_reset();
        crate::arch::riscv32::arm_kernel_stack_for(next_pid);
        if was_ready {
            crate::arch::riscv32::build_initial_frame(next_index, next_pid);
        }
    }
    #[cfg(not(target_os = "none"))]
    let _ = was_ready;

    Ok(next_pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot;
    use crate::process::table::PROCESS_TABLE_TEST_LOCK;

    #[test]
    fn yield_cpu_rotates_to_the_next_runnable_entry() {
        let _guard = PROCESS_TABLE_TEST_LOCK.lock();
        boot::install_disk(boot::boot_disk());
        crate::mm::init(crate::mm::EngineChoice::SoftTlb, 5);

        let a = PROCESS_TABLE.alloc(ProcessState::Running).unwrap();
        let b = PROCESS_TABLE.alloc(ProcessState::Ready).unwrap();
        *CURRENT_INDEX.lock() = PROCESS_TABLE.index_of(a).unwrap();

        let next = yield_cpu();
        assert_eq!(next, b);
        assert_eq!(PROCESS_TABLE.with(a, |e| e.state()).unwrap(), ProcessState::Runnable);
        assert_eq!(PROCESS_TABLE.with(b, |e| e.state()).unwrap(), ProcessState::Running);

        PROCESS_TABLE.release(a).unwrap();
        PROCESS_TABLE.release(b).unwrap();
    }

    #[test]
    fn yield_cpu_with_nothing_else_runnable_is_fatal() {
        let _guard = PROCESS_TABLE_TEST_LOCK.lock();
        boot::install_disk(boot::boot_disk());
        crate::mm::init(crate::mm::EngineChoice::SoftTlb, 5);

        let solo = PROCESS_TABLE.alloc(ProcessState::WaitToRecv).unwrap();
        *CURRENT_INDEX.lock() = PROCESS_TABLE.index_of(solo).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(yield_cpu));
        assert!(result.is_err());

        PROCESS_TABLE.release(solo).unwrap();
    }
}
