//! RISC-V 32-bit (machine mode) architecture support. The whole of what the
//! rest of the kernel needs from hardware: a trap vector, CSR access, and
//! the per-process kernel stacks trap frames live on.

pub mod csr;
pub mod trap;

use crate::arch::context;
use crate::process::ProcessId;

pub use trap::{enable_interrupts, timer_reset};

/// Stage 1 of boot: install the trap vector and arm `mscratch`.
pub fn init() {
    trap::install();
    log::info!("[ARCH] riscv32 trap vector installed");
}

/// Park the hart forever; reached only from [`crate::error::fatal`].
pub fn halt() -> ! {
    loop {
        // SAFETY: `wfi` has no preconditions; it idles the hart. Since
        // interrupts are never re-armed after a fatal halt, it never wakes.
        unsafe {
            core::arch::asm!("wfi");
        }
    }
}

/// Adjust `mscratch` to the about-to-run process's own kernel-stack top, so
/// its *next* trap swaps onto the right stack. The previous-privilege (MPP)
/// bit itself needs no per-switch update: it is part of each process's own
/// saved `mstatus`, set once in [`build_initial_frame`] on first dispatch
/// and preserved thereafter, since a pid's privilege level never changes.
pub fn arm_kernel_stack_for(pid: ProcessId) {
    let index = crate::process::PROCESS_TABLE
        .index_of(pid)
        .expect("scheduler only dispatches live entries");
    // SAFETY: `index` names the live table slot `pid` currently occupies;
    // its kernel stack is not shared with any other live pid.
    unsafe {
        csr::write_mscratch(context::stack_top(index) as usize);
    }
}

/// Build and install the first `TrapFrame` for a process dispatched out of
/// `Ready` for the first time: entry point and argc/argv come from the
/// PCB's `trap_pc` (set by the loader) and the fixed `APPS_ARG` region.
pub fn build_initial_frame(index: usize, pid: ProcessId) {
    let entry_pc = crate::process::PROCESS_TABLE
        .with(pid, |pcb| pcb.trap_pc() as u32)
        .expect("scheduler only dispatches live entries");

    let frame = context::build_initial_frame(entry_pc, 0, crate::config::APPS_ARG_VA as u32, pid);

    // SAFETY: `index` is this pid's own table slot; its kernel stack is
    // otherwise untouched since `release`/`alloc` only reuse a slot between
    // traps, never while one of its frames is being built.
    unsafe {
        let top = context::stack_top(index) as usize;
        let frame_ptr = (top - core::mem::size_of::<context::TrapFrame>()) as *mut context::TrapFrame;
        frame_ptr.write(frame);
    }

    crate::process::PROCESS_TABLE
        .with_mut(pid, |pcb| {
            let top = unsafe { context::stack_top(index) } as usize;
            pcb.set_ksp(top - core::mem::size_of::<context::TrapFrame>());
        })
        .expect("scheduler only dispatches live entries");
}
