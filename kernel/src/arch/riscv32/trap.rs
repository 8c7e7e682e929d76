//! Trap entry and dispatch.
//!
//! The vector itself is hand-written assembly rather than a `#[naked]`
//! function: a normal Rust function prologue would clobber registers
//! before we get a chance to save them. The register save/restore lives in
//! a plain `asm!` block instead, wrapped in `global_asm!` because the
//! vector is entered directly by hardware, never called, so it has no Rust
//! signature to hang an `asm!` body off of.

use core::arch::{asm, global_asm};

use super::csr::{self, Cause};
use crate::arch::context::TrapFrame;
use crate::process::ProcessId;

const FRAME_SIZE: usize = core::mem::size_of::<TrapFrame>();

global_asm!(
    "
    .section .text.trap
    .global trap_entry
    .align 4
trap_entry:
    // mscratch holds the current process's kernel-stack top; swap it with
    // sp so sp becomes the kernel stack and mscratch the interrupted sp.
    csrrw sp, mscratch, sp
    addi sp, sp, -{frame_size}

    sw ra,  0*4(sp)
    sw gp,  2*4(sp)
    sw tp,  3*4(sp)
    sw t0,  4*4(sp)
    sw t1,  5*4(sp)
    sw t2,  6*4(sp)
    sw s0,  7*4(sp)
    sw s1,  8*4(sp)
    sw a0,  9*4(sp)
    sw a1, 10*4(sp)
    sw a2, 11*4(sp)
    sw a3, 12*4(sp)
    sw a4, 13*4(sp)
    sw a5, 14*4(sp)
    sw a6, 15*4(sp)
    sw a7, 16*4(sp)
    sw s2, 17*4(sp)
    sw s3, 18*4(sp)
    sw s4, 19*4(sp)
    sw s5, 20*4(sp)
    sw s6, 21*4(sp)
    sw s7, 22*4(sp)
    sw s8, 23*4(sp)
    sw s9, 24*4(sp)
    sw s10,25*4(sp)
    sw s11,26*4(sp)
    sw t3, 27*4(sp)
    sw t4, 28*4(sp)
    sw t5, 29*4(sp)
    sw t6, 30*4(sp)

    csrr t0, mscratch
    sw t0, 1*4(sp)

    csrr t0, mepc
    sw t0, 31*4(sp)
    csrr t0, mstatus
    sw t0, 32*4(sp)

    mv a0, sp
    call rust_trap_handler
    mv sp, a0

    lw t0, 32*4(sp)
    csrw mstatus, t0
    lw t0, 31*4(sp)
    csrw mepc, t0

    lw ra,  0*4(sp)
    lw gp,  2*4(sp)
    lw tp,  3*4(sp)
    lw t0,  4*4(sp)
    lw t1,  5*4(sp)
    lw t2,  6*4(sp)
    lw s0,  7*4(sp)
    lw s1,  8*4(sp)
    lw a0,  9*4(sp)
    lw a1, 10*4(sp)
    lw a2, 11*4(sp)
    lw a3, 12*4(sp)
    lw a4, 13*4(sp)
    lw a5, 14*4(sp)
    lw a6, 15*4(sp)
    lw a7, 16*4(sp)
    lw s2, 17*4(sp)
    lw s3, 18*4(sp)
    lw s4, 19*4(sp)
    lw s5, 20*4(sp)
    lw s6, 21*4(sp)
    lw s7, 22*4(sp)
    lw s8, 23*4(sp)
    lw s9, 24*4(sp)
    lw s10,25*4(sp)
    lw s11,26*4(sp)
    lw t3, 27*4(sp)
    lw t4, 28*4(sp)
    lw t5, 29*4(sp)
    lw t6, 30*4(sp)

    // The resumed process's own stack pointer, and the kernel-stack top
    // mscratch should hold for *its* next trap, both come back from
    // rust_trap_handler via the frame it chose; reload sp last.
    csrr t0, mscratch
    lw sp, 1*4(sp)
    mret
    ",
    frame_size = const FRAME_SIZE,
);

extern "C" {
    fn trap_entry();
}

/// Install the trap vector and seed `mscratch` with pid 1's kernel-stack
/// top — the first entry `sched::init` makes `Running`.
pub fn install() {
    // SAFETY: `trap_entry` is the `global_asm!` symbol above, a valid,
    // 4-byte-aligned direct-mode trap vector.
    unsafe {
        csr::install_trap_vector(trap_entry as usize);
        csr::write_mscratch(crate::arch::context::stack_top(0) as usize);
    }
}

/// Called from `trap_entry` with `a0` pointing at the just-saved frame on
/// the outgoing process's dedicated kernel stack; returns the frame to
/// resume.
#[no_mangle]
pub extern "C" fn rust_trap_handler(frame: *mut TrapFrame) -> *mut TrapFrame {
    // SAFETY: `frame` was just constructed by `trap_entry` on a stack this
    // core owns exclusively for the duration of the trap.
    let current = unsafe { &mut *frame };
    let current_pid = crate::sched::current_pid();
    let cause = csr::read_cause();

    // Step past the `ecall` before the syscall protocol runs: `dispatch`
    // may yield away from this process, so the advance has to land on
    // this frame (and the PCB's mirror of it) now, not after the match
    // below — otherwise a later re-trap into the same process would
    // restore the un-advanced mepc and re-execute the same `ecall`. The
    // fault/terminate paths overwrite mepc with the exit trampoline
    // instead, so they must not see this advance.
    if matches!(cause, Cause::Exception(csr::EXC_ENV_CALL_FROM_U) | Cause::Interrupt(csr::INT_SOFTWARE)) {
        current.mepc = current.mepc.wrapping_add(4);
    }

    crate::process::PROCESS_TABLE
        .with_mut(current_pid, |pcb| {
            pcb.set_ksp(frame as usize);
            pcb.set_trap_pc(current.mepc as usize);
        })
        .unwrap_or_else(|e| crate::error::fatal(e.into()));

    // `syscall::dispatch` (via `ipc::sync::send`/`recv`) and the timer-
    // preemption arm below are the only two paths that call
    // `sched::yield_cpu` directly, matching the one-scheduling-decision-per-
    // trap shape of SPEC_FULL.md §4.5/§4.6: whichever pid is `current_pid`
    // once the match below returns is the frame we resume into, with no
    // further rotation.
    match cause {
        Cause::Exception(csr::EXC_ENV_CALL_FROM_U) => {
            crate::syscall::dispatch(current_pid);
        }
        Cause::Exception(csr::EXC_ENV_CALL_FROM_M) => {
            if current_pid.is_privileged() {
                crate::error::fatal(crate::error::TrapError::FatalException { mcause: csr::EXC_ENV_CALL_FROM_M, pid: current_pid.as_u32() }.into());
            } else {
                terminate(current, current_pid);
            }
        }
        Cause::Interrupt(csr::INT_SOFTWARE) => {
            crate::syscall::dispatch(current_pid);
        }
        Cause::Interrupt(csr::INT_TIMER) => {
            if current_pid.is_privileged() {
                timer_reset();
                return frame;
            }
            crate::sched::yield_cpu();
        }
        Cause::Interrupt(csr::INT_EXTERNAL) => {
            terminate(current, current_pid);
        }
        Cause::Exception(code) => {
            if current_pid.is_privileged() {
                crate::error::fatal(crate::error::TrapError::FatalException { mcause: code, pid: current_pid.as_u32() }.into());
            } else {
                terminate(current, current_pid);
            }
        }
        Cause::Interrupt(code) => {
            crate::error::fatal(crate::error::TrapError::UnknownCause { mcause: code }.into());
        }
    }

    let next_pid = crate::sched::current_pid();
    crate::process::PROCESS_TABLE
        .with(next_pid, |pcb| pcb.ksp() as *mut TrapFrame)
        .unwrap_or_else(|e| crate::error::fatal(e.into()))
}

/// Redirect `pid`'s trap PC to the exit trampoline rather than resuming it
/// where it faulted. Writes `mepc` directly into the live frame, not just
/// the PCB's `trap_pc` bookkeeping field: this process is not necessarily
/// rescheduled before it next resumes (round-robin may return to it with no
/// intervening `build_initial_frame` call), so the frame already sitting on
/// its kernel stack is what `mret` will actually use. The process itself is
/// expected to call `exit` once the trampoline runs.
fn terminate(frame: &mut TrapFrame, pid: ProcessId) {
    frame.mepc = crate::config::EXIT_TRAMPOLINE_VA as u32;
    crate::process::PROCESS_TABLE
        .with_mut(pid, |pcb| pcb.set_trap_pc(crate::config::EXIT_TRAMPOLINE_VA))
        .unwrap_or_else(|e| crate::error::fatal(e.into()));
}

pub fn timer_reset() {
    // A real board reprograms `mtimecmp`; this core has no timer device
    // modeled beyond the cause code itself, so resetting it is a no-op
    // until a board support package wires one in.
}

pub fn enable_interrupts() {
    // SAFETY: sets MIE (bit 3) in mstatus, the global machine-interrupt
    // enable; no preconditions beyond running in machine mode, which the
    // boot path always does at this point.
    unsafe {
        asm!("csrsi mstatus, 0x8");
    }
}
