//! End-to-end scenario 4 (SPEC_FULL.md §8): "A calls recv with no pending
//! sender -> A is WAIT_TO_RECV. B calls send(2, "ack", 3) -> next dispatch
//! delivers "ack" to A, B resumes with retval 0."

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use egos32_kernel::ipc::sync::SYSCALL_SLOTS;
use egos32_kernel::mm::{self, EngineChoice};
use egos32_kernel::process::{self, ProcessState, PROCESS_TABLE};
use egos32_kernel::{arch, boot, ipc, sched};

mod common;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    common::test_panic(info)
}

#[no_mangle]
pub extern "C" fn _start() -> ! {
    common::init();
    arch::riscv32::init();
    boot::install_disk(boot::boot_disk());
    mm::init(EngineChoice::SoftTlb, egos32_kernel::config::BOOT_EVICTION_SEED);
    process::init();
    sched::init();
    ipc::init();

    let a = process::spawn().expect("room for receiver");
    let b = process::spawn().expect("room for sender");

    ipc::recv(a);
    let a_waiting_to_recv = PROCESS_TABLE.with(a, |pcb| pcb.state()) == Ok(ProcessState::WaitToRecv);

    let b_retval = ipc::send(b, a, b"ack");
    let a_runnable = PROCESS_TABLE.with(a, |pcb| pcb.state()) == Ok(ProcessState::Runnable);

    let delivered = PROCESS_TABLE
        .index_of(a)
        .map(|index| SYSCALL_SLOTS.lock()[index].message)
        .expect("a has a live table entry");
    let payload_matches = delivered.sender_pid == b.as_u32() && delivered.as_slice() == b"ack";

    common::report(
        "rendezvous_recv_first",
        a_waiting_to_recv && a_runnable && b_retval == 0 && payload_matches,
    )
}
