//! End-to-end scenario 3 (SPEC_FULL.md §8): "A calls send(3, "ping", 4)
//! with B not yet receiving -> A becomes WAIT_TO_SEND(receiver=3). B calls
//! recv -> on next dispatch A is RUNNABLE, B's syscall slot holds
//! sender=2, content="ping"."

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

    let a = process::spawn().expect("room for sender");
    let b = process::spawn().expect("room for receiver");

    ipc::send(a, b, b"ping");
    let a_waiting_to_send = PROCESS_TABLE.with(a, |pcb| pcb.state()) == Ok(ProcessState::WaitToSend);

    ipc::recv(b);
    let a_runnable = PROCESS_TABLE.with(a, |pcb| pcb.state()) == Ok(ProcessState::Runnable);

    let delivered = PROCESS_TABLE
        .index_of(b)
        .map(|index| SYSCALL_SLOTS.lock()[index].message)
        .expect("b has a live table entry");
    let payload_matches = delivered.sender_pid == a.as_u32() && delivered.as_slice() == b"ping";

    common::report(
        "rendezvous_send_first",
        a_waiting_to_send && a_runnable && payload_matches,
    )
}
