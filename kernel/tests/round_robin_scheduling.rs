//! End-to-end scenario 2 (SPEC_FULL.md §8): "Two processes A (pid 2) and B
//! (pid 3) both runnable; after three timer ticks each has been scheduled
//! at least once (round-robin)."

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use egos32_kernel::mm::{self, EngineChoice};
use egos32_kernel::process::{self};
use egos32_kernel::{arch, boot, sched};

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

    let a = process::spawn().expect("process table has room for two apps");
    let b = process::spawn().expect("process table has room for two apps");

    let mut scheduled = [None; 3];
    for slot in scheduled.iter_mut() {
        *slot = Some(sched::yield_cpu());
    }

    let a_scheduled = scheduled.iter().any(|p| *p == Some(a));
    let b_scheduled = scheduled.iter().any(|p| *p == Some(b));

    common::report("round_robin_scheduling", a_scheduled && b_scheduled)
}
