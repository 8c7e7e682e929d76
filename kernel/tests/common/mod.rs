//! Shared harness for the bare-metal integration tests (SPEC_FULL.md
//! §10.5): each scenario boots the kernel's init sequence for real on the
//! target, drives the exact library calls the trap dispatcher would, then
//! narrates pass/fail with the same `[ok]`/`[failed]`/`BOOTOK`/`BOOTFAIL`
//! markers `egos32_kernel::boot` uses, so CI can grep the QEMU serial log.

#![allow(dead_code)]

use core::panic::PanicInfo;

use egos32_kernel::arch;

pub fn init() {
    egos32_kernel::print::init_logger();
}

pub fn test_panic(info: &PanicInfo) -> ! {
    log::error!("[failed] {}", info);
    log::error!("BOOTFAIL");
    arch::riscv32::halt()
}

/// Narrate a scenario's outcome and park the hart. Never returns: the
/// QEMU harness reads the serial log rather than an exit code.
pub fn report(name: &str, passed: bool) -> ! {
    if passed {
        log::info!("{} ... [ok]", name);
        log::info!("BOOTOK");
    } else {
        log::error!("{} ... [failed]", name);
        log::error!("BOOTFAIL");
    }
    arch::riscv32::halt()
}
