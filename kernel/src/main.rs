//! Bare-metal entry point.
//!
//! Everything else lives in the `egos32_kernel` library; this binary is
//! only the `_start`/panic-handler shell the linker script and QEMU
//! expect, handing off immediately to `boot::run`.

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use egos32_kernel::arch;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    log::error!("[PANIC] {}", info);
    arch::riscv32::halt()
}

#[no_mangle]
pub extern "C" fn _start() -> ! {
    egos32_kernel::boot::run()
}
