//! UART-backed console output and the `log` backend that rides on top of it.

use core::fmt::{self, Write};

use spin::Mutex;

/// QEMU `virt` machine NS16550A UART data register.
const UART_BASE: usize = 0x1000_0000;

struct Uart {
    base: *mut u8,
}

// SAFETY: the UART base is a fixed MMIO address valid for the lifetime of
// the kernel; all access goes through `write_volatile` on a single byte
// register, and callers only ever reach `Uart` through the `CONSOLE` mutex
// below, so there is no concurrent access.
unsafe impl Send for Uart {}

impl Uart {
    const fn new(base: usize) -> Self {
        Self {
            base: base as *mut u8,
        }
    }

    fn write_byte(&mut self, byte: u8) {
        #[cfg(target_os = "none")]
        // SAFETY: `self.base` is the UART data register, mapped and
        // writable for the lifetime of the kernel on the QEMU virt machine.
        unsafe {
            core::ptr::write_volatile(self.base, byte);
        }
        #[cfg(not(target_os = "none"))]
        {
            let _ = byte;
        }
    }
}

impl Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

static CONSOLE: Mutex<Uart> = Mutex::new(Uart::new(UART_BASE));

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    #[cfg(not(target_os = "none"))]
    {
        std::print!("{}", args);
    }
    #[cfg(target_os = "none")]
    {
        CONSOLE.lock().write_fmt(args).ok();
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::print::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

/// A minimal `log::Log` implementor writing through the same UART as
/// `print!`/`println!`.
struct UartLogger;

static LOGGER: UartLogger = UartLogger;

impl log::Log for UartLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            println!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Register the UART logger as the `log` crate's global backend.
///
/// Safe to call more than once; subsequent calls are no-ops, matching
/// `log::set_logger`'s own idempotence contract.
pub fn init_logger() {
    log::set_logger(&LOGGER).ok();
    log::set_max_level(log::LevelFilter::Trace);
}
