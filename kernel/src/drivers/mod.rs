//! Device boundary consumed by the core.
//!
//! These traits are the whole of the contract the MMU and trap dispatcher
//! need from the outside world. Bit-banging the real SD controller or UART
//! is explicitly out of scope; the only implementation this
//! crate carries is a RAM-backed one used by host-side unit tests and
//! bare-metal smoke tests run under QEMU with no attached block device.

use crate::config::BLOCK_SIZE;
use crate::error::MmError;

/// Synchronous block storage, 512-byte blocks.
pub trait DiskDevice {
    /// Read `nblocks` starting at `block_no` into `dst`.
    ///
    /// `dst.len()` must equal `nblocks * BLOCK_SIZE`.
    fn disk_read(&mut self, block_no: u32, nblocks: u32, dst: &mut [u8]) -> Result<(), MmError>;

    /// Write `nblocks` starting at `block_no` from `src`.
    ///
    /// `src.len()` must equal `nblocks * BLOCK_SIZE`.
    fn disk_write(&mut self, block_no: u32, nblocks: u32, src: &[u8]) -> Result<(), MmError>;
}

/// Polling TTY input and the interrupt-signal query.
pub trait TtyDevice {
    /// Non-blocking read of one pending byte, if any.
    fn tty_read(&mut self) -> Option<u8>;

    /// True if a user interrupt (ctrl-C) has been signalled since the last
    /// check.
    fn tty_recv_intr(&mut self) -> bool;
}

/// RAM-backed disk used where no physical medium is attached.
///
/// `N` is the disk's capacity in whole blocks; the boot path uses
/// `NUM_FRAMES * BLOCKS_PER_FRAME` so the frame store fits exactly, with no more backing storage than the frame store
/// needs. A fixed array keeps this heap-free, matching the rest of the
/// core's fixed-size tables.
pub struct RamDisk<const N: usize> {
    blocks: [[u8; BLOCK_SIZE]; N],
}

impl<const N: usize> RamDisk<N> {
    /// A zero-filled disk of exactly `N` blocks.
    pub const fn new_zeroed() -> Self {
        Self {
            blocks: [[0u8; BLOCK_SIZE]; N],
        }
    }
}

impl<const N: usize> DiskDevice for RamDisk<N> {
    fn disk_read(&mut self, block_no: u32, nblocks: u32, dst: &mut [u8]) -> Result<(), MmError> {
        let start = block_no as usize;
        let end = start + nblocks as usize;
        if end > N || dst.len() != nblocks as usize * BLOCK_SIZE {
            return Err(MmError::DiskIoFailed { block_no });
        }
        for (i, block) in self.blocks[start..end].iter().enumerate() {
            dst[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE].copy_from_slice(block);
        }
        Ok(())
    }

    fn disk_write(&mut self, block_no: u32, nblocks: u32, src: &[u8]) -> Result<(), MmError> {
        let start = block_no as usize;
        let end = start + nblocks as usize;
        if end > N || src.len() != nblocks as usize * BLOCK_SIZE {
            return Err(MmError::DiskIoFailed { block_no });
        }
        for (i, block) in self.blocks[start..end].iter_mut().enumerate() {
            block.copy_from_slice(&src[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE]);
        }
        Ok(())
    }
}

/// TTY stub with no pending input and no interrupt signalled; used wherever
/// a real console is not wired up.
#[derive(Default)]
pub struct RamTty {
    intr_pending: bool,
}

impl RamTty {
    /// Simulate the user pressing ctrl-C, for tests of the TTY-interrupt
    /// path.
    pub fn signal_intr(&mut self) {
        self.intr_pending = true;
    }
}

impl TtyDevice for RamTty {
    fn tty_read(&mut self) -> Option<u8> {
        None
    }

    fn tty_recv_intr(&mut self) -> bool {
        core::mem::take(&mut self.intr_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut disk: RamDisk<16> = RamDisk::new_zeroed();
        let src = [0xABu8; BLOCK_SIZE * 2];
        disk.disk_write(3, 2, &src).unwrap();
        let mut dst = [0u8; BLOCK_SIZE * 2];
        disk.disk_read(3, 2, &mut dst).unwrap();
        assert_eq!(src, dst);
    }

    #[test]
    fn out_of_range_read_fails() {
        let mut disk: RamDisk<4> = RamDisk::new_zeroed();
        let mut dst = [0u8; BLOCK_SIZE];
        assert!(disk.disk_read(10, 1, &mut dst).is_err());
    }

    #[test]
    fn tty_intr_is_edge_triggered() {
        let mut tty = RamTty::default();
        assert!(!tty.tty_recv_intr());
        tty.signal_intr();
        assert!(tty.tty_recv_intr());
        assert!(!tty.tty_recv_intr());
    }
}
