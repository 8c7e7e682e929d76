//! Software-TLB translation engine.
//!
//! No hardware page tables are installed; instead the engine copies a
//! process's pages into and out of a shared user-virtual window on every
//! context switch.

use crate::config::{FRAME_SIZE, MAX_PAGES_PER_PROCESS};
use crate::drivers::DiskDevice;
use crate::error::MmError;

use super::allocator::FrameAllocator;
use super::frame::{FrameId, PageNo, Perm};

/// The window's total span, one slot per addressable page number.
const WINDOW_BYTES: usize = FRAME_SIZE * MAX_PAGES_PER_PROCESS;

/// The shared user-virtual window every process's pages are copied through
/// on switch. Only one process's pages occupy it at a time.
pub struct SoftTlb {
    window: [u8; WINDOW_BYTES],
    current_pid: Option<u32>,
}

impl SoftTlb {
    pub const fn new() -> Self {
        Self {
            window: [0u8; WINDOW_BYTES],
            current_pid: None,
        }
    }

    fn window_slice(&self, page_no: PageNo) -> core::ops::Range<usize> {
        let start = page_no.0 as usize * FRAME_SIZE;
        start..start + FRAME_SIZE
    }

    fn check_page_no(page_no: PageNo) -> Result<(), MmError> {
        if (page_no.0 as usize) < MAX_PAGES_PER_PROCESS {
            Ok(())
        } else {
            Err(MmError::InvalidPageNumber { page_no: page_no.0 })
        }
    }

    /// Stamp `frame_id`'s mapping record; the caller must have already
    /// allocated the frame.
    pub fn map(&mut self, allocator: &mut FrameAllocator, pid: u32, page_no: PageNo, frame_id: FrameId, perm: Perm) -> Result<(), MmError> {
        Self::check_page_no(page_no)?;
        allocator.stamp(frame_id, pid, page_no, perm);
        Ok(())
    }

    /// Copy the outgoing VM pid's pages back into their frame-cache slots,
    /// then copy the incoming pid's pages into the window.
    /// No-op when `pid` is already current.
    pub fn switch(&mut self, allocator: &mut FrameAllocator, pid: u32, disk: &mut dyn DiskDevice) -> Result<(), MmError> {
        if self.current_pid == Some(pid) {
            return Ok(());
        }

        if let Some(outgoing) = self.current_pid {
            let frames: alloc_owned::Owned = alloc_owned::collect(allocator.table().owned_by(outgoing));
            for frame_id in frames.iter() {
                let record = *allocator.table().get(frame_id);
                let range = self.window_slice(record.page_no());
                let mut page = [0u8; FRAME_SIZE];
                page.copy_from_slice(&self.window[range]);
                allocator.write_frame(frame_id, &page, disk)?;
            }
        }

        let frames: alloc_owned::Owned = alloc_owned::collect(allocator.table().owned_by(pid));
        for frame_id in frames.iter() {
            let page_no = allocator.table().get(frame_id).page_no();
            let data = *allocator.read_frame(frame_id, disk)?;
            let range = self.window_slice(page_no);
            self.window[range].copy_from_slice(&data);
        }

        self.current_pid = Some(pid);
        Ok(())
    }

    pub fn current_pid(&self) -> Option<u32> {
        self.current_pid
    }
}

impl Default for SoftTlb {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity, no-heap substitute for collecting an `owned_by` iterator
/// before mutating the allocator it borrowed from.
mod alloc_owned {
    use crate::config::NUM_FRAMES;
    use crate::mm::frame::FrameId;

    pub struct Owned {
        items: [Option<FrameId>; NUM_FRAMES],
        len: usize,
    }

    impl Owned {
        pub fn iter(&self) -> impl Iterator<Item = FrameId> + '_ {
            self.items[..self.len].iter().map(|f| f.expect("within len"))
        }
    }

    pub fn collect(iter: impl Iterator<Item = FrameId>) -> Owned {
        let mut items = [None; NUM_FRAMES];
        let mut len = 0;
        for frame_id in iter {
            items[len] = Some(frame_id);
            len += 1;
        }
        Owned { items, len }
    }
}
