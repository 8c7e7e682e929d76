//! The `{map, switch, alloc, free}` capability set shared by both
//! translation back-ends.

use crate::config::PAGE_TABLES_AVAILABLE;
use crate::drivers::DiskDevice;
use crate::error::MmError;

use super::allocator::FrameAllocator;
use super::frame::{FrameId, PageNo, Perm};
use super::soft_tlb::SoftTlb;
use super::sv32::Sv32Engine;

/// Which translation engine the MMU brings up at boot: on emulator boot the
/// user is prompted to choose 0 (page tables) or 1 (software TLB); on the
/// constrained board only the software TLB is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineChoice {
    SoftTlb,
    PageTables,
}

impl EngineChoice {
    /// Resolve a boot-prompt digit (`'0'` or `'1'`) to a choice, falling
    /// back to the software TLB for anything else or when page tables are
    /// unavailable on this build.
    pub fn from_prompt_byte(byte: u8) -> Self {
        if byte == b'0' && PAGE_TABLES_AVAILABLE {
            Self::PageTables
        } else {
            Self::SoftTlb
        }
    }
}

/// Either translation engine behind one call surface so the rest of the
/// kernel is parametric over which one is active.
pub enum MmuEngine {
    SoftTlb(SoftTlb),
    PageTables(Sv32Engine),
}

impl MmuEngine {
    pub fn new(choice: EngineChoice) -> Self {
        match choice {
            EngineChoice::SoftTlb => Self::SoftTlb(SoftTlb::new()),
            EngineChoice::PageTables => Self::PageTables(Sv32Engine::new()),
        }
    }

    pub fn map(&mut self, allocator: &mut FrameAllocator, pid: u32, page_no: PageNo, frame_id: FrameId, perm: Perm) -> Result<(), MmError> {
        match self {
            Self::SoftTlb(engine) => engine.map(allocator, pid, page_no, frame_id, perm),
            Self::PageTables(engine) => engine.map(allocator, pid, page_no, frame_id),
        }
    }

    /// Bring `pid`'s address space into view. The page-table engine returns
    /// the new root PPN for the caller to install in the page-table base
    /// register; the software TLB has no equivalent and performs the
    /// window copy internally.
    pub fn switch(&mut self, allocator: &mut FrameAllocator, pid: u32, disk: &mut dyn DiskDevice) -> Result<Option<u32>, MmError> {
        match self {
            Self::SoftTlb(engine) => {
                engine.switch(allocator, pid, disk)?;
                Ok(None)
            }
            Self::PageTables(engine) => Ok(Some(engine.switch(pid)?)),
        }
    }

    pub fn is_page_tables(&self) -> bool {
        matches!(self, Self::PageTables(_))
    }
}
