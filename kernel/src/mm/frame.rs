//! Physical frame identity and the 256-entry mapping table.

use bitflags::bitflags;

use crate::config::NUM_FRAMES;
use crate::error::MmError;

bitflags! {
    /// Permission bits carried by a frame's mapping record and, for the
    /// Sv32 engine, by the leaf page-table entry itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Perm: u8 {
        const READ  = 0b0001;
        const WRITE = 0b0010;
        const EXEC  = 0b0100;
        const USER  = 0b1000;
    }
}

/// Identifies one of the 256 physical frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u32);

impl FrameId {
    pub fn new(id: u32) -> Result<Self, MmError> {
        if (id as usize) < NUM_FRAMES {
            Ok(Self(id))
        } else {
            Err(MmError::InvalidFrame { frame_id: id })
        }
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// The virtual page number a frame is mapped to within its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNo(pub u32);

/// Mapping record for one physical frame.
#[derive(Debug, Clone, Copy)]
pub struct MappingRecord {
    in_use: bool,
    pid: Option<u32>,
    page_no: PageNo,
    perm: Perm,
}

impl MappingRecord {
    const fn empty() -> Self {
        Self {
            in_use: false,
            pid: None,
            page_no: PageNo(0),
            perm: Perm::empty(),
        }
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn page_no(&self) -> PageNo {
        self.page_no
    }

    pub fn perm(&self) -> Perm {
        self.perm
    }
}

/// The fixed 256-entry physical-frame mapping table.
pub struct FrameTable {
    entries: [MappingRecord; NUM_FRAMES],
}

impl FrameTable {
    pub const fn new() -> Self {
        Self {
            entries: [MappingRecord::empty(); NUM_FRAMES],
        }
    }

    /// Lowest-indexed free frame, marked in-use.
    pub fn alloc(&mut self) -> Result<FrameId, MmError> {
        let index = self
            .entries
            .iter()
            .position(|entry| !entry.in_use)
            .ok_or(MmError::FramesExhausted)?;
        self.entries[index].in_use = true;
        FrameId::new(index as u32)
    }

    /// Stamp a frame's mapping record with its owner, page number, and
    /// permissions. The frame must already be in-use.
    pub fn stamp(&mut self, frame_id: FrameId, pid: u32, page_no: PageNo, perm: Perm) {
        let entry = &mut self.entries[frame_id.as_usize()];
        entry.pid = Some(pid);
        entry.page_no = page_no;
        entry.perm = perm;
    }

    pub fn get(&self, frame_id: FrameId) -> &MappingRecord {
        &self.entries[frame_id.as_usize()]
    }

    /// Every frame currently owned by `pid`, in index order.
    pub fn owned_by(&self, pid: u32) -> impl Iterator<Item = FrameId> + '_ {
        self.entries.iter().enumerate().filter_map(move |(i, e)| {
            (e.in_use && e.pid == Some(pid)).then(|| FrameId::new(i as u32).expect("table index in range"))
        })
    }

    /// Clear the mapping record for `frame_id`, returning it to unused.
    pub fn clear(&mut self, frame_id: FrameId) {
        self.entries[frame_id.as_usize()] = MappingRecord::empty();
    }
}

impl Default for FrameTable {
    fn default() -> Self {
        Self::new()
    }
}
