//! Physical-frame allocator: frame table + frame cache together.

use crate::config::{FRAME_SIZE, NUM_CACHE_SLOTS};
use crate::drivers::DiskDevice;
use crate::error::MmError;

use super::frame::{FrameId, FrameTable, PageNo, Perm};
use super::frame_cache::FrameCache;

/// Physical-frame allocator combining the mapping table with the frame
/// cache, the two halves of `alloc`/`free`.
pub struct FrameAllocator {
    table: FrameTable,
    cache: FrameCache<NUM_CACHE_SLOTS>,
}

impl FrameAllocator {
    pub fn new(eviction_seed: u32) -> Self {
        Self {
            table: FrameTable::new(),
            cache: FrameCache::new(eviction_seed),
        }
    }

    pub fn init(&mut self) {
        self.table = FrameTable::new();
        self.cache.init();
    }

    /// First-fit scan for a free frame; pull it into the cache in
    /// `alloc_only` mode; return its id and fast-memory contents.
    pub fn alloc(&mut self, disk: &mut dyn DiskDevice) -> Result<(FrameId, &[u8; FRAME_SIZE]), MmError> {
        let frame_id = self.table.alloc()?;
        let data = self.cache.read(frame_id, true, disk)?;
        Ok((frame_id, data))
    }

    /// Stamp the mapping record of an already-allocated frame.
    pub fn stamp(&mut self, frame_id: FrameId, pid: u32, page_no: PageNo, perm: Perm) {
        self.table.stamp(frame_id, pid, page_no, perm);
    }

    /// For every frame owned by `pid`: invalidate its cache slot and clear
    /// its mapping record.
    pub fn free(&mut self, pid: u32) {
        let owned: [Option<FrameId>; crate::config::NUM_FRAMES] = {
            let mut buf = [None; crate::config::NUM_FRAMES];
            for (slot, frame_id) in buf.iter_mut().zip(self.table.owned_by(pid)) {
                *slot = Some(frame_id);
            }
            buf
        };
        for frame_id in owned.into_iter().flatten() {
            self.cache.invalidate(frame_id);
            self.table.clear(frame_id);
        }
    }

    pub fn write_frame(&mut self, frame_id: FrameId, src: &[u8; FRAME_SIZE], disk: &mut dyn DiskDevice) -> Result<(), MmError> {
        self.cache.write(frame_id, src, disk)
    }

    pub fn read_frame(&mut self, frame_id: FrameId, disk: &mut dyn DiskDevice) -> Result<&[u8; FRAME_SIZE], MmError> {
        self.cache.read(frame_id, false, disk)
    }

    pub fn invalidate_frame(&mut self, frame_id: FrameId) {
        self.cache.invalidate(frame_id);
    }

    pub fn table(&self) -> &FrameTable {
        &self.table
    }
}
