//! Frame cache (paging device) over the disk-backed frame store.

use crate::config::{BLOCKS_PER_FRAME, BLOCK_SIZE, FRAME_SIZE};
use crate::drivers::DiskDevice;
use crate::error::MmError;

use super::frame::FrameId;

struct Slot {
    frame_id: Option<u32>,
    dirty: bool,
    data: [u8; FRAME_SIZE],
}

impl Slot {
    const fn empty() -> Self {
        Self {
            frame_id: None,
            dirty: false,
            data: [0u8; FRAME_SIZE],
        }
    }
}

/// Xorshift32, good enough for a uniform eviction choice and cheap to seed
/// from a cycle counter at boot.
pub struct Rng(u32);

impl Rng {
    pub const fn new(seed: u32) -> Self {
        // xorshift needs a nonzero state.
        Self(if seed == 0 { 0xDEAD_BEEF } else { seed })
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next_u32() as usize) % bound
    }
}

/// `N` fast-memory slots staging a subset of the 256 disk-backed frames.
///
/// Production code sizes this with [`crate::config::NUM_CACHE_SLOTS`]; tests
/// instantiate smaller sizes directly to exercise eviction at the
/// constrained board's 28-slot bound.
pub struct FrameCache<const N: usize> {
    slots: [Slot; N],
    rng: Rng,
}

impl<const N: usize> FrameCache<N> {
    pub fn new(seed: u32) -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::empty()),
            rng: Rng::new(seed),
        }
    }

    /// Mark all slots empty and all dirty bits clear.
    pub fn init(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::empty();
        }
    }

    fn find(&self, frame_id: FrameId) -> Option<usize> {
        self.slots.iter().position(|s| s.frame_id == Some(frame_id.as_u32()))
    }

    fn disk_offset(frame_id: FrameId) -> u32 {
        frame_id.as_u32() * BLOCKS_PER_FRAME as u32
    }

    fn writeback(slot: &mut Slot, disk: &mut dyn DiskDevice) -> Result<(), MmError> {
        if let Some(id) = slot.frame_id {
            if slot.dirty {
                let frame_id = FrameId::new(id).expect("resident frame id always valid");
                disk.disk_write(Self::disk_offset(frame_id), BLOCKS_PER_FRAME as u32, &slot.data)?;
                slot.dirty = false;
            }
        }
        Ok(())
    }

    /// If resident, evict `frame_id` without write-back.
    /// Idempotent.
    pub fn invalidate(&mut self, frame_id: FrameId) {
        if let Some(index) = self.find(frame_id) {
            self.slots[index] = Slot::empty();
        }
    }

    /// Choose a slot to hold `frame_id`, writing back and evicting its
    /// current occupant if the slot is dirty. Returns the slot index.
    fn install(&mut self, frame_id: FrameId, disk: &mut dyn DiskDevice) -> Result<usize, MmError> {
        if let Some(index) = self.find(frame_id) {
            return Ok(index);
        }
        if let Some(index) = self.slots.iter().position(|s| s.frame_id.is_none()) {
            self.slots[index].frame_id = Some(frame_id.as_u32());
            return Ok(index);
        }
        let index = self.rng.below(N);
        Self::writeback(&mut self.slots[index], disk)?;
        self.slots[index] = Slot::empty();
        self.slots[index].frame_id = Some(frame_id.as_u32());
        Ok(index)
    }

    /// Stage `src` into the slot holding `frame_id`, evicting if necessary;
    /// mark the slot dirty. Skips the copy when the slot already holds
    /// exactly these bytes.
    pub fn write(&mut self, frame_id: FrameId, src: &[u8; FRAME_SIZE], disk: &mut dyn DiskDevice) -> Result<(), MmError> {
        let index = self.install(frame_id, disk)?;
        if self.slots[index].data != *src {
            self.slots[index].data = *src;
            self.slots[index].dirty = true;
        }
        Ok(())
    }

    /// Resident contents of `frame_id`, installing it first if absent.
    /// `alloc_only` skips the disk fill, leaving contents undefined for a
    /// fresh allocation.
    pub fn read(&mut self, frame_id: FrameId, alloc_only: bool, disk: &mut dyn DiskDevice) -> Result<&[u8; FRAME_SIZE], MmError> {
        let already_resident = self.find(frame_id).is_some();
        let index = self.install(frame_id, disk)?;
        if !already_resident && !alloc_only {
            let mut buf = [0u8; FRAME_SIZE];
            disk.disk_read(Self::disk_offset(frame_id), BLOCKS_PER_FRAME as u32, &mut buf)?;
            self.slots[index].data = buf;
        }
        Ok(&self.slots[index].data)
    }
}

const _: () = assert!(FRAME_SIZE % BLOCK_SIZE == 0);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::RamDisk;

    fn frame(id: u32) -> FrameId {
        FrameId::new(id).unwrap()
    }

    #[test]
    fn write_then_read_yields_written_bytes() {
        let mut cache: FrameCache<4> = FrameCache::new(1);
        let mut disk: RamDisk<32> = RamDisk::new_zeroed();
        let src = [0x11u8; FRAME_SIZE];
        cache.write(frame(0), &src, &mut disk).unwrap();
        let read = cache.read(frame(0), false, &mut disk).unwrap();
        assert_eq!(*read, src);
    }

    #[test]
    fn invalidate_then_read_loads_disk_image() {
        let mut cache: FrameCache<4> = FrameCache::new(1);
        let mut disk: RamDisk<32> = RamDisk::new_zeroed();
        let src = [0x22u8; FRAME_SIZE];
        cache.write(frame(1), &src, &mut disk).unwrap();

        // Force the write-back by evicting everything through allocation
        // pressure isn't available here, so drive it through the disk
        // directly: invalidate drops the cached copy without writing back,
        // so pre-seed disk with the pattern we expect read to observe.
        disk.disk_write(BLOCKS_PER_FRAME as u32, BLOCKS_PER_FRAME as u32, &[0x33u8; FRAME_SIZE]).unwrap();
        cache.invalidate(frame(1));
        let read = cache.read(frame(1), false, &mut disk).unwrap();
        assert_eq!(*read, [0x33u8; FRAME_SIZE]);
    }

    #[test]
    fn invalidate_is_idempotent() {
        let mut cache: FrameCache<4> = FrameCache::new(1);
        let mut disk: RamDisk<32> = RamDisk::new_zeroed();
        cache.write(frame(0), &[0u8; FRAME_SIZE], &mut disk).unwrap();
        cache.invalidate(frame(0));
        cache.invalidate(frame(0));
    }

    #[test]
    fn eviction_with_all_slots_dirty_writes_back_exactly_one_frame() {
        let mut cache: FrameCache<28> = FrameCache::new(42);
        let mut disk: RamDisk<{ 28 * BLOCKS_PER_FRAME + BLOCKS_PER_FRAME }> = RamDisk::new_zeroed();
        for i in 0..28u32 {
            cache.write(frame(i), &[i as u8; FRAME_SIZE], &mut disk).unwrap();
        }
        // All 28 slots are resident and dirty; staging frame 28 forces
        // exactly one eviction.
        cache.write(frame(28), &[0xFFu8; FRAME_SIZE], &mut disk).unwrap();
        let resident: usize = (0..28).filter(|&i| cache.find(frame(i)).is_some()).count();
        assert_eq!(resident, 27);
        assert!(cache.find(frame(28)).is_some());
    }
}
