//! Memory management: physical frames, the frame cache, and the two
//! translation engines.

pub mod allocator;
pub mod engine;
pub mod frame;
pub mod frame_cache;
pub mod soft_tlb;
pub mod sv32;

use spin::Mutex;

use crate::config::{NUM_CACHE_SLOTS, PAGE_TABLES_AVAILABLE};
use crate::drivers::DiskDevice;
use crate::error::MmError;

pub use allocator::FrameAllocator;
pub use engine::{EngineChoice, MmuEngine};
pub use frame::{FrameId, PageNo, Perm};

struct Mmu {
    allocator: FrameAllocator,
    engine: MmuEngine,
}

/// Process-wide singleton tying the frame allocator to whichever
/// translation engine boot selected; populated by [`init`].
static MMU: Mutex<Option<Mmu>> = Mutex::new(None);

/// Bring up the MMU with the given engine choice and an eviction seed for
/// the frame cache's random policy.
pub fn init(choice: EngineChoice, eviction_seed: u32) {
    let choice = if choice == EngineChoice::PageTables && !PAGE_TABLES_AVAILABLE {
        EngineChoice::SoftTlb
    } else {
        choice
    };
    let mut allocator = FrameAllocator::new(eviction_seed);
    allocator.init();
    *MMU.lock() = Some(Mmu {
        allocator,
        engine: MmuEngine::new(choice),
    });
    log::info!(
        "[MM] mmu initialized with {} cache slots, {:?} engine",
        NUM_CACHE_SLOTS,
        choice,
    );
}

fn with_mmu<R>(f: impl FnOnce(&mut Mmu) -> R) -> R {
    let mut guard = MMU.lock();
    let mmu = guard.as_mut().expect("mm::init must run before any MMU operation");
    f(mmu)
}

/// Allocate a frame and stamp it for `pid`/`page_no` with `perm`.
pub fn mmu_alloc_and_map(pid: u32, page_no: PageNo, perm: Perm, disk: &mut dyn DiskDevice) -> Result<FrameId, MmError> {
    with_mmu(|mmu| {
        let (frame_id, _) = mmu.allocator.alloc(disk)?;
        mmu.engine.map(&mut mmu.allocator, pid, page_no, frame_id, perm)?;
        Ok(frame_id)
    })
}

/// Bring `pid`'s address space into view. Returns the
/// Sv32 root PPN when that engine is active, for the caller to install in
/// `satp`.
pub fn mmu_switch(pid: u32, disk: &mut dyn DiskDevice) -> Result<Option<u32>, MmError> {
    with_mmu(|mmu| mmu.engine.switch(&mut mmu.allocator, pid, disk))
}

/// Release every frame owned by `pid`.
pub fn mmu_free(pid: u32) {
    with_mmu(|mmu| mmu.allocator.free(pid));
}

pub fn is_page_tables_engine() -> bool {
    with_mmu(|mmu| mmu.engine.is_page_tables())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::RamDisk;

    #[test]
    fn alloc_and_map_then_free_clears_frame() {
        init(EngineChoice::SoftTlb, 11);
        let mut disk: RamDisk<{ crate::config::FRAME_STORE_BLOCKS }> = RamDisk::new_zeroed();
        let frame_id = mmu_alloc_and_map(7, PageNo(0), Perm::READ | Perm::WRITE, &mut disk).unwrap();
        mmu_free(7);
        with_mmu(|mmu| assert!(!mmu.allocator.table().get(frame_id).in_use()));
    }
}
