//! Sv32 two-level page-table translation engine.
//!
//! Optional on the emulator (`page_tables` feature); never available on the
//! constrained board, which only ever ships the software TLB.

use bitflags::bitflags;

use crate::config::max_tracked_processes;
use crate::error::MmError;

use super::allocator::FrameAllocator;
use super::frame::{FrameId, PageNo, Perm};

bitflags! {
    /// Sv32 PTE permission/valid bits (RISC-V privileged spec layout).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct PteFlags: u32 {
        const VALID = 1 << 0;
        const READ  = 1 << 1;
        const WRITE = 1 << 2;
        const EXEC  = 1 << 3;
        const USER  = 1 << 4;
    }
}

const PTE_PPN_SHIFT: u32 = 10;
const PTE_COUNT: usize = 1024;

/// One page-table page: 1024 32-bit entries, either pointing at a leaf page
/// table (root) or a physical frame (leaf).
#[derive(Clone, Copy)]
struct PageTablePage {
    entries: [u32; PTE_COUNT],
}

impl PageTablePage {
    const fn empty() -> Self {
        Self { entries: [0u32; PTE_COUNT] }
    }
}

fn encode_pte(ppn: u32, flags: PteFlags) -> u32 {
    (ppn << PTE_PPN_SHIFT) | flags.bits()
}

/// A fixed identity-mapped physical range installed kernel-only in every
/// process's root before any user mapping.
pub struct IdentityRegion {
    pub base_ppn: u32,
    pub page_count: u32,
}

/// MMIO, boot ROM, disk image, data TIM, instruction TIM.
pub const IDENTITY_REGIONS: &[IdentityRegion] = &[
    IdentityRegion { base_ppn: 0x1000_0 >> 2, page_count: 1 },  // MMIO (UART etc.)
    IdentityRegion { base_ppn: 0x0000_0 >> 2, page_count: 16 }, // boot ROM
    IdentityRegion { base_ppn: 0x2000_0 >> 2, page_count: 256 }, // disk image window
    IdentityRegion { base_ppn: 0x8000_0 >> 2, page_count: 16 }, // data TIM
    IdentityRegion { base_ppn: 0x8010_0 >> 2, page_count: 16 }, // instruction TIM
];

struct ProcessRoot {
    pid: u32,
    root: PageTablePage,
    leaves: [Option<PageTablePage>; 1024],
}

/// Per-process roots, one two-level tree per tracked pid.
pub struct Sv32Engine {
    roots: [Option<ProcessRoot>; crate::config::MAX_NPROCESS],
}

impl Sv32Engine {
    pub fn new() -> Self {
        Self {
            roots: core::array::from_fn(|_| None),
        }
    }

    fn find_or_build_root(&mut self, pid: u32) -> Result<&mut ProcessRoot, MmError> {
        if (pid as usize) >= max_tracked_processes() {
            return Err(MmError::InvalidPageNumber { page_no: pid });
        }
        if let Some(index) = self.roots.iter().position(|r| matches!(r, Some(root) if root.pid == pid)) {
            return Ok(self.roots[index].as_mut().expect("just matched Some"));
        }
        let index = self
            .roots
            .iter()
            .position(|r| r.is_none())
            .ok_or(MmError::InvalidPageNumber { page_no: pid })?;

        let mut process_root = ProcessRoot {
            pid,
            root: PageTablePage::empty(),
            leaves: [None; 1024],
        };
        install_identity_region(&mut process_root);
        self.roots[index] = Some(process_root);
        Ok(self.roots[index].as_mut().expect("just inserted"))
    }

    /// Lazily build the identity-mapped root for `pid` if absent, then
    /// install `frame_id` at the leaf indexed by `page_no`'s `VPN1`/`VPN0`
    /// with user RWX.
    pub fn map(&mut self, allocator: &mut FrameAllocator, pid: u32, page_no: PageNo, frame_id: FrameId) -> Result<(), MmError> {
        allocator.stamp(frame_id, pid, page_no, Perm::READ | Perm::WRITE | Perm::EXEC | Perm::USER);

        let process_root = self.find_or_build_root(pid)?;
        let vpn1 = (page_no.0 >> 10) & 0x3FF;
        let vpn0 = page_no.0 & 0x3FF;

        if process_root.leaves[vpn1 as usize].is_none() {
            process_root.leaves[vpn1 as usize] = Some(PageTablePage::empty());
            // Leaf PPN is a placeholder: a real board backs page-table pages
            // with allocated frames too; this engine only models the
            // mapping contract the core spec names, not a physical-frame-
            // for-page-table-pages bookkeeping layer.
            process_root.root.entries[vpn1 as usize] = encode_pte(0, PteFlags::VALID);
        }
        let leaf = process_root.leaves[vpn1 as usize].as_mut().expect("just installed");
        leaf.entries[vpn0 as usize] = encode_pte(frame_id.as_u32(), PteFlags::VALID | PteFlags::READ | PteFlags::WRITE | PteFlags::EXEC | PteFlags::USER);
        Ok(())
    }

    /// The physical page number of `pid`'s root, to be written into the
    /// page-table base register with paging enabled.
    /// Outgoing mappings are left intact; unlike the software TLB there is
    /// no copying.
    pub fn switch(&mut self, pid: u32) -> Result<u32, MmError> {
        let process_root = self.find_or_build_root(pid)?;
        Ok(root_ppn(process_root))
    }
}

impl Default for Sv32Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn root_ppn(process_root: &ProcessRoot) -> u32 {
    (process_root.root.entries.as_ptr() as usize as u32) >> 2
}

fn install_identity_region(process_root: &mut ProcessRoot) {
    for region in IDENTITY_REGIONS {
        for offset in 0..region.page_count {
            // Identity-mapped: VA == PA, so the VPN comes from the region's
            // own physical page number, not from a 0-based loop counter —
            // otherwise every region would land at the same low VPNs and
            // overlap instead of sitting at its physical address.
            let page_no = region.base_ppn + offset;
            let vpn1 = (page_no >> 10) & 0x3FF;
            let vpn0 = page_no & 0x3FF;
            if process_root.leaves[vpn1 as usize].is_none() {
                process_root.leaves[vpn1 as usize] = Some(PageTablePage::empty());
                process_root.root.entries[vpn1 as usize] = encode_pte(0, PteFlags::VALID);
            }
            let leaf = process_root.leaves[vpn1 as usize].as_mut().expect("just installed");
            leaf.entries[vpn0 as usize] = encode_pte(region.base_ppn + offset, PteFlags::VALID | PteFlags::READ | PteFlags::WRITE | PteFlags::EXEC);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::RamDisk;

    #[test]
    fn map_builds_root_lazily_and_installs_leaf() {
        let mut engine = Sv32Engine::new();
        let mut allocator = FrameAllocator::new(1);
        let mut disk: RamDisk<{ crate::config::FRAME_STORE_BLOCKS }> = RamDisk::new_zeroed();
        let (frame_id, _) = allocator.alloc(&mut disk).unwrap();

        engine.map(&mut allocator, 4, PageNo(0), frame_id).unwrap();
        assert_eq!(allocator.table().get(frame_id).pid(), Some(4));
    }

    #[test]
    fn switch_returns_stable_root_ppn_across_calls() {
        let mut engine = Sv32Engine::new();
        let first = engine.switch(4).unwrap();
        let second = engine.switch(4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn switch_rejects_pid_beyond_tracked_bound() {
        let mut engine = Sv32Engine::new();
        let out_of_range = max_tracked_processes() as u32 + 10;
        assert!(engine.switch(out_of_range).is_err());
    }
}
