//! Board and kernel-wide configuration constants.
//!
//! `cfg(feature = "board_fpga")` narrows the cache-slot count down to the
//! constrained board's 28 slots and compiles out the Sv32 engine; the
//! default (`board_qemu`) keeps all 256 frames resident and allows either
//! translation engine to be selected at boot.

/// Total number of physical frames backing the system.
pub const NUM_FRAMES: usize = 256;

/// Size in bytes of one physical frame.
pub const FRAME_SIZE: usize = 4096;

/// Size in bytes of one disk block.
pub const BLOCK_SIZE: usize = 512;

/// Disk blocks per frame (`FRAME_SIZE / BLOCK_SIZE`).
pub const BLOCKS_PER_FRAME: usize = FRAME_SIZE / BLOCK_SIZE;

/// Total blocks in the frame store: frame `i` lives at blocks
/// `[i * BLOCKS_PER_FRAME, (i + 1) * BLOCKS_PER_FRAME)`.
pub const FRAME_STORE_BLOCKS: usize = NUM_FRAMES * BLOCKS_PER_FRAME;

/// Number of frame-cache slots resident in fast memory at once.
#[cfg(feature = "board_fpga")]
pub const NUM_CACHE_SLOTS: usize = 28;
#[cfg(not(feature = "board_fpga"))]
pub const NUM_CACHE_SLOTS: usize = 256;

/// Maximum number of PCB entries.
pub const MAX_NPROCESS: usize = 64;

/// Maximum inline bytes carried by one syscall-slot message.
pub const SYSCALL_MSG_LEN: usize = 256;

/// Process ids below this value are privileged servers; at or above, user
/// applications.
pub const GPID_USER_START: u32 = 8;

/// Pid of the process-manager server, the target of `exit`'s `PROC_EXIT`
/// message.
pub const GPID_PROCESS: u32 = 1;

/// Pid of the shell; privileged servers are those with pid `< GPID_SHELL`.
pub const GPID_SHELL: u32 = 2;

/// Whether this build can offer the Sv32 two-level page-table engine as an
/// alternative to the software TLB. The constrained board only ever ships
/// the software TLB.
pub const PAGE_TABLES_AVAILABLE: bool = cfg!(all(feature = "page_tables", not(feature = "board_fpga")));

/// Bound on virtual page numbers a single process may map.
///
/// Sizes the software TLB's shared user-virtual window and the software
/// TLB engine's page-number range check; kept as a single configurable
/// constant rather than a literal scattered across both engines.
pub const MAX_PAGES_PER_PROCESS: usize = 64;

/// Bound on the number of processes the Sv32 engine tracks roots for.
///
/// Unified with `MAX_NPROCESS` rather than a separately hardcoded cap, so
/// raising the process table's size automatically raises this too.
pub const fn max_tracked_processes() -> usize {
    MAX_NPROCESS
}

/// Fixed virtual address of the per-process syscall slot. Identical across
/// processes: the MMU switch is what makes it resolve to different
/// physical storage per pid.
pub const SYSCALL_SLOT_VA: usize = 0x8020_0000;

/// Fixed virtual address of the `argc`/`argv` region the scheduler loads
/// from on a process's first dispatch.
pub const APPS_ARG_VA: usize = 0x8030_0000;

/// Virtual address the trap dispatcher redirects a killed user process's
/// trap PC to.
pub const EXIT_TRAMPOLINE_VA: usize = 0x8040_0000;

/// Size in bytes of the dedicated kernel stack every trap switches onto
/// before invoking the scheduler or syscall dispatcher.
pub const KERNEL_STACK_SIZE: usize = 16 * 1024;

/// Seed handed to the frame cache's eviction PRNG at boot, used in place of
/// an interactive seed prompt.
pub const BOOT_EVICTION_SEED: u32 = 0x2463_ace1;

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn fixed_regions_do_not_overlap() {
        assert_ne!(SYSCALL_SLOT_VA, APPS_ARG_VA);
        assert_ne!(APPS_ARG_VA, EXIT_TRAMPOLINE_VA);
        assert_ne!(SYSCALL_SLOT_VA, EXIT_TRAMPOLINE_VA);
    }
}
