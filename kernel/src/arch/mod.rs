//! Architecture support. This core targets 32-bit RISC-V exclusively; there
//! is no multi-architecture abstraction layer to pick between.
//!
//! [`cause`] and [`context`] hold no inline assembly and no `riscv` crate
//! dependency — pure trap-frame layout and cause-code decoding — so they sit
//! here, outside the `target_arch = "riscv32"` gate, and build and run their
//! unit tests under a plain host `cargo test` regardless of host
//! architecture. Only [`riscv32`] itself, whose `csr` and `trap` modules
//! issue real CSR instructions and a hand-written trap vector, requires an
//! actual riscv32 target.
pub mod cause;
pub mod context;

#[cfg(target_arch = "riscv32")]
pub mod riscv32;
