//! IPC error types.

pub use crate::error::IpcError;

pub type Result<T> = core::result::Result<T, IpcError>;
