//! Save/load persistence
//!
//! Features:
//! - Versioned JSON record, merged over defaults on load
//! - Field-wise recovery from partially corrupt records
//! - Debounced writes with a synchronous flush for teardown
//! - Pluggable storage backends (memory, file, LocalStorage)

pub mod save_data;
pub mod storage;
pub mod store;

pub use save_data::{SAVE_VERSION, SaveData};
pub use storage::{MemoryStorage, StorageBackend};
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
pub use store::{SAVE_DEBOUNCE_MS, SaveStore};
