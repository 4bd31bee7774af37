#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod rocks;
pub(crate) mod rules;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStorage;
pub use rocks::RocksStorage;
pub use traits::*;
