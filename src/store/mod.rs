// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

//! String key-value storage backends.
//!
//! Values are opaque strings (JSON in practice). The cache layers on top decide
//! what goes in them; the stores only persist and enumerate.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait KvStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;

    fn clear(&self) -> StoreResult<()>;

    fn keys(&self) -> StoreResult<Vec<String>>;
}
