// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod hydrate;
pub mod media;
pub mod player;
pub mod rows;
pub mod store;
pub mod tmdb;
pub mod watchmode;

pub use cache::{CacheCategory, TtlCache};
pub use config::Config;
pub use error::{ApiError, StoreError};
pub use hydrate::{IdHydrator, IdMappingStore};
pub use media::MediaKind;
pub use player::SessionManager;
pub use tmdb::TmdbClient;
pub use watchmode::WatchmodeClient;
