// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::CommandContext;
use anyhow::Result;

pub enum CacheCommand {
    List,
    Clear,
}

impl CacheCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        match self {
            Self::List => {
                let keys = context.cache.keys()?;
                if keys.is_empty() {
                    println!("Cache is empty");
                }
                for key in keys {
                    println!("{}", key);
                }
            }
            Self::Clear => {
                eprintln!("Clearing cache...");
                if let Err(e) = context.cache.clear() {
                    eprintln!("Warning: Failed to clear cache: {}", e);
                } else {
                    println!("Cache cleared");
                }
            }
        }

        Ok(())
    }
}
