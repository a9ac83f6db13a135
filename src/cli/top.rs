// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_json, spinner};
use anyhow::Result;
use reelcache::media::MediaKind;

pub struct TopCommand {
    pub source_ids: Vec<u32>,
    pub kind: Option<MediaKind>,
    pub format: OutputFormat,
}

impl TopCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        if !context.watchmode.is_enabled() {
            anyhow::bail!("Watch-provider API key is not configured");
        }

        let pb = spinner("Loading top titles...");
        let titles = context
            .watchmode
            .top_content(&self.source_ids, self.kind)
            .await;
        pb.finish_and_clear();

        let Some(titles) = titles else {
            anyhow::bail!("Failed to load top titles, see log for details");
        };

        match self.format {
            OutputFormat::Json => print_json(&titles)?,
            OutputFormat::Text => {
                if titles.is_empty() {
                    println!("No titles found");
                }
                for (rank, title) in titles.iter().enumerate() {
                    let year = title
                        .item
                        .year
                        .map(|y| y.to_string())
                        .unwrap_or_else(|| "----".to_string());
                    println!(
                        "  {:>2}. {:<5} {:>8}  {}  {}",
                        rank + 1,
                        title.media_type.as_str(),
                        title.tmdb_id,
                        year,
                        title.item.title
                    );
                }
            }
        }
        Ok(())
    }
}
