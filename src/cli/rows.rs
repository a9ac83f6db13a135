// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_json, print_summary, spinner};
use anyhow::Result;
use chrono::Datelike;
use reelcache::media;
use reelcache::rows::{BannerCategory, Page, catalog, load_banner, load_rows, rows_for_page};
use tracing::warn;

const ITEMS_PER_ROW: usize = 5;

pub struct RowsCommand {
    pub page: Page,
    pub format: OutputFormat,
}

impl RowsCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let today = media::today();
        let year = chrono::Utc::now().year();
        let rows = rows_for_page(catalog(year), self.page);

        let pb = spinner(&format!("Loading {} rows...", rows.len()));
        let banner = if self.page == Page::Home {
            match load_banner(&context.tmdb, BannerCategory::TrendingInIndia).await {
                Ok(slides) => slides,
                Err(e) => {
                    warn!("Banner failed to load: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        let loaded = load_rows(&context.tmdb, context.store(), &rows, &today).await;
        pb.finish_and_clear();

        match self.format {
            OutputFormat::Json => print_json(&serde_json::json!({
                "banner": banner,
                "rows": loaded,
            }))?,
            OutputFormat::Text => {
                if !banner.is_empty() {
                    println!("Featured:");
                    for slide in &banner {
                        println!("  [{}] {}", slide.kind, slide.item.display_title());
                    }
                }
                for row in loaded.iter().filter(|r| !r.items.is_empty()) {
                    println!("\n{} ({})", row.title, row.items.len());
                    for item in row.items.iter().take(ITEMS_PER_ROW) {
                        print_summary(item);
                    }
                }
            }
        }
        Ok(())
    }
}
