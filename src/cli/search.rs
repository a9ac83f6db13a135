// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat, print_json, print_summary, spinner};
use anyhow::Result;
use reelcache::tmdb::only_titles;

pub struct SearchCommand {
    pub query: String,
    pub page: u32,
    pub format: OutputFormat,
}

impl SearchCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let pb = spinner(&format!("Searching for '{}'...", self.query));
        let results = context.tmdb.search_multi(&self.query, self.page).await;
        pb.finish_and_clear();

        // People come back from the multi endpoint too.
        let results = only_titles(results?);

        match self.format {
            OutputFormat::Json => print_json(&results)?,
            OutputFormat::Text => {
                if results.is_empty() {
                    println!("No results found for '{}'", self.query);
                } else {
                    println!("Found {} result(s) for '{}':", results.len(), self.query);
                    for item in &results {
                        print_summary(item);
                    }
                }
            }
        }

        Ok(())
    }
}
