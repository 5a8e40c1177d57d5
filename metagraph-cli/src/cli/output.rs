// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Rendering of materialized responses for the terminal

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use metagraph::cache::IdentityCacheMetric;
use metagraph::{IdentityCache, MetaResponse, MetaValue};

use super::commands::OutputFormat;

/// Formats a `MetaResponse` as a table, JSON or CSV
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn format(response: &MetaResponse, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(response),
            OutputFormat::Json => Self::format_json(response),
            OutputFormat::Csv => Self::format_csv(response),
        }
    }

    fn width(response: &MetaResponse) -> usize {
        response.contents.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn header(width: usize) -> Vec<String> {
        (1..=width).map(|i| format!("value_{}", i)).collect()
    }

    fn format_table(response: &MetaResponse) -> String {
        if response.is_empty() {
            return "No results".to_string();
        }

        let width = Self::width(response);
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(Self::header(width));

        for row in &response.contents {
            let mut cells: Vec<String> = row.iter().map(MetaValue::to_string).collect();
            cells.resize(width, String::new());
            table.add_row(cells);
        }

        let mut output = table.to_string();
        let noun = if response.len() == 1 { "row" } else { "rows" };
        output.push_str(&format!("\n{} {}", response.len(), noun));
        if !response.description.is_empty() {
            output.push_str(&format!("\n{}", response.description));
        }
        output
    }

    fn format_json(response: &MetaResponse) -> String {
        serde_json::to_string_pretty(response)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    fn format_csv(response: &MetaResponse) -> String {
        let width = Self::width(response);
        let mut lines = vec![Self::header(width).join(",")];
        for row in &response.contents {
            let cells: Vec<String> = row
                .iter()
                .map(|value| csv_field(&value.to_string()))
                .collect();
            lines.push(cells.join(","));
        }
        lines.join("\n")
    }
}

/// Summary of the identity cache for the console `stats` command
pub fn format_cache_stats(cache: &IdentityCache) -> String {
    let stats = cache.stats();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        "entries".to_string(),
        format!("{} / {}", cache.entry_count(), cache.max_entries()),
    ]);
    table.add_row(vec!["ttl".to_string(), format!("{}s", cache.ttl().as_secs())]);
    for (name, metric) in [
        ("hits", IdentityCacheMetric::Hits),
        ("misses", IdentityCacheMetric::Misses),
        ("inserts", IdentityCacheMetric::Inserts),
        ("invalidations", IdentityCacheMetric::Invalidations),
    ] {
        table.add_row(vec![name.to_string(), stats.load(metric).to_string()]);
    }
    table.add_row(vec![
        "hit rate".to_string(),
        format!("{:.1}%", stats.hit_rate() * 100.0),
    ]);
    table.to_string()
}

/// Quote a CSV field when it contains a separator, quote or line break
fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
