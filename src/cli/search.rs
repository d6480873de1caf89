use super::ui;
use crate::core::{SearchCandidate, SymbolSearchProvider};
use anyhow::Result;
use comfy_table::Cell;
use tracing::warn;

/// Runs a single search. Search is advisory, so failures print as "no matches".
pub async fn run(provider: &dyn SymbolSearchProvider, query: &str, limit: usize) -> Result<()> {
    let query = query.trim().to_uppercase();
    let pb = ui::new_spinner("Searching...");
    let found = provider.search(&query, limit).await.unwrap_or_else(|e| {
        warn!(error = %e, %query, "Search failed");
        Vec::new()
    });
    pb.finish_and_clear();

    display_candidates(&found);
    Ok(())
}

pub fn display_candidates(candidates: &[SearchCandidate]) {
    if candidates.is_empty() {
        println!("{}", ui::style_text("No matches found.", ui::StyleType::Subtle));
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
    ]);
    for (i, candidate) in candidates.iter().enumerate() {
        table.add_row(vec![
            ui::number_cell((i + 1).to_string()),
            Cell::new(&candidate.identifier),
            Cell::new(&candidate.display_name),
        ]);
    }
    println!("{table}");
}
