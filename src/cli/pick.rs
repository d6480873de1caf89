//! Interactive ticker picker on stdin.
//!
//! Every input line is treated as an edit of the query. `:N` picks the N-th
//! candidate and shows its price history, an empty line closes the list,
//! `:f` re-opens it and `:q` quits.

use super::{search, series, ui};
use crate::core::{
    LookupState, PickerOptions, SeriesLookup, SeriesRange, SymbolPicker, SymbolSearchProvider,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, PartialEq, Eq)]
enum PickerInput {
    Edit(String),
    Select(usize),
    Dismiss,
    Focus,
    Quit,
}

fn parse_input(line: &str) -> PickerInput {
    let line = line.trim();
    match line {
        "" => PickerInput::Dismiss,
        ":q" => PickerInput::Quit,
        ":f" => PickerInput::Focus,
        _ => match line.strip_prefix(':').map(|n| n.parse::<usize>()) {
            Some(Ok(n)) if n > 0 => PickerInput::Select(n - 1),
            _ => PickerInput::Edit(line.to_string()),
        },
    }
}

pub async fn run(
    search_provider: Arc<dyn SymbolSearchProvider>,
    options: PickerOptions,
    lookup: &SeriesLookup,
    range: SeriesRange,
) -> Result<()> {
    let (selected_tx, mut selected_rx) = mpsc::unbounded_channel();
    let picker = SymbolPicker::new(search_provider, options, move |candidate| {
        // The receiver only goes away when the loop below has ended.
        let _ = selected_tx.send(candidate.identifier.clone());
    });

    let mut watcher = picker.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(state) = watcher.changed().await {
            // Closing the list needs no output; reopening shows it again.
            match state {
                LookupState::Success(list) if list.open => {
                    search::display_candidates(&list.items)
                }
                _ => {}
            }
        }
    });

    println!(
        "{}",
        ui::style_text(
            "Type a symbol to search. :N picks a match, empty line closes the list, :f reopens it, :q quits.",
            ui::StyleType::Subtle
        )
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match parse_input(&line) {
                    PickerInput::Quit => break,
                    PickerInput::Dismiss => picker.dismiss(),
                    PickerInput::Focus => picker.focus().await,
                    PickerInput::Edit(text) => picker.edit(&text),
                    PickerInput::Select(index) => {
                        if picker.select(index).is_none() {
                            println!("{}", ui::style_text("Nothing to select.", ui::StyleType::Subtle));
                        }
                    }
                }
            }
            Some(symbol) = selected_rx.recv() => {
                debug!(%symbol, "Selection committed");
                if let Err(e) = series::run(lookup, &symbol, range, false).await {
                    println!("{}", ui::style_text(&format!("Error: {e:#}"), ui::StyleType::Error));
                }
                ui::print_separator();
            }
        }
    }

    drop(picker);
    printer.abort();
    Ok(())
}
