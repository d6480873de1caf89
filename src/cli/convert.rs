use super::ui;
use crate::core::{Conversion, LookupState, RateLookup};
use anyhow::{Result, anyhow};
use comfy_table::Cell;
use tracing::debug;

/// Converts `amount` and prints both the converted amount and the unit rate.
pub async fn run(lookup: &RateLookup, amount: f64, from: &str, to: &str) -> Result<()> {
    let pb = ui::new_spinner("Converting...");

    // The code list only backs validation, so failing to load it is not fatal.
    lookup.load_currencies(from).await;
    if let LookupState::Failed(e) = lookup.currencies() {
        debug!(error = %e, "Currency list unavailable, skipping code validation");
    }

    lookup.set_amount(amount);
    if lookup.set_codes(from, to).await.is_none() {
        lookup.submit().await;
    }
    pb.finish_and_clear();

    match lookup.state() {
        LookupState::Success(conversion) => {
            display_conversion(&conversion);
            Ok(())
        }
        LookupState::Failed(err) => Err(anyhow!(err).context("Failed to convert currency")),
        LookupState::Idle | LookupState::Loading => Ok(()),
    }
}

pub fn display_conversion(conversion: &Conversion) {
    println!(
        "\n{}",
        ui::style_text(&conversion.summary_line(), ui::StyleType::Highlight)
    );
    println!(
        "{}",
        ui::style_text(&conversion.unit_line(), ui::StyleType::Subtle)
    );
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Last updated: {}",
                conversion.quote.as_of.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            ui::StyleType::Subtle
        )
    );
}

/// Prints the codes convertible from `base`.
pub async fn list_currencies(lookup: &RateLookup, base: &str) -> Result<()> {
    let pb = ui::new_spinner("Loading currencies...");
    lookup.load_currencies(base).await;
    pb.finish_and_clear();

    let list = match lookup.currencies() {
        LookupState::Success(list) => list,
        LookupState::Failed(err) => {
            return Err(anyhow!(err).context("Failed to load currencies"));
        }
        LookupState::Idle | LookupState::Loading => return Ok(()),
    };

    println!(
        "\n{}",
        ui::style_text(
            &format!("{} currencies convertible from {}", list.codes.len(), list.base_code),
            ui::StyleType::Title
        )
    );

    const COLUMNS: usize = 10;
    let mut table = ui::new_styled_table();
    for chunk in list.codes.chunks(COLUMNS) {
        table.add_row(chunk.iter().map(Cell::new).collect::<Vec<_>>());
    }
    println!("{table}");
    println!(
        "{}",
        ui::style_text(
            &format!("Last updated: {}", list.as_of.format("%Y-%m-%d %H:%M:%S UTC")),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
