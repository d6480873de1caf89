use super::{chart, ui};
use crate::core::{LookupState, SeriesLookup, SeriesRange, SeriesView};
use anyhow::{Result, anyhow};
use comfy_table::Cell;

const CHART_HEIGHT: u16 = 14;

/// Looks up `symbol` over `range` and prints the summary and chart.
pub async fn run(
    lookup: &SeriesLookup,
    symbol: &str,
    range: SeriesRange,
    show_bars: bool,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching stock data...");
    lookup.request(symbol, range).await;
    pb.finish_and_clear();

    match lookup.state() {
        LookupState::Success(view) => {
            display_view(&view);
            if show_bars {
                display_bars(&view);
            }
            Ok(())
        }
        LookupState::Failed(err) => Err(anyhow!(err).context(format!(
            "Failed to fetch stock data for {}",
            symbol.trim().to_uppercase()
        ))),
        LookupState::Idle | LookupState::Loading => Ok(()),
    }
}

pub fn display_view(view: &SeriesView) {
    let summary = &view.summary;
    let latest = &summary.latest;

    let heading = match &view.identity.display_name {
        Some(name) => format!("{} · {}", view.symbol, name),
        None => format!("[{}] {}", view.identity.placeholder, view.symbol),
    };
    println!("\n{}", ui::style_text(&heading, ui::StyleType::Title));
    if let Some(logo) = &view.identity.logo_url {
        println!("{}", ui::style_text(logo, ui::StyleType::Subtle));
    }
    println!(
        "{}",
        ui::style_text(
            &format!("{} · {}", latest.date, view.range),
            ui::StyleType::Subtle
        )
    );

    let change = format!(
        "{} ({}%)",
        ui::signed(&summary.change_abs_display(), summary.change_abs),
        ui::signed(&summary.change_pct_display(), summary.change_pct)
    );
    println!(
        "{}  {}",
        ui::style_text(&format!("${:.2}", latest.close), ui::StyleType::Highlight),
        ui::style_change(&change, summary.change_abs)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Open"),
        ui::header_cell("High"),
        ui::header_cell("Low"),
        ui::header_cell("Volume"),
    ]);
    table.add_row(vec![
        ui::number_cell(format!("${:.2}", latest.open)),
        ui::number_cell(format!("${:.2}", latest.high)),
        ui::number_cell(format!("${:.2}", latest.low)),
        ui::number_cell(ui::group_thousands(latest.volume)),
    ]);
    println!("{table}");

    let points: Vec<_> = view.bars.iter().map(|bar| (bar.date, bar.close)).collect();
    let title = format!("{} closing price, {}", view.symbol, view.range);
    println!();
    for line in chart::render_line_chart(&title, &points, ui::chart_width(), CHART_HEIGHT) {
        println!("{line}");
    }
}

/// Lists every bar, newest first.
pub fn display_bars(view: &SeriesView) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Open"),
        ui::header_cell("High"),
        ui::header_cell("Low"),
        ui::header_cell("Close"),
        ui::header_cell("Volume"),
    ]);
    for bar in view.bars.iter().rev() {
        table.add_row(vec![
            Cell::new(bar.date.to_string()),
            ui::number_cell(format!("{:.2}", bar.open)),
            ui::number_cell(format!("{:.2}", bar.high)),
            ui::number_cell(format!("{:.2}", bar.low)),
            ui::number_cell(format!("{:.2}", bar.close)),
            ui::number_cell(ui::group_thousands(bar.volume)),
        ]);
    }
    println!("{table}");
}
