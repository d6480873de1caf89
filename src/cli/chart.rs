//! Line chart of closing prices, drawn with ratatui into an off-screen buffer
//! and printed as plain text rows.

use chrono::NaiveDate;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Widget};

const EMPTY_MESSAGE: &str = "No chart data available";
const DATE_FORMAT: &str = "%b %d";

/// Renders `points` (ascending by date) into a `width` x `height` chart with
/// the price range on the y axis and first, middle and last dates below.
pub fn render_line_chart(
    title: &str,
    points: &[(NaiveDate, f64)],
    width: u16,
    height: u16,
) -> Vec<String> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return vec![EMPTY_MESSAGE.to_string()];
    };
    if width == 0 || height == 0 {
        return vec![EMPTY_MESSAGE.to_string()];
    }

    // Trading days sit side by side, so plot by position rather than date.
    let data: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, close))| (i as f64, *close))
        .collect();
    let (low, high) = price_bounds(points);
    let middle = points[points.len() / 2].0;
    let x_max = (points.len() - 1).max(1) as f64;

    // A line needs two points; a lone close is drawn as a dot.
    let graph_type = if data.len() > 1 {
        GraphType::Line
    } else {
        GraphType::Scatter
    };
    let dataset = Dataset::default()
        .marker(Marker::Braille)
        .graph_type(graph_type)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {title} ")),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::raw(first.0.format(DATE_FORMAT).to_string()),
                    Span::raw(middle.format(DATE_FORMAT).to_string()),
                    Span::raw(last.0.format(DATE_FORMAT).to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([low, high])
                .labels(vec![
                    Span::raw(format!("{low:.2}")),
                    Span::raw(format!("{:.2}", (low + high) / 2.0)),
                    Span::raw(format!("{high:.2}")),
                ]),
        );

    let area = Rect::new(0, 0, width, height);
    let mut buffer = Buffer::empty(area);
    chart.render(area, &mut buffer);
    rows(&buffer)
}

/// Lowest and highest close. A flat series is padded so it has a range to draw in.
fn price_bounds(points: &[(NaiveDate, f64)]) -> (f64, f64) {
    let (low, high) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });
    if high > low {
        (low, high)
    } else {
        let pad = (high.abs() * 0.05).max(0.01);
        (low - pad, high + pad)
    }
}

fn rows(buffer: &Buffer) -> Vec<String> {
    let width = usize::from(buffer.area.width);
    buffer
        .content
        .chunks(width)
        .map(|row| {
            row.iter()
                .map(|cell| cell.symbol())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}
