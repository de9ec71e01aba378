use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Cell, Row};

use crate::models::{Column, Holding};
use crate::summary::Summary;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for the picker popup.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Root cause of a chained error, for the footer.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

pub(crate) fn header_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub(crate) fn header_row(headers: impl IntoIterator<Item = String>) -> Row<'static> {
    Row::new(headers.into_iter().map(Cell::from)).style(header_style())
}

/// One table row per holding, rendered through `columns`.
pub(crate) fn holding_rows(holdings: &[Holding], columns: &[Column]) -> Vec<Row<'static>> {
    holdings
        .iter()
        .map(|holding| {
            Row::new(
                columns
                    .iter()
                    .map(|column| Cell::from(column.value(holding).to_string())),
            )
        })
        .collect()
}

/// Summary rows with the bottle count in the last column.
pub(crate) fn summary_rows(summary: &Summary) -> Vec<Row<'static>> {
    summary
        .rows
        .iter()
        .map(|row| {
            let mut cells = row.key.parts();
            cells.push(row.bottles.to_string());
            Row::new(cells.into_iter().map(Cell::from))
        })
        .collect()
}

/// Equal-share column widths for a table of `count` columns.
pub(crate) fn even_widths(count: usize) -> Vec<Constraint> {
    let count = count.max(1) as u32;
    vec![Constraint::Ratio(1, count); count as usize]
}

pub(crate) fn plural(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn surface_error_reports_the_root_cause() {
        let err = Err::<(), _>(std::io::Error::other("disk full"))
            .context("failed to write export")
            .unwrap_err();
        assert_eq!(surface_error(&err), "disk full");
    }

    #[test]
    fn plural_handles_one() {
        assert_eq!(plural(1, "bottle"), "1 bottle");
        assert_eq!(plural(0, "bottle"), "0 bottles");
        assert_eq!(plural(12, "record"), "12 records");
    }

    #[test]
    fn centered_rect_stays_inside_the_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(60, 50, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 10);
    }
}
