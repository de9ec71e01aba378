use std::mem;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use open::that as open_export;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Clear, List, ListItem, ListState, Paragraph, Table, Tabs, Wrap,
};
use ratatui::Frame;
use tracing::{info, warn};

use crate::config::Config;
use crate::export::{
    results_payload, shelf_workbook, write_export, RESULTS_FILE_NAME, SHELF_FILE_NAME,
};
use crate::filter::FilterConfig;
use crate::models::Column;
use crate::session::{FridgePanel, QueryResult, Snapshot};
use crate::summary::GroupBy;

use super::fields::FilterField;
use super::helpers::{
    centered_rect, even_widths, header_row, holding_rows, plural, summary_rows, surface_error,
};
use super::picker::Picker;

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
const HEADER_HEIGHT: u16 = 3;
const SIDEBAR_WIDTH: u16 = 36;
/// Rows moved per PageUp/PageDown.
const PAGE: isize = 10;

/// Top-level views, cycled with Tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Results,
    /// Index into `GroupBy::TABS`.
    Summaries(usize),
    Fridges,
}

impl Screen {
    fn next(self) -> Self {
        match self {
            Screen::Results => Screen::Summaries(0),
            Screen::Summaries(_) => Screen::Fridges,
            Screen::Fridges => Screen::Results,
        }
    }

    fn previous(self) -> Self {
        match self {
            Screen::Results => Screen::Fridges,
            Screen::Summaries(_) => Screen::Results,
            Screen::Fridges => Screen::Summaries(0),
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Screen::Results => "Results",
            Screen::Summaries(_) => "Summaries",
            Screen::Fridges => "Fridges",
        }
    }
}

enum Mode {
    Normal,
    Picking(Picker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportKind {
    ResultsWorkbook,
    ResultsCsv,
    ShelfDetails,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Interactive session state. The snapshot never changes; every filter edit
/// rebuilds `result` and `panel` from it.
pub struct App {
    snapshot: Snapshot,
    config: Config,
    filters: FilterConfig,
    result: QueryResult,
    panel: FridgePanel,
    screen: Screen,
    field: usize,
    scroll: usize,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(snapshot: Snapshot, config: Config) -> Self {
        let filters = FilterConfig::reset();
        let result = snapshot.query(&filters);
        let panel = snapshot.fridge_panel(&filters);
        let mut app = Self {
            snapshot,
            config,
            filters,
            result,
            panel,
            screen: Screen::Results,
            field: 0,
            scroll: 0,
            mode: Mode::Normal,
            status: None,
        };
        let excluded = app.snapshot.excluded_rows();
        if excluded > 0 {
            app.set_status(
                format!("{excluded} source row(s) excluded while loading; see the log for details."),
                StatusKind::Error,
            );
        }
        app
    }

    /// Apply one keypress. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Picking(picker) => self.handle_picker(code, picker),
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Tab => self.switch_screen(self.screen.next()),
            KeyCode::BackTab => self.switch_screen(self.screen.previous()),
            KeyCode::Left => self.move_tab(-1),
            KeyCode::Right => self.move_tab(1),
            KeyCode::Up => self.move_field(-1),
            KeyCode::Down => self.move_field(1),
            KeyCode::PageUp => self.scroll_by(-PAGE),
            KeyCode::PageDown => self.scroll_by(PAGE),
            KeyCode::Home => self.scroll = 0,
            KeyCode::Enter => return Ok(self.open_picker()),
            KeyCode::Char('m') => self.toggle_magnums(),
            KeyCode::Char('r') => {
                self.set_filters(FilterConfig::reset());
                self.set_status("Filters reset.", StatusKind::Info);
            }
            KeyCode::Char('x') => self.run_export(ExportKind::ResultsWorkbook),
            KeyCode::Char('c') => self.run_export(ExportKind::ResultsCsv),
            KeyCode::Char('s') => self.run_export(ExportKind::ShelfDetails),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_picker(&mut self, code: KeyCode, mut picker: Picker) -> Mode {
        match code {
            KeyCode::Esc => {
                self.clear_status();
                return Mode::Normal;
            }
            KeyCode::Up => picker.move_selection(-1),
            KeyCode::Down => picker.move_selection(1),
            KeyCode::PageUp => picker.move_selection(-PAGE),
            KeyCode::PageDown => picker.move_selection(PAGE),
            KeyCode::Backspace => picker.pop_char(),
            KeyCode::Char(ch) => picker.push_char(ch),
            KeyCode::Enter => {
                let Some(item) = picker.current().cloned() else {
                    self.set_status("Nothing matches that search.", StatusKind::Error);
                    return Mode::Picking(picker);
                };
                let next = picker.field.apply(&self.filters, &item.choice);
                self.set_filters(next);
                self.set_status(
                    format!(
                        "{}: {}",
                        picker.field.label(&self.snapshot.options),
                        picker.field.current(&self.filters)
                    ),
                    StatusKind::Info,
                );
                return Mode::Normal;
            }
            _ => {}
        }
        Mode::Picking(picker)
    }

    fn current_field(&self) -> FilterField {
        FilterField::ALL[self.field.min(FilterField::ALL.len() - 1)]
    }

    fn open_picker(&mut self) -> Mode {
        let field = self.current_field();
        if field == FilterField::QuickMagnums {
            self.toggle_magnums();
            return Mode::Normal;
        }
        let items = field.choices(&self.snapshot.options, &self.panel.shelves);
        if items.len() <= 1 {
            self.set_status(
                format!("No values available for {}.", field.label(&self.snapshot.options)),
                StatusKind::Error,
            );
            return Mode::Normal;
        }
        self.clear_status();
        Mode::Picking(Picker::new(field, items, &field.current(&self.filters)))
    }

    fn toggle_magnums(&mut self) {
        let next = FilterConfig {
            quick_magnums: !self.filters.quick_magnums,
            ..self.filters.clone()
        };
        self.set_filters(next);
        let message = if self.filters.quick_magnums {
            "Showing magnums only."
        } else {
            "Showing all formats."
        };
        self.set_status(message, StatusKind::Info);
    }

    /// Replace the filter configuration and rerun the query pass.
    fn set_filters(&mut self, filters: FilterConfig) {
        self.filters = filters;
        self.result = self.snapshot.query(&self.filters);
        self.panel = self.snapshot.fridge_panel(&self.filters);
        self.scroll = 0;
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.scroll = 0;
    }

    fn move_tab(&mut self, offset: isize) {
        if let Screen::Summaries(tab) = self.screen {
            let last = GroupBy::TABS.len() as isize - 1;
            let next = (tab as isize + offset).clamp(0, last) as usize;
            self.switch_screen(Screen::Summaries(next));
        }
    }

    fn move_field(&mut self, offset: isize) {
        let last = FilterField::ALL.len() as isize - 1;
        self.field = (self.field as isize + offset).clamp(0, last) as usize;
    }

    fn content_len(&self) -> usize {
        match self.screen {
            Screen::Results => self.result.rows.len(),
            Screen::Summaries(tab) => self
                .result
                .summary(GroupBy::TABS[tab])
                .map_or(0, |summary| summary.rows.len()),
            Screen::Fridges => self.panel.details.len(),
        }
    }

    fn scroll_by(&mut self, offset: isize) {
        let last = self.content_len().saturating_sub(1) as isize;
        self.scroll = (self.scroll as isize + offset).clamp(0, last.max(0)) as usize;
    }

    fn run_export(&mut self, kind: ExportKind) {
        match self.export(kind) {
            Ok(path) => self.set_status(
                format!("Exported to {}.", path.display()),
                StatusKind::Info,
            ),
            Err(err) => {
                warn!(error = %err, "export failed");
                self.set_status(
                    format!("Export failed: {}", surface_error(&err)),
                    StatusKind::Error,
                );
            }
        }
    }

    fn export(&self, kind: ExportKind) -> Result<PathBuf> {
        let dir = self.config.export_dir();
        let path = match kind {
            ExportKind::ResultsWorkbook => dir.join(RESULTS_FILE_NAME),
            ExportKind::ResultsCsv => dir.join(Path::new(RESULTS_FILE_NAME).with_extension("csv")),
            ExportKind::ShelfDetails => dir.join(SHELF_FILE_NAME),
        };
        let bytes = match kind {
            ExportKind::ResultsWorkbook | ExportKind::ResultsCsv => {
                results_payload(&path, &self.result.rows, &self.result.summaries)
            }
            ExportKind::ShelfDetails => shelf_workbook(&self.panel.details),
        }
        .context("failed to build export")?;
        write_export(&path, &bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), kind = ?kind, "export saved");

        if self.config.open_exports {
            open_export(&path).with_context(|| format!("failed to open {}", path.display()))?;
        }
        Ok(path)
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(chunks[1]);
        self.draw_sidebar(frame, body[0]);
        match self.screen {
            Screen::Results => self.draw_results(frame, body[1]),
            Screen::Summaries(tab) => self.draw_summaries(frame, body[1], tab),
            Screen::Fridges => self.draw_fridges(frame, body[1]),
        }

        self.draw_footer(frame, chunks[2]);

        if let Mode::Picking(picker) = &self.mode {
            self.draw_picker(frame, area, picker);
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let titles = [Screen::Results, Screen::Summaries(0), Screen::Fridges];
        let selected = titles
            .iter()
            .position(|screen| screen.title() == self.screen.title())
            .unwrap_or(0);
        let tabs = Tabs::new(titles.iter().map(|screen| screen.title()))
            .select(selected)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Cellar Explorer | {}", self.snapshot.source)),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_sidebar(&self, frame: &mut Frame, area: Rect) {
        let options = &self.snapshot.options;
        let items: Vec<ListItem> = FilterField::ALL
            .iter()
            .map(|field| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{}: ", field.label(options)),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::raw(field.current(&self.filters)),
                ]))
            })
            .collect();

        let title = match self.filters.active_predicates() {
            0 => "Filters".to_string(),
            active => format!("Filters ({active} active)"),
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(Some(self.field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_results(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            "Results ({}, {})",
            plural(self.result.record_count() as u64, "record"),
            plural(self.result.bottles, "bottle")
        );
        let block = Block::default().borders(Borders::ALL).title(title);
        if self.result.rows.is_empty() {
            draw_empty(frame, area, block, "No bottles match the current filters.");
            return;
        }

        let start = self.scroll.min(self.result.rows.len() - 1);
        let table = Table::new(
            holding_rows(&self.result.rows[start..], &Column::ALL),
            even_widths(Column::ALL.len()),
        )
        .header(header_row(
            Column::ALL.iter().map(|column| column.header().to_string()),
        ))
        .block(block);
        frame.render_widget(table, area);
    }

    fn draw_summaries(&self, frame: &mut Frame, area: Rect, tab: usize) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let tabs = Tabs::new(GroupBy::TABS.iter().map(|group_by| group_by.title()))
            .select(tab)
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(tabs, chunks[0]);

        let group_by = GroupBy::TABS[tab];
        let Some(summary) = self.result.summary(group_by) else {
            return;
        };
        let block = Block::default().borders(Borders::ALL).title(format!(
            "{} ({})",
            group_by.title(),
            plural(summary.total(), "bottle")
        ));
        if summary.is_empty() {
            draw_empty(frame, chunks[1], block, "Nothing to summarize.");
            return;
        }

        let rows = summary_rows(summary);
        let start = self.scroll.min(rows.len() - 1);
        let headers = summary_headers(group_by);
        let table = Table::new(rows.into_iter().skip(start), even_widths(headers.len()))
            .header(header_row(headers))
            .block(block);
        frame.render_widget(table, chunks[1]);
    }

    fn draw_fridges(&self, frame: &mut Frame, area: Rect) {
        if self.panel.fridges.is_empty() {
            let block = Block::default().borders(Borders::ALL).title("Fridges");
            draw_empty(frame, area, block, "No fridge locations in this cellar.");
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        let fridge = FilterField::Fridge.current(&self.filters);
        let shelf_block = Block::default().borders(Borders::ALL).title(format!(
            "{} by shelf ({})",
            if self.filters.selected_fridge.is_any() {
                "All fridges".to_string()
            } else {
                fridge
            },
            plural(self.panel.fridge_bottles, "bottle")
        ));
        if self.panel.summary.is_empty() {
            draw_empty(frame, chunks[0], shelf_block, "No fridge bottles match the filters.");
        } else {
            let headers = summary_headers(GroupBy::LocationShelf);
            let table = Table::new(summary_rows(&self.panel.summary), even_widths(headers.len()))
                .header(header_row(headers))
                .block(shelf_block);
            frame.render_widget(table, chunks[0]);
        }

        let detail_block = Block::default().borders(Borders::ALL).title(format!(
            "Shelf {} details ({})",
            FilterField::Shelf.current(&self.filters),
            plural(self.panel.shown_bottles, "bottle")
        ));
        if self.panel.details.is_empty() {
            draw_empty(frame, chunks[1], detail_block, "No bottles on this shelf.");
            return;
        }
        let start = self.scroll.min(self.panel.details.len() - 1);
        let table = Table::new(
            holding_rows(&self.panel.details[start..], &Column::SHELF_DETAIL),
            even_widths(Column::SHELF_DETAIL.len()),
        )
        .header(header_row(
            Column::SHELF_DETAIL
                .iter()
                .map(|column| column.header().to_string()),
        ))
        .block(detail_block);
        frame.render_widget(table, chunks[1]);
    }

    fn draw_picker(&self, frame: &mut Frame, area: Rect, picker: &Picker) {
        let popup_area = centered_rect(50, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Choose {}", picker.field.label(&self.snapshot.options)))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);
        let search = Paragraph::new(format!("Search: {}", picker.query));
        frame.render_widget(search, chunks[0]);
        frame.set_cursor_position((
            chunks[0].x + "Search: ".len() as u16 + picker.query.chars().count() as u16,
            chunks[0].y,
        ));

        let items: Vec<ListItem> = picker
            .visible_items()
            .map(|item| ListItem::new(item.label.clone()))
            .collect();
        let list = List::new(items)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if picker.len() > 0 {
            state.select(Some(picker.selected));
        }
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let pairs: Vec<(&str, &str)> = match &self.mode {
            Mode::Picking(_) => vec![
                ("[↑↓]", " Navigate   "),
                ("[Type]", " Search   "),
                ("[Enter]", " Select   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::Normal => vec![
                ("[↑↓]", " Filter   "),
                ("[Enter]", " Change   "),
                ("[m]", " Magnums   "),
                ("[r]", " Reset   "),
                ("[Tab]", " View   "),
                ("[PgUp/PgDn]", " Scroll   "),
                ("[x/c/s]", " Export xlsx/csv/shelf   "),
                ("[q]", " Quit"),
            ],
        };
        let mut spans = Vec::with_capacity(pairs.len() * 2);
        for (key, action) in &pairs {
            spans.push(Span::styled(key.to_string(), key_style));
            spans.push(Span::raw(action.to_string()));
        }
        if let (Mode::Normal, Screen::Summaries(_)) = (&self.mode, self.screen) {
            spans.push(Span::styled("   [←→]".to_string(), key_style));
            spans.push(Span::raw(" Tab".to_string()));
        }
        Line::from(spans)
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

fn summary_headers(group_by: GroupBy) -> Vec<String> {
    group_by
        .key_headers()
        .iter()
        .map(|header| header.to_string())
        .chain(std::iter::once("Bottles".to_string()))
        .collect()
}

fn draw_empty(frame: &mut Frame, area: Rect, block: Block<'_>, message: &str) {
    let paragraph = Paragraph::new(message.to_string())
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
