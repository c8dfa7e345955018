use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    DefaultTerminal, Frame,
};

use crate::error::Result;
use crate::fmt;
use crate::models::TimeEntry;
use crate::tui::{self, FOOTER_STYLE, HEADER_STYLE, MUTED_STYLE, SELECTED_STYLE};

const PAGE_SIZE: usize = 20;

enum BrowseMode {
    Normal,
    GotoPage(String),
    GotoDate(String),
}

pub enum BrowseAction {
    Continue,
    Close,
}

/// Scrollable, read-only list of time entries with a detail line for the
/// selected row.
pub struct EntryBrowser {
    rows: Vec<TimeEntry>,
    /// Matches before the row limit was applied.
    total: usize,
    total_hours: f64,
    filters_desc: String,
    offset: usize,
    visible_count: usize,
    selected: usize,
    mode: BrowseMode,
    status_message: Option<String>,
    table_state: TableState,
}

impl EntryBrowser {
    pub fn new(rows: Vec<TimeEntry>, total: usize, filters_desc: String) -> Self {
        let total_hours = rows.iter().map(|e| e.hours).sum();
        Self {
            rows,
            total,
            total_hours,
            filters_desc,
            offset: 0,
            visible_count: PAGE_SIZE,
            selected: 0,
            mode: BrowseMode::Normal,
            status_message: None,
            table_state: TableState::default(),
        }
    }

    pub fn selected_entry(&self) -> Option<&TimeEntry> {
        self.rows.get(self.offset + self.selected)
    }

    /// True while a prompt is collecting typed input.
    pub fn is_prompting(&self) -> bool {
        !matches!(self.mode, BrowseMode::Normal)
    }

    pub fn run(&mut self) -> Result<()> {
        if self.rows.is_empty() {
            println!("No time entries found.");
            return Ok(());
        }

        let hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            ratatui::restore();
            hook(info);
        }));

        let mut terminal = ratatui::init();
        let result = self.event_loop(&mut terminal);
        ratatui::restore();
        result
    }

    /// Draw the browser over the whole frame.
    pub fn draw_frame(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.draw_in(frame, area);
    }

    /// Draw the browser into `area`. Callable from an external event loop.
    pub fn draw_in(&mut self, frame: &mut Frame, area: Rect) {
        let narrow = area.width < 110;

        let [title_area, table_area, detail_area, status_area, keys_area] = Layout::vertical([
            Constraint::Length(1), // title
            Constraint::Fill(1),   // table
            Constraint::Length(2), // detail
            Constraint::Length(1), // status
            Constraint::Length(1), // keys
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new("Time Entries").style(HEADER_STYLE),
            title_area,
        );

        if self.rows.is_empty() {
            frame.render_widget(
                Paragraph::new("  No time entries match the current filters.").style(FOOTER_STYLE),
                table_area,
            );
        } else {
            self.draw_table(frame, table_area, narrow);
        }

        // Detail for the selected row
        let detail: Vec<Line> = match self.selected_entry() {
            Some(e) => vec![
                Line::from(vec![
                    Span::styled("Notes: ", MUTED_STYLE),
                    Span::raw(e.notes.clone()),
                ]),
                Line::from(vec![
                    Span::styled("Reason: ", MUTED_STYLE),
                    Span::raw(e.classification_reason.clone()),
                ]),
            ],
            None => Vec::new(),
        };
        frame.render_widget(Paragraph::new(detail), detail_area);

        frame.render_widget(
            Paragraph::new(self.status_line()).style(FOOTER_STYLE),
            status_area,
        );

        let keys_widget = match &self.mode {
            BrowseMode::Normal => Paragraph::new(
                "\u{2191}/\u{2193}:select  n/\u{2192}:next  p/\u{2190}:prev  g:page  d:date  q:quit",
            )
            .style(FOOTER_STYLE),
            BrowseMode::GotoPage(input) => Paragraph::new(format!("Go to page: {input}\u{2588}")),
            BrowseMode::GotoDate(input) => {
                Paragraph::new(format!("Jump to date (YYYY-MM-DD): {input}\u{2588}"))
            }
        };
        frame.render_widget(keys_widget, keys_area);
    }

    fn draw_table(&mut self, frame: &mut Frame, table_area: Rect, narrow: bool) {
        // Notes column width from fixed columns + spacing
        let (fixed_cols, num_cols): (u16, u16) = if narrow {
            (10 + 8 + 22, 4)
        } else {
            (10 + 8 + 22 + 24 + 24, 6)
        };
        let spacing = num_cols - 1;
        let notes_width = (table_area.width.saturating_sub(fixed_cols + spacing) as usize).max(10);

        // header row + bottom_margin
        let header_overhead = 2u16;
        let available_height = table_area.height.saturating_sub(header_overhead) as usize;
        let mut rendered_rows = Vec::new();
        let mut total_height = 0usize;
        let mut vis = 0usize;

        for e in self.rows.iter().skip(self.offset) {
            let (wrapped_notes, line_count) = tui::wrap_text(&e.notes, notes_width);
            let h = line_count as usize;
            if total_height + h > available_height && vis > 0 {
                break;
            }

            let mut cells = vec![
                Cell::from(e.local_date.clone()),
                Cell::from(tui::hours_span(e.hours)),
                Cell::from(e.classification.clone()),
            ];
            if !narrow {
                cells.push(Cell::from(e.employee()));
                cells.push(Cell::from(e.service_item.clone()));
            }
            cells.push(Cell::from(wrapped_notes));

            rendered_rows.push(Row::new(cells).height(line_count));
            total_height += h;
            vis += 1;
        }

        self.visible_count = vis.max(1);
        self.selected = self.selected.min(self.visible_count - 1);

        let mut widths = vec![
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(22),
        ];
        let mut header_cells = vec!["Date", "Hours", "Classification"];
        if !narrow {
            widths.push(Constraint::Length(24));
            widths.push(Constraint::Length(24));
            header_cells.push("Employee");
            header_cells.push("Service Item");
        }
        widths.push(Constraint::Fill(1));
        header_cells.push("Notes");

        self.table_state.select(Some(self.selected));
        let table = Table::new(rendered_rows, widths)
            .header(Row::new(header_cells).style(HEADER_STYLE).bottom_margin(1))
            .column_spacing(1)
            .row_highlight_style(SELECTED_STYLE);

        frame.render_stateful_widget(table, table_area, &mut self.table_state);
    }

    fn status_line(&self) -> String {
        let end_row = (self.offset + self.visible_count).min(self.rows.len());
        let start_row = if self.rows.is_empty() { 0 } else { self.offset + 1 };
        let shown = if self.total > self.rows.len() {
            format!("{} (of {} matches)", fmt::number(self.rows.len()), fmt::number(self.total))
        } else {
            fmt::number(self.rows.len())
        };
        let filters = if self.filters_desc.is_empty() {
            String::new()
        } else {
            format!(" | {}", self.filters_desc)
        };
        let mut status = format!(
            "Rows {start_row}-{end_row} of {shown} | Hours: {}{filters}",
            fmt::hours(self.total_hours),
        );
        if let Some(msg) = &self.status_message {
            status.push_str(&format!(" | {msg}"));
        }
        status
    }

    /// Handle a key event. Returns a BrowseAction indicating what the caller should do.
    pub fn handle_key_event(&mut self, code: KeyCode) -> BrowseAction {
        self.status_message = None;

        match &self.mode {
            BrowseMode::Normal => match code {
                KeyCode::Char('q') | KeyCode::Esc => return BrowseAction::Close,
                KeyCode::Down => {
                    let on_screen = self.visible_count.min(self.rows.len().saturating_sub(self.offset));
                    if self.selected + 1 < on_screen {
                        self.selected += 1;
                    } else if self.offset + self.visible_count < self.rows.len() {
                        self.offset += 1;
                    }
                }
                KeyCode::Up => {
                    if self.selected > 0 {
                        self.selected -= 1;
                    } else if self.offset > 0 {
                        self.offset -= 1;
                    }
                }
                KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
                    self.scroll_down();
                    self.selected = 0;
                }
                KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
                    self.scroll_up();
                    self.selected = 0;
                }
                KeyCode::Home => {
                    self.offset = 0;
                    self.selected = 0;
                }
                KeyCode::End => {
                    self.scroll_to_end();
                    self.selected = 0;
                }
                KeyCode::Char('g') => self.mode = BrowseMode::GotoPage(String::new()),
                KeyCode::Char('d') => self.mode = BrowseMode::GotoDate(String::new()),
                _ => {}
            },
            BrowseMode::GotoPage(_) | BrowseMode::GotoDate(_) => match code {
                KeyCode::Esc => self.mode = BrowseMode::Normal,
                KeyCode::Enter => self.submit_input(),
                KeyCode::Backspace => self.input_backspace(),
                KeyCode::Char(c) => self.input_push(c),
                _ => {}
            },
        }
        BrowseAction::Continue
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw_frame(frame))?;

            if let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read()?
            {
                if kind != KeyEventKind::Press {
                    continue;
                }

                if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
                    break;
                }

                match self.handle_key_event(code) {
                    BrowseAction::Close => break,
                    BrowseAction::Continue => {}
                }
            }
        }
        Ok(())
    }

    fn scroll_down(&mut self) {
        let new_offset = self.offset + self.visible_count;
        if new_offset < self.rows.len() {
            self.offset = new_offset;
        }
    }

    fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(self.visible_count);
    }

    fn scroll_to_end(&mut self) {
        self.offset = self.rows.len().saturating_sub(self.visible_count);
    }

    fn input_push(&mut self, c: char) {
        match &mut self.mode {
            BrowseMode::GotoPage(s) | BrowseMode::GotoDate(s) => s.push(c),
            BrowseMode::Normal => {}
        }
    }

    fn input_backspace(&mut self) {
        match &mut self.mode {
            BrowseMode::GotoPage(s) | BrowseMode::GotoDate(s) => {
                s.pop();
            }
            BrowseMode::Normal => {}
        }
    }

    fn submit_input(&mut self) {
        let mode = std::mem::replace(&mut self.mode, BrowseMode::Normal);
        match &mode {
            BrowseMode::GotoPage(input) => {
                if let Ok(page) = input.trim().parse::<usize>() {
                    if page >= 1 {
                        let target = (page - 1).saturating_mul(self.visible_count);
                        self.offset = target.min(self.rows.len().saturating_sub(1));
                        self.selected = 0;
                    }
                }
            }
            BrowseMode::GotoDate(input) => {
                let target = input.trim();
                match NaiveDate::parse_from_str(target, "%Y-%m-%d") {
                    Ok(date) => {
                        if let Some(idx) = self.rows.iter().position(|r| r.parsed_date == Some(date)) {
                            self.offset = idx;
                            self.selected = 0;
                        } else {
                            self.status_message = Some(format!("No entries on {target}"));
                        }
                    }
                    Err(_) => {
                        self.status_message = Some(format!("Invalid date: {target}"));
                    }
                }
            }
            BrowseMode::Normal => {}
        }
    }
}
