use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use crossterm::event::KeyCode;

use super::{Report, ReportData};
use crate::error::Result;
use crate::fmt;
use crate::reports::{CategoryTotal, TrendGrid};
use crate::tui::{hours_span, run_report_view, ReportView, ReportViewAction, FOOTER_STYLE, HEADER_STYLE};

/// Show a report in the interactive table view.
pub fn show(report: Report) -> Result<()> {
    let mut view = build_view(report);
    run_report_view(&mut view)
}

// ---------------------------------------------------------------------------
// Table-based report view (shared by all report types)
// ---------------------------------------------------------------------------

const BOLD: Style = Style::new().add_modifier(Modifier::BOLD);
const HEADER_ROW_STYLE: Style = Style::new()
    .fg(Color::DarkGray)
    .add_modifier(Modifier::BOLD);

pub(crate) struct TableReportView {
    title: String,
    header: Row<'static>,
    rows: Vec<Row<'static>>,
    widths: Vec<Constraint>,
    offset: usize,
    visible_count: usize,
}

impl TableReportView {
    fn new(
        title: impl Into<String>,
        header: Row<'static>,
        rows: Vec<Row<'static>>,
        widths: Vec<Constraint>,
    ) -> Self {
        Self {
            title: title.into(),
            header,
            rows,
            widths,
            offset: 0,
            visible_count: 20,
        }
    }

    fn max_offset(&self) -> usize {
        self.rows.len().saturating_sub(self.visible_count)
    }
}

impl ReportView for TableReportView {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, sep_area, content_area, footer_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" {}", self.title)).style(HEADER_STYLE),
            header_area,
        );

        frame.render_widget(
            Paragraph::new("━".repeat(area.width as usize)).style(FOOTER_STYLE),
            sep_area,
        );

        // header row + bottom_margin
        let header_overhead = 2u16;
        let visible = content_area.height.saturating_sub(header_overhead) as usize;
        self.visible_count = visible.max(1);
        self.offset = self.offset.min(self.max_offset());

        if self.rows.is_empty() {
            frame.render_widget(
                Paragraph::new("  No time entries in this range.").style(FOOTER_STYLE),
                content_area,
            );
        } else {
            let visible_rows: Vec<Row> = self
                .rows
                .iter()
                .skip(self.offset)
                .take(visible)
                .cloned()
                .collect();
            let table = Table::new(visible_rows, self.widths.clone())
                .header(self.header.clone())
                .column_spacing(2);
            frame.render_widget(table, content_area);
        }

        let pos_info = if self.max_offset() > 0 {
            format!("  line {}/{}", self.offset + 1, self.rows.len())
        } else {
            String::new()
        };
        frame.render_widget(
            Paragraph::new(format!(" \u{2191}/\u{2193}=scroll  q/Esc=close{pos_info}"))
                .style(FOOTER_STYLE),
            footer_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ReportViewAction {
        let page = self.visible_count;
        let max = self.max_offset();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ReportViewAction::Close,
            KeyCode::Up | KeyCode::Char('k') => self.offset = self.offset.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.offset = (self.offset + 1).min(max),
            KeyCode::PageUp => self.offset = self.offset.saturating_sub(page),
            KeyCode::PageDown => self.offset = (self.offset + page).min(max),
            KeyCode::Home => self.offset = 0,
            KeyCode::End => self.offset = max,
            _ => {}
        }
        ReportViewAction::Continue
    }
}

// ---------------------------------------------------------------------------
// Helpers: create cells with consistent styling
// ---------------------------------------------------------------------------

fn hours_cell(hours: f64) -> Cell<'static> {
    Cell::from(hours_span(hours))
}

fn text_cell(s: impl Into<String>) -> Cell<'static> {
    Cell::from(s.into())
}

fn bold_cell(s: impl Into<String>) -> Cell<'static> {
    Cell::from(Span::styled(s.into(), BOLD))
}

fn header_row<const N: usize>(labels: [&'static str; N]) -> Row<'static> {
    Row::new(labels).style(HEADER_ROW_STYLE).bottom_margin(1)
}

fn total_row(hours: f64, leading: usize, trailing: usize) -> Row<'static> {
    let mut cells = vec![bold_cell("Total")];
    cells.extend((1..leading).map(|_| text_cell("")));
    cells.push(hours_cell(hours));
    cells.extend((0..trailing).map(|_| text_cell("")));
    Row::new(cells)
}

// ---------------------------------------------------------------------------
// Report builders
// ---------------------------------------------------------------------------

pub(crate) fn build_view(report: Report) -> TableReportView {
    let title = format!("{} \u{2014} {}", report.title, report.window);
    match report.data {
        ReportData::Categories(rows) | ReportData::Breakdown { rows, .. } => {
            category_view(title, &rows)
        }
        ReportData::Services(rows) => {
            let body = rows
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    Row::new([
                        text_cell((i + 1).to_string()),
                        text_cell(r.service_item.clone()),
                        hours_cell(r.hours),
                        text_cell(fmt::number(r.entries)),
                    ])
                })
                .collect();
            TableReportView::new(
                title,
                header_row(["#", "Service Item", "Hours", "Entries"]),
                body,
                vec![
                    Constraint::Length(3),
                    Constraint::Fill(1),
                    Constraint::Length(12),
                    Constraint::Length(9),
                ],
            )
        }
        ReportData::Monthly(rows) => {
            let total: f64 = rows.iter().map(|r| r.hours).sum();
            let mut body: Vec<Row> = rows
                .iter()
                .map(|r| Row::new([text_cell(r.month.clone()), hours_cell(r.hours)]))
                .collect();
            if !body.is_empty() {
                body.push(total_row(total, 1, 0));
            }
            TableReportView::new(
                title,
                header_row(["Month", "Hours"]),
                body,
                vec![Constraint::Length(10), Constraint::Length(12)],
            )
        }
        ReportData::Employees(rows) => {
            let total: f64 = rows.iter().map(|r| r.hours).sum();
            let mut body: Vec<Row> = rows
                .iter()
                .map(|r| {
                    Row::new([
                        text_cell(r.full_name()),
                        hours_cell(r.hours),
                        text_cell(fmt::number(r.entries)),
                    ])
                })
                .collect();
            if !body.is_empty() {
                body.push(total_row(total, 1, 1));
            }
            TableReportView::new(
                title,
                header_row(["Employee", "Hours", "Entries"]),
                body,
                vec![Constraint::Fill(1), Constraint::Length(12), Constraint::Length(9)],
            )
        }
        ReportData::Trend(grid) => trend_view(title, &grid),
    }
}

fn category_view(title: String, rows: &[CategoryTotal]) -> TableReportView {
    let total: f64 = rows.iter().map(|r| r.hours).sum();
    let mut body: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new([
                text_cell(r.classification.clone()),
                hours_cell(r.hours),
                text_cell(fmt::pct(r.pct)),
                text_cell(fmt::number(r.entries)),
            ])
        })
        .collect();
    if !body.is_empty() {
        body.push(total_row(total, 1, 2));
    }
    TableReportView::new(
        title,
        header_row(["Classification", "Hours", "%", "Entries"]),
        body,
        vec![
            Constraint::Fill(1),
            Constraint::Length(12),
            Constraint::Length(7),
            Constraint::Length(9),
        ],
    )
}

fn trend_view(title: String, grid: &TrendGrid) -> TableReportView {
    // One row per month, one column per classification
    let mut header_cells = vec![text_cell("Month")];
    header_cells.extend(grid.classifications.iter().map(|c| text_cell(c.clone())));
    let header = Row::new(header_cells)
        .style(HEADER_ROW_STYLE)
        .bottom_margin(1);

    let body = grid
        .months
        .iter()
        .enumerate()
        .map(|(m, month)| {
            let mut cells = vec![text_cell(month.clone())];
            cells.extend(grid.hours.iter().map(|series| hours_cell(series[m])));
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(10)];
    widths.extend(grid.classifications.iter().map(|_| Constraint::Fill(1)));
    TableReportView::new(title, header, body, widths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{MonthlyTotal, TrendPoint, pivot_trend};

    #[test]
    fn test_monthly_view_appends_total_row() {
        let report = Report {
            title: "Monthly Hours".into(),
            window: "All Time".into(),
            data: ReportData::Monthly(vec![
                MonthlyTotal { month: "2024-01".into(), hours: 5.0 },
                MonthlyTotal { month: "2024-02".into(), hours: 1.0 },
            ]),
        };
        let view = build_view(report);
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.title, "Monthly Hours \u{2014} All Time");
    }

    #[test]
    fn test_empty_view_has_no_total_row() {
        let report = Report {
            title: "Hours by Category".into(),
            window: "Last 3 Days".into(),
            data: ReportData::Categories(Vec::new()),
        };
        assert!(build_view(report).rows.is_empty());
    }

    #[test]
    fn test_trend_view_rows_are_months() {
        let points = vec![
            TrendPoint { month: "2024-01".into(), classification: "Admin".into(), hours: 2.0 },
            TrendPoint { month: "2024-02".into(), classification: "Dev".into(), hours: 1.0 },
            TrendPoint { month: "2024-03".into(), classification: "Admin".into(), hours: 4.0 },
        ];
        let view = trend_view("Trend".into(), &pivot_trend(&points));
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.widths.len(), 3);
    }

    #[test]
    fn test_scroll_clamps_to_rows() {
        let report = Report {
            title: "Monthly Hours".into(),
            window: "All Time".into(),
            data: ReportData::Monthly(vec![MonthlyTotal { month: "2024-01".into(), hours: 5.0 }]),
        };
        let mut view = build_view(report);
        view.visible_count = 1;
        view.handle_key(KeyCode::End);
        assert_eq!(view.offset, 1);
        view.handle_key(KeyCode::Down);
        assert_eq!(view.offset, 1);
        assert!(matches!(view.handle_key(KeyCode::Esc), ReportViewAction::Close));
    }
}
