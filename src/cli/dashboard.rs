use std::sync::Arc;

use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, Tabs},
    Frame,
};
use tracing::{info, warn};

use crate::browser::EntryBrowser;
use crate::cli::report::window_label;
use crate::cli::{RangeArgs, Session};
use crate::error::Result;
use crate::explorer::{self, SortKey};
use crate::filter::{self, resolve_range, DateBounds, RangeMode};
use crate::fmt;
use crate::models::{Dataset, TimeEntry};
use crate::reports::{
    self, CategoryTotal, Dimension, EmployeeTotal, MonthlyTotal, ServiceItemTotal, Summary,
    TrendGrid,
};
use crate::tui::{bar_value, hours_span, BAR_STYLE, FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Categories,
    Services,
    Trends,
    Employees,
    Explorer,
}

const TABS: &[Tab] = &[
    Tab::Categories,
    Tab::Services,
    Tab::Trends,
    Tab::Employees,
    Tab::Explorer,
];

impl Tab {
    fn title(&self) -> &'static str {
        match self {
            Self::Categories => "1 Category Analysis",
            Self::Services => "2 Service Items",
            Self::Trends => "3 Time Trends",
            Self::Employees => "4 Employees",
            Self::Explorer => "5 Data Explorer",
        }
    }

    fn index(&self) -> usize {
        TABS.iter().position(|t| t == self).unwrap_or(0)
    }

    fn next(&self) -> Self {
        TABS[(self.index() + 1) % TABS.len()]
    }

    fn prev(&self) -> Self {
        TABS[(self.index() + TABS.len() - 1) % TABS.len()]
    }
}

/// Everything the tabs display, computed for the current range.
#[derive(Default)]
struct Panels {
    summary: Summary,
    categories: Vec<CategoryTotal>,
    services: Vec<ServiceItemTotal>,
    service_breakdown: Vec<CategoryTotal>,
    monthly: Vec<MonthlyTotal>,
    trend: TrendGrid,
    employees: Vec<EmployeeTotal>,
    employee_breakdown: Vec<CategoryTotal>,
}

struct ExplorerFilters {
    category: Option<String>,
    service: Option<String>,
    sort: SortKey,
}

struct Dashboard<'a> {
    session: &'a Session,
    dataset: Arc<Dataset>,
    today: NaiveDate,
    mode: RangeMode,
    bounds: DateBounds,
    tab: Tab,
    service_selection: usize,
    employee_selection: usize,
    panels: Panels,
    filters: ExplorerFilters,
    category_choices: Vec<String>,
    service_choices: Vec<String>,
    browser: EntryBrowser,
    status_message: Option<String>,
}

impl<'a> Dashboard<'a> {
    fn new(
        session: &'a Session,
        dataset: Arc<Dataset>,
        mode: RangeMode,
        bounds: DateBounds,
        today: NaiveDate,
    ) -> Self {
        let mut dashboard = Self {
            session,
            dataset,
            today,
            mode,
            bounds,
            tab: Tab::Categories,
            service_selection: 0,
            employee_selection: 0,
            panels: Panels::default(),
            filters: ExplorerFilters {
                category: None,
                service: None,
                sort: SortKey::default(),
            },
            category_choices: Vec::new(),
            service_choices: Vec::new(),
            browser: EntryBrowser::new(Vec::new(), 0, String::new()),
            status_message: None,
        };
        dashboard.recompute();
        dashboard
    }

    // -----------------------------------------------------------------------
    // Data
    // -----------------------------------------------------------------------

    fn recompute(&mut self) {
        let dataset = Arc::clone(&self.dataset);
        let view = filter::apply(&dataset.entries, &self.bounds);

        let categories = reports::category_totals(&view);
        let selection = reports::trend_selection(
            &[],
            &categories,
            self.session.settings.trend_categories,
        );
        let trend = reports::pivot_trend(&reports::select_trend(
            &reports::category_trend(&view),
            &selection,
        ));
        let mut employees = reports::employee_totals(&view);
        employees.truncate(reports::TOP_N);

        self.panels = Panels {
            summary: reports::summary(&view),
            categories,
            services: reports::service_item_totals(&view),
            service_breakdown: Vec::new(),
            monthly: reports::monthly_totals(&view),
            trend,
            employees,
            employee_breakdown: Vec::new(),
        };
        self.category_choices = reports::distinct_classifications(&view);
        self.service_choices = reports::distinct_service_items(&view);

        self.refresh_breakdowns(&view);
        self.refresh_explorer(&view);
    }

    fn refresh_breakdowns(&mut self, view: &[&TimeEntry]) {
        self.service_selection = clamp_selection(self.service_selection, self.panels.services.len());
        self.employee_selection =
            clamp_selection(self.employee_selection, self.panels.employees.len());

        self.panels.service_breakdown = self
            .panels
            .services
            .get(self.service_selection)
            .map(|s| reports::category_breakdown(view, &Dimension::ServiceItem(s.service_item.clone())))
            .unwrap_or_default();
        self.panels.employee_breakdown = self
            .panels
            .employees
            .get(self.employee_selection)
            .map(|e| reports::category_breakdown(view, &e.dimension()))
            .unwrap_or_default();
    }

    fn refresh_explorer(&mut self, view: &[&TimeEntry]) {
        let explored = explorer::explore(
            view,
            self.filters.category.as_deref(),
            self.filters.service.as_deref(),
            self.filters.sort,
            self.session.settings.row_limit,
        );
        let rows = explored.rows.iter().map(|&e| e.clone()).collect();
        self.browser = EntryBrowser::new(rows, explored.total, self.filters_desc());
    }

    /// Re-run one refresh step against the current range.
    fn with_view(&mut self, step: fn(&mut Self, &[&TimeEntry])) {
        let dataset = Arc::clone(&self.dataset);
        let view = filter::apply(&dataset.entries, &self.bounds);
        step(self, &view);
    }

    fn filters_desc(&self) -> String {
        format!(
            "Category: {} \u{00b7} Service: {} \u{00b7} Sort: {}",
            self.filters.category.as_deref().unwrap_or("All"),
            self.filters.service.as_deref().unwrap_or("All"),
            self.filters.sort.label(),
        )
    }

    fn cycle_range(&mut self) {
        self.mode = self.mode.next_preset();
        match resolve_range(self.mode, None, None, self.today) {
            Ok(bounds) => self.bounds = bounds,
            Err(e) => {
                self.status_message = Some(format!("Range error: {e}"));
                return;
            }
        }
        self.recompute();
    }

    fn reload(&mut self) {
        match self.session.cache.reload() {
            Ok(dataset) => {
                info!(entries = dataset.entries.len(), "dashboard reloaded dataset");
                self.status_message = Some(format!(
                    "Reloaded {} entries",
                    fmt::number(dataset.entries.len())
                ));
                self.dataset = dataset;
                self.recompute();
            }
            Err(e) => {
                warn!(error = %e, "dashboard reload failed");
                self.status_message = Some(format!("Reload failed: {e}"));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------------

    /// Returns true when the dashboard should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.tab == Tab::Explorer && self.browser.is_prompting() {
            self.browser.handle_key_event(code);
            return false;
        }

        self.status_message = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.tab = TABS[idx];
            }
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.prev(),
            KeyCode::Char('r') => self.cycle_range(),
            KeyCode::Char('R') => self.reload(),
            code => match self.tab {
                Tab::Services => self.move_selection(code, true),
                Tab::Employees => self.move_selection(code, false),
                Tab::Explorer => self.handle_explorer_key(code),
                Tab::Categories | Tab::Trends => {}
            },
        }
        false
    }

    fn move_selection(&mut self, code: KeyCode, services: bool) {
        let (selection, len) = if services {
            (&mut self.service_selection, self.panels.services.len())
        } else {
            (&mut self.employee_selection, self.panels.employees.len())
        };
        let before = *selection;
        match code {
            KeyCode::Up => *selection = selection.saturating_sub(1),
            KeyCode::Down => *selection = clamp_selection(*selection + 1, len),
            _ => {}
        }
        if *selection != before {
            self.with_view(Self::refresh_breakdowns);
        }
    }

    fn handle_explorer_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('c') => {
                self.filters.category = cycle_choice(&self.filters.category, &self.category_choices);
            }
            KeyCode::Char('s') => {
                self.filters.service = cycle_choice(&self.filters.service, &self.service_choices);
            }
            KeyCode::Char('o') => self.filters.sort = self.filters.sort.next(),
            other => {
                self.browser.handle_key_event(other);
                return;
            }
        }
        self.with_view(Self::refresh_explorer);
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, tabs_area, sep_area, stats_area, body_area, hints_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(1),
            ])
            .areas(area);

        frame.render_widget(
            Paragraph::new(format!(
                " Hourglass \u{00b7} {}",
                window_label(self.mode, &self.bounds)
            ))
            .style(HEADER_STYLE),
            header_area,
        );

        let titles: Vec<&str> = TABS.iter().map(|t| t.title()).collect();
        frame.render_widget(
            Tabs::new(titles)
                .select(self.tab.index())
                .style(FOOTER_STYLE)
                .highlight_style(SELECTED_STYLE),
            tabs_area,
        );

        frame.render_widget(
            Paragraph::new("━".repeat(area.width as usize)).style(FOOTER_STYLE),
            sep_area,
        );

        frame.render_widget(Paragraph::new(self.stats_line()), stats_area);

        match self.tab {
            Tab::Categories => self.draw_categories(frame, body_area),
            Tab::Services => self.draw_services(frame, body_area),
            Tab::Trends => self.draw_trends(frame, body_area),
            Tab::Employees => self.draw_employees(frame, body_area),
            Tab::Explorer => self.browser.draw_in(frame, body_area),
        }

        let hints = match self.tab {
            Tab::Services | Tab::Employees => {
                " 1-5/Tab=switch  \u{2191}/\u{2193}=select  r=range  R=reload  q=quit"
            }
            Tab::Explorer => " 1-5/Tab=switch  c=category  s=service  o=sort  r=range  R=reload  q=quit",
            Tab::Categories | Tab::Trends => " 1-5/Tab=switch  r=range  R=reload  q=quit",
        };
        match &self.status_message {
            Some(msg) => frame.render_widget(
                Paragraph::new(format!(" {msg}")).style(Style::default().fg(Color::Yellow)),
                hints_area,
            ),
            None => frame.render_widget(Paragraph::new(hints).style(FOOTER_STYLE), hints_area),
        }
    }

    fn stats_line(&self) -> Line<'static> {
        let s = &self.panels.summary;
        let span = match (s.first_date, s.last_date) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "no dated entries".to_string(),
        };
        let mut spans = vec![
            Span::raw(" Total Hours "),
            hours_span(s.total_hours),
            Span::raw(format!("   Entries {}   Dates {span}", fmt::number(s.entries))),
        ];
        if self.dataset.unparsed_dates > 0 {
            spans.push(Span::styled(
                format!("   ({} undated)", fmt::number(self.dataset.unparsed_dates)),
                FOOTER_STYLE,
            ));
        }
        Line::from(spans)
    }

    fn draw_categories(&self, frame: &mut Frame, area: Rect) {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(area);
        let bars: Vec<(String, f64)> = self
            .panels
            .categories
            .iter()
            .map(|c| (format!("{} ({})", c.classification, fmt::pct(c.pct)), c.hours))
            .collect();
        render_hbars(frame, left, "Hours by Category", &bars, None);
        render_trend_table(frame, right, "Category Trend", &self.panels.trend, false);
    }

    fn draw_services(&self, frame: &mut Frame, area: Rect) {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                .areas(area);
        let bars: Vec<(String, f64)> = self
            .panels
            .services
            .iter()
            .map(|s| (s.service_item.clone(), s.hours))
            .collect();
        render_hbars(
            frame,
            left,
            &format!("Top {} Service Items", reports::TOP_N),
            &bars,
            Some(self.service_selection),
        );
        let title = match self.panels.services.get(self.service_selection) {
            Some(s) => format!("Categories for {}", s.service_item),
            None => "Categories".to_string(),
        };
        render_breakdown(frame, right, &title, &self.panels.service_breakdown);
    }

    fn draw_trends(&self, frame: &mut Frame, area: Rect) {
        let [top, bottom] =
            Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
        render_monthly_bars(frame, top, &self.panels.monthly);
        render_trend_table(frame, bottom, "Category Heatmap", &self.panels.trend, true);
    }

    fn draw_employees(&self, frame: &mut Frame, area: Rect) {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                .areas(area);
        let bars: Vec<(String, f64)> = self
            .panels
            .employees
            .iter()
            .map(|e| (e.full_name(), e.hours))
            .collect();
        render_hbars(
            frame,
            left,
            &format!("Top {} Employees", reports::TOP_N),
            &bars,
            Some(self.employee_selection),
        );
        let title = match self.panels.employees.get(self.employee_selection) {
            Some(e) => format!("Categories for {}", e.full_name()),
            None => "Categories".to_string(),
        };
        render_breakdown(frame, right, &title, &self.panels.employee_breakdown);
    }
}

fn clamp_selection(selection: usize, len: usize) -> usize {
    selection.min(len.saturating_sub(1))
}

/// None -> first choice -> ... -> last choice -> None.
fn cycle_choice(current: &Option<String>, choices: &[String]) -> Option<String> {
    let next = match current {
        None => 0,
        Some(c) => match choices.iter().position(|x| x == c) {
            Some(i) => i + 1,
            None => 0,
        },
    };
    choices.get(next).cloned()
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

fn titled(title: &str) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .title_style(Style::default().add_modifier(Modifier::BOLD))
        .borders(Borders::NONE)
}

fn empty_notice(frame: &mut Frame, area: Rect, title: &str) {
    frame.render_widget(
        Paragraph::new(Span::styled(" No time entries in this range.", FOOTER_STYLE))
            .block(titled(title)),
        area,
    );
}

/// Horizontal bar chart of labelled hours, largest first as given.
fn render_hbars(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[(String, f64)],
    selected: Option<usize>,
) {
    if rows.is_empty() {
        empty_notice(frame, area, title);
        return;
    }
    let label_width = (area.width / 3).max(8) as usize;
    let bars: Vec<Bar> = rows
        .iter()
        .enumerate()
        .map(|(i, (label, hours))| {
            let is_selected = selected == Some(i);
            let marker = if is_selected { ">" } else { " " };
            let style = if is_selected {
                BAR_STYLE.add_modifier(Modifier::BOLD)
            } else {
                BAR_STYLE
            };
            Bar::default()
                .label(Line::from(format!("{marker}{}", fmt::truncate(label, label_width))))
                .value(bar_value(*hours))
                .text_value(fmt::hours(*hours))
                .style(style)
        })
        .collect();
    let chart = BarChart::default()
        .block(titled(title))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

fn render_monthly_bars(frame: &mut Frame, area: Rect, monthly: &[MonthlyTotal]) {
    let title = "Monthly Hours";
    if monthly.is_empty() {
        empty_notice(frame, area, title);
        return;
    }
    let bars: Vec<Bar> = monthly
        .iter()
        .map(|m| {
            Bar::default()
                .label(Line::from(m.month.clone()))
                .value(bar_value(m.hours))
                .text_value(format!("{:.0}", m.hours))
                .style(BAR_STYLE)
        })
        .collect();
    let chart = BarChart::default()
        .block(titled(title))
        .bar_width(7)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

fn render_breakdown(frame: &mut Frame, area: Rect, title: &str, rows: &[CategoryTotal]) {
    if rows.is_empty() {
        empty_notice(frame, area, title);
        return;
    }
    let body: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new([
                Cell::from(r.classification.clone()),
                Cell::from(hours_span(r.hours)),
                Cell::from(fmt::pct(r.pct)),
            ])
        })
        .collect();
    let table = Table::new(
        body,
        [Constraint::Fill(1), Constraint::Length(10), Constraint::Length(7)],
    )
    .header(Row::new(["Classification", "Hours", "%"]).style(FOOTER_STYLE))
    .column_spacing(1)
    .block(titled(title));
    frame.render_widget(table, area);
}

/// Month rows by classification columns. With `heat`, cells are shaded by
/// their share of the largest value.
fn render_trend_table(frame: &mut Frame, area: Rect, title: &str, grid: &TrendGrid, heat: bool) {
    if grid.months.is_empty() {
        empty_notice(frame, area, title);
        return;
    }
    let max = grid
        .hours
        .iter()
        .flatten()
        .copied()
        .fold(0.0_f64, f64::max);

    let mut header = vec![Cell::from("Month")];
    header.extend(
        grid.classifications
            .iter()
            .map(|c| Cell::from(fmt::truncate(c, 14))),
    );

    // Most recent months first so they survive vertical clipping
    let body: Vec<Row> = grid
        .months
        .iter()
        .enumerate()
        .rev()
        .map(|(m, month)| {
            let mut cells = vec![Cell::from(month.clone())];
            for series in &grid.hours {
                let h = series[m];
                let cell = Cell::from(fmt::hours(h));
                cells.push(if heat { cell.style(heat_style(h, max)) } else { cell });
            }
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(8)];
    widths.extend(grid.classifications.iter().map(|_| Constraint::Length(14)));
    let table = Table::new(body, widths)
        .header(Row::new(header).style(FOOTER_STYLE))
        .column_spacing(1)
        .block(titled(title));
    frame.render_widget(table, area);
}

fn heat_style(hours: f64, max: f64) -> Style {
    if max <= 0.0 || hours <= 0.0 {
        return Style::default().fg(Color::DarkGray);
    }
    let ratio = (hours / max).clamp(0.0, 1.0);
    let shade = (40.0 + ratio * 160.0) as u8;
    Style::default().bg(Color::Rgb(0, shade, shade / 2)).fg(Color::White)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(session: &Session, range: &RangeArgs) -> Result<()> {
    let (mode, bounds) = session.resolve(range)?;
    let dataset = session.cache.load()?;
    let mut dashboard = Dashboard::new(session, dataset, mode, bounds, crate::cli::today());

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| dashboard.draw(frame)) {
            break Err(e.into());
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    break Ok(());
                }
                if dashboard.handle_key(key.code) {
                    break Ok(());
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::date;
    use crate::loader::tests::write_csv;
    use crate::loader::DatasetCache;
    use crate::settings::Settings;

    const BODY: &str = "\
2024-03-01,2.0,Ada,Lovelace,Audit,,Admin,
2024-03-02,3.0,Grace,Hopper,Tax,,Dev,
2024-02-10,1.0,Ada,Lovelace,Tax,,Dev,
2024-03-09,4.0,Grace,Hopper,Audit,,Admin,
";

    fn session(dir: &std::path::Path) -> Session {
        Session {
            settings: Settings::default(),
            cache: DatasetCache::new(write_csv(dir, "t.csv", BODY)),
        }
    }

    fn dashboard(session: &Session) -> Dashboard<'_> {
        let dataset = session.cache.load().unwrap();
        Dashboard::new(
            session,
            dataset,
            RangeMode::All,
            DateBounds::default(),
            date(2024, 3, 10),
        )
    }

    #[test]
    fn test_panels_cover_all_views() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let d = dashboard(&s);
        assert_eq!(d.panels.summary.entries, 4);
        assert_eq!(d.panels.categories[0].classification, "Admin");
        assert_eq!(d.panels.services[0].service_item, "Audit");
        assert_eq!(d.panels.monthly.len(), 2);
        assert_eq!(d.panels.trend.months, vec!["2024-02", "2024-03"]);
        assert_eq!(d.panels.employees[0].full_name(), "Grace Hopper");
        // Audit is selected first: all Admin hours
        assert_eq!(d.panels.service_breakdown.len(), 1);
        assert_eq!(d.panels.service_breakdown[0].hours, 6.0);
    }

    #[test]
    fn test_selection_updates_breakdown() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let mut d = dashboard(&s);
        d.handle_key(KeyCode::Char('4'));
        assert_eq!(d.tab, Tab::Employees);
        d.handle_key(KeyCode::Down);
        assert_eq!(d.employee_selection, 1);
        let hours: Vec<f64> = d.panels.employee_breakdown.iter().map(|r| r.hours).collect();
        assert_eq!(hours, vec![2.0, 1.0]);
        d.handle_key(KeyCode::Down);
        assert_eq!(d.employee_selection, 1);
    }

    #[test]
    fn test_range_cycle_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let mut d = dashboard(&s);
        d.handle_key(KeyCode::Char('r'));
        assert_eq!(d.mode, RangeMode::Last3Days);
        // Only 2024-03-09 falls within 2024-03-07..=2024-03-10
        assert_eq!(d.panels.summary.entries, 1);
        for _ in 0..4 {
            d.handle_key(KeyCode::Char('r'));
        }
        assert_eq!(d.mode, RangeMode::All);
        assert_eq!(d.panels.summary.entries, 4);
    }

    #[test]
    fn test_explorer_filters_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let mut d = dashboard(&s);
        d.handle_key(KeyCode::Char('5'));
        d.handle_key(KeyCode::Char('c'));
        assert_eq!(d.filters.category.as_deref(), Some("Admin"));
        assert_eq!(d.browser.selected_entry().unwrap().local_date, "2024-03-09");
        d.handle_key(KeyCode::Char('c'));
        d.handle_key(KeyCode::Char('c'));
        assert_eq!(d.filters.category, None);
        d.handle_key(KeyCode::Char('o'));
        assert_eq!(d.filters.sort, SortKey::DateAsc);
        assert_eq!(d.browser.selected_entry().unwrap().local_date, "2024-02-10");
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let mut d = dashboard(&s);
        write_csv(dir.path(), "t.csv", "2024-03-05,8.0,Ada,Lovelace,Audit,,Admin,\n");
        d.handle_key(KeyCode::Char('R'));
        assert_eq!(d.panels.summary.entries, 1);
        assert_eq!(d.status_message.as_deref(), Some("Reloaded 1 entries"));
    }

    #[test]
    fn test_reload_failure_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let mut d = dashboard(&s);
        std::fs::remove_file(s.cache.path()).unwrap();
        d.handle_key(KeyCode::Char('R'));
        assert_eq!(d.panels.summary.entries, 4);
        assert!(d.status_message.unwrap().starts_with("Reload failed"));
    }

    #[test]
    fn test_quit_keys() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path());
        let mut d = dashboard(&s);
        assert!(!d.handle_key(KeyCode::Tab));
        assert_eq!(d.tab, Tab::Services);
        assert!(d.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn test_cycle_choice() {
        let choices = vec!["A".to_string(), "B".to_string()];
        assert_eq!(cycle_choice(&None, &choices), Some("A".into()));
        assert_eq!(cycle_choice(&Some("B".into()), &choices), None);
        assert_eq!(cycle_choice(&Some("gone".into()), &choices), Some("A".into()));
    }
}
