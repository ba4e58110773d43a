use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;

use sales_pulse::{Aggregator, Summary};

/// Number of buckets for the revenue histogram
const HISTOGRAM_BINS: usize = 8;

/// Which ranking table receives scroll keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Products,
    SalesReps,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::Products => Focus::SalesReps,
            Focus::SalesReps => Focus::Products,
        }
    }
}

pub struct App {
    aggregator: Aggregator,
    /// All years present in the dataset, sorted; digit keys toggle these
    pub all_years: Vec<i32>,
    /// Currently selected years; empty means "all years"
    pub selected: BTreeSet<i32>,
    /// Result of the latest successful recomputation (last-write-wins:
    /// each keystroke produces exactly one summary, displayed immediately)
    pub summary: Summary,
    pub focus: Focus,
    pub product_state: TableState,
    pub rep_state: TableState,
    pub status: Option<String>,
}

impl App {
    pub fn new(aggregator: Aggregator) -> Result<Self> {
        let all_years: Vec<i32> = aggregator.dataset().years().into_iter().collect();
        let summary = aggregator.summarize(&BTreeSet::new())?;

        let mut product_state = TableState::default();
        product_state.select(Some(0));
        let mut rep_state = TableState::default();
        rep_state.select(Some(0));

        Ok(Self {
            aggregator,
            all_years,
            selected: BTreeSet::new(),
            summary,
            focus: Focus::Products,
            product_state,
            rep_state,
            status: None,
        })
    }

    /// Toggle the year bound to digit key `index` and recompute.
    pub fn toggle_year(&mut self, index: usize) {
        let Some(&year) = self.all_years.get(index) else {
            return;
        };
        if !self.selected.remove(&year) {
            self.selected.insert(year);
        }
        self.recompute();
    }

    /// Clear the selection back to "all years".
    pub fn select_all_years(&mut self) {
        self.selected.clear();
        self.recompute();
    }

    /// Synchronous recomputation over the full dataset. On error the
    /// previous summary stays on screen and the status line reports why.
    fn recompute(&mut self) {
        match self.aggregator.summarize(&self.selected) {
            Ok(summary) => {
                self.summary = summary;
                self.status = None;
                self.product_state.select(Some(0));
                self.rep_state.select(Some(0));
            }
            Err(e) => {
                self.status = Some(e.to_string());
            }
        }
    }

    fn focused_len(&self) -> usize {
        match self.focus {
            Focus::Products => self.summary.product_ranking.len(),
            Focus::SalesReps => self.summary.sales_rep_ranking.len(),
        }
    }

    fn focused_state(&mut self) -> &mut TableState {
        match self.focus {
            Focus::Products => &mut self.product_state,
            Focus::SalesReps => &mut self.rep_state,
        }
    }

    pub fn next_row(&mut self) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let state = self.focused_state();
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let state = self.focused_state();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('a') => app.select_all_years(),
                KeyCode::Char(c @ '1'..='9') => {
                    app.toggle_year(c as usize - '1' as usize);
                }
                KeyCode::Tab => app.focus = app.focus.next(),
                KeyCode::Down | KeyCode::Char('j') => app.next_row(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_row(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with year selection
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55), // Metrics and charts
            Constraint::Percentage(45), // Ranking tables
        ])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(12), // Key metrics
            Constraint::Percentage(50),
            Constraint::Min(0),
        ])
        .split(content[0]);

    render_metrics(f, left[0], app);
    render_monthly_chart(f, left[1], app);
    render_histogram(f, left[2], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(content[1]);

    render_product_table(f, right[0], app);
    render_rep_table(f, right[1], app);

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " Years: ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];

    for (i, year) in app.all_years.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        let active = app.selected.is_empty() || app.selected.contains(year);
        let style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("[{}] {}", i + 1, year), style));
    }

    if app.selected.is_empty() {
        spans.push(Span::styled(
            "   (all years)",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Sales Pulse "),
    );

    f.render_widget(header, area);
}

fn metric_line<'a>(label: &'a str, value: String, color: Color) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("  {:<24}", label),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ])
}

fn render_metrics(f: &mut Frame, area: Rect, app: &App) {
    let s = &app.summary;

    let content = vec![
        Line::from(""),
        metric_line("Total revenue", format!("$ {:.2}", s.total_revenue), Color::Green),
        metric_line("Units sold", format!("{}", s.total_units), Color::White),
        metric_line(
            "Avg revenue per unit",
            format!("$ {:.2}", s.avg_revenue_per_unit),
            Color::White,
        ),
        metric_line(
            "Avg discount",
            format!("{:.2}%", s.avg_discount * 100.0),
            Color::White,
        ),
        metric_line("Top category", s.top_category.clone(), Color::Yellow),
        metric_line("Top payment method", s.top_payment_method.clone(), Color::Yellow),
        metric_line("Top sales channel", s.top_channel.clone(), Color::Yellow),
        metric_line("Top region", s.top_region.clone(), Color::Yellow),
        metric_line(
            "Mean revenue per sale",
            format!("$ {:.2}", s.distribution.mean),
            Color::Green,
        ),
    ];

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Key Metrics "),
    );

    f.render_widget(panel, area);
}

fn render_monthly_chart(f: &mut Frame, area: Rect, app: &App) {
    let labels: Vec<String> = app
        .summary
        .monthly_revenue
        .iter()
        .map(|m| {
            if app.summary.years.len() > 1 {
                format!("{}-{:02}", m.year % 100, m.month)
            } else {
                format!("{:02}", m.month)
            }
        })
        .collect();

    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(app.summary.monthly_revenue.iter())
        .map(|(label, m)| (label.as_str(), m.revenue.round() as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Monthly Revenue "),
        )
        .data(&data)
        .bar_width(5)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Green))
        .value_style(Style::default().fg(Color::Black).bg(Color::Green));

    f.render_widget(chart, area);
}

/// Bucket per-transaction revenue into fixed-width bins.
/// Binning lives in the renderer; the aggregator only hands out raw values.
fn histogram_bins(values: &[f64], bins: usize) -> Vec<(String, u64)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return vec![(format!("{:.0}", min), values.len() as u64)];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0u64; bins];
    for &v in values {
        let mut idx = ((v - min) / width) as usize;
        if idx >= bins {
            idx = bins - 1; // max lands in the last bin
        }
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let low = min + width * i as f64;
            (format!("{:.0}", low), count)
        })
        .collect()
}

fn render_histogram(f: &mut Frame, area: Rect, app: &App) {
    let bins = histogram_bins(&app.summary.distribution.values, HISTOGRAM_BINS);
    let data: Vec<(&str, u64)> = bins.iter().map(|(l, c)| (l.as_str(), *c)).collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(
                    " Revenue per Sale (mean $ {:.2}) ",
                    app.summary.distribution.mean
                )),
        )
        .data(&data)
        .bar_width(6)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Blue))
        .value_style(Style::default().fg(Color::Black).bg(Color::Blue));

    f.render_widget(chart, area);
}

fn ranking_rows(entities: &[sales_pulse::RankedEntity]) -> Vec<Row<'static>> {
    entities
        .iter()
        .map(|e| {
            Row::new(vec![
                Cell::from(format!("{:.1}", e.rank)),
                Cell::from(e.key.clone()),
                Cell::from(format!("{:.2}", e.revenue))
                    .style(Style::default().fg(Color::Green)),
                Cell::from(format!("{:.2}%", e.participation * 100.0)),
            ])
            .height(1)
        })
        .collect()
}

fn ranking_header() -> Row<'static> {
    let cells = ["Rank", "Name", "Revenue", "Share"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_product_table(f: &mut Frame, area: Rect, app: &mut App) {
    let border = if app.focus == Focus::Products {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };

    let table = Table::new(
        ranking_rows(&app.summary.product_ranking),
        [
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(8),
        ],
    )
    .header(ranking_header())
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(" Product Ranking "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.product_state);
}

fn render_rep_table(f: &mut Frame, area: Rect, app: &mut App) {
    let border = if app.focus == Focus::SalesReps {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };

    let table = Table::new(
        ranking_rows(&app.summary.sales_rep_ranking),
        [
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(8),
        ],
    )
    .header(ranking_header())
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(" Sales Rep Ranking "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.rep_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];

    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!(" {} ", status),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("| "));
    }

    spans.push(Span::styled("1-9", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" Toggle year | "));
    spans.push(Span::styled("a", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" All years | "));
    spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" Switch table | "));
    spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" Nav | "));
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
