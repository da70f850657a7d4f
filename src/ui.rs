use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use statement_insights::{metric_rows, AggregateReport, Insight};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Summary,
    Details,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Summary => Page::Details,
            Page::Details => Page::Summary,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Summary => "Summary",
            Page::Details => "Details",
        }
    }
}

pub struct App {
    pub report: AggregateReport,
    pub rows: Vec<(&'static str, String)>,
    pub state: TableState,
    pub current_page: Page,
}

impl App {
    pub fn new(report: AggregateReport) -> Self {
        let rows = metric_rows(&report);

        let mut state = TableState::default();
        state.select(Some(0));

        Self {
            report,
            rows,
            state,
            current_page: Page::Summary,
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn next(&mut self) {
        let len = self.rows.len();
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.rows.len();
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn insight_color(&self) -> Color {
        match self.report.insight {
            Insight::NoMoneyOut => Color::Green,
            Insight::LargeTransactions => Color::Red,
            Insight::SmallDailyExpenses => Color::Yellow,
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

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
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Tab | KeyCode::BackTab => app.next_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Summary => render_metrics(f, chunks[1], app),
        Page::Details => render_details(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, page) in [Page::Summary, Page::Details].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("↑ {}", app.report.format(app.report.total_income)),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("↓ {}", app.report.format(app.report.total_expense)),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_metrics(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Metric", "Value"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let insight_color = app.insight_color();
    let rows = app.rows.iter().map(|(metric, value)| {
        let color = match *metric {
            "Total In" => Color::Green,
            "Total Out" => Color::Red,
            "Insight" => insight_color,
            _ => Color::White,
        };
        Row::new(vec![
            Cell::from(*metric),
            Cell::from(value.clone()).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(rows, [Constraint::Length(24), Constraint::Min(20)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Statement Summary "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_details(f: &mut Frame, area: Rect, app: &App) {
    let report = &app.report;
    let currency = report
        .currency
        .map(|c| format!("{} ({})", c.symbol(), c.code()))
        .unwrap_or_else(|| "unknown".to_string());

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Heuristic:  ", Style::default().fg(Color::Yellow)),
            Span::raw(report.heuristic.name().to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Currency:   ", Style::default().fg(Color::Yellow)),
            Span::raw(currency),
        ]),
        Line::from(vec![
            Span::styled("  Amounts:    ", Style::default().fg(Color::Yellow)),
            Span::raw(report.transaction_count.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Threshold:  ", Style::default().fg(Color::Yellow)),
            Span::raw(report.format(report.threshold)),
        ]),
        Line::from(vec![
            Span::styled("  Generated:  ", Style::default().fg(Color::Yellow)),
            Span::raw(report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ]),
        Line::from(""),
    ];

    for notice in &report.notices {
        content.push(Line::from(Span::styled(
            format!("  ℹ {}", notice),
            Style::default().fg(Color::Cyan),
        )));
    }

    let details = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Details "),
    );

    f.render_widget(details, area);
}

fn render_status_bar(f: &mut Frame, area: Rect) {
    let status_spans = vec![
        Span::styled(" Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
