// 🖥️ Admin Dashboard - ratatui + crossterm
//
// Table of shipments with live filters, multi-select and bulk delete.
// Enter opens the detail panel (timeline + AI next-action suggestion).

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dispatch_tracker::entities::parse_date;
use dispatch_tracker::{
    AiGateway, DateRange, KeyValueStorage, Selection, Shipment, ShipmentFilter, ShipmentStore,
    StatusFilter, Tone,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tokio::runtime::Handle;

const PAGE_SIZE: usize = 20;
const POLL_INTERVAL: Duration = Duration::from_millis(150);

// ============================================================================
// STATE
// ============================================================================

/// What the keyboard is currently driving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    DateFrom(String),
    DateTo(String),
    Confirm(PendingDelete),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDelete {
    One { id: String, tracking_number: String },
    Selected(usize),
}

/// Identifies one suggestion request; later tickets supersede earlier ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub shipment_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestion {
    Idle,
    Loading(Ticket),
    Ready { shipment_id: String, text: String },
}

struct Suggester {
    gateway: AiGateway,
    handle: Handle,
    tx: Sender<(Ticket, String)>,
    rx: Receiver<(Ticket, String)>,
}

pub struct App<S: KeyValueStorage> {
    store: ShipmentStore<S>,
    pub shipments: Vec<Shipment>,
    pub filter: ShipmentFilter,
    pub selection: Selection,
    pub state: TableState,
    pub mode: InputMode,
    pub show_detail: bool,
    pub message: Option<String>,
    pub suggestion: Suggestion,
    next_ticket: u64,
    suggester: Option<Suggester>,
}

impl<S: KeyValueStorage> App<S> {
    pub fn new(mut store: ShipmentStore<S>) -> Result<Self> {
        let shipments = store.list_all()?;

        let mut state = TableState::default();
        if !shipments.is_empty() {
            state.select(Some(0));
        }

        Ok(Self {
            store,
            shipments,
            filter: ShipmentFilter::new(),
            selection: Selection::new(),
            state,
            mode: InputMode::Normal,
            show_detail: false,
            message: None,
            suggestion: Suggestion::Idle,
            next_ticket: 0,
            suggester: None,
        })
    }

    /// Enable background next-action suggestions on the given runtime
    pub fn with_suggestions(mut self, gateway: AiGateway, handle: Handle) -> Self {
        if gateway.is_configured() {
            let (tx, rx) = mpsc::channel();
            self.suggester = Some(Suggester {
                gateway,
                handle,
                tx,
                rx,
            });
        }
        self
    }

    pub fn into_store(self) -> ShipmentStore<S> {
        self.store
    }

    // ------------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------------

    pub fn visible(&self) -> Vec<&Shipment> {
        self.filter.apply(&self.shipments)
    }

    pub fn selected_shipment(&self) -> Option<&Shipment> {
        let index = self.state.selected()?;
        self.visible().into_iter().nth(index)
    }

    /// Reload from the store, pruning selections that no longer exist
    pub fn refresh(&mut self) -> Result<()> {
        self.shipments = self.store.list_all()?;
        self.selection.retain_existing(&self.shipments);
        self.clamp_cursor();
        Ok(())
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            _ => {}
        }
        self.on_cursor_moved();
    }

    fn filter_changed(&mut self) {
        if self.visible().is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
        self.on_cursor_moved();
    }

    pub fn set_search(&mut self, text: String) {
        self.filter.text = text;
        self.filter_changed();
    }

    pub fn cycle_status(&mut self) {
        self.filter.status = self.filter.status.cycle();
        self.filter_changed();
    }

    pub fn set_dates(&mut self, dates: DateRange) {
        self.filter.dates = dates;
        self.filter_changed();
    }

    pub fn clear_filters(&mut self) {
        self.filter = ShipmentFilter::new();
        self.filter_changed();
    }

    // ------------------------------------------------------------------------
    // Selection + delete
    // ------------------------------------------------------------------------

    pub fn toggle_current(&mut self) {
        if let Some(id) = self.selected_shipment().map(|s| s.id.clone()) {
            self.selection.toggle(&id);
        }
    }

    pub fn toggle_all_visible(&mut self) {
        let visible: Vec<Shipment> = self.visible().into_iter().cloned().collect();
        let refs: Vec<&Shipment> = visible.iter().collect();
        self.selection.toggle_all(&refs);
    }

    pub fn request_delete_current(&mut self) {
        if let Some(s) = self.selected_shipment() {
            self.mode = InputMode::Confirm(PendingDelete::One {
                id: s.id.clone(),
                tracking_number: s.tracking_number.clone(),
            });
        }
    }

    pub fn request_delete_selected(&mut self) {
        if self.selection.is_empty() {
            self.message = Some("Nothing selected".to_string());
        } else {
            self.mode = InputMode::Confirm(PendingDelete::Selected(self.selection.len()));
        }
    }

    pub fn confirm_delete(&mut self) -> Result<()> {
        let pending = std::mem::replace(&mut self.mode, InputMode::Normal);
        match pending {
            InputMode::Confirm(PendingDelete::One {
                id,
                tracking_number,
            }) => {
                self.store.remove(&id)?;
                self.message = Some(format!("Deleted {}", tracking_number));
            }
            InputMode::Confirm(PendingDelete::Selected(_)) => {
                let ids: Vec<String> = self.selection.ids().map(str::to_string).collect();
                let removed = self.store.remove_many(&ids)?;
                self.selection.clear();
                self.message = Some(format!("Deleted {} shipment(s)", removed));
            }
            other => self.mode = other,
        }
        self.refresh()
    }

    // ------------------------------------------------------------------------
    // Suggestions
    // ------------------------------------------------------------------------

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
        self.on_cursor_moved();
    }

    fn on_cursor_moved(&mut self) {
        if !self.show_detail {
            return;
        }
        let target = self
            .selected_shipment()
            .map(|s| (s.id.clone(), s.current_status));

        match target {
            Some((id, status)) => {
                let already = match &self.suggestion {
                    Suggestion::Loading(t) => t.shipment_id == id,
                    Suggestion::Ready { shipment_id, .. } => *shipment_id == id,
                    Suggestion::Idle => false,
                };
                if already {
                    return;
                }

                let ticket = self.issue_ticket(&id);
                if let Some(suggester) = &self.suggester {
                    let gateway = suggester.gateway.clone();
                    let tx = suggester.tx.clone();
                    let sent = ticket.clone();
                    suggester.handle.spawn(async move {
                        let text = gateway.suggest_next_action(status).await;
                        // Receiver gone means the dashboard closed
                        let _ = tx.send((sent, text));
                    });
                } else {
                    self.suggestion = Suggestion::Idle;
                }
            }
            None => self.suggestion = Suggestion::Idle,
        }
    }

    fn issue_ticket(&mut self, shipment_id: &str) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket {
            seq: self.next_ticket,
            shipment_id: shipment_id.to_string(),
        };
        self.suggestion = Suggestion::Loading(ticket.clone());
        ticket
    }

    /// Apply a finished suggestion; stale tickets are dropped
    pub fn accept_suggestion(&mut self, ticket: Ticket, text: String) -> bool {
        match &self.suggestion {
            Suggestion::Loading(current) if *current == ticket => {
                self.suggestion = Suggestion::Ready {
                    shipment_id: ticket.shipment_id,
                    text,
                };
                true
            }
            _ => false,
        }
    }

    fn drain_suggestions(&mut self) {
        let finished: Vec<(Ticket, String)> = match &self.suggester {
            Some(s) => s.rx.try_iter().collect(),
            None => return,
        };
        for (ticket, text) in finished {
            self.accept_suggestion(ticket, text);
        }
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn next(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
        self.on_cursor_moved();
    }

    pub fn previous(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
        self.on_cursor_moved();
    }

    pub fn page_down(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_SIZE).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
        self.on_cursor_moved();
    }

    pub fn page_up(&mut self) {
        if self.visible().is_empty() {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| i.saturating_sub(PAGE_SIZE))
            .unwrap_or(0);
        self.state.select(Some(i));
        self.on_cursor_moved();
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    /// Returns false when the dashboard should exit
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode.clone() {
            InputMode::Search => {
                let mut text = self.filter.text.clone();
                match key.code {
                    KeyCode::Enter | KeyCode::Esc => self.mode = InputMode::Normal,
                    KeyCode::Backspace => {
                        text.pop();
                        self.set_search(text);
                    }
                    KeyCode::Char(c) => {
                        text.push(c);
                        self.set_search(text);
                    }
                    _ => {}
                }
            }

            InputMode::DateFrom(mut buf) | InputMode::DateTo(mut buf) => {
                let is_from = matches!(self.mode, InputMode::DateFrom(_));
                match key.code {
                    KeyCode::Esc => self.mode = InputMode::Normal,
                    KeyCode::Enter => {
                        self.mode = InputMode::Normal;
                        self.commit_date(is_from, &buf);
                    }
                    KeyCode::Backspace => {
                        buf.pop();
                        self.mode = date_mode(is_from, buf);
                    }
                    KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => {
                        buf.push(c);
                        self.mode = date_mode(is_from, buf);
                    }
                    _ => {}
                }
            }

            InputMode::Confirm(_) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete()?,
                _ => {
                    self.mode = InputMode::Normal;
                    self.message = Some("Delete cancelled".to_string());
                }
            },

            InputMode::Normal => {
                self.message = None;
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
                    KeyCode::Enter => self.toggle_detail(),
                    KeyCode::Char('/') => self.mode = InputMode::Search,
                    KeyCode::Char('s') => self.cycle_status(),
                    KeyCode::Char('f') => {
                        self.mode = InputMode::DateFrom(date_text(self.filter.dates.start))
                    }
                    KeyCode::Char('t') => {
                        self.mode = InputMode::DateTo(date_text(self.filter.dates.end))
                    }
                    KeyCode::Char('c') => self.clear_filters(),
                    KeyCode::Char(' ') => self.toggle_current(),
                    KeyCode::Char('a') => self.toggle_all_visible(),
                    KeyCode::Char('x') | KeyCode::Delete => self.request_delete_current(),
                    KeyCode::Char('D') => self.request_delete_selected(),
                    KeyCode::Char('r') => {
                        self.refresh()?;
                        self.message = Some("Refreshed".to_string());
                    }
                    KeyCode::Down | KeyCode::Char('j') => self.next(),
                    KeyCode::Up | KeyCode::Char('k') => self.previous(),
                    KeyCode::PageDown => self.page_down(),
                    KeyCode::PageUp => self.page_up(),
                    KeyCode::Home => {
                        if !self.visible().is_empty() {
                            self.state.select(Some(0));
                            self.on_cursor_moved();
                        }
                    }
                    KeyCode::End => {
                        let len = self.visible().len();
                        if len > 0 {
                            self.state.select(Some(len - 1));
                            self.on_cursor_moved();
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(true)
    }

    fn commit_date(&mut self, is_from: bool, buf: &str) {
        let parsed = if buf.trim().is_empty() {
            Ok(None)
        } else {
            parse_date(buf).map(Some)
        };

        match parsed {
            Ok(day) => {
                let mut dates = self.filter.dates;
                if is_from {
                    dates.start = day;
                } else {
                    dates.end = day;
                }
                self.set_dates(dates);
            }
            Err(err) => self.message = Some(err.to_string()),
        }
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            total: self.shipments.len(),
            ..StatusCounts::default()
        };
        for s in &self.shipments {
            match s.current_status.display().tone {
                Tone::Emerald => counts.delivered += 1,
                Tone::Red => counts.exceptions += 1,
                _ => counts.active += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub active: usize,
    pub delivered: usize,
    pub exceptions: usize,
}

fn date_mode(is_from: bool, buf: String) -> InputMode {
    if is_from {
        InputMode::DateFrom(buf)
    } else {
        InputMode::DateTo(buf)
    }
}

fn date_text(day: Option<chrono::NaiveDate>) -> String {
    day.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui<S: KeyValueStorage>(app: &mut App<S>) -> Result<()> {
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

    res
}

fn run_app<B: ratatui::backend::Backend, S: KeyValueStorage>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<()> {
    loop {
        app.drain_suggestions();
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key)? {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Slate => Color::Gray,
        Tone::Amber => Color::Yellow,
        Tone::Indigo => Color::Magenta,
        Tone::Blue => Color::Blue,
        Tone::Emerald => Color::Green,
        Tone::Red => Color::Red,
    }
}

fn ui<S: KeyValueStorage>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Filters
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_filters(f, chunks[1], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[2]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[2], app);
    }

    render_status_bar(f, chunks[3], app);
}

fn render_header<S: KeyValueStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let counts = app.status_counts();

    let spans = vec![
        Span::styled(
            "📦 Dispatch",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(format!("Total: {}", counts.total), Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::styled(format!("» {}", counts.active), Style::default().fg(Color::Blue)),
        Span::raw("  "),
        Span::styled(format!("✔ {}", counts.delivered), Style::default().fg(Color::Green)),
        Span::raw("  "),
        Span::styled(format!("✖ {}", counts.exceptions), Style::default().fg(Color::Red)),
    ];

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_filters<S: KeyValueStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let editing = Style::default().fg(Color::Black).bg(Color::Yellow);

    let search = if app.filter.text.is_empty() && app.mode != InputMode::Search {
        "tracking # or recipient".to_string()
    } else {
        app.filter.text.clone()
    };
    let search_style = if app.mode == InputMode::Search {
        editing
    } else if app.filter.text.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };

    let (from, from_style) = match &app.mode {
        InputMode::DateFrom(buf) => (format!("{}_", buf), editing),
        _ => (date_or_dash(app.filter.dates.start), Style::default().fg(Color::White)),
    };
    let (to, to_style) = match &app.mode {
        InputMode::DateTo(buf) => (format!("{}_", buf), editing),
        _ => (date_or_dash(app.filter.dates.end), Style::default().fg(Color::White)),
    };

    let status_style = match app.filter.status {
        StatusFilter::All => Style::default().fg(Color::White),
        StatusFilter::Only(s) => Style::default().fg(tone_color(s.display().tone)),
    };

    let spans = vec![
        Span::styled(" Search: ", label),
        Span::styled(search, search_style),
        Span::raw("  |  "),
        Span::styled("Status: ", label),
        Span::styled(app.filter.status.label(), status_style),
        Span::raw("  |  "),
        Span::styled("ETA: ", label),
        Span::styled(from, from_style),
        Span::raw(" .. "),
        Span::styled(to, to_style),
    ];

    let block_style = if app.filter.is_active() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::White)
    };

    let filters = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(block_style)
            .title(" Filters "),
    );
    f.render_widget(filters, area);
}

fn date_or_dash(day: Option<chrono::NaiveDate>) -> String {
    day.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn render_table<S: KeyValueStorage>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header_cells = ["", "Tracking #", "Recipient", "Route", "Status", "ETA"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let visible = app.visible();
    let all_selected = app.selection.is_all_selected(&visible);

    let rows: Vec<Row> = visible
        .iter()
        .map(|s| {
            let display = s.current_status.display();
            let check = if app.selection.contains(&s.id) { "[x]" } else { "[ ]" };

            Row::new(vec![
                Cell::from(check),
                Cell::from(s.tracking_number.clone()),
                Cell::from(truncate(&s.recipient, 20)),
                Cell::from(truncate(&format!("{} → {}", s.origin, s.destination), 36)),
                Cell::from(format!("{} {}", display.icon.glyph(), display.label))
                    .style(Style::default().fg(tone_color(display.tone))),
                Cell::from(s.estimated_delivery.format("%Y-%m-%d").to_string()),
            ])
            .height(1)
        })
        .collect();

    let title = format!(
        " Shipments ({}){} ",
        visible.len(),
        if all_selected { " - all selected" } else { "" }
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(14),
            Constraint::Length(22),
            Constraint::Min(20),
            Constraint::Length(20),
            Constraint::Length(11),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel<S: KeyValueStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Shipment Details ");

    let Some(s) = app.selected_shipment() else {
        f.render_widget(Paragraph::new("No shipment selected").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let section = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let display = s.current_status.display();

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Tracking: ", label),
            Span::raw(s.tracking_number.as_str()),
        ]),
        Line::from(vec![
            Span::styled("  Status: ", label),
            Span::styled(
                format!("{} {}", display.icon.glyph(), display.label),
                Style::default().fg(tone_color(display.tone)),
            ),
        ]),
        Line::from(vec![Span::styled("  Sender: ", label), Span::raw(s.sender.as_str())]),
        Line::from(vec![
            Span::styled("  Recipient: ", label),
            Span::raw(s.recipient.as_str()),
        ]),
        Line::from(vec![Span::styled("  From: ", label), Span::raw(s.origin.as_str())]),
        Line::from(vec![Span::styled("  To: ", label), Span::raw(s.destination.as_str())]),
        Line::from(vec![
            Span::styled("  Est. delivery: ", label),
            Span::raw(s.estimated_delivery.format("%Y-%m-%d").to_string()),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("  ✨ NEXT ACTION", section)]),
    ];

    let suggestion = match &app.suggestion {
        Suggestion::Ready { shipment_id, text } if *shipment_id == s.id && !text.is_empty() => {
            Span::styled(format!("  {}", text), Style::default().fg(Color::Green))
        }
        Suggestion::Loading(ticket) if ticket.shipment_id == s.id => Span::styled(
            "  thinking...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ),
        _ => Span::styled("  -", Style::default().fg(Color::DarkGray)),
    };
    content.push(Line::from(suggestion));
    content.push(Line::from(""));
    content.push(Line::from(vec![Span::styled("  TIMELINE", section)]));

    for event in s.timeline() {
        let d = event.status.display();
        content.push(Line::from(""));
        content.push(Line::from(vec![
            Span::styled(
                format!("  {} ", d.icon.glyph()),
                Style::default().fg(tone_color(d.marker)),
            ),
            Span::styled(d.label, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                event.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        content.push(Line::from(format!("    {}", event.location)));
        if !event.description.is_empty() {
            content.push(Line::from(Span::styled(
                format!("    {}", wrap_text(&event.description, 35)),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
    }

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_status_bar<S: KeyValueStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let key = Style::default().fg(Color::Yellow);

    let spans = match &app.mode {
        InputMode::Confirm(pending) => {
            let what = match pending {
                PendingDelete::One {
                    tracking_number, ..
                } => format!("Delete {}?", tracking_number),
                PendingDelete::Selected(n) => format!("Delete {} selected shipment(s)?", n),
            };
            vec![
                Span::styled(format!(" {} ", what), Style::default().fg(Color::Red)),
                Span::styled("y", key),
                Span::raw(" confirm | any other key cancels"),
            ]
        }
        InputMode::Search => vec![
            Span::raw(" Type to search | "),
            Span::styled("Enter/Esc", key),
            Span::raw(" done"),
        ],
        InputMode::DateFrom(_) | InputMode::DateTo(_) => vec![
            Span::raw(" YYYY-MM-DD, empty clears | "),
            Span::styled("Enter", key),
            Span::raw(" apply | "),
            Span::styled("Esc", key),
            Span::raw(" cancel"),
        ],
        InputMode::Normal => {
            let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
            let mut spans = vec![Span::styled(
                format!(" Row: {}/{} ", selected, app.visible().len()),
                Style::default().fg(Color::Cyan),
            )];
            if !app.selection.is_empty() {
                spans.push(Span::styled(
                    format!("| {} selected ", app.selection.len()),
                    Style::default().fg(Color::Green),
                ));
            }
            if let Some(message) = &app.message {
                spans.push(Span::styled(
                    format!("| {} ", message),
                    Style::default().fg(Color::Magenta),
                ));
            }
            for (k, what) in [
                ("/", " Search"),
                ("s", " Status"),
                ("f/t", " ETA"),
                ("c", " Clear"),
                ("Space/a", " Select"),
                ("x/D", " Delete"),
                ("Enter", " Details"),
                ("q", " Quit"),
            ] {
                spans.push(Span::raw("| "));
                spans.push(Span::styled(k, key));
                spans.push(Span::raw(format!("{} ", what)));
            }
            spans
        }
    };

    let status = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    if text.len() <= width {
        return text.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n    ")
}
