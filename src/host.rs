// SPDX-License-Identifier: MIT
//
// Full-screen terminal host for `tracepad run`:
//   - Header: exercise + assistant + session state
//   - Editor pane: buffer text with the pending suggestion as dim ghost text
//   - Status line: key help, or the last fetch error
//
// Deliberately bare — no menus, no dialogs, no syntax coloring. Participants
// get a plain editor so the logged behavior is about the suggestions, not
// the chrome.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use tokio::sync::mpsc;

use crate::buffer::Direction;
use crate::engine::{EditorEngine, EngineEvent, InputEvent};
use crate::session::SessionState;

/// ratatui front end driving one [`EditorEngine`].
pub struct EditorUi {
    engine: EditorEngine,
    events: mpsc::Receiver<EngineEvent>,
}

impl EditorUi {
    pub fn new(engine: EditorEngine, events: mpsc::Receiver<EngineEvent>) -> Self {
        Self { engine, events }
    }

    /// Start the interactive editor loop.
    pub async fn run(mut self) -> Result<()> {
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("create terminal")?;

        let result = self.event_loop(&mut terminal).await;

        // Restore terminal regardless of result.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            terminal.draw(|f| draw_ui(f, &self.engine))?;

            // Poll for terminal events (non-blocking, 50ms timeout).
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    let input = match (key.code, key.modifiers) {
                        (KeyCode::Char('q'), KeyModifiers::CONTROL)
                        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => break,
                        (KeyCode::Tab, _) => Some(InputEvent::Accept),
                        (KeyCode::Esc, _) => Some(InputEvent::Reject),
                        (KeyCode::Backspace, _) => Some(InputEvent::Backspace),
                        (KeyCode::Delete, _) => Some(InputEvent::DeleteForward),
                        (KeyCode::Enter, _) => Some(InputEvent::Insert('\n')),
                        (KeyCode::Left, _) => Some(InputEvent::Arrow(Direction::Left)),
                        (KeyCode::Right, _) => Some(InputEvent::Arrow(Direction::Right)),
                        (KeyCode::Up, _) => Some(InputEvent::Arrow(Direction::Up)),
                        (KeyCode::Down, _) => Some(InputEvent::Arrow(Direction::Down)),
                        (KeyCode::Char(c), _) => Some(InputEvent::Insert(c)),
                        _ => None,
                    };
                    if let Some(input) = input {
                        self.engine.handle(EngineEvent::Input(input)).await;
                    }
                }
            }

            // Drain engine task events (debounce ticks, fetch settlements).
            while let Ok(ev) = self.events.try_recv() {
                self.engine.handle(ev).await;
            }
        }

        Ok(())
    }
}

// ─── UI rendering ─────────────────────────────────────────────────────────────

fn draw_ui(f: &mut ratatui::Frame, engine: &EditorEngine) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(3),    // editor pane
            Constraint::Length(1), // status line
        ])
        .split(area);

    render_header(f, chunks[0], engine);
    render_editor(f, chunks[1], engine);
    render_status(f, chunks[2], engine);
}

fn render_header(f: &mut ratatui::Frame, area: Rect, engine: &EditorEngine) {
    let ctx = engine.context();
    let header = Paragraph::new(format!(
        " tracepad  {} @ {}  [{}]",
        ctx.exercise,
        ctx.assistant,
        state_label(engine.session().state()),
    ))
    .style(Style::default().bg(Color::Rgb(28, 28, 40)).fg(Color::White));
    f.render_widget(header, area);
}

fn render_editor(f: &mut ratatui::Frame, area: Rect, engine: &EditorEngine) {
    let buffer = engine.buffer();
    let before = buffer.prefix_to_caret();
    let after = &buffer.text()[before.len()..];
    let ghost = engine.overlay().map(|view| view.text);

    let lines = editor_lines(before, ghost, after);

    // Keep the caret line inside the viewport.
    let (caret_line, _) = buffer.caret_line_col();
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = caret_line.saturating_sub(inner_height.saturating_sub(1)) as u16;

    let editor = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .scroll((scroll, 0));
    f.render_widget(editor, area);
}

fn render_status(f: &mut ratatui::Frame, area: Rect, engine: &EditorEngine) {
    let (text, style) = match engine.last_error() {
        Some(err) => (
            format!(" completion error: {err}"),
            Style::default().fg(Color::Red),
        ),
        None => (
            " Tab: accept  |  Esc: dismiss  |  Ctrl+Q: quit".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Buffer text around the caret plus the ghost suggestion, as styled lines.
fn editor_lines<'a>(before: &'a str, ghost: Option<&'a str>, after: &'a str) -> Vec<Line<'a>> {
    let normal = Style::default().fg(Color::White);
    let dim = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC);

    let mut lines: Vec<Line> = Vec::new();
    let mut current: Vec<Span> = Vec::new();

    push_segment(&mut lines, &mut current, before, normal);
    current.push(Span::styled("▌", Style::default().fg(Color::Cyan)));
    if let Some(ghost) = ghost {
        push_segment(&mut lines, &mut current, ghost, dim);
    }
    push_segment(&mut lines, &mut current, after, normal);
    lines.push(Line::from(current));
    lines
}

fn push_segment<'a>(
    lines: &mut Vec<Line<'a>>,
    current: &mut Vec<Span<'a>>,
    segment: &'a str,
    style: Style,
) {
    for (i, part) in segment.split('\n').enumerate() {
        if i > 0 {
            lines.push(Line::from(std::mem::take(current)));
        }
        if !part.is_empty() {
            current.push(Span::styled(part, style));
        }
    }
}

fn state_label(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "idle",
        SessionState::PendingFetch => "pending",
        SessionState::InFlight => "fetching",
        SessionState::Suggested => "suggested",
        SessionState::Suppressed => "dismissed",
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
