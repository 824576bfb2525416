//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, resize)
//! - ChatController for the streaming chat core
//! - DisplayState for rendering
//!
//! The TUI holds no chat logic. It forwards submit/cancel/clear to the
//! controller, polls it each frame, applies the resulting events to
//! DisplayState, and renders.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

use babbel_core::{
    ChatConfig, ChatController, ChatState, HttpBackend, MessageRole, NotifyLevel, SubmitError,
};

use crate::display::DisplayState;
use crate::theme;

/// Input box height (lines), border included.
const INPUT_HEIGHT: u16 = 3;

/// Main application state.
pub struct App {
    /// Is the app still running?
    running: bool,
    /// The chat controller (core).
    controller: ChatController<HttpBackend>,
    /// Events from the controller.
    events: mpsc::Receiver<babbel_core::ChatEvent>,
    /// Display state derived from chat events.
    display: DisplayState,
    /// User input buffer.
    input_buffer: String,
    /// Scroll offset (lines from bottom, 0 = latest).
    scroll_offset: usize,
    /// Total rendered conversation lines (for scroll bounds).
    total_lines: usize,
    /// Terminal size.
    size: (u16, u16),
}

impl App {
    /// Create a new App instance from configuration.
    pub fn new(config: ChatConfig) -> anyhow::Result<Self> {
        let size = crossterm::terminal::size()?;
        let (tx, rx) = mpsc::channel(1024);
        let backend = HttpBackend::new(config.endpoint.clone());
        let controller = ChatController::new(backend, config, tx);

        Ok(Self {
            running: true,
            controller,
            events: rx,
            display: DisplayState::new(),
            input_buffer: String::new(),
            scroll_offset: 0,
            total_lines: 0,
            size,
        })
    }

    /// Main event loop.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        // ~30 FPS is plenty for text reveal.
        let frame_duration = Duration::from_millis(33);
        let mut event_stream = EventStream::new();

        // Render the initial frame immediately so the user sees the UI.
        self.render(terminal)?;

        // One advisory health check; a warning lands on the status line
        // if the API is down.
        self.controller.start().await;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Terminal events - highest priority.
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        match event {
                            // Only handle Press events (not Release or Repeat).
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key(key).await;
                            }
                            Event::Resize(w, h) => {
                                self.size = (w, h);
                            }
                            _ => {}
                        }
                    }
                }

                // Frame tick.
                () = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            // Advance the stream and apply whatever the core produced.
            self.controller.poll().await;
            while let Ok(event) = self.events.try_recv() {
                self.display.apply(event);
            }

            self.render(terminal)?;

            // Frame rate limiting.
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Handle keyboard input.
    async fn handle_key(&mut self, key: event::KeyEvent) {
        match key.code {
            // Esc cancels an in-flight response, or quits when idle.
            KeyCode::Esc => {
                if self.controller.is_busy() {
                    self.controller.cancel().await;
                } else {
                    self.running = false;
                }
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.controller.cancel().await;
                self.running = false;
            }

            // Clear the conversation.
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = self.controller.clear().await;
            }

            // Submit.
            KeyCode::Enter => {
                if !self.input_buffer.trim().is_empty() {
                    let message = std::mem::take(&mut self.input_buffer);
                    match self.controller.submit(message.clone()).await {
                        Ok(()) => {
                            self.scroll_offset = 0;
                        }
                        Err(SubmitError::Empty) => {}
                        Err(SubmitError::Busy(_)) => {
                            // Keep what the user typed; they can resend
                            // once the stream finishes.
                            self.input_buffer = message;
                        }
                    }
                }
            }

            // Typing.
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }

            // Conversation scrolling.
            KeyCode::PageUp => {
                let page = usize::from(self.size.1.saturating_sub(INPUT_HEIGHT + 1)) / 2;
                let max_scroll = self.total_lines.saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + page).min(max_scroll);
            }
            KeyCode::PageDown => {
                let page = usize::from(self.size.1.saturating_sub(INPUT_HEIGHT + 1)) / 2;
                self.scroll_offset = self.scroll_offset.saturating_sub(page);
            }
            KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_offset = 0;
            }

            _ => {}
        }
    }

    /// Render one frame.
    fn render(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(1),
                    Constraint::Length(INPUT_HEIGHT),
                    Constraint::Length(1),
                ])
                .split(frame.area());

            self.total_lines = render_conversation(
                frame,
                chunks[0],
                &self.display,
                self.scroll_offset,
            );
            render_input(frame, chunks[1], &self.input_buffer, self.display.chat_state);
            render_status(frame, chunks[2], &mut self.display);
        })?;
        Ok(())
    }
}

/// Render the conversation area; returns the total wrapped line count.
fn render_conversation(
    frame: &mut ratatui::Frame,
    area: Rect,
    display: &DisplayState,
    scroll_offset: usize,
) -> usize {
    let width = usize::from(area.width.saturating_sub(2)).max(10);
    let mut lines: Vec<Line> = Vec::new();

    for msg in &display.messages {
        let (prefix, prefix_style) = match msg.role {
            MessageRole::User => ("You: ", Style::default().fg(theme::USER_GREEN)),
            MessageRole::Assistant => ("Babbel: ", Style::default().fg(theme::ASSISTANT_CYAN)),
        };

        let mut content = msg.content.clone();
        if msg.streaming {
            // Block cursor marks the live reveal point.
            content.push('\u{258c}');
        }

        let indent = " ".repeat(prefix.len());
        let wrap_width = width.saturating_sub(prefix.len()).max(10);

        // Wrap paragraph by paragraph; textwrap would otherwise fold
        // the response's own newlines into spaces.
        let mut wrapped: Vec<String> = Vec::new();
        for para in content.split('\n') {
            if para.is_empty() {
                wrapped.push(String::new());
            } else {
                wrapped.extend(
                    textwrap::wrap(para, wrap_width)
                        .into_iter()
                        .map(|piece| piece.into_owned()),
                );
            }
        }

        for (i, piece) in wrapped.iter().enumerate() {
            if i == 0 {
                lines.push(Line::from(vec![
                    Span::styled(prefix.to_string(), prefix_style.add_modifier(Modifier::BOLD)),
                    Span::raw(piece.to_string()),
                ]));
            } else {
                lines.push(Line::from(vec![
                    Span::raw(indent.clone()),
                    Span::raw(piece.to_string()),
                ]));
            }
        }
        // Blank separator between messages.
        lines.push(Line::default());
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Start a conversation - type a message below.",
            Style::default().fg(theme::DIM_GRAY),
        )));
    }

    let total = lines.len();
    let visible = usize::from(area.height.saturating_sub(2));

    // scroll_offset counts lines from the bottom; 0 sticks to latest.
    let bottom = total.saturating_sub(scroll_offset.min(total.saturating_sub(1)));
    let top = bottom.saturating_sub(visible);
    let window: Vec<Line> = lines[top..bottom].to_vec();

    let widget = Paragraph::new(window)
        .block(Block::default().borders(Borders::ALL).title(" babbel "));
    frame.render_widget(widget, area);

    total
}

/// Render the input box, with the cursor placed after the typed text.
fn render_input(frame: &mut ratatui::Frame, area: Rect, input: &str, state: ChatState) {
    let title = if state.is_busy() {
        " waiting - Esc to cancel "
    } else {
        " message "
    };
    let widget = Paragraph::new(input)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(widget, area);

    let cursor_x = area.x + 1 + u16::try_from(input.width()).unwrap_or(u16::MAX - 1);
    frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
}

/// Render the status line: state on the left, notice or key hints on
/// the right.
fn render_status(frame: &mut ratatui::Frame, area: Rect, display: &mut DisplayState) {
    let state = display.chat_state;
    let mut spans = vec![Span::styled(
        format!(" {} ", state.description()),
        Style::default().fg(match state {
            ChatState::Errored => theme::ERROR_RED,
            ChatState::Streaming | ChatState::Sending => theme::ASSISTANT_CYAN,
            _ => theme::DIM_GRAY,
        }),
    )];

    if let Some(notice) = display.current_notice() {
        let color = match notice.level {
            NotifyLevel::Info => theme::INFO_BLUE,
            NotifyLevel::Warning => theme::WARNING_AMBER,
            NotifyLevel::Error => theme::ERROR_RED,
        };
        spans.push(Span::styled(
            notice.message.clone(),
            Style::default().fg(color),
        ));
    } else {
        spans.push(Span::styled(
            "Enter send · Esc cancel/quit · Ctrl+L clear · PgUp/PgDn scroll",
            Style::default().fg(theme::DIM_GRAY),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
