use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::{io, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use nexuschat::models::{AppView, ChatSession, Contact, ContactStatus, DeliveryStatus, Message};
use nexuschat::Conversations;

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

const ACCENT: Color = Color::Cyan;

/// What the user asked for. The main loop turns these into state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum UiIntent {
    Quit,
    Select(String),
    Send(String),
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Focus {
    Contacts,
    Search,
    Composer,
}

pub struct ChatUI {
    input: Input,
    search: Input,
    focus: Focus,
    selected: Option<String>, // Highlighted contact id, first row when unset
    view: AppView,
    show_help: bool,
}

impl ChatUI {
    pub fn new() -> Self {
        ChatUI {
            input: Input::default(),
            search: Input::default(),
            focus: Focus::Contacts,
            selected: None,
            view: AppView::ChatList,
            show_help: false,
        }
    }

    /// Text currently in the composer.
    pub fn composer_text(&self) -> &str {
        self.input.value()
    }

    /// Switch to a conversation, restoring its draft into the composer.
    pub fn open_conversation(&mut self, draft: Option<&str>) {
        self.view = AppView::ChatWindow;
        self.focus = Focus::Composer;
        self.input = Input::new(draft.unwrap_or_default().to_string());
    }

    pub fn close_conversation(&mut self) {
        self.view = AppView::ChatList;
        self.focus = Focus::Contacts;
        self.input = Input::default();
    }

    pub fn handle_input(&mut self, convo: &Conversations) -> Result<Option<UiIntent>> {
        if !event::poll(Duration::from_millis(10))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(self.handle_key(key, convo)),
            _ => Ok(None),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, convo: &Conversations) -> Option<UiIntent> {
        // Any key closes the help overlay
        if self.show_help {
            self.show_help = false;
            return None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => return Some(UiIntent::Quit),
            KeyCode::Char('h') if ctrl => {
                self.show_help = true;
                return None;
            }
            KeyCode::Char('f') if ctrl => {
                self.focus = Focus::Search;
                return None;
            }
            KeyCode::Char('p') if ctrl => {
                self.view = match self.view {
                    AppView::ChatWindow if convo.active_contact().is_some() => AppView::Profile,
                    AppView::Profile => AppView::ChatWindow,
                    other => other,
                };
                return None;
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Composer => Focus::Contacts,
                    Focus::Contacts | Focus::Search => Focus::Composer,
                };
                return None;
            }
            KeyCode::Esc => {
                if self.view == AppView::Profile {
                    self.view = AppView::ChatWindow;
                } else if self.focus == Focus::Search {
                    self.focus = Focus::Contacts;
                } else if convo.active_contact_id().is_some() {
                    return Some(UiIntent::Back);
                }
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Contacts => {
                let visible = convo.filter_contacts(self.search.value());
                let row = self.selected_row(&visible);
                match key.code {
                    KeyCode::Up => self.highlight(&visible, row.saturating_sub(1)),
                    KeyCode::Down => self.highlight(&visible, row + 1),
                    KeyCode::Enter => {
                        if let Some(contact) = visible.get(row) {
                            debug!("UI: selecting contact {}", contact.id);
                            return Some(UiIntent::Select(contact.id.clone()));
                        }
                    }
                    _ => {}
                }
                None
            }
            Focus::Search => {
                if key.code == KeyCode::Enter {
                    self.focus = Focus::Contacts;
                } else {
                    self.search.handle_event(&Event::Key(key));
                }
                self.selected = None;
                None
            }
            Focus::Composer => {
                if key.code == KeyCode::Enter {
                    if self.input.value().trim().is_empty() || convo.active_contact_id().is_none() {
                        return None;
                    }
                    let text = self.input.value().to_string();
                    self.input = Input::default();
                    return Some(UiIntent::Send(text));
                }
                self.input.handle_event(&Event::Key(key));
                None
            }
        }
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>, convo: &Conversations) {
        let size = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30), // Chats
                Constraint::Percentage(70), // Conversation
            ])
            .split(size);

        let chat_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // Conversation
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Help line
            ])
            .split(chunks[1]);

        self.draw_sidebar(frame, chunks[0], convo);

        match (self.view, convo.active_contact(), convo.active_session()) {
            (AppView::ChatWindow | AppView::Profile, Some(contact), Some(session)) => {
                draw_conversation(frame, chat_chunks[0], contact, session);
            }
            _ => draw_welcome(frame, chat_chunks[0]),
        }

        // Composer
        let input_block = Block::default()
            .title("Message")
            .borders(Borders::ALL)
            .border_style(self.focus_style(Focus::Composer));
        let input_widget = if self.input.value().is_empty() {
            Paragraph::new(Span::styled("Type a message...", Style::default().fg(Color::DarkGray)))
        } else {
            Paragraph::new(self.input.value())
        }
        .block(input_block);
        frame.render_widget(input_widget, chat_chunks[1]);

        let help = Paragraph::new(Line::from(vec![Span::styled(
            "Ctrl+Q quit | Tab focus | ↑/↓ Enter open | Ctrl+F search | Esc back | Ctrl+P profile | Ctrl+H help",
            Style::default().fg(Color::Gray),
        )]));
        frame.render_widget(help, chat_chunks[2]);

        match self.focus {
            Focus::Composer => frame.set_cursor(
                chat_chunks[1].x + self.input.cursor() as u16 + 1,
                chat_chunks[1].y + 1,
            ),
            Focus::Search => frame.set_cursor(chunks[0].x + self.search.cursor() as u16 + 1, chunks[0].y + 1),
            Focus::Contacts => {}
        }

        if self.view == AppView::Profile {
            if let Some(contact) = convo.active_contact() {
                draw_profile(frame, contact, size);
            }
        }

        if self.show_help {
            draw_help_dialog(frame, size);
        }
    }

    /// Row of the highlighted contact in `visible`. Rows shift as contacts
    /// reorder, so the highlight is kept by id.
    fn selected_row(&self, visible: &[&Contact]) -> usize {
        self.selected
            .as_deref()
            .and_then(|id| visible.iter().position(|c| c.id == id))
            .unwrap_or(0)
    }

    fn highlight(&mut self, visible: &[&Contact], row: usize) {
        if let Some(contact) = visible.get(row) {
            self.selected = Some(contact.id.clone());
        }
    }

    fn focus_style(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    }

    fn draw_sidebar<B: Backend>(&self, frame: &mut Frame<B>, area: Rect, convo: &Conversations) {
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(area);

        let search_text = if self.search.value().is_empty() && self.focus != Focus::Search {
            Span::styled("Search or start new chat", Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(self.search.value())
        };
        let search = Paragraph::new(search_text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.focus_style(Focus::Search)),
        );
        frame.render_widget(search, parts[0]);

        let visible = convo.filter_contacts(self.search.value());
        let preview_width = (area.width as usize).saturating_sub(12);
        let active_id = convo.active_contact_id();

        let items: Vec<ListItem> = visible
            .iter()
            .map(|contact| {
                let is_active = active_id == Some(contact.id.as_str());
                let last = convo.last_message(&contact.id);
                let unread = convo.unread_count(&contact.id);

                let marker = if is_active { "▌" } else { " " };
                let dot = if contact.status == ContactStatus::Online && !contact.is_ai {
                    Span::styled("● ", Style::default().fg(Color::Green))
                } else {
                    Span::raw("  ")
                };
                let name_style = if is_active {
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };

                let mut title = vec![Span::styled(marker, Style::default().fg(ACCENT)), dot];
                if contact.is_ai {
                    title.push(Span::styled("[AI] ", Style::default().fg(ACCENT)));
                }
                title.push(Span::styled(contact.name.clone(), name_style));
                if let Some(last) = last {
                    title.push(Span::styled(
                        format!("  {}", format_time(&last.timestamp)),
                        Style::default().fg(Color::DarkGray),
                    ));
                }

                let preview = if contact.is_typing() {
                    Span::styled("Typing...", Style::default().fg(ACCENT))
                } else if let Some(last) = last {
                    Span::styled(truncate(&last.text, preview_width), Style::default().fg(Color::Gray))
                } else {
                    Span::styled(
                        "No messages yet",
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )
                };
                let mut second = vec![Span::raw("    "), preview];
                if unread > 0 {
                    second.push(Span::styled(
                        format!(" ({})", unread),
                        Style::default().fg(Color::Black).bg(ACCENT),
                    ));
                }

                ListItem::new(Text::from(vec![Line::from(title), Line::from(second)]))
            })
            .collect();

        let mut list_state = ListState::default();
        if self.focus == Focus::Contacts && !items.is_empty() {
            list_state.select(Some(self.selected_row(&visible)));
        }

        let list = List::new(items)
            .block(
                Block::default()
                    .title("Chats")
                    .borders(Borders::ALL)
                    .border_style(self.focus_style(Focus::Contacts)),
            )
            .highlight_style(Style::default().bg(Color::DarkGray));
        frame.render_stateful_widget(list, parts[1], &mut list_state);
    }
}

fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max_chars {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}

fn status_ticks(status: DeliveryStatus) -> Span<'static> {
    match status {
        DeliveryStatus::Sent => Span::styled(" ✓", Style::default().fg(Color::Gray)),
        DeliveryStatus::Delivered => Span::styled(" ✓✓", Style::default().fg(Color::Gray)),
        DeliveryStatus::Read => Span::styled(" ✓✓", Style::default().fg(ACCENT)),
    }
}

/// Left padding that pushes a line of `len` chars against the right edge.
fn right_pad(width: usize, len: usize) -> Span<'static> {
    Span::raw(" ".repeat(width.saturating_sub(len)))
}

fn message_lines(message: &Message, width: usize) -> Vec<Line<'static>> {
    let bubble_width = (width * 65 / 100).max(10);
    let from_me = message.is_from_me();
    let text_style = if from_me {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::Gray)
    };

    let mut lines: Vec<Line> = wrap(&message.text, bubble_width)
        .into_iter()
        .map(|l| {
            let l = l.into_owned();
            if from_me {
                let pad = right_pad(width, l.chars().count());
                Line::from(vec![pad, Span::styled(l, text_style)])
            } else {
                Line::from(Span::styled(l, text_style))
            }
        })
        .collect();

    let time = Span::styled(format_time(&message.timestamp), Style::default().fg(Color::DarkGray));
    if from_me {
        let ticks = status_ticks(message.status);
        let len = time.content.chars().count() + ticks.content.chars().count();
        lines.push(Line::from(vec![right_pad(width, len), time, ticks]));
    } else {
        lines.push(Line::from(time));
    }
    lines.push(Line::from(""));
    lines
}

fn draw_conversation<B: Backend>(f: &mut Frame<B>, area: Rect, contact: &Contact, session: &ChatSession) {
    let width = area.width.saturating_sub(2) as usize; // Borders

    let mut header = vec![Span::styled(
        contact.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if contact.is_ai {
        header.push(Span::styled(" BOT", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)));
    }
    header.push(Span::styled(
        format!(" · {}", contact.presence_label()),
        Style::default().fg(ACCENT),
    ));

    let today = "Today";
    let mut lines = vec![
        Line::from(vec![
            right_pad(width / 2 + today.len() / 2, today.len()),
            Span::styled(today, Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
    ];
    for message in &session.messages {
        lines.extend(message_lines(message, width));
    }
    if contact.is_typing() {
        lines.push(Line::from(Span::styled("• • •", Style::default().fg(ACCENT))));
    }

    let items: Vec<ListItem> = lines.into_iter().map(ListItem::new).collect();

    // Select the last row so the list keeps the newest message in view
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(items.len() - 1));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(Line::from(header)))
        .highlight_style(Style::default());
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_welcome<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Welcome to NexusChat",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Select a contact to start messaging."),
        Line::from(vec![
            Span::raw("Connect with "),
            Span::styled("Nexus AI", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
            Span::raw(" for intelligent assistance."),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "End-to-End Encryption (Simulated)",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let welcome = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(welcome, area);
}

fn centered_popup(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn draw_profile<B: Backend>(f: &mut Frame<B>, contact: &Contact, area: Rect) {
    let popup_area = centered_popup(60, 12, area);

    let popup_block = Block::default()
        .title("Contact Info")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<8}", label), Style::default().fg(Color::Green)),
            Span::raw(value),
        ])
    };

    let mut content = vec![
        Line::from(Span::styled(
            contact.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(contact.presence_label(), Style::default().fg(ACCENT))),
        Line::from(""),
        field("About", contact.bio.clone().unwrap_or_else(|| "-".to_string())),
        field("Phone", contact.phone_number.clone().unwrap_or_else(|| "-".to_string())),
        field("Avatar", contact.avatar.clone()),
    ];
    if contact.is_ai {
        content.push(field("Type", "AI assistant".to_string()));
    }
    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "Esc or Ctrl+P to close",
        Style::default().fg(Color::DarkGray),
    )));

    f.render_widget(Paragraph::new(content), inner_area);
}

fn draw_help_dialog<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let popup_area = centered_popup(70, 18, area);

    let popup_block = Block::default()
        .title("Keyboard Shortcuts")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });

    let shortcuts = [
        ("General", ""),
        ("Ctrl+Q", "Quit"),
        ("Tab", "Switch between chats and composer"),
        ("", ""),
        ("Chats", ""),
        ("↑/↓", "Move through chats"),
        ("Enter", "Open the highlighted chat"),
        ("Ctrl+F", "Search chats by name"),
        ("Esc", "Back to the chat list"),
        ("", ""),
        ("Conversation", ""),
        ("Enter", "Send message"),
        ("Ctrl+P", "Show contact info"),
        ("", ""),
        ("Press any key to close this dialog", ""),
    ];

    let items: Vec<ListItem> = shortcuts
        .iter()
        .map(|(key, desc)| {
            if desc.is_empty() {
                ListItem::new(Text::styled(
                    key.to_string(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<10}", key), Style::default().fg(Color::Green)),
                    Span::raw(desc.to_string()),
                ]))
            }
        })
        .collect();

    f.render_widget(List::new(items), inner_area);
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
