use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use singlish_chat::{ChatMessage, ChatRole, Safety, PERSONAS};

use crate::app::{App, InputMode};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let chat_column = if app.sidebar_open {
        let [sidebar_area, chat_column] =
            Layout::horizontal([Constraint::Length(32), Constraint::Min(0)]).areas(body_area);
        render_sidebar(app, frame, sidebar_area);
        app.sidebar_area = Some(sidebar_area);
        chat_column
    } else {
        app.sidebar_area = None;
        body_area
    };

    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(chat_column);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_persona_picker {
        render_persona_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let persona = app.session.persona().info();

    let title = Line::from(vec![
        Span::styled(" Multi-Persona Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!(" Active Persona: {} {} ", persona.icon, persona.name),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let current = app.session.persona();

    let items: Vec<ListItem> = PERSONAS
        .iter()
        .enumerate()
        .map(|(i, info)| {
            let selected = info.persona == current;
            let name_style = if selected {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if selected { "●" } else { " " };
            ListItem::new(Text::from(vec![
                Line::from(vec![
                    Span::styled(format!("{} ", marker), Style::default().fg(Color::Blue)),
                    Span::styled(format!("{} {} ", i + 1, info.icon), Style::default().fg(Color::DarkGray)),
                    Span::styled(info.name, name_style),
                ]),
                Line::from(Span::styled(
                    format!("      {}", info.description),
                    Style::default().fg(Color::DarkGray),
                )),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Persona ");

    frame.render_widget(List::new(items).block(block), area);
}

fn message_label(msg: &ChatMessage) -> Line<'static> {
    let time = msg.short_time().map(|t| format!(" {}", t)).unwrap_or_default();

    match msg.role {
        ChatRole::User => Line::from(vec![
            Span::styled("You:", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(time, Style::default().fg(Color::DarkGray)),
        ]),
        ChatRole::Assistant => {
            let mut spans = vec![
                Span::styled("Bot:", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::styled(time, Style::default().fg(Color::DarkGray)),
            ];
            if msg.is_error {
                spans.push(Span::styled(" [error]", Style::default().fg(Color::Red)));
            }
            match msg.safety {
                Some(Safety::Safe) => {
                    spans.push(Span::styled(" [Safe]", Style::default().fg(Color::Green)))
                }
                Some(Safety::Unsafe) => spans.push(Span::styled(
                    " [Unsafe]",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Some(Safety::Unknown) | None => {}
            }
            Line::from(spans)
        }
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let persona = app.session.persona();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(format!(" Messages ({}) ", app.session.messages().len()));

    let text = if app.session.messages().is_empty() && !app.session.is_loading() {
        Text::from(Span::styled(
            format!("Say something to {} lah...", persona.display_name()),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.session.messages() {
            lines.push(message_label(msg));
            let content_style = if msg.is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            for line in msg.content.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), content_style)));
            }
            lines.push(Line::default());
        }

        if app.session.is_loading() {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("typing{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let title = if app.session.is_loading() {
        " Waiting for reply... "
    } else {
        " Message (Enter to send) "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let input = app.session.pending_input();
    let content = if input.is_empty() {
        let placeholder = if app.session.backend_ready() {
            "Type your message..."
        } else {
            "Connecting to backend..."
        };
        Span::styled(placeholder, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(input)
    };

    // Keep the cursor in view on long input
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_col = cursor_column(input, app.input_cursor);
    let scroll_x = cursor_col.saturating_sub(inner_width.saturating_sub(1));

    let paragraph = Paragraph::new(Line::from(content))
        .block(block)
        .scroll((0, scroll_x.min(u16::MAX as usize) as u16));
    frame.render_widget(paragraph, area);

    if editing && !app.show_persona_picker {
        let x = area.x + 1 + (cursor_col - scroll_x) as u16;
        frame.set_cursor_position(Position::new(x, area.y + 1));
    }
}

/// Terminal column of the caret: display width of the text before it.
fn cursor_column(input: &str, cursor: usize) -> usize {
    let end = input
        .char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    Span::raw(&input[..end]).width()
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let hints = match app.input_mode {
        InputMode::Normal => " i:type  r:retry  n:new chat  p/1-4:persona  b:sidebar  q:quit ",
        InputMode::Editing => " Enter:send  Esc:normal  PgUp/PgDn:scroll ",
    };

    let (status_text, status_style) = if app.session.backend_ready() {
        (" ● online ", Style::default().fg(Color::Green))
    } else {
        (" ○ connecting ", Style::default().fg(Color::Yellow))
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(Color::Gray)),
        Span::styled(status_text, status_style),
        Span::styled(app.base_url.clone(), Style::default().fg(Color::DarkGray)),
    ];
    if let Some(err) = app.session.last_error() {
        spans.push(Span::styled(format!("  {}", err), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_persona_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 44.min(area.width.saturating_sub(4));
    let popup_height = (PERSONAS.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Persona (Enter to select, Esc to cancel) ");

    let current = app.session.persona();
    let items: Vec<ListItem> = PERSONAS
        .iter()
        .map(|info| {
            let style = if info.persona == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} {} - {}", info.icon, info.name, info.description)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.persona_picker_state);
}
