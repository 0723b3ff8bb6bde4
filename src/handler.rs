use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use singlish_chat::Persona;

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => insert_text(app, &text),
        AppEvent::Resize => {
            if app.follow_tail {
                app.scroll_to_bottom();
            }
        }
        AppEvent::Tick => app.tick(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_persona_picker {
        handle_persona_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('r') => app.retry(),
        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Char('p') => app.open_persona_picker(),
        KeyCode::Char('b') => app.sidebar_open = !app.sidebar_open,
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            if let Some(persona) = Persona::from_index(index) {
                app.choose_persona(persona);
            }
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.half_page())
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.half_page())
        }
        KeyCode::PageDown => app.scroll_down(app.half_page()),
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::Char('G') | KeyCode::End => {
            app.follow_tail = true;
            app.scroll_to_bottom();
        }
        KeyCode::Char('g') | KeyCode::Home => app.scroll_up(u16::MAX),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let input = app.session.pending_input_mut();
                let byte_pos = char_to_byte_index(input, app.input_cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let cursor = app.input_cursor;
            let input = app.session.pending_input_mut();
            if cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.pending_input().chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.session.pending_input().chars().count();
        }
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::PageDown => app.scroll_down(app.half_page()),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.session.set_pending_input(String::new());
            app.input_cursor = 0;
        }
        KeyCode::Char(c) => {
            let cursor = app.input_cursor;
            let input = app.session.pending_input_mut();
            let byte_pos = char_to_byte_index(input, cursor);
            input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_persona_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.show_persona_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.persona_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.persona_picker_nav_up(),
        KeyCode::Enter => app.select_picked_persona(),
        _ => {}
    }
}

/// Inserts pasted text at the cursor; newlines become spaces since Enter sends.
fn insert_text(app: &mut App, text: &str) {
    if app.input_mode != InputMode::Editing || app.show_persona_picker {
        return;
    }
    let cleaned: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    let cursor = app.input_cursor;
    let input = app.session.pending_input_mut();
    let byte_pos = char_to_byte_index(input, cursor);
    input.insert_str(byte_pos, &cleaned);
    app.input_cursor += cleaned.chars().count();
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Sidebar entries are two rows tall, inside a one-cell border.
fn sidebar_persona_at(row: u16, rect: Rect) -> Option<Persona> {
    let inner_row = row.checked_sub(rect.y + 1)?;
    Persona::from_index((inner_row / 2) as usize)
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.show_persona_picker {
        return;
    }

    if let Some(sidebar) = app.sidebar_area {
        if point_in_rect(mouse.column, mouse.row, sidebar) {
            if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                if let Some(persona) = sidebar_persona_at(mouse.row, sidebar) {
                    app.choose_persona(persona);
                }
            }
            return;
        }
    }

    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
