use ratatui::layout::Rect;
use ratatui::text::Span;
use ratatui::widgets::ListState;
use tracing::warn;

use singlish_chat::{ChatMessage, ChatSession, Config, Persona, SessionEvent, PERSONAS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,
    pub base_url: String,

    // Input box
    pub input_cursor: usize, // cursor position in chars, not bytes

    // Chat scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area, set during render
    pub chat_width: u16,  // Inner width of chat area, set during render
    pub follow_tail: bool,

    // Layout
    pub sidebar_open: bool,
    pub show_persona_picker: bool,
    pub persona_picker_state: ListState,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sidebar_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for typing indicator
}

impl App {
    pub fn new(session: ChatSession, base_url: String) -> Self {
        let mut persona_picker_state = ListState::default();
        persona_picker_state.select(Some(session.persona().index()));

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session,
            base_url,

            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,

            sidebar_open: true,
            show_persona_picker: false,
            persona_picker_state,

            chat_area: None,
            sidebar_area: None,

            animation_frame: 0,
        }
    }

    pub fn on_session_event(&mut self, event: SessionEvent) {
        self.session.apply(event);
        if self.follow_tail {
            self.scroll_to_bottom();
        }
    }

    pub fn submit_input(&mut self) {
        if self.session.submit_pending_input() {
            self.input_cursor = 0;
            self.follow_tail = true;
            self.scroll_to_bottom();
        }
    }

    pub fn retry(&mut self) {
        if self.session.retry_last_message() {
            self.follow_tail = true;
            self.scroll_to_bottom();
        }
    }

    pub fn new_chat(&mut self) {
        self.session.clear_messages();
        self.session.set_pending_input(String::new());
        self.input_cursor = 0;
        self.chat_scroll = 0;
        self.follow_tail = true;
    }

    /// Switches persona and remembers it as the default for next time.
    pub fn choose_persona(&mut self, persona: Persona) {
        self.session.set_persona(persona);
        self.persona_picker_state.select(Some(persona.index()));
        if let Err(e) = Config::save_default_persona(persona) {
            warn!(error = %e, "could not save default persona");
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick(&mut self) {
        self.session.drain_events();
        if self.session.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Persona picker
    pub fn open_persona_picker(&mut self) {
        self.persona_picker_state.select(Some(self.session.persona().index()));
        self.show_persona_picker = true;
    }

    pub fn persona_picker_nav_down(&mut self) {
        let i = self.persona_picker_state.selected().unwrap_or(0);
        self.persona_picker_state.select(Some((i + 1).min(PERSONAS.len() - 1)));
    }

    pub fn persona_picker_nav_up(&mut self) {
        let i = self.persona_picker_state.selected().unwrap_or(0);
        self.persona_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_picked_persona(&mut self) {
        if let Some(persona) = self.persona_picker_state.selected().and_then(Persona::from_index) {
            self.choose_persona(persona);
        }
        self.show_persona_picker = false;
    }

    // Chat scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        self.follow_tail = self.chat_scroll >= max_scroll;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    /// Scroll chat to bottom so the newest message (or the typing indicator)
    /// is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.total_chat_lines().saturating_sub(visible_height)
    }

    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        let mut total: usize = self
            .session
            .messages()
            .iter()
            .map(|msg| message_line_count(msg, wrap_width))
            .sum();

        if self.session.is_loading() {
            total += 2; // label + "typing..."
        }

        total.min(u16::MAX as usize) as u16
    }
}

/// Rendered height of one message: label line, wrapped content, blank line.
pub fn message_line_count(msg: &ChatMessage, wrap_width: usize) -> usize {
    let wrap_width = wrap_width.max(1);
    let content: usize = msg
        .content
        .lines()
        .map(|line| wrapped_rows(line, wrap_width))
        .sum();
    content.max(1) + 2
}

/// Rows one line takes when word-wrapped to `width` columns. Words wider
/// than a row are broken across rows, as the chat paragraph does.
fn wrapped_rows(line: &str, width: usize) -> usize {
    let mut rows = 1;
    let mut col = 0;

    for word in line.split(' ') {
        let w = Span::raw(word).width();
        let needed = if col == 0 { w } else { col + 1 + w };
        if needed <= width {
            col = needed;
            continue;
        }

        if col > 0 {
            rows += 1;
        }
        rows += w.saturating_sub(1) / width;
        col = if w == 0 { 0 } else { (w - 1) % width + 1 };
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_line_count_wraps() {
        let msg = ChatMessage::user("a".repeat(25));
        assert_eq!(message_line_count(&msg, 10), 3 + 2);

        let multi = ChatMessage::user("one\n\ntwo");
        assert_eq!(message_line_count(&multi, 10), 3 + 2);

        let empty = ChatMessage::user("");
        assert_eq!(message_line_count(&empty, 10), 1 + 2);
    }

    #[test]
    fn test_wrapping_breaks_on_words() {
        // 14 chars fit in two 7-column rows, but word wrap needs three
        assert_eq!(wrapped_rows("aaaaa bbbbb cc", 7), 3);
        assert_eq!(wrapped_rows("hello world", 11), 1);
        assert_eq!(wrapped_rows("hello world", 10), 2);

        let reply = ChatMessage::user("aaaaa bbbbb cc");
        assert_eq!(message_line_count(&reply, 7), 3 + 2);
    }

    #[test]
    fn test_wrapping_uses_display_width() {
        assert_eq!(wrapped_rows("😎😎😎", 4), 2);
        assert_eq!(wrapped_rows("你好 你好", 5), 2);
    }
}
