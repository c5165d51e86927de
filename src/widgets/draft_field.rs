use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use tui_textarea::TextArea;

use crate::app::Effect;
use crate::services::drafts::DraftStore;
use crate::theme::Theme;
use crate::ui::ToastLevel;

/// Free-text field whose content is written to the draft store on every edit,
/// keyed by `local_id`, so an unsent entry comes back after a restart.
pub struct DraftField {
    local_id: String,
    textarea: TextArea<'static>,
    store: DraftStore,
    theme: Theme,
}

impl Default for DraftField {
    fn default() -> Self {
        Self::new("unsent", DraftStore::in_memory())
    }
}

fn fresh_textarea(text: &str) -> TextArea<'static> {
    let mut ta = if text.is_empty() {
        TextArea::default()
    } else {
        TextArea::from(text.split('\n').map(|l| l.to_string()))
    };
    ta.set_placeholder_text("New entry…");
    ta
}

// Editing keys arrive from crossterm 0.27; tui-textarea expects ratatui's re-export.
fn to_textarea_key(key: KeyEvent) -> Option<rt_event::KeyEvent> {
    let code = match key.code {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Enter => rt_event::KeyCode::Enter,
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Up => rt_event::KeyCode::Up,
        KeyCode::Down => rt_event::KeyCode::Down,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        KeyCode::PageUp => rt_event::KeyCode::PageUp,
        KeyCode::PageDown => rt_event::KeyCode::PageDown,
        _ => return None,
    };
    let mods = rt_event::KeyModifiers::from_bits_truncate(key.modifiers.bits());
    Some(rt_event::KeyEvent::new(code, mods))
}

impl DraftField {
    pub fn new(local_id: impl Into<String>, store: DraftStore) -> Self {
        let local_id = local_id.into();
        let text = store.get(&local_id).unwrap_or_default().to_string();
        Self {
            textarea: fresh_textarea(&text),
            local_id,
            store,
            theme: Theme::default(),
        }
    }

    pub fn into_store(self) -> DraftStore {
        self.store
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn value(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn set_text(&mut self, text: &str) -> Result<()> {
        self.textarea = fresh_textarea(text);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.textarea = fresh_textarea("");
        self.store.clear(&self.local_id)
    }

    fn persist(&mut self) -> Result<()> {
        let text = self.value();
        self.store.set(&self.local_id, &text)
    }
}

impl crate::widgets::Widget for DraftField {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, _tick: u64) {
        let title = if focused {
            "Message · Ctrl+S send"
        } else {
            "Message"
        };
        self.textarea
            .set_block(crate::widgets::chrome::panel_block(title, focused, &self.theme));
        if focused {
            self.textarea
                .set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        } else {
            self.textarea.set_cursor_style(Style::default());
        }
        f.render_widget(&self.textarea, area);
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let Some(ev) = to_textarea_key(key) else {
            return Vec::new();
        };
        if !self.textarea.input(ev) {
            return Vec::new();
        }
        match self.persist() {
            Ok(()) => Vec::new(),
            Err(e) => vec![Effect::ShowToast {
                text: format!("draft not saved: {e:#}"),
                level: ToastLevel::Error,
                seconds: 5,
            }],
        }
    }
}
