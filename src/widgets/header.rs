use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::ui::AppState;

/// Bot name, choice count and submission state on the first line; the
/// history link under it.
pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let theme = &state.theme;
    let busy = state.submit.buttons_disabled() || state.status_text.is_some();
    let border = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(if busy {
            theme.border_focused()
        } else {
            theme.border_unfocused()
        });
    let inner = border.inner(area);
    f.render_widget(border, area);

    let botname = if state.config.botname.is_empty() {
        "(no bot)"
    } else {
        state.config.botname.as_str()
    };
    let title = Line::from(vec![
        Span::styled(format!(" {botname}"), theme.text_active_bold()),
        Span::styled(
            format!("  ·  {} choices  ·  ", state.input.leaf_count()),
            theme.text_muted(),
        ),
        Span::styled(state.submit.name(), theme.text_editing_bold()),
    ]);
    let history = match state.history_url() {
        Some(url) => format!(" history: {url}"),
        None => String::new(),
    };
    let p = Paragraph::new(vec![
        title,
        Line::from(Span::styled(history, theme.text_muted())),
    ]);
    f.render_widget(p, inner);
}
