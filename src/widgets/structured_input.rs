use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::model::ConfigNode;
use crate::nav::flatten::{flatten, FlatChoice};
use crate::nav::keys::{button_label, choice_key};
use crate::nav::partition::{partition, FeaturedSet};
use crate::services::submit::HttpReply;
use crate::ui::AppState;
use crate::widgets::chrome::panel_block;

/// Submission lifecycle shared by every button of one widget. Only `Idle`
/// accepts a submit; nothing in the widget moves back to `Idle`, a page
/// rebuild does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting {
        label: String,
    },
    Succeeded {
        url: String,
    },
    Failed {
        reason: String,
    },
}

impl SubmitState {
    pub fn buttons_disabled(&self) -> bool {
        !matches!(self, SubmitState::Idle)
    }

    /// Idle -> Submitting. Returns false (and changes nothing) in any other state.
    pub fn begin(&mut self, label: &str) -> bool {
        if self.buttons_disabled() {
            return false;
        }
        *self = SubmitState::Submitting {
            label: label.to_string(),
        };
        true
    }

    /// Submitting -> Succeeded | Failed. Returns the navigation target on success.
    pub fn finish(&mut self, outcome: &Result<HttpReply, String>) -> Option<String> {
        if !matches!(self, SubmitState::Submitting { .. }) {
            return None;
        }
        match outcome {
            Ok(reply) if reply.is_ok() => {
                *self = SubmitState::Succeeded {
                    url: reply.url.clone(),
                };
                Some(reply.url.clone())
            }
            Ok(reply) => {
                *self = SubmitState::Failed {
                    reason: format!("HTTP {}", reply.status),
                };
                None
            }
            Err(e) => {
                *self = SubmitState::Failed { reason: e.clone() };
                None
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SubmitState::Idle => "idle",
            SubmitState::Submitting { .. } => "submitting",
            SubmitState::Succeeded { .. } => "succeeded",
            SubmitState::Failed { .. } => "failed",
        }
    }
}

/// One mini-form: the hidden `kv` field and its submit button.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceButton {
    pub key: String,
    pub label: String,
    pub kv_json: String,
    pub action: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuredView {
    Loading,
    Ready {
        featured: Vec<ChoiceButton>,
        hidden: Vec<ChoiceButton>,
        hidden_open: bool,
    },
}

/// A selectable line of the rendered widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Row<'a> {
    Button(&'a ChoiceButton),
    Summary { count: usize, open: bool },
}

impl StructuredView {
    pub fn rows(&self) -> Vec<Row<'_>> {
        match self {
            StructuredView::Loading => Vec::new(),
            StructuredView::Ready {
                featured,
                hidden,
                hidden_open,
            } => {
                let mut out: Vec<Row> = featured.iter().map(Row::Button).collect();
                if !hidden.is_empty() {
                    out.push(Row::Summary {
                        count: hidden.len(),
                        open: *hidden_open,
                    });
                    if *hidden_open {
                        out.extend(hidden.iter().map(Row::Button));
                    }
                }
                out
            }
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &ChoiceButton> {
        let (featured, hidden): (&[ChoiceButton], &[ChoiceButton]) = match self {
            StructuredView::Loading => (&[][..], &[][..]),
            StructuredView::Ready {
                featured, hidden, ..
            } => (featured.as_slice(), hidden.as_slice()),
        };
        featured.iter().chain(hidden.iter())
    }
}

/// The structured-input element: tree and bot name are injected once; the
/// view is derived from them on every render.
#[derive(Debug, Clone, Default)]
pub struct StructuredInput {
    config: Option<ConfigNode>,
    botname: String,
    featured: FeaturedSet,
    separator: String,
}

impl StructuredInput {
    pub fn new(
        config: Option<ConfigNode>,
        botname: impl Into<String>,
        featured: FeaturedSet,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            config,
            botname: botname.into(),
            featured,
            separator: separator.into(),
        }
    }

    pub fn botname(&self) -> &str {
        &self.botname
    }

    pub fn action(&self) -> String {
        format!("{}/structuredInput", self.botname)
    }

    pub fn leaf_count(&self) -> usize {
        self.config
            .as_ref()
            .filter(|c| c.has_choices())
            .map(ConfigNode::leaf_count)
            .unwrap_or(0)
    }

    fn button(&self, choice: &FlatChoice, disabled: bool) -> ChoiceButton {
        ChoiceButton {
            key: choice_key(choice),
            label: button_label(choice, &self.separator),
            kv_json: serde_json::Value::Object(choice.kv.clone()).to_string(),
            action: self.action(),
            disabled,
        }
    }

    pub fn render(&self, state: &SubmitState, hidden_open: bool) -> StructuredView {
        let Some(root) = self.config.as_ref().filter(|c| c.has_choices()) else {
            return StructuredView::Loading;
        };
        let disabled = state.buttons_disabled();
        let groups = partition(flatten(root), &self.featured);
        StructuredView::Ready {
            featured: groups
                .featured
                .iter()
                .map(|c| self.button(c, disabled))
                .collect(),
            hidden: groups
                .hidden
                .iter()
                .map(|c| self.button(c, disabled))
                .collect(),
            hidden_open,
        }
    }
}

pub(crate) fn compute_scroll_window(total: usize, selected: usize, inner_h: u16) -> (usize, usize) {
    if inner_h == 0 || total == 0 {
        return (0, 0);
    }
    let sel = selected.min(total.saturating_sub(1));
    let ih = inner_h as usize;
    let start = sel.saturating_sub(ih - 1);
    let end = (start + ih).min(total);
    (start, end)
}

pub fn draw_structured_input(f: &mut Frame, area: Rect, state: &AppState, focused: bool) {
    let theme = &state.theme;
    let title = format!("Structured input · {}", state.input.botname());
    let block = panel_block(&title, focused, theme);
    let view = state.input.render(&state.submit, state.hidden_open);
    if let StructuredView::Loading = view {
        let p = Paragraph::new("loading...")
            .style(theme.text_muted())
            .block(block);
        f.render_widget(p, area);
        return;
    }
    let rows = view.rows();
    let inner = block.inner(area);
    // one line at the bottom shows the payload of the selected button
    let list_h = inner.height.saturating_sub(1);
    let (start, end) = compute_scroll_window(rows.len(), state.selected, list_h);
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(idx, row)| {
            let is_sel = focused && idx == state.selected;
            let sel = if is_sel { "> " } else { "  " };
            let (text, style) = match row {
                Row::Button(b) => {
                    let style = if b.disabled {
                        theme.text_muted()
                    } else {
                        theme.text_active_bold()
                    };
                    (format!("{sel}[ {} ]", b.label), style)
                }
                Row::Summary { count, open } => {
                    let chevron = if *open { "▾" } else { "▸" };
                    (format!("{sel}{chevron} more ({count})"), theme.text_muted())
                }
            };
            let mut item = ListItem::new(text).style(style);
            if is_sel {
                item = item.style(theme.list_cursor_style());
            }
            item
        })
        .collect();
    f.render_widget(block, area);
    let list_area = Rect {
        height: list_h,
        ..inner
    };
    f.render_widget(List::new(items), list_area);

    let detail = match rows.get(state.selected) {
        Some(Row::Button(b)) => format!("{} kv={}", b.action, b.kv_json),
        _ => String::new(),
    };
    let state_line = match &state.submit {
        SubmitState::Idle => String::new(),
        SubmitState::Submitting { label } => format!("submitting {label}…  "),
        SubmitState::Succeeded { url } => format!("-> {url}  "),
        SubmitState::Failed { reason } => format!("not recorded ({reason}), r reloads  "),
    };
    let detail_area = Rect {
        y: inner.y.saturating_add(list_h),
        height: inner.height.min(1),
        ..inner
    };
    let p = Paragraph::new(Line::from(vec![
        Span::styled(state_line, theme.text_editing_bold()),
        Span::styled(detail, theme.text_muted()),
    ]));
    f.render_widget(p, detail_area);
}
