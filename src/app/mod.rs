use crate::services::submit::HttpReply;
use crate::ui::{AppState, ToastLevel, View};
use crate::widgets::structured_input::ChoiceButton;

pub enum AppMsg {
    SubmitChoice(ChoiceButton),
    StructuredResponse(Result<HttpReply, String>),
    ToggleHidden,
    SubmitMessage,
    MessageResponse(Result<HttpReply, String>),
    Reload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PostStructured {
        label: String,
        kv_json: String,
    },
    PostMessage {
        msg: String,
    },
    Navigate {
        url: String,
    },
    ClearDraft,
    ReloadPage,
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        SubmitChoice(button) => {
            // flips before the request goes out: all buttons are disabled from the next frame on
            if !state.submit.begin(&button.label) {
                state.dbg(format!(
                    "ignored {} (submission {})",
                    button.label,
                    state.submit.name()
                ));
                return effects;
            }
            state.dbg(format!("submit {} kv={}", button.key, button.kv_json));
            effects.push(Effect::PostStructured {
                label: button.label,
                kv_json: button.kv_json,
            });
        }
        StructuredResponse(outcome) => {
            match &outcome {
                Ok(reply) => state.dbg(format!("structuredInput -> {} {}", reply.status, reply.url)),
                Err(e) => state.dbg(format!("structuredInput failed: {e}")),
            }
            if let Some(url) = state.submit.finish(&outcome) {
                effects.push(Effect::Navigate { url });
            }
        }
        ToggleHidden => {
            state.hidden_open = !state.hidden_open;
        }
        SubmitMessage => {
            if state.message_pending {
                return effects;
            }
            let msg = state.draft.value();
            if msg.trim().is_empty() {
                effects.push(Effect::ShowToast {
                    text: "Nothing to send".into(),
                    level: ToastLevel::Info,
                    seconds: 2,
                });
                return effects;
            }
            state.message_pending = true;
            state.status_text = Some("Sending...".into());
            state.dbg(format!("send message ({} chars)", msg.chars().count()));
            effects.push(Effect::PostMessage { msg });
        }
        MessageResponse(outcome) => {
            state.message_pending = false;
            state.status_text = None;
            match outcome {
                Ok(reply) if reply.is_ok() => {
                    state.dbg(format!("message -> {} {}", reply.status, reply.url));
                    effects.push(Effect::ClearDraft);
                    state.view = View::Landed {
                        url: None,
                        note: "saved".into(),
                    };
                }
                Ok(reply) => {
                    state.dbg(format!("message -> {} {}", reply.status, reply.url));
                    effects.push(Effect::ShowToast {
                        text: format!("Message not saved: HTTP {}", reply.status),
                        level: ToastLevel::Error,
                        seconds: 5,
                    });
                }
                Err(e) => {
                    state.dbg(format!("message failed: {e}"));
                    effects.push(Effect::ShowToast {
                        text: format!("Message not saved: {e}"),
                        level: ToastLevel::Error,
                        seconds: 5,
                    });
                }
            }
        }
        Reload => {
            effects.push(Effect::ReloadPage);
        }
    }
    effects
}

#[cfg(test)]
mod tests;
