use super::*;
use crate::widgets::structured_input::SubmitState;
use pretty_assertions::assert_eq;

fn button(label: &str, kv_json: &str) -> ChoiceButton {
    ChoiceButton {
        key: format!("choice:{label}"),
        label: label.into(),
        kv_json: kv_json.into(),
        action: "bot1/structuredInput".into(),
        disabled: false,
    }
}

fn reply(status: u16, url: &str) -> Result<HttpReply, String> {
    Ok(HttpReply {
        status,
        url: url.into(),
    })
}

#[test]
fn submit_flips_state_before_the_post() {
    let mut st = AppState::default();
    let effects = update(
        &mut st,
        AppMsg::SubmitChoice(button("dose + 5mg", "{\"k\":\"d\"}")),
    );
    assert_eq!(
        st.submit,
        SubmitState::Submitting {
            label: "dose + 5mg".into()
        }
    );
    assert_eq!(
        effects,
        vec![Effect::PostStructured {
            label: "dose + 5mg".into(),
            kv_json: "{\"k\":\"d\"}".into(),
        }]
    );
}

#[test]
fn second_submit_while_in_flight_is_ignored() {
    let mut st = AppState::default();
    let _ = update(&mut st, AppMsg::SubmitChoice(button("a", "{}")));
    let effects = update(&mut st, AppMsg::SubmitChoice(button("b", "{}")));
    assert!(effects.is_empty());
    assert_eq!(st.submit, SubmitState::Submitting { label: "a".into() });
    assert!(st.debug_log.back().unwrap().starts_with("ignored b"));
}

#[test]
fn ok_response_navigates() {
    let mut st = AppState::default();
    let _ = update(&mut st, AppMsg::SubmitChoice(button("a", "{}")));
    let effects = update(&mut st, AppMsg::StructuredResponse(reply(200, "https://x/ok")));
    assert_eq!(
        effects,
        vec![Effect::Navigate {
            url: "https://x/ok".into()
        }]
    );
    assert!(st.submit.buttons_disabled());
}

#[test]
fn non_200_and_transport_errors_stay_disabled() {
    for outcome in [reply(404, "https://x/nope"), Err("timed out".to_string())] {
        let mut st = AppState::default();
        let _ = update(&mut st, AppMsg::SubmitChoice(button("a", "{}")));
        let effects = update(&mut st, AppMsg::StructuredResponse(outcome));
        assert!(effects.is_empty());
        assert!(matches!(st.submit, SubmitState::Failed { .. }));
        // no retry from the failed state
        assert!(update(&mut st, AppMsg::SubmitChoice(button("a", "{}"))).is_empty());
    }
}

#[test]
fn toggle_hidden_leaves_submission_alone() {
    let mut st = AppState::default();
    let _ = update(&mut st, AppMsg::SubmitChoice(button("a", "{}")));
    let _ = update(&mut st, AppMsg::ToggleHidden);
    assert!(st.hidden_open);
    assert_eq!(st.submit, SubmitState::Submitting { label: "a".into() });
    let _ = update(&mut st, AppMsg::ToggleHidden);
    assert!(!st.hidden_open);
}

#[test]
fn empty_message_is_not_sent() {
    let mut st = AppState::default();
    let effects = update(&mut st, AppMsg::SubmitMessage);
    assert!(!st.message_pending);
    assert!(matches!(
        effects.as_slice(),
        [Effect::ShowToast {
            level: ToastLevel::Info,
            ..
        }]
    ));
}

#[test]
fn message_ok_clears_draft_and_lands_on_saved() {
    let mut st = AppState::default();
    st.draft.set_text("walked 5km").unwrap();
    let effects = update(&mut st, AppMsg::SubmitMessage);
    assert_eq!(
        effects,
        vec![Effect::PostMessage {
            msg: "walked 5km".into()
        }]
    );
    assert!(st.message_pending);
    // pending send blocks a second one
    assert!(update(&mut st, AppMsg::SubmitMessage).is_empty());

    let effects = update(&mut st, AppMsg::MessageResponse(reply(200, "https://x/msg")));
    assert_eq!(effects, vec![Effect::ClearDraft]);
    assert!(!st.message_pending);
    assert_eq!(
        st.view,
        View::Landed {
            url: None,
            note: "saved".into()
        }
    );
}

#[test]
fn message_failure_keeps_draft_and_toasts() {
    let mut st = AppState::default();
    st.draft.set_text("walked 5km").unwrap();
    let _ = update(&mut st, AppMsg::SubmitMessage);
    let effects = update(&mut st, AppMsg::MessageResponse(reply(500, "https://x/msg")));
    assert_eq!(st.view, View::Entry);
    assert_eq!(st.draft.value(), "walked 5km");
    match effects.as_slice() {
        [Effect::ShowToast { text, level, .. }] => {
            assert_eq!(*level, ToastLevel::Error);
            assert!(text.contains("HTTP 500"));
        }
        other => panic!("expected an error toast, got {other:?}"),
    }
}

#[test]
fn reload_is_left_to_the_effect_runner() {
    let mut st = AppState::default();
    assert_eq!(update(&mut st, AppMsg::Reload), vec![Effect::ReloadPage]);
}
