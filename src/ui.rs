use crate::app::{update, AppMsg, Effect};
use crate::model::{duplicate_payload_warnings, validate_page_config, PageConfig};
use crate::nav::partition::FeaturedSet;
use crate::page::focus::{FocusState, Pane};
use crate::services::drafts::{state_dir, DraftStore};
use crate::services::endpoint::Endpoints;
use crate::services::submit::{
    http_timeout, spawn_post_form, HttpTransport, SubmitKind, SubmitMsg, Transport,
};
use crate::theme::Theme;
use crate::widgets::draft_field::DraftField;
use crate::widgets::header::draw_header;
use crate::widgets::status_bar::draw_footer_combined;
use crate::widgets::structured_input::{draw_structured_input, Row, StructuredInput, SubmitState};
use crate::widgets::Widget;
use anyhow::{anyhow, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const CONFIG_FILE: &str = "diarybot.yaml";

#[derive(Default)]
pub struct AppState {
    pub(crate) config: PageConfig,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) endpoints: Option<Endpoints>,
    pub(crate) input: StructuredInput,
    pub(crate) submit: SubmitState,
    pub(crate) hidden_open: bool,
    pub(crate) selected: usize,
    pub(crate) focus: FocusState,
    pub(crate) draft: DraftField,
    pub(crate) message_pending: bool,
    pub(crate) view: View,
    pub(crate) status_text: Option<String>,
    pub(crate) toast: Option<Toast>,
    pub(crate) tick: u64,
    pub(crate) theme: Theme,
    // Debug log (rendered in bottom debug pane)
    pub(crate) debug_log: VecDeque<String>,
    // bumped on every page (re)build; worker replies carry the id they were sent from
    pub(crate) page_id: u64,
    pub(crate) tx: Option<Sender<SubmitMsg>>,
    pub(crate) rx: Option<Receiver<SubmitMsg>>,
    pub(crate) transport: Option<Arc<dyn Transport>>,
}

#[derive(Default, Debug, Clone, PartialEq)]
pub(crate) enum View {
    #[default]
    Entry,
    Landed {
        url: Option<String>,
        note: String,
    },
}

impl AppState {
    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg.into());
    }

    pub(crate) fn history_url(&self) -> Option<Url> {
        self.endpoints
            .as_ref()
            .and_then(|e| e.history(self.config.history_path()).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

pub fn run() -> Result<()> {
    let state_root = state_dir();
    let _log_guard = crate::logging::init_file_logging(&state_root)?;
    let config_path = discover_config()?;
    let config = load_page_config(&config_path)?;
    tracing::info!(config = %config_path.display(), botname = %config.botname, "starting");

    let headless = env_flag("DIARYBOT_HEADLESS");
    let store = if headless {
        DraftStore::in_memory()
    } else {
        DraftStore::open(state_root.join("drafts.json"))?
    };
    tracing::debug!(drafts = ?store.path(), "draft store");
    let mut state = build_page(config, Some(config_path), store)?;
    let transport = HttpTransport::new(http_timeout())?;
    attach_transport(&mut state, Arc::new(transport));

    if headless {
        return run_headless(state);
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let res: Result<()> = loop {
        terminal.draw(|f| ui(f, &mut state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut state, key) {
                    break Ok(());
                }
            }
        }
        pump_responses(&mut state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    // Restore
    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    tracing::info!("exit");
    res
}

// Headless smoke mode: draw into a TestBackend for a number of ticks, optionally
// pressing one choice by its button label.
fn run_headless(mut state: AppState) -> Result<()> {
    let ticks: u64 = std::env::var("DIARYBOT_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let submit_label = std::env::var("DIARYBOT_HEADLESS_SUBMIT").ok();
    let summary = env_flag("DIARYBOT_SMOKE_SUMMARY");
    let backend = ratatui::backend::TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut submit_done = false;
    for _ in 0..ticks {
        if !submit_done {
            if let Some(label) = &submit_label {
                submit_done = submit_by_label(&mut state, label);
            }
        }
        terminal.draw(|f| ui(f, &mut state))?;
        pump_responses(&mut state);
        state.tick = state.tick.wrapping_add(1);
        std::thread::sleep(tick_rate);
    }
    if summary {
        println!("{}", headless_summary(&state, submit_done));
    }
    Ok(())
}

/// Press the button labelled `label`, as Enter on it would. False when no
/// button has that label.
pub(crate) fn submit_by_label(state: &mut AppState, label: &str) -> bool {
    let view = state.input.render(&state.submit, true);
    let found = view.buttons().find(|b| b.label == label).cloned();
    let Some(button) = found else {
        return false;
    };
    let effs = update(state, AppMsg::SubmitChoice(button));
    run_effects(state, effs);
    true
}

pub(crate) fn headless_summary(state: &AppState, submit_done: bool) -> serde_json::Value {
    let (view, landed_url) = match &state.view {
        View::Entry => ("Entry", None),
        View::Landed { url, .. } => ("Landed", url.clone()),
    };
    serde_json::json!({
        "ok": !matches!(state.submit, SubmitState::Failed { .. }),
        "view": view,
        "submit": state.submit.name(),
        "choices": state.input.leaf_count(),
        "submit_done": submit_done,
        "landed_url": landed_url,
    })
}

fn discover_config() -> Result<PathBuf> {
    // 1) DIARYBOT_CONFIG_DIR/diarybot.yaml
    if let Ok(base) = std::env::var("DIARYBOT_CONFIG_DIR") {
        return Ok(PathBuf::from(base).join(CONFIG_FILE));
    }
    // 2) CWD, then <ancestor>/.diarybot
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let candidates = [
        cwd.join(CONFIG_FILE),
        cwd.join(".diarybot").join(CONFIG_FILE),
    ];
    for p in candidates {
        if p.exists() {
            return Ok(p);
        }
    }
    let mut cur = cwd.as_path();
    while let Some(parent) = cur.parent() {
        let p = parent.join(".diarybot").join(CONFIG_FILE);
        if p.exists() {
            return Ok(p);
        }
        cur = parent;
    }
    // Last attempt: ~/.diarybot/diarybot.yaml
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        let p = home.join(".diarybot").join(CONFIG_FILE);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(anyhow!(
        "No config found. Set DIARYBOT_CONFIG_DIR=<dir with {CONFIG_FILE}> or place {CONFIG_FILE} in CWD/.diarybot and ancestors"
    ))
}

pub(crate) fn load_page_config(path: &Path) -> Result<PageConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut cfg = parse_page_config(&s, &base_dir).with_context(|| format!("loading {path:?}"))?;
    apply_env_overrides(&mut cfg, |name| std::env::var(name).ok());
    validate_page_config(&cfg).map_err(|e| anyhow!("invalid config {path:?}: {e}"))?;
    Ok(cfg)
}

/// Parse `diarybot.yaml`. A tree referenced by `structured_input_path` is read
/// as JSON relative to `base_dir`; an inline `structured_input` takes precedence.
pub(crate) fn parse_page_config(text: &str, base_dir: &Path) -> Result<PageConfig> {
    let mut cfg: PageConfig = serde_yaml::from_str(text).context("parsing page config")?;
    if cfg.structured_input.is_none() {
        if let Some(rel) = &cfg.structured_input_path {
            let p = base_dir.join(rel);
            let s = fs::read_to_string(&p).with_context(|| format!("reading {p:?}"))?;
            let tree = serde_json::from_str(&s).with_context(|| format!("parsing {p:?}"))?;
            cfg.structured_input = Some(tree);
        }
    }
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut PageConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(name) = get("DIARYBOT_BOTNAME").filter(|s| !s.is_empty()) {
        cfg.botname = name;
    }
    if let Some(server) = get("DIARYBOT_SERVER").filter(|s| !s.is_empty()) {
        cfg.server = server;
    }
}

/// Build the entry page for `config`. The tree and bot name are handed to the
/// structured input here and nowhere else.
pub(crate) fn build_page(
    config: PageConfig,
    config_path: Option<PathBuf>,
    store: DraftStore,
) -> Result<AppState> {
    let endpoints = Endpoints::new(&config.server, &config.botname)?;
    let mut state = AppState {
        config_path,
        theme: Theme::synthwave_dark(),
        ..Default::default()
    };
    assemble_page(&mut state, config, endpoints, store);
    Ok(state)
}

fn assemble_page(state: &mut AppState, config: PageConfig, endpoints: Endpoints, store: DraftStore) {
    state.input = StructuredInput::new(
        config.structured_input.clone(),
        config.botname.clone(),
        FeaturedSet::new(config.featured.iter().cloned()),
        config.separator(),
    );
    state.draft = DraftField::new(format!("unsent-{}", config.botname), store);
    state.submit = SubmitState::Idle;
    state.hidden_open = false;
    state.selected = 0;
    state.focus = FocusState::default();
    state.message_pending = false;
    state.view = View::Entry;
    state.status_text = None;
    state.endpoints = Some(endpoints);
    if let Some(root) = &config.structured_input {
        for w in duplicate_payload_warnings(root) {
            tracing::warn!("{w}");
            state.dbg(format!("warning: {w}"));
        }
    }
    state.dbg(format!(
        "page {} for {} ({} choices, draft {})",
        state.page_id,
        config.botname,
        state.input.leaf_count(),
        state.draft.local_id()
    ));
    state.config = config;
}

pub(crate) fn attach_transport(state: &mut AppState, transport: Arc<dyn Transport>) {
    let (tx, rx) = mpsc::channel::<SubmitMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);
    state.transport = Some(transport);
}

// Rebuild the page from its config file (or the config in memory when there is
// none). The draft store, channel, debug log and tick carry over.
fn reload_page(state: &mut AppState) {
    let config = match &state.config_path {
        Some(path) => match load_page_config(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                state.dbg(format!("reload failed: {e:#}"));
                show_toast(state, format!("Reload failed: {e:#}"), ToastLevel::Error, 5);
                return;
            }
        },
        None => state.config.clone(),
    };
    let endpoints = match Endpoints::new(&config.server, &config.botname) {
        Ok(e) => e,
        Err(e) => {
            state.dbg(format!("reload failed: {e:#}"));
            show_toast(state, format!("Reload failed: {e:#}"), ToastLevel::Error, 5);
            return;
        }
    };
    let store = std::mem::take(&mut state.draft).into_store();
    state.page_id = state.page_id.wrapping_add(1);
    tracing::info!(page = state.page_id, "reload");
    assemble_page(state, config, endpoints, store);
}

fn show_toast(state: &mut AppState, text: String, level: ToastLevel, seconds: u64) {
    state.toast = Some(Toast {
        text,
        level,
        // 200ms tick
        expires_at_tick: state.tick.saturating_add(seconds * 5),
    });
}

fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::PostStructured { label, kv_json } => {
                let url = state.endpoints.as_ref().map(Endpoints::structured_input);
                state.dbg(format!("post {label}"));
                dispatch(state, url, vec![("kv".to_string(), kv_json)], SubmitKind::Structured);
            }
            Effect::PostMessage { msg } => {
                let url = state.endpoints.as_ref().map(Endpoints::message);
                dispatch(state, url, vec![("msg".to_string(), msg)], SubmitKind::Message);
            }
            Effect::Navigate { url } => {
                tracing::info!(%url, "navigate");
                state.dbg(format!("navigate -> {url}"));
                state.view = View::Landed {
                    url: Some(url),
                    note: String::new(),
                };
            }
            Effect::ClearDraft => {
                if let Err(e) = state.draft.clear() {
                    state.dbg(format!("clearing draft failed: {e:#}"));
                }
            }
            Effect::ReloadPage => reload_page(state),
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => show_toast(state, text, level, seconds),
        }
    }
}

fn dispatch(
    state: &mut AppState,
    url: Option<Result<Url>>,
    fields: Vec<(String, String)>,
    kind: SubmitKind,
) {
    let url = match url {
        Some(Ok(url)) => url,
        Some(Err(e)) => return respond_now(state, kind, format!("{e:#}")),
        None => return respond_now(state, kind, "no server endpoint".to_string()),
    };
    match (&state.transport, &state.tx) {
        (Some(transport), Some(tx)) => {
            spawn_post_form(
                transport.clone(),
                url,
                fields,
                kind,
                state.page_id,
                tx.clone(),
            );
        }
        _ => respond_now(state, kind, "no transport".to_string()),
    }
}

// A request that could not be sent is answered like a failed one.
fn respond_now(state: &mut AppState, kind: SubmitKind, reason: String) {
    let effects = match kind {
        SubmitKind::Structured => update(state, AppMsg::StructuredResponse(Err(reason))),
        SubmitKind::Message => update(state, AppMsg::MessageResponse(Err(reason))),
    };
    run_effects(state, effects);
}

pub(crate) fn pump_responses(state: &mut AppState) {
    let mut drained: Vec<SubmitMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        if msg.page != state.page_id {
            // the server stored the message even though the page moved on
            if msg.kind == SubmitKind::Message && matches!(&msg.outcome, Ok(r) if r.is_ok()) {
                state.dbg(format!("late message reply from page {}: saved", msg.page));
                run_effects(state, vec![Effect::ClearDraft]);
                show_toast(state, "Earlier message saved".into(), ToastLevel::Success, 3);
                continue;
            }
            state.dbg(format!(
                "dropped {:?} reply from page {} (now {})",
                msg.kind, msg.page, state.page_id
            ));
            continue;
        }
        let effects = match msg.kind {
            SubmitKind::Structured => update(state, AppMsg::StructuredResponse(msg.outcome)),
            SubmitKind::Message => update(state, AppMsg::MessageResponse(msg.outcome)),
        };
        run_effects(state, effects);
    }
}

fn copy_to_clipboard(state: &mut AppState, text: &str) {
    match arboard::Clipboard::new().and_then(|mut c| c.set_text(text)) {
        Ok(()) => show_toast(state, format!("Copied {text}"), ToastLevel::Success, 2),
        Err(e) => show_toast(state, format!("Clipboard: {e}"), ToastLevel::Error, 4),
    }
}

fn row_count(state: &AppState) -> usize {
    state
        .input
        .render(&state.submit, state.hidden_open)
        .rows()
        .len()
}

/// Returns true when the app should quit.
pub(crate) fn handle_key(state: &mut AppState, key: KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return true;
    }
    if let View::Landed { url, .. } = &state.view {
        let url = url.clone();
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('r') => {
                let effs = update(state, AppMsg::Reload);
                run_effects(state, effs);
            }
            KeyCode::Char('c') => {
                if let Some(url) = url {
                    copy_to_clipboard(state, &url);
                }
            }
            _ => {}
        }
        return false;
    }
    if key.code == KeyCode::Tab {
        state.focus.toggle();
        return false;
    }
    match state.focus.pane {
        Pane::Draft => match key.code {
            KeyCode::Char('s') if ctrl => {
                let effs = update(state, AppMsg::SubmitMessage);
                run_effects(state, effs);
            }
            KeyCode::Esc => state.focus = FocusState::new(Pane::Choices),
            _ => {
                let effs = state.draft.on_key(key);
                run_effects(state, effs);
            }
        },
        Pane::Choices => {
            let total = row_count(state);
            match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Up | KeyCode::Char('k') => {
                    state.selected = state.selected.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if state.selected + 1 < total {
                        state.selected += 1;
                    }
                }
                KeyCode::Home => state.selected = 0,
                KeyCode::End => state.selected = total.saturating_sub(1),
                KeyCode::Enter | KeyCode::Char(' ') => {
                    let view = state.input.render(&state.submit, state.hidden_open);
                    let msg = match view.rows().get(state.selected) {
                        Some(Row::Button(b)) => Some(AppMsg::SubmitChoice((*b).clone())),
                        Some(Row::Summary { .. }) => Some(AppMsg::ToggleHidden),
                        None => None,
                    };
                    if let Some(msg) = msg {
                        let effs = update(state, msg);
                        run_effects(state, effs);
                        state.selected = state.selected.min(row_count(state).saturating_sub(1));
                    }
                }
                KeyCode::Char('r') => {
                    let effs = update(state, AppMsg::Reload);
                    run_effects(state, effs);
                }
                KeyCode::Char('h') => {
                    if let Some(url) = state.history_url() {
                        copy_to_clipboard(state, url.as_str());
                    }
                }
                _ => {}
            }
        }
    }
    false
}

fn ui(f: &mut Frame, state: &mut AppState) {
    // Clear expired toast
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }

    let screen = f.area();
    let bg = Block::default().style(state.theme.base_style());
    f.render_widget(bg, screen);

    const DEBUG_H: u16 = 4;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(DEBUG_H),
            Constraint::Length(1),
        ])
        .split(screen);

    draw_header(f, chunks[0], state);
    let help_text = match (&state.view, state.focus.pane) {
        (View::Landed { .. }, _) => "r back to entry page  c copy url  q quit",
        (View::Entry, Pane::Choices) => {
            "↑/↓ select  Enter submit  Tab message  h copy history  r reload  q quit"
        }
        (View::Entry, Pane::Draft) => "Ctrl+S send  Esc/Tab choices",
    };
    match state.view.clone() {
        View::Entry => {
            let main = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(5), Constraint::Length(6)])
                .split(chunks[1]);
            draw_structured_input(f, main[0], state, state.focus.is(Pane::Choices));
            let draft_focused = state.focus.is(Pane::Draft);
            let tick = state.tick;
            state.draft.render(f, main[1], draft_focused, tick);
        }
        View::Landed { url, note } => draw_landed(f, chunks[1], state, url.as_deref(), &note),
    }
    draw_debug(f, chunks[2], state);
    draw_footer_combined(f, chunks[3], state, help_text);
}

fn draw_landed(f: &mut Frame, area: Rect, state: &AppState, url: Option<&str>, note: &str) {
    let theme = &state.theme;
    let block = crate::widgets::chrome::panel_block("Entry page", true, theme);
    let mut lines: Vec<Line> = Vec::new();
    if let Some(url) = url {
        lines.push(Line::styled("Recorded. The server continued at:", theme.text_muted()));
        lines.push(Line::raw(""));
        lines.push(Line::styled(url.to_string(), theme.text_active_bold()));
    }
    if !note.is_empty() {
        lines.push(Line::styled(note.to_string(), theme.text_active_bold()));
    }
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(state.theme.text_muted())
        .title(Span::styled(
            "Debug",
            state.theme.text_muted().add_modifier(Modifier::BOLD),
        ));
    // Take last `area.height` lines
    let h = area.height as usize;
    let start = state.debug_log.len().saturating_sub(h);
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .skip(start)
        .map(|s| Line::raw(s.clone()))
        .collect();
    let p = Paragraph::new(lines)
        .style(Style::default().fg(Color::Gray))
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
