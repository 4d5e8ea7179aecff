use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, Receiver, Sender, UnboundedReceiver};

use crate::browser::SystemBrowser;
use crate::config::{self, Config, ConfigError};
use crate::dispatcher::{Dispatcher, InputInstruction, RenderInstruction, ResultView, SlotStatus};
use crate::history::CommandHistory;
use crate::hotkey::parse_hotkey;
use crate::lookup::{HttpLookupProvider, LookupCompletion, LookupError, LookupGateway};
use crate::query::has_confirm_marker;
use crate::trigger;
use crate::visibility::{VisibilityAction, VisibilityState};

const EVENT_QUEUE_DEPTH: usize = 64;
pub const ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Lookup(LookupError),
    Io(std::io::Error),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Lookup(error) => write!(f, "lookup setup error: {error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ConfigError> for RuntimeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LookupError> for RuntimeError {
    fn from(value: LookupError) -> Self {
        Self::Lookup(value)
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Everything the UI thread can be told about.
#[derive(Debug, Clone)]
pub enum UiEvent {
    TextChanged(String),
    Confirm(String),
    RecallPrevious,
    RecallNext,
    /// Hotkey, tray "Open / Hide" or the trigger file.
    Toggle,
    /// Escape or focus loss.
    Hide,
    SettingsSaved(Config),
    Quit,
}

/// The window, as seen from the event loop.
pub trait Frontend {
    fn render(&mut self, instruction: &RenderInstruction);
    fn set_input(&mut self, instruction: &InputInstruction);
    fn set_visible(&mut self, visible: bool);
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub config_dir: Option<PathBuf>,
    pub query: Option<String>,
    pub trigger_file: Option<PathBuf>,
}

/// Line-oriented stand-in for the floating window.
pub struct ConsoleFrontend<W: Write> {
    out: W,
}

impl<W: Write> ConsoleFrontend<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(error) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            tracing::warn!("console write failed: {error}");
        }
    }
}

impl<W: Write> Frontend for ConsoleFrontend<W> {
    fn render(&mut self, instruction: &RenderInstruction) {
        if let RenderInstruction::Show(view) = instruction {
            let text = format_view(view);
            self.line(&text);
        }
    }

    fn set_input(&mut self, instruction: &InputInstruction) {
        match instruction {
            InputInstruction::Replace(text) => self.line(&format!("> {text}")),
            InputInstruction::Clear => self.line(">"),
        }
    }

    fn set_visible(&mut self, visible: bool) {
        self.line(if visible { "[shown]" } else { "[hidden]" });
    }
}

pub fn format_view(view: &ResultView) -> String {
    format!("{}: {}", view.title, view.body)
}

/// Maps one console line onto UI events.
///
/// A line ending in the confirmation marker is typed as-is; any other
/// non-command line is confirmed.
pub fn console_events(line: &str) -> Vec<UiEvent> {
    match line.trim() {
        ":up" => return vec![UiEvent::RecallPrevious],
        ":down" => return vec![UiEvent::RecallNext],
        ":toggle" => return vec![UiEvent::Toggle],
        ":hide" => return vec![UiEvent::Hide],
        ":quit" | ":q" => return vec![UiEvent::Quit],
        _ => {}
    }

    if has_confirm_marker(line) {
        vec![UiEvent::TextChanged(line.to_string())]
    } else {
        vec![UiEvent::Confirm(line.to_string())]
    }
}

/// Drives the dispatcher until `Quit` arrives or every event source is gone.
pub async fn event_loop<F: Frontend>(
    dispatcher: &mut Dispatcher,
    frontend: &mut F,
    events: &mut Receiver<UiEvent>,
    completions: &mut UnboundedReceiver<LookupCompletion>,
) {
    let mut visibility = VisibilityState::default();
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("event sources closed; leaving event loop");
                    break;
                };
                if !handle_event(dispatcher, frontend, &mut visibility, event) {
                    break;
                }
            }
            Some(completion) = completions.recv() => {
                if let Some(instruction) = dispatcher.on_lookup_completed(completion) {
                    frontend.render(&instruction);
                }
            }
        }
    }
}

/// Returns false when the loop should stop.
pub fn handle_event<F: Frontend>(
    dispatcher: &mut Dispatcher,
    frontend: &mut F,
    visibility: &mut VisibilityState,
    event: UiEvent,
) -> bool {
    match event {
        UiEvent::TextChanged(text) => frontend.render(&dispatcher.on_text_changed(&text)),
        UiEvent::Confirm(text) => frontend.render(&dispatcher.on_confirm(&text)),
        UiEvent::RecallPrevious => {
            if let Some(instruction) = dispatcher.recall_previous() {
                recall_into(dispatcher, frontend, instruction);
            }
        }
        UiEvent::RecallNext => {
            if let Some(instruction) = dispatcher.recall_next() {
                recall_into(dispatcher, frontend, instruction);
            }
        }
        UiEvent::Toggle => {
            let action = visibility.toggle();
            apply_visibility(dispatcher, frontend, action);
        }
        UiEvent::Hide => {
            let action = visibility.hide();
            apply_visibility(dispatcher, frontend, action);
        }
        UiEvent::SettingsSaved(config) => dispatcher.reload_config(Arc::new(config)),
        UiEvent::Quit => {
            tracing::info!("quit requested");
            return false;
        }
    }
    true
}

fn recall_into<F: Frontend>(
    dispatcher: &mut Dispatcher,
    frontend: &mut F,
    instruction: InputInstruction,
) {
    frontend.set_input(&instruction);
    let text = match &instruction {
        InputInstruction::Replace(text) => text.as_str(),
        InputInstruction::Clear => "",
    };
    frontend.render(&dispatcher.on_text_changed(text));
}

fn apply_visibility<F: Frontend>(
    dispatcher: &mut Dispatcher,
    frontend: &mut F,
    action: VisibilityAction,
) {
    match action {
        VisibilityAction::ShowAndFocus => frontend.set_visible(true),
        VisibilityAction::Hide => {
            frontend.set_visible(false);
            frontend.set_input(&InputInstruction::Clear);
            frontend.render(&dispatcher.dismiss());
        }
        VisibilityAction::Unchanged => {}
    }
}

/// Confirms `text` and waits for a pending lookup to settle.
pub async fn run_once(
    dispatcher: &mut Dispatcher,
    text: &str,
    completions: &mut UnboundedReceiver<LookupCompletion>,
    timeout: Duration,
) -> Option<ResultView> {
    let RenderInstruction::Show(mut view) = dispatcher.on_confirm(text) else {
        return None;
    };

    while view.status == SlotStatus::Pending {
        match tokio::time::timeout(timeout, completions.recv()).await {
            Ok(Some(completion)) => {
                if let Some(RenderInstruction::Show(updated)) =
                    dispatcher.on_lookup_completed(completion)
                {
                    view = updated;
                }
            }
            Ok(None) => break,
            Err(_) => {
                tracing::warn!("{} lookup did not finish within {timeout:?}", view.slot);
                break;
            }
        }
    }
    Some(view)
}

pub fn run(options: RuntimeOptions) -> Result<(), RuntimeError> {
    let config = config::load(options.config_dir.as_deref());
    if !config.config_path.exists() {
        config::save(&config)?;
        println!(
            "[rudolph-core] wrote default config to {}",
            config.config_path.display()
        );
    }
    tracing::info!(
        "startup hotkey={} config_path={} history_path={} enabled={:?}",
        config.hotkey(),
        config.config_path.display(),
        config.history_path.display(),
        config.enabled_flags()
    );
    match parse_hotkey(config.hotkey()) {
        Ok(hotkey) => tracing::info!("global shortcut {}", hotkey.canonical()),
        Err(error) => tracing::warn!("unusable shortcut '{}': {error}", config.hotkey()),
    }

    let history = open_history(&config);
    let provider = HttpLookupProvider::new()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel();
        let mut dispatcher = Dispatcher::new(
            Arc::new(config),
            history,
            Box::new(SystemBrowser::default()),
            LookupGateway::new(Arc::new(provider)),
            completion_tx,
        );

        if let Some(query) = options.query {
            let mut frontend = ConsoleFrontend::new(std::io::stdout());
            let view = run_once(&mut dispatcher, &query, &mut completion_rx, ONE_SHOT_TIMEOUT).await;
            if let Some(view) = view {
                frontend.render(&RenderInstruction::Show(view));
            }
            return;
        }

        let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let _stdin = spawn_stdin_reader(event_tx.clone());
        let _watcher = options.trigger_file.map(|path| {
            trigger::spawn_watcher(path, trigger::POLL_INTERVAL, event_tx.clone(), UiEvent::Toggle)
        });
        drop(event_tx);

        let mut frontend = ConsoleFrontend::new(std::io::stdout());
        println!("[rudolph-core] ready; type a command (:up :down :toggle :hide :quit)");
        event_loop(&mut dispatcher, &mut frontend, &mut event_rx, &mut completion_rx).await;
    });
    Ok(())
}

fn open_history(config: &Config) -> CommandHistory {
    match CommandHistory::open(&config.history_path, config.max_history()) {
        Ok(history) => {
            tracing::info!("loaded {} history entries", history.len());
            history
        }
        Err(error) => {
            tracing::warn!(
                "history at {} unavailable: {error}; keeping it in memory",
                config.history_path.display()
            );
            CommandHistory::in_memory(config.max_history())
        }
    }
}

fn spawn_stdin_reader(events: Sender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!("stdin read failed: {error}");
                    break;
                }
            };
            for event in console_events(&line) {
                if events.send(event).await.is_err() {
                    return;
                }
            }
        }
        let _ = events.send(UiEvent::Quit).await;
    })
}
