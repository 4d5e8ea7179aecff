use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::browser::UrlOpener;
use crate::config::Config;
use crate::history::{CommandHistory, Recall};
use crate::lookup::{LookupCompletion, LookupGateway, LookupTask, SlotId};
use crate::query::{has_confirm_marker, ParsedQuery};
use crate::registry::{CommandDefinition, CommandRegistry, Effect, Mode};

pub const LOADING_TEXT: &str = "Loading...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    Done(String),
    Failed(String),
}

/// The single visible result area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub slot: SlotId,
    pub title: String,
    pub body: String,
    pub status: SlotStatus,
}

/// What the UI layer should do with the result area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderInstruction {
    Clear,
    Show(ResultView),
}

/// What the UI layer should do with the input box after history navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputInstruction {
    Replace(String),
    Clear,
}

#[derive(Debug)]
enum DispatchState {
    Idle,
    Showing(ResultView),
}

/// Turns input text into command executions and owns the result slot.
///
/// Every mutating method must run on the thread that owns the UI; the type is
/// deliberately `!Send` so it cannot migrate to a worker thread. Async lookups
/// report back through the completion channel handed to [`Dispatcher::new`],
/// and the owner feeds them to [`Dispatcher::on_lookup_completed`].
pub struct Dispatcher {
    config: Arc<Config>,
    registry: CommandRegistry,
    history: CommandHistory,
    opener: Box<dyn UrlOpener>,
    gateway: LookupGateway,
    completions: UnboundedSender<LookupCompletion>,
    state: DispatchState,
    pending: Option<LookupTask>,
    last_slot: u64,
    _ui_thread: PhantomData<Rc<()>>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        history: CommandHistory,
        opener: Box<dyn UrlOpener>,
        gateway: LookupGateway,
        completions: UnboundedSender<LookupCompletion>,
    ) -> Self {
        Self {
            config,
            registry: CommandRegistry::builtin(),
            history,
            opener,
            gateway,
            completions,
            state: DispatchState::Idle,
            pending: None,
            last_slot: 0,
            _ui_thread: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn current(&self) -> Option<&ResultView> {
        match &self.state {
            DispatchState::Idle => None,
            DispatchState::Showing(view) => Some(view),
        }
    }

    pub fn has_pending_lookup(&self) -> bool {
        self.pending.is_some()
    }

    /// Swaps in a freshly loaded snapshot, e.g. after the settings editor saved.
    pub fn reload_config(&mut self, config: Arc<Config>) {
        if let Err(error) = self.history.set_limit(config.max_history()) {
            tracing::warn!("failed to apply history limit: {error}");
        }
        self.config = config;
        tracing::info!(
            "config reloaded enabled={:?} max_history={}",
            self.config.enabled_flags(),
            self.config.max_history()
        );
    }

    /// Handles every edit of the input box.
    pub fn on_text_changed(&mut self, text: &str) -> RenderInstruction {
        self.clear_slot();
        let Some((command, query)) = self.recognize(text) else {
            return RenderInstruction::Clear;
        };

        let confirmed = self.config.general.confirm_on_double_space && has_confirm_marker(text);
        match command.mode {
            Mode::Live => self.execute(command, &query, confirmed),
            Mode::ConfirmOnly if confirmed => self.execute(command, &query, true),
            Mode::ConfirmOnly => RenderInstruction::Clear,
        }
    }

    /// Handles an explicit confirmation (Enter) of the current input.
    pub fn on_confirm(&mut self, text: &str) -> RenderInstruction {
        self.clear_slot();
        let Some((command, query)) = self.recognize(text) else {
            return RenderInstruction::Clear;
        };
        self.execute(command, &query, true)
    }

    /// Applies a finished lookup if it still belongs to the visible slot.
    pub fn on_lookup_completed(&mut self, completion: LookupCompletion) -> Option<RenderInstruction> {
        let DispatchState::Showing(view) = &mut self.state else {
            tracing::debug!("{} completion dropped; slot is idle", completion.slot);
            return None;
        };
        if view.slot != completion.slot || view.status != SlotStatus::Pending {
            tracing::debug!(
                "{} completion dropped; {} is visible",
                completion.slot,
                view.slot
            );
            return None;
        }

        match completion.result {
            Ok(text) => {
                view.body = text.clone();
                view.status = SlotStatus::Done(text);
            }
            Err(error) => {
                let reason = error.to_string();
                view.body = format!("Error: {reason}");
                view.status = SlotStatus::Failed(reason);
            }
        }
        self.pending = None;
        Some(RenderInstruction::Show(view.clone()))
    }

    /// Window hidden: drop whatever the slot holds and forget the recall position.
    pub fn dismiss(&mut self) -> RenderInstruction {
        self.clear_slot();
        self.history.reset_cursor();
        RenderInstruction::Clear
    }

    pub fn recall_previous(&mut self) -> Option<InputInstruction> {
        self.history.recall_previous().map(InputInstruction::Replace)
    }

    pub fn recall_next(&mut self) -> Option<InputInstruction> {
        self.history.recall_next().map(|recall| match recall {
            Recall::Entry(text) => InputInstruction::Replace(text),
            Recall::ClearInput => InputInstruction::Clear,
        })
    }

    fn recognize(&self, text: &str) -> Option<(CommandDefinition, ParsedQuery)> {
        let query = ParsedQuery::parse(text)?;
        let command = self.registry.resolve(&query.keyword, &self.config).copied()?;
        Some((command, query))
    }

    fn clear_slot(&mut self) {
        // Dropping the task cancels it; a completion already in flight is
        // discarded by the slot check.
        if let Some(task) = self.pending.take() {
            tracing::debug!("{} superseded", task.slot());
        }
        self.state = DispatchState::Idle;
    }

    /// Runs the handler; a confirmed run is recorded unless it produced nothing.
    fn execute(
        &mut self,
        command: CommandDefinition,
        query: &ParsedQuery,
        confirmed: bool,
    ) -> RenderInstruction {
        if !command.arity.accepts(query.args.len()) {
            tracing::debug!(
                "'{}' ignored: {} args do not satisfy {:?}",
                command.keyword,
                query.args.len(),
                command.arity
            );
            return RenderInstruction::Clear;
        }

        let effect = command.kind.run(&query.args);
        if confirmed && effect != Effect::Nothing {
            if let Err(error) = self.history.append(&query.command_line()) {
                tracing::warn!("history entry kept in memory only: {error}");
            }
        }
        self.apply(effect)
    }

    fn apply(&mut self, effect: Effect) -> RenderInstruction {
        match effect {
            Effect::Nothing => RenderInstruction::Clear,
            Effect::OpenUrl(url) => {
                match self.opener.open(&url) {
                    Ok(()) => tracing::info!("opened {url}"),
                    Err(error) => tracing::error!("failed to open {url}: {error}"),
                }
                RenderInstruction::Clear
            }
            Effect::Show { title, body } => {
                let view = ResultView {
                    slot: self.allocate_slot(),
                    title,
                    status: SlotStatus::Done(body.clone()),
                    body,
                };
                self.show(view)
            }
            Effect::Lookup { kind, query, title } => {
                let slot = self.allocate_slot();
                tracing::info!("{slot} starting {kind:?} lookup for '{query}'");
                let task = self
                    .gateway
                    .spawn(slot, kind, query, self.completions.clone());
                self.pending = Some(task);
                self.show(ResultView {
                    slot,
                    title,
                    body: LOADING_TEXT.to_string(),
                    status: SlotStatus::Pending,
                })
            }
        }
    }

    fn show(&mut self, view: ResultView) -> RenderInstruction {
        self.state = DispatchState::Showing(view.clone());
        RenderInstruction::Show(view)
    }

    fn allocate_slot(&mut self) -> SlotId {
        self.last_slot += 1;
        SlotId(self.last_slot)
    }
}

#[cfg(test)]
mod tests {
    use super::{Dispatcher, RenderInstruction, SlotStatus};
    use crate::browser::RecordingOpener;
    use crate::config::Config;
    use crate::history::CommandHistory;
    use crate::lookup::{
        LookupCompletion, LookupError, LookupGateway, LookupKind, LookupProvider, SlotId,
    };
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Silent;

    #[async_trait]
    impl LookupProvider for Silent {
        async fn fetch(&self, _kind: LookupKind, _query: &str) -> Result<String, LookupError> {
            std::future::pending().await
        }
    }

    fn dispatcher() -> Dispatcher {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        Dispatcher::new(
            Arc::new(Config::in_dir(std::path::Path::new("unused"))),
            CommandHistory::in_memory(10),
            Box::new(RecordingOpener::default()),
            LookupGateway::new(Arc::new(Silent)),
            tx,
        )
    }

    #[test]
    fn empty_and_unknown_input_stay_idle() {
        let mut dispatcher = dispatcher();
        assert_eq!(dispatcher.on_text_changed(""), RenderInstruction::Clear);
        assert_eq!(dispatcher.on_text_changed("zzz 1 2"), RenderInstruction::Clear);
        assert!(dispatcher.current().is_none());
    }

    #[test]
    fn each_render_gets_a_fresh_slot() {
        let mut dispatcher = dispatcher();
        let RenderInstruction::Show(first) = dispatcher.on_text_changed("e 1") else {
            panic!("expected a result");
        };
        let RenderInstruction::Show(second) = dispatcher.on_text_changed("e 12") else {
            panic!("expected a result");
        };
        assert!(second.slot > first.slot);
        assert_eq!(second.status, SlotStatus::Done("12".into()));
    }

    #[test]
    fn completion_for_idle_slot_is_dropped() {
        let mut dispatcher = dispatcher();
        let late = LookupCompletion {
            slot: SlotId(99),
            kind: LookupKind::Weather,
            result: Ok("sunny".into()),
        };
        assert!(dispatcher.on_lookup_completed(late).is_none());
    }
}
