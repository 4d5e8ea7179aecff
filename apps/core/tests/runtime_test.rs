use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rudolph_core::browser::RecordingOpener;
use rudolph_core::config::Config;
use rudolph_core::dispatcher::{Dispatcher, InputInstruction, RenderInstruction, SlotStatus};
use rudolph_core::history::CommandHistory;
use rudolph_core::lookup::{
    LookupCompletion, LookupError, LookupGateway, LookupKind, LookupProvider,
};
use rudolph_core::registry::FeatureFlag;
use rudolph_core::runtime::{event_loop, run_once, Frontend, UiEvent};
use tokio::sync::mpsc::UnboundedReceiver;

struct SlowWeather;

#[async_trait]
impl LookupProvider for SlowWeather {
    async fn fetch(&self, _kind: LookupKind, query: &str) -> Result<String, LookupError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(format!("+18°C Cloudy in {query}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Render(String),
    Clear,
    Input(String),
    Visible(bool),
}

#[derive(Default)]
struct RecordingFrontend {
    seen: Vec<Seen>,
}

impl Frontend for RecordingFrontend {
    fn render(&mut self, instruction: &RenderInstruction) {
        self.seen.push(match instruction {
            RenderInstruction::Show(view) => Seen::Render(view.body.clone()),
            RenderInstruction::Clear => Seen::Clear,
        });
    }

    fn set_input(&mut self, instruction: &InputInstruction) {
        self.seen.push(Seen::Input(match instruction {
            InputInstruction::Replace(text) => text.clone(),
            InputInstruction::Clear => String::new(),
        }));
    }

    fn set_visible(&mut self, visible: bool) {
        self.seen.push(Seen::Visible(visible));
    }
}

fn dispatcher() -> (Dispatcher, UnboundedReceiver<LookupCompletion>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(
        Arc::new(Config::in_dir(std::path::Path::new("runtime-test"))),
        CommandHistory::in_memory(10),
        Box::new(RecordingOpener::default()),
        LookupGateway::new(Arc::new(SlowWeather)),
        tx,
    );
    (dispatcher, rx)
}

#[tokio::test]
async fn event_loop_applies_events_and_completions() {
    let (mut dispatcher, mut completions) = dispatcher();
    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(16);
    let mut frontend = RecordingFrontend::default();

    let feeder = tokio::spawn(async move {
        events_tx.send(UiEvent::Toggle).await.unwrap();
        events_tx.send(UiEvent::Confirm("e 6*7".into())).await.unwrap();
        events_tx.send(UiEvent::TextChanged("temp Oslo  ".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        events_tx.send(UiEvent::RecallPrevious).await.unwrap();
        events_tx.send(UiEvent::Toggle).await.unwrap();
        events_tx.send(UiEvent::Quit).await.unwrap();
    });

    tokio::time::timeout(
        Duration::from_secs(5),
        event_loop(&mut dispatcher, &mut frontend, &mut events_rx, &mut completions),
    )
    .await
    .unwrap();
    feeder.await.unwrap();

    assert_eq!(
        frontend.seen,
        vec![
            Seen::Visible(true),
            Seen::Render("42".into()),
            Seen::Render("Loading...".into()),
            Seen::Render("+18°C Cloudy in Oslo".into()),
            Seen::Input("temp Oslo".into()),
            Seen::Clear,
            Seen::Visible(false),
            Seen::Input(String::new()),
            Seen::Clear,
        ]
    );
    assert_eq!(dispatcher.history().entries(), ["e 6*7", "temp Oslo"]);
}

#[tokio::test]
async fn settings_saved_event_reloads_config() {
    let (mut dispatcher, mut completions) = dispatcher();
    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(4);
    let mut frontend = RecordingFrontend::default();

    let mut next = dispatcher.config().clone();
    next.set_enabled(FeatureFlag::Expression, false);
    events_tx.send(UiEvent::SettingsSaved(next)).await.unwrap();
    events_tx.send(UiEvent::TextChanged("e 1".into())).await.unwrap();
    drop(events_tx);

    event_loop(&mut dispatcher, &mut frontend, &mut events_rx, &mut completions).await;
    assert_eq!(frontend.seen, vec![Seen::Clear]);
}

#[tokio::test]
async fn run_once_waits_for_lookup() {
    let (mut dispatcher, mut completions) = dispatcher();
    let view = run_once(
        &mut dispatcher,
        "temp Lima",
        &mut completions,
        Duration::from_secs(2),
    )
    .await
    .unwrap();
    assert_eq!(view.title, "City Weather - Lima");
    assert_eq!(view.status, SlotStatus::Done("+18°C Cloudy in Lima".into()));
}

#[tokio::test]
async fn run_once_returns_none_for_unknown_input() {
    let (mut dispatcher, mut completions) = dispatcher();
    let view = run_once(
        &mut dispatcher,
        "nope",
        &mut completions,
        Duration::from_secs(1),
    )
    .await;
    assert!(view.is_none());
}
