use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rudolph_core::browser::RecordingOpener;
use rudolph_core::config::Config;
use rudolph_core::dispatcher::{
    Dispatcher, InputInstruction, RenderInstruction, SlotStatus, LOADING_TEXT,
};
use rudolph_core::history::CommandHistory;
use rudolph_core::lookup::{
    LookupCompletion, LookupError, LookupGateway, LookupKind, LookupProvider,
};
use rudolph_core::registry::FeatureFlag;
use tokio::sync::mpsc::UnboundedReceiver;

struct FakeProvider;

#[async_trait]
impl LookupProvider for FakeProvider {
    async fn fetch(&self, kind: LookupKind, query: &str) -> Result<String, LookupError> {
        match (kind, query) {
            (_, "Nowhere") => Err(LookupError::Status(404)),
            (LookupKind::Weather, city) => Ok(format!("+21°C Sunny in {city}")),
            (LookupKind::WikiSummary, subject) => Ok(format!("{subject} is a topic.")),
        }
    }
}

struct Harness {
    dispatcher: Dispatcher,
    completions: UnboundedReceiver<LookupCompletion>,
    opener: RecordingOpener,
}

fn harness_with(config: Config) -> Harness {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let opener = RecordingOpener::default();
    let dispatcher = Dispatcher::new(
        Arc::new(config),
        CommandHistory::in_memory(50),
        Box::new(opener.clone()),
        LookupGateway::new(Arc::new(FakeProvider)),
        tx,
    );
    Harness {
        dispatcher,
        completions: rx,
        opener,
    }
}

fn harness() -> Harness {
    harness_with(Config::in_dir(std::path::Path::new("dispatcher-test")))
}

fn shown(instruction: RenderInstruction) -> (String, String, SlotStatus) {
    match instruction {
        RenderInstruction::Show(view) => (view.title, view.body, view.status),
        RenderInstruction::Clear => panic!("expected a rendered result"),
    }
}

async fn next_completion(harness: &mut Harness) -> LookupCompletion {
    tokio::time::timeout(Duration::from_secs(2), harness.completions.recv())
        .await
        .expect("lookup finished in time")
        .expect("completion channel open")
}

#[tokio::test]
async fn expression_renders_live_without_recording() {
    let mut harness = harness();
    let (title, body, _) = shown(harness.dispatcher.on_text_changed("e 2+2"));
    assert_eq!(title, "Expression");
    assert_eq!(body, "4");
    assert!(harness.dispatcher.history().is_empty());
}

#[tokio::test]
async fn invalid_expression_clears_slot() {
    let mut harness = harness();
    shown(harness.dispatcher.on_text_changed("e 2+2"));
    assert_eq!(
        harness.dispatcher.on_text_changed("e 2+2/"),
        RenderInstruction::Clear
    );
    assert!(harness.dispatcher.current().is_none());
}

#[tokio::test]
async fn confirmed_conversion_is_recorded_trimmed() {
    let mut harness = harness();
    let (title, body, _) = shown(harness.dispatcher.on_text_changed("c 10 km mi  "));
    assert_eq!(title, "Conversion");
    assert_eq!(body, "6.214 mi");
    assert_eq!(harness.dispatcher.history().entries(), ["c 10 km mi"]);
}

#[tokio::test]
async fn conversion_arity_mismatch_is_silent() {
    let mut harness = harness();
    assert_eq!(
        harness.dispatcher.on_text_changed("c 10 km  "),
        RenderInstruction::Clear
    );
    assert!(harness.dispatcher.history().is_empty());
}

#[tokio::test]
async fn weather_shows_loading_then_result() {
    let mut harness = harness();
    let (title, body, status) = shown(harness.dispatcher.on_text_changed("temp Rome  "));
    assert_eq!(title, "City Weather - Rome");
    assert_eq!(body, LOADING_TEXT);
    assert_eq!(status, SlotStatus::Pending);
    assert!(harness.dispatcher.has_pending_lookup());
    assert_eq!(harness.dispatcher.history().entries(), ["temp Rome"]);

    let completion = next_completion(&mut harness).await;
    let (title, body, status) = shown(
        harness
            .dispatcher
            .on_lookup_completed(completion)
            .expect("completion applies to visible slot"),
    );
    assert_eq!(title, "City Weather - Rome");
    assert_eq!(body, "+21°C Sunny in Rome");
    assert_eq!(status, SlotStatus::Done("+21°C Sunny in Rome".into()));
    assert!(!harness.dispatcher.has_pending_lookup());
}

#[tokio::test]
async fn weather_without_marker_does_nothing() {
    let mut harness = harness();
    assert_eq!(
        harness.dispatcher.on_text_changed("temp Rome"),
        RenderInstruction::Clear
    );
    assert!(!harness.dispatcher.has_pending_lookup());
    assert!(harness.dispatcher.history().is_empty());
}

#[tokio::test]
async fn stale_completion_is_dropped_after_further_typing() {
    let mut harness = harness();
    shown(harness.dispatcher.on_text_changed("wikisum Rust  "));
    let late = next_completion(&mut harness).await;

    let (_, body, _) = shown(harness.dispatcher.on_text_changed("e 1+1"));
    assert_eq!(body, "2");

    assert!(harness.dispatcher.on_lookup_completed(late).is_none());
    let current = harness.dispatcher.current().unwrap();
    assert_eq!(current.body, "2");
    assert_eq!(current.status, SlotStatus::Done("2".into()));
}

#[tokio::test]
async fn lookup_error_is_surfaced() {
    let mut harness = harness();
    shown(harness.dispatcher.on_text_changed("temp Nowhere  "));
    let completion = next_completion(&mut harness).await;
    let (_, body, status) = shown(harness.dispatcher.on_lookup_completed(completion).unwrap());
    assert!(body.starts_with("Error: "), "body was {body}");
    assert!(matches!(status, SlotStatus::Failed(_)));
}

#[tokio::test]
async fn disabled_command_is_unknown() {
    let mut config = Config::in_dir(std::path::Path::new("dispatcher-test"));
    config.set_enabled(FeatureFlag::Expression, false);
    let mut harness = harness_with(config);
    assert_eq!(
        harness.dispatcher.on_text_changed("e 2+2  "),
        RenderInstruction::Clear
    );
    assert!(harness.dispatcher.history().is_empty());
}

#[tokio::test]
async fn search_opens_browser_and_renders_nothing() {
    let mut harness = harness();
    assert_eq!(
        harness.dispatcher.on_text_changed("yt lofi beats  "),
        RenderInstruction::Clear
    );
    assert_eq!(
        harness.opener.opened.borrow().as_slice(),
        ["https://youtube.com/search?q=lofi+beats"]
    );
    assert_eq!(harness.dispatcher.history().entries(), ["yt lofi beats"]);
}

#[tokio::test]
async fn explicit_confirm_runs_confirm_only_commands() {
    let mut harness = harness();
    assert_eq!(
        harness.dispatcher.on_confirm("wiki Alan Turing"),
        RenderInstruction::Clear
    );
    assert_eq!(
        harness.opener.opened.borrow().as_slice(),
        ["https://en.wikipedia.org/wiki/Alan_Turing"]
    );
    assert_eq!(harness.dispatcher.history().entries(), ["wiki Alan Turing"]);
}

#[tokio::test]
async fn marker_can_be_switched_off() {
    let mut config = Config::in_dir(std::path::Path::new("dispatcher-test"));
    config.general.confirm_on_double_space = false;
    let mut harness = harness_with(config);
    assert_eq!(
        harness.dispatcher.on_text_changed("ddg rust  "),
        RenderInstruction::Clear
    );
    assert!(harness.opener.opened.borrow().is_empty());
    harness.dispatcher.on_confirm("ddg rust");
    assert_eq!(harness.opener.opened.borrow().len(), 1);
}

#[tokio::test]
async fn recall_walks_history() {
    let mut harness = harness();
    harness.dispatcher.on_confirm("e 1");
    harness.dispatcher.on_confirm("e 2");

    assert_eq!(
        harness.dispatcher.recall_previous(),
        Some(InputInstruction::Replace("e 2".into()))
    );
    assert_eq!(
        harness.dispatcher.recall_previous(),
        Some(InputInstruction::Replace("e 1".into()))
    );
    assert_eq!(
        harness.dispatcher.recall_next(),
        Some(InputInstruction::Replace("e 2".into()))
    );
    assert_eq!(harness.dispatcher.recall_next(), Some(InputInstruction::Clear));
    assert_eq!(harness.dispatcher.recall_next(), None);
}

#[tokio::test]
async fn reload_applies_new_flags_and_limit() {
    let mut harness = harness();
    for n in 0..5 {
        harness.dispatcher.on_confirm(&format!("e {n}"));
    }

    let mut next = harness.dispatcher.config().clone();
    next.general.max_history = 2;
    next.set_enabled(FeatureFlag::Conversion, false);
    harness.dispatcher.reload_config(Arc::new(next));

    assert_eq!(harness.dispatcher.history().entries(), ["e 3", "e 4"]);
    assert_eq!(
        harness.dispatcher.on_text_changed("c 1 km m"),
        RenderInstruction::Clear
    );
}

#[tokio::test]
async fn history_stores_single_spaced_command_line() {
    let mut harness = harness();
    shown(harness.dispatcher.on_text_changed("c 10   km \tmi  "));
    harness.dispatcher.on_confirm("  e   1 + 1 ");
    assert_eq!(
        harness.dispatcher.history().entries(),
        ["c 10 km mi", "e 1 + 1"]
    );
}

#[tokio::test]
async fn confirmed_live_command_without_result_is_not_recorded() {
    let mut harness = harness();
    assert_eq!(
        harness.dispatcher.on_text_changed("e 2+  "),
        RenderInstruction::Clear
    );
    assert_eq!(
        harness.dispatcher.on_text_changed("c 1 km zz  "),
        RenderInstruction::Clear
    );
    assert_eq!(harness.dispatcher.on_confirm("c x km mi"), RenderInstruction::Clear);
    assert!(harness.dispatcher.history().is_empty());
}

#[tokio::test]
async fn bare_weather_looks_up_local_forecast() {
    let mut harness = harness();
    let (title, body, status) = shown(harness.dispatcher.on_text_changed("temp  "));
    assert_eq!(title, "City Weather");
    assert_eq!(body, LOADING_TEXT);
    assert_eq!(status, SlotStatus::Pending);
    assert_eq!(harness.dispatcher.history().entries(), ["temp"]);

    let completion = next_completion(&mut harness).await;
    assert_eq!(completion.kind, LookupKind::Weather);
    assert!(harness.dispatcher.on_lookup_completed(completion).is_some());
}
