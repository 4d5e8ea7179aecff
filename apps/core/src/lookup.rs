use std::fmt::{Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use url::Url;

const WEATHER_ENDPOINT: &str = "https://wttr.in/";
const WIKI_SUMMARY_ENDPOINT: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
const USER_AGENT: &str = "RudolphLauncher/0.1 (desktop quick-launcher; wiki summary lookup)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Weather,
    WikiSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    Transport(String),
    Status(u16),
    Malformed(String),
    MissingField(&'static str),
    InvalidQuery(String),
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "request failed: {error}"),
            Self::Status(code) => write!(f, "service answered with HTTP {code}"),
            Self::Malformed(error) => write!(f, "unreadable response: {error}"),
            Self::MissingField(field) => write!(f, "response has no '{field}' field"),
            Self::InvalidQuery(query) => write!(f, "cannot build a request for '{query}'"),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<reqwest::Error> for LookupError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) => Self::Status(status.as_u16()),
            None if value.is_decode() => Self::Malformed(value.to_string()),
            None => Self::Transport(value.to_string()),
        }
    }
}

/// Network-bound capability behind the `temp` and `wikisum` commands.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    async fn fetch(&self, kind: LookupKind, query: &str) -> Result<String, LookupError>;
}

pub struct HttpLookupProvider {
    client: reqwest::Client,
    weather_base: Url,
    wiki_base: Url,
}

impl HttpLookupProvider {
    pub fn new() -> Result<Self, LookupError> {
        Self::with_endpoints(WEATHER_ENDPOINT, WIKI_SUMMARY_ENDPOINT)
    }

    pub fn with_endpoints(weather: &str, wiki_summary: &str) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| LookupError::Transport(error.to_string()))?;
        Ok(Self {
            client,
            weather_base: parse_base(weather)?,
            wiki_base: parse_base(wiki_summary)?,
        })
    }

    /// `wttr.in/<location>`; an empty location asks for the caller's own weather.
    pub fn weather_url(&self, location: &str) -> Result<Url, LookupError> {
        let location = location.trim();
        let mut url = if location.is_empty() {
            self.weather_base.clone()
        } else {
            append_path_segment(&self.weather_base, location)
                .ok_or_else(|| LookupError::InvalidQuery(location.to_string()))?
        };
        url.query_pairs_mut().append_pair("format", "%t %C");
        Ok(url)
    }

    pub fn wiki_summary_url(&self, subject: &str) -> Result<Url, LookupError> {
        let title = normalize_wiki_title(subject);
        if title.is_empty() {
            return Err(LookupError::InvalidQuery(subject.to_string()));
        }
        append_path_segment(&self.wiki_base, &title)
            .ok_or_else(|| LookupError::InvalidQuery(subject.to_string()))
    }

    async fn weather(&self, location: &str) -> Result<String, LookupError> {
        let url = self.weather_url(location)?;
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn wiki_summary(&self, subject: &str) -> Result<String, LookupError> {
        let url = self.wiki_summary_url(subject)?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        extract_summary(&body)
    }
}

#[async_trait]
impl LookupProvider for HttpLookupProvider {
    async fn fetch(&self, kind: LookupKind, query: &str) -> Result<String, LookupError> {
        match kind {
            LookupKind::Weather => self.weather(query).await,
            LookupKind::WikiSummary => self.wiki_summary(query).await,
        }
    }
}

fn parse_base(raw: &str) -> Result<Url, LookupError> {
    Url::parse(raw).map_err(|error| LookupError::InvalidQuery(format!("{raw}: {error}")))
}

/// Trims and joins the words of a title with underscores.
pub fn normalize_wiki_title(subject: &str) -> String {
    subject.split_whitespace().collect::<Vec<_>>().join("_")
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    extract: Option<String>,
}

pub fn extract_summary(body: &str) -> Result<String, LookupError> {
    let payload: SummaryPayload =
        serde_json::from_str(body).map_err(|error| LookupError::Malformed(error.to_string()))?;
    payload.extract.ok_or(LookupError::MissingField("extract"))
}

/// Percent-encodes `segment` as the last path segment of `base`.
pub fn append_path_segment(base: &Url, segment: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut().ok()?.pop_if_empty().push(segment);
    Some(url)
}

/// Identity of one occupant of the result slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u64);

impl Display for SlotId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Single result delivered back to the UI context, tagged with its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupCompletion {
    pub slot: SlotId,
    pub kind: LookupKind,
    pub result: Result<String, LookupError>,
}

/// Handle to an in-flight lookup. Dropping it cancels the work.
#[derive(Debug)]
pub struct LookupTask {
    slot: SlotId,
    cancel: CancellationToken,
}

impl LookupTask {
    pub fn slot(&self) -> SlotId {
        self.slot
    }
}

impl Drop for LookupTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts one task per lookup; no pooling and no caching.
#[derive(Clone)]
pub struct LookupGateway {
    provider: Arc<dyn LookupProvider>,
}

impl LookupGateway {
    pub fn new(provider: Arc<dyn LookupProvider>) -> Self {
        Self { provider }
    }

    /// Must be called from within a tokio runtime.
    pub fn spawn(
        &self,
        slot: SlotId,
        kind: LookupKind,
        query: String,
        completions: UnboundedSender<LookupCompletion>,
    ) -> LookupTask {
        let provider = Arc::clone(&self.provider);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("{slot} lookup cancelled");
                }
                result = provider.fetch(kind, &query) => {
                    if let Err(error) = &result {
                        tracing::warn!("{slot} {kind:?} lookup for '{query}' failed: {error}");
                    }
                    if completions.send(LookupCompletion { slot, kind, result }).is_err() {
                        tracing::debug!("{slot} completion dropped; dispatcher is gone");
                    }
                }
            }
        });
        LookupTask { slot, cancel }
    }
}
