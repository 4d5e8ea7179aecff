use url::Url;

use crate::config::Config;
use crate::expression;
use crate::lookup::{append_path_segment, LookupKind};
use crate::units;

/// Named toggle in the `[Commands]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureFlag {
    Expression,
    Conversion,
    Temp,
    Youtube,
    Duckduckgo,
    Wikipedia,
    Perplexity,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 7] = [
        FeatureFlag::Expression,
        FeatureFlag::Conversion,
        FeatureFlag::Temp,
        FeatureFlag::Youtube,
        FeatureFlag::Duckduckgo,
        FeatureFlag::Wikipedia,
        FeatureFlag::Perplexity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Expression => "Expression",
            Self::Conversion => "Conversion",
            Self::Temp => "City weather",
            Self::Youtube => "YouTube search",
            Self::Duckduckgo => "DuckDuckGo search",
            Self::Wikipedia => "Wikipedia search",
            Self::Perplexity => "Perplexity search",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Runs on every text change.
    Live,
    /// Runs only once the input is confirmed.
    ConfirmOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Expression,
    Conversion,
    Weather,
    YoutubeSearch,
    DuckDuckGoSearch,
    WikipediaArticle,
    WikipediaSummary,
    PerplexitySearch,
}

/// What a command asks the dispatcher to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Show { title: String, body: String },
    OpenUrl(String),
    Lookup {
        kind: LookupKind,
        query: String,
        title: String,
    },
    Nothing,
}

impl CommandKind {
    pub fn run(self, args: &[String]) -> Effect {
        match self {
            Self::Expression => {
                let input = args.join(" ");
                match expression::evaluate(&input) {
                    Ok(value) => Effect::Show {
                        title: "Expression".to_string(),
                        body: value,
                    },
                    Err(error) => {
                        tracing::debug!("expression '{input}' not rendered: {error}");
                        Effect::Nothing
                    }
                }
            }
            Self::Conversion => convert_effect(args),
            Self::Weather => {
                let city = args.join(" ");
                let title = if city.is_empty() {
                    "City Weather".to_string()
                } else {
                    format!("City Weather - {city}")
                };
                Effect::Lookup {
                    kind: LookupKind::Weather,
                    title,
                    query: city,
                }
            }
            Self::WikipediaSummary => {
                let subject = args.join(" ");
                Effect::Lookup {
                    kind: LookupKind::WikiSummary,
                    title: format!("Wikipedia Summary - {subject}"),
                    query: subject,
                }
            }
            Self::YoutubeSearch => search_url(YOUTUBE_SEARCH, &args.join(" ")),
            Self::DuckDuckGoSearch => search_url(DUCKDUCKGO_SEARCH, &args.join(" ")),
            Self::WikipediaArticle => article_url(&args.join("_")),
            Self::PerplexitySearch => search_url(PERPLEXITY_SEARCH, &args.join(" ")),
        }
    }
}

const YOUTUBE_SEARCH: &str = "https://youtube.com/search";
const DUCKDUCKGO_SEARCH: &str = "https://duckduckgo.com/search";
const PERPLEXITY_SEARCH: &str = "https://www.perplexity.ai/search";
const WIKIPEDIA_ARTICLE: &str = "https://en.wikipedia.org/wiki/";

/// `<base>?q=<terms>`, form-encoded (space as `+`).
fn search_url(base: &str, terms: &str) -> Effect {
    match Url::parse_with_params(base, &[("q", terms.trim())]) {
        Ok(url) => Effect::OpenUrl(url.into()),
        Err(error) => {
            tracing::debug!("cannot build search url for '{terms}': {error}");
            Effect::Nothing
        }
    }
}

fn article_url(title: &str) -> Effect {
    let article = Url::parse(WIKIPEDIA_ARTICLE)
        .ok()
        .and_then(|base| append_path_segment(&base, title));
    match article {
        Some(url) => Effect::OpenUrl(url.into()),
        None => {
            tracing::debug!("cannot build article url for '{title}'");
            Effect::Nothing
        }
    }
}

fn convert_effect(args: &[String]) -> Effect {
    let [value, from, to] = args else {
        return Effect::Nothing;
    };
    let Ok(value) = value.parse::<f64>() else {
        tracing::debug!("conversion value '{value}' is not a number");
        return Effect::Nothing;
    };
    match units::convert(value, from, to) {
        Ok(result) => Effect::Show {
            title: "Conversion".to_string(),
            body: units::format_quantity(result, to),
        },
        Err(error) => {
            tracing::debug!("conversion not rendered: {error}");
            Effect::Nothing
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDefinition {
    pub keyword: &'static str,
    pub flag: FeatureFlag,
    pub arity: Arity,
    pub mode: Mode,
    pub kind: CommandKind,
}

const BUILTIN_COMMANDS: [CommandDefinition; 8] = [
    CommandDefinition {
        keyword: "e",
        flag: FeatureFlag::Expression,
        arity: Arity::AtLeast(1),
        mode: Mode::Live,
        kind: CommandKind::Expression,
    },
    CommandDefinition {
        keyword: "c",
        flag: FeatureFlag::Conversion,
        arity: Arity::Exact(3),
        mode: Mode::Live,
        kind: CommandKind::Conversion,
    },
    CommandDefinition {
        keyword: "temp",
        flag: FeatureFlag::Temp,
        arity: Arity::AtLeast(0),
        mode: Mode::ConfirmOnly,
        kind: CommandKind::Weather,
    },
    CommandDefinition {
        keyword: "yt",
        flag: FeatureFlag::Youtube,
        arity: Arity::AtLeast(1),
        mode: Mode::ConfirmOnly,
        kind: CommandKind::YoutubeSearch,
    },
    CommandDefinition {
        keyword: "ddg",
        flag: FeatureFlag::Duckduckgo,
        arity: Arity::AtLeast(1),
        mode: Mode::ConfirmOnly,
        kind: CommandKind::DuckDuckGoSearch,
    },
    CommandDefinition {
        keyword: "wiki",
        flag: FeatureFlag::Wikipedia,
        arity: Arity::AtLeast(1),
        mode: Mode::ConfirmOnly,
        kind: CommandKind::WikipediaArticle,
    },
    CommandDefinition {
        keyword: "wikisum",
        flag: FeatureFlag::Wikipedia,
        arity: Arity::AtLeast(1),
        mode: Mode::ConfirmOnly,
        kind: CommandKind::WikipediaSummary,
    },
    CommandDefinition {
        keyword: "plx",
        flag: FeatureFlag::Perplexity,
        arity: Arity::AtLeast(1),
        mode: Mode::ConfirmOnly,
        kind: CommandKind::PerplexitySearch,
    },
];

/// Keyword table. Lookup is an exact match on the first token.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: &'static [CommandDefinition],
}

impl CommandRegistry {
    pub fn builtin() -> Self {
        Self {
            commands: &BUILTIN_COMMANDS,
        }
    }

    pub fn commands(&self) -> &[CommandDefinition] {
        self.commands
    }

    pub fn get(&self, keyword: &str) -> Option<&CommandDefinition> {
        self.commands.iter().find(|command| command.keyword == keyword)
    }

    /// Like [`get`](Self::get), but treats commands behind a disabled flag as unknown.
    pub fn resolve(&self, keyword: &str, cfg: &Config) -> Option<&CommandDefinition> {
        self.get(keyword)
            .filter(|command| cfg.is_enabled(command.flag))
    }
}
