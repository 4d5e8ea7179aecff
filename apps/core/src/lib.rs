pub mod browser;
pub mod config;
pub mod dispatcher;
pub mod expression;
pub mod history;
pub mod hotkey;
pub mod logging;
pub mod lookup;
pub mod query;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod trigger;
pub mod units;
pub mod visibility;
