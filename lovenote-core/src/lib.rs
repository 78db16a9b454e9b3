//! Core library for the `lovenote` dispatcher.
//!
//! This crate defines:
//! - Configuration loading and validation
//! - The daily send window
//! - Date counters and love-line selection
//! - Abstraction over weather providers
//! - The messaging client: template introspection and sending
//! - The pipeline that runs all of the above once
//!
//! It is used by `lovenote-cli`.

pub mod compose;
pub mod config;
pub mod dates;
pub mod error;
pub mod gate;
mod http;
pub mod lines;
pub mod messaging;
pub mod model;
pub mod pipeline;
pub mod provider;

pub use config::{Config, RunConfig};
pub use error::{LoveNoteError, Result};
pub use gate::{GateDecision, SendWindow, is_send_allowed};
pub use lines::LinePools;
pub use messaging::WeChatClient;
pub use model::{OutgoingPayload, ProviderResponse, WeatherReport, WeatherSnapshot};
pub use pipeline::{Pipeline, RunOptions, RunOutcome};
pub use provider::{ProviderId, WeatherProvider};
