//! Storyline - research assistant for finance video content
//!
//! Turns a research field into a finished video script in three model calls:
//!
//! 1. **Discover** - ask a web-grounded model for candidate topics, then check
//!    every source link it cites ([`links`]).
//! 2. **Research** - produce a deep report on one topic, cached by topic in a
//!    JSON file ([`store`]).
//! 3. **Script** - rewrite the report as a narrative script.
//!
//! [`session::Workflow`] ties the steps together around a
//! [`session::SessionState`]; [`flows`] holds the individual calls and
//! [`gateway`] the provider client.

pub mod config;
pub mod field;
pub mod flows;
pub mod gateway;
pub mod links;
pub mod prompts;
pub mod session;
pub mod store;
pub mod topics;

pub use config::{Config, ConfigError};
pub use field::{FieldError, FieldSelection};
pub use flows::FlowError;
pub use gateway::{ChatCompletion, GatewayError, OpenRouterGateway};
pub use links::{GLYPH_LEGEND, HttpLinkChecker, LinkAnnotator, LinkChecker, LinkStatus};
pub use session::{ResearchOutcome, SessionState, Workflow, WorkflowError};
pub use store::{ResearchRecord, ResultStore, StoreError};
