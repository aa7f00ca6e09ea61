//! The three single-call flows: discovery, deep research and script writing.
//!
//! Each flow renders its prompt, sends it as one `user` message with a fixed
//! model and temperature, and returns the generated text. Flows hold no state
//! and never cache or retry; callers decide what to do with a failure.

use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument};

use crate::gateway::{ChatCompletion, ChatMessage, CompletionRequest, GatewayError};
use crate::prompts::{self, PromptError};

/// Model and sampling settings for one flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSpec {
    pub model: &'static str,
    pub temperature: f32,
}

/// Web-grounded search for candidate topics.
pub const DISCOVERY: FlowSpec = FlowSpec {
    model: "perplexity/sonar-pro",
    temperature: 0.7,
};

/// Long-running multi-source research report.
pub const RESEARCH: FlowSpec = FlowSpec {
    model: "perplexity/sonar-deep-research",
    temperature: 0.7,
};

/// Narrative script writing; runs hotter than the research flows.
pub const SCRIPT: FlowSpec = FlowSpec {
    model: "anthropic/claude-3.5-sonnet",
    temperature: 0.8,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl FlowSpec {
    /// Build the request for a rendered prompt.
    pub fn request(&self, prompt: String, timeout: Duration) -> CompletionRequest {
        CompletionRequest::new(self.model, vec![ChatMessage::user(prompt)])
            .with_temperature(self.temperature)
            .with_timeout(timeout)
    }
}

async fn run<G: ChatCompletion>(
    gateway: &G,
    spec: FlowSpec,
    prompt: String,
    timeout: Duration,
) -> Result<String, FlowError> {
    let request = spec.request(prompt, timeout);
    let text = gateway.complete(&request).await?;
    info!(model = spec.model, chars = text.len(), "Flow completed");
    Ok(text)
}

/// Ask for a list of video topics in `field`.
#[instrument(skip(gateway, field), fields(model = DISCOVERY.model))]
pub async fn discover_topics<G: ChatCompletion>(
    gateway: &G,
    field: &str,
    timeout: Duration,
) -> Result<String, FlowError> {
    let prompt = prompts::discovery_prompt(field)?;
    run(gateway, DISCOVERY, prompt, timeout).await
}

/// Produce a deep research report on `topic`.
#[instrument(skip(gateway), fields(model = RESEARCH.model))]
pub async fn research_topic<G: ChatCompletion>(
    gateway: &G,
    topic: &str,
    timeout: Duration,
) -> Result<String, FlowError> {
    let prompt = prompts::research_prompt(topic)?;
    run(gateway, RESEARCH, prompt, timeout).await
}

/// Turn a research report into a video script.
#[instrument(skip(gateway, report), fields(model = SCRIPT.model, report_chars = report.len()))]
pub async fn generate_script<G: ChatCompletion>(
    gateway: &G,
    topic: &str,
    report: &str,
    timeout: Duration,
) -> Result<String, FlowError> {
    let prompt = prompts::script_prompt(topic, report)?;
    run(gateway, SCRIPT, prompt, timeout).await
}
