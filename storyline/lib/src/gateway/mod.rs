//! Hosted chat-completion access.
//!
//! [`ChatCompletion`] is the seam the flows call through; [`OpenRouterGateway`]
//! is the production implementation. A call either returns the generated
//! text or one [`GatewayError`]; nothing is retried here.

mod error;
mod openrouter;
mod types;

use std::future::Future;

pub use error::{FailureKind, GatewayError};
pub use openrouter::{DEFAULT_BASE_URL, OpenRouterGateway};
pub use types::{ChatMessage, CompletionRequest, Role};

/// Something that can turn a [`CompletionRequest`] into generated text.
pub trait ChatCompletion: Send + Sync {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}
