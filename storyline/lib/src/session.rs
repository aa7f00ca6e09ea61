//! Session state and the discover → research → script workflow.
//!
//! A [`SessionState`] belongs to one interactive session and is passed
//! explicitly into every [`Workflow`] step. The workflow owns the shared
//! collaborators (gateway, store, link annotator); the session owns what the
//! user has seen and chosen so far.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, DEFAULT_LLM_TIMEOUT};
use crate::field::{FieldError, FieldSelection};
use crate::flows::{self, FlowError};
use crate::gateway::{ChatCompletion, OpenRouterGateway};
use crate::links::{HttpLinkChecker, LinkAnnotator, LinkChecker};
use crate::store::{ResultStore, StoreError};

/// Errors surfaced by a workflow step.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    /// The report was generated but the store rejected it.
    #[error("Research finished but could not be saved: {source}")]
    Unsaved {
        report: String,
        #[source]
        source: StoreError,
    },

    #[error("Please enter a research topic")]
    EmptyTopic,

    /// Script generation needs a research report first.
    #[error("No research found for '{0}'. Run deep research on it first.")]
    NoResearch(String),
}

/// Everything one interactive session has accumulated.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Link-annotated output of the latest successful discovery.
    pub discovered_topics_text: String,
    /// Topic most recently researched.
    pub selected_topic: Option<String>,
    /// Reports produced or loaded during this session, by topic.
    pub research_results: HashMap<String, String>,
    /// Field used for the latest discovery.
    pub field_selection: FieldSelection,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Where a research report came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchOutcome {
    /// Loaded from the store; no model call was made.
    Cached(String),
    /// Freshly generated and saved.
    Fresh(String),
}

impl ResearchOutcome {
    pub fn report(&self) -> &str {
        match self {
            ResearchOutcome::Cached(report) | ResearchOutcome::Fresh(report) => report,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ResearchOutcome::Cached(_))
    }
}

/// Runs the three steps against a gateway, a store and a link checker.
pub struct Workflow<G, C> {
    gateway: G,
    store: ResultStore,
    annotator: LinkAnnotator<C>,
    timeout: Duration,
}

impl Workflow<OpenRouterGateway, HttpLinkChecker> {
    /// Production wiring from resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let gateway = OpenRouterGateway::new(config.api_key.clone())
            .with_base_url(config.base_url.clone())
            .with_app_name("storyline");
        let annotator = LinkAnnotator::new(HttpLinkChecker::new()?);

        Ok(Self::new(
            gateway,
            ResultStore::new(config.store_path.clone()),
            annotator,
        )
        .with_timeout(config.llm_timeout))
    }
}

impl<G, C> Workflow<G, C>
where
    G: ChatCompletion,
    C: LinkChecker + 'static,
{
    pub fn new(gateway: G, store: ResultStore, annotator: LinkAnnotator<C>) -> Self {
        Self {
            gateway,
            store,
            annotator,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    /// Per-call timeout for every model request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Discover topics in `field` and annotate the links in the reply.
    ///
    /// On success the annotated text replaces the session's discovered topics.
    /// On failure the session is left untouched.
    #[instrument(skip(self, state, field), fields(field = %field))]
    pub async fn discover(
        &self,
        state: &mut SessionState,
        field: &FieldSelection,
    ) -> Result<String, WorkflowError> {
        let field_value = field.prompt_value()?;
        let text = flows::discover_topics(&self.gateway, &field_value, self.timeout).await?;
        let annotated = self.annotator.annotate(&text).await;

        state.discovered_topics_text = annotated.clone();
        state.field_selection = field.clone();
        Ok(annotated)
    }

    /// Research `topic`, preferring a cached report.
    ///
    /// A fresh report is saved to the store before it is returned. A failed
    /// model call writes nothing. If saving fails the report is kept in the
    /// session and handed back inside [`WorkflowError::Unsaved`].
    #[instrument(skip(self, state))]
    pub async fn research(
        &self,
        state: &mut SessionState,
        topic: &str,
    ) -> Result<ResearchOutcome, WorkflowError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(WorkflowError::EmptyTopic);
        }
        state.selected_topic = Some(topic.to_string());

        if let Some(record) = self.store.get(topic) {
            info!(topic, "Using cached research");
            state
                .research_results
                .insert(topic.to_string(), record.result.clone());
            return Ok(ResearchOutcome::Cached(record.result));
        }

        debug!(topic, "No cached research, calling model");
        let report = flows::research_topic(&self.gateway, topic, self.timeout).await?;

        state
            .research_results
            .insert(topic.to_string(), report.clone());
        if let Err(source) = self.store.upsert(topic, &report) {
            warn!(topic, error = %source, "Failed to save research");
            return Err(WorkflowError::Unsaved { report, source });
        }

        Ok(ResearchOutcome::Fresh(report))
    }

    /// The report for `topic`, from this session or the store.
    pub fn research_report(&self, state: &SessionState, topic: &str) -> Option<String> {
        state
            .research_results
            .get(topic)
            .cloned()
            .or_else(|| self.store.get(topic).map(|record| record.result))
    }

    /// Write a video script from the research on `topic`.
    #[instrument(skip(self, state))]
    pub async fn script(&self, state: &SessionState, topic: &str) -> Result<String, WorkflowError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(WorkflowError::EmptyTopic);
        }

        let report = self
            .research_report(state, topic)
            .ok_or_else(|| WorkflowError::NoResearch(topic.to_string()))?;

        Ok(flows::generate_script(&self.gateway, topic, &report, self.timeout).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{CompletionRequest, GatewayError};
    use crate::store::ResearchRecord;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct ScriptedGateway {
        replies: Mutex<Vec<Result<String, GatewayError>>>,
        models: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                models: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.models.lock().unwrap().clone()
        }
    }

    impl ChatCompletion for ScriptedGateway {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
            self.models.lock().unwrap().push(request.model.clone());
            self.replies.lock().unwrap().remove(0)
        }
    }

    struct AlwaysReachable;

    impl LinkChecker for AlwaysReachable {
        async fn check(&self, _url: &str) -> bool {
            true
        }
    }

    fn workflow(
        dir: &TempDir,
        replies: Vec<Result<String, GatewayError>>,
    ) -> Workflow<ScriptedGateway, AlwaysReachable> {
        Workflow::new(
            ScriptedGateway::new(replies),
            ResultStore::new(dir.path().join("store.json")),
            LinkAnnotator::new(AlwaysReachable),
        )
    }

    #[tokio::test]
    async fn test_discover_annotates_and_records_field() {
        let dir = TempDir::new().unwrap();
        let wf = workflow(&dir, vec![Ok("#### Title\nhttps://a.example".to_string())]);
        let mut state = SessionState::new();

        let text = wf.discover(&mut state, &FieldSelection::Ai).await.unwrap();
        assert_eq!(text, "#### Title\nhttps://a.example ✅");
        assert_eq!(state.discovered_topics_text, text);
        assert_eq!(state.field_selection, FieldSelection::Ai);
        assert_eq!(wf.gateway.calls(), vec!["perplexity/sonar-pro".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_custom_field_makes_no_call() {
        let dir = TempDir::new().unwrap();
        let wf = workflow(&dir, vec![]);
        let mut state = SessionState::new();

        let err = wf
            .discover(&mut state, &FieldSelection::Custom("  ".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Field(FieldError::EmptyCustomField)));
        assert!(wf.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_research_trims_and_rejects_empty_topic() {
        let dir = TempDir::new().unwrap();
        let wf = workflow(&dir, vec![Ok("report".to_string())]);
        let mut state = SessionState::new();

        assert!(matches!(
            wf.research(&mut state, "   ").await,
            Err(WorkflowError::EmptyTopic)
        ));

        let outcome = wf.research(&mut state, "  Fed cuts ").await.unwrap();
        assert_eq!(outcome, ResearchOutcome::Fresh("report".to_string()));
        assert_eq!(state.selected_topic.as_deref(), Some("Fed cuts"));
        assert_eq!(
            wf.store().get("Fed cuts"),
            Some(ResearchRecord::new("report"))
        );
    }

    #[tokio::test]
    async fn test_unsaved_research_returns_report() {
        let dir = TempDir::new().unwrap();
        // A directory where the store file should be makes every save fail.
        let store_path = dir.path().join("isdir");
        std::fs::create_dir(&store_path).unwrap();
        let wf = Workflow::new(
            ScriptedGateway::new(vec![Ok("EXPENSIVE REPORT".to_string())]),
            ResultStore::new(store_path),
            LinkAnnotator::new(AlwaysReachable),
        );
        let mut state = SessionState::new();

        let err = wf.research(&mut state, "T").await.unwrap_err();
        match err {
            WorkflowError::Unsaved { report, .. } => assert_eq!(report, "EXPENSIVE REPORT"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            state.research_results.get("T").map(String::as_str),
            Some("EXPENSIVE REPORT")
        );
    }

    #[tokio::test]
    async fn test_script_prefers_session_report() {
        let dir = TempDir::new().unwrap();
        let wf = workflow(&dir, vec![Ok("the script".to_string())]);
        let mut state = SessionState::new();
        state
            .research_results
            .insert("T".to_string(), "session report".to_string());

        assert_eq!(wf.research_report(&state, "T").as_deref(), Some("session report"));
        let script = wf.script(&state, "T").await.unwrap();
        assert_eq!(script, "the script");
        assert_eq!(
            wf.gateway.calls(),
            vec!["anthropic/claude-3.5-sonnet".to_string()]
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let cached = ResearchOutcome::Cached("r".to_string());
        assert!(cached.is_cached());
        assert_eq!(cached.report(), "r");
        assert!(!ResearchOutcome::Fresh("r".to_string()).is_cached());
    }
}
