//! Reachability check for a single URL.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::debug;

/// Timeout applied to every HEAD request.
pub const LINK_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum redirect hops followed before a URL is considered unreachable.
const MAX_REDIRECTS: usize = 10;

/// Decides whether a URL is reachable.
///
/// Implementations collapse every failure cause (DNS, refused connection,
/// timeout, TLS, unexpected status) into `false`. The annotator relies on the
/// returned future being `Send` so checks can run on separate tasks.
pub trait LinkChecker: Send + Sync {
    fn check(&self, url: &str) -> impl Future<Output = bool> + Send;
}

/// Returns `true` for status codes in `[200, 400)`.
///
/// ## Examples
///
/// ```
/// use storyline_lib::links::is_reachable_status;
///
/// assert!(is_reachable_status(200));
/// assert!(is_reachable_status(399));
/// assert!(!is_reachable_status(199));
/// assert!(!is_reachable_status(400));
/// ```
pub fn is_reachable_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// [`LinkChecker`] backed by HTTP HEAD requests.
#[derive(Debug, Clone)]
pub struct HttpLinkChecker {
    client: Client,
}

impl HttpLinkChecker {
    /// Create a checker using [`LINK_CHECK_TIMEOUT`].
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(LINK_CHECK_TIMEOUT)
    }

    /// Create a checker with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("storyline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl LinkChecker for HttpLinkChecker {
    async fn check(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let reachable = is_reachable_status(status);
                debug!(url = %url, status, reachable, "Link checked");
                reachable
            }
            Err(e) => {
                debug!(url = %url, error = %e, timeout = e.is_timeout(), "Link check failed");
                false
            }
        }
    }
}
