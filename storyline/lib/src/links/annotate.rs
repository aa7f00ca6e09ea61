//! URL extraction and inline status annotation.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use futures::stream::{self, StreamExt};
use regex::{Captures, Regex};
use tracing::{info, warn};

use super::{LinkChecker, LinkStatus};

/// Number of link checks allowed in flight at once.
pub const MAX_CONCURRENT_CHECKS: usize = 10;

/// `http://` or `https://` followed by anything up to whitespace, `)` or `>`.
///
/// Deliberately loose: Markdown link syntax is not parsed, and trailing
/// punctuation stays part of the token.
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)>]+").expect("Invalid URL regex"));

/// Extract every URL-looking token from `text`, in order of appearance.
///
/// Duplicates are preserved; see [`LinkAnnotator`] for de-duplication.
///
/// ## Examples
///
/// ```
/// use storyline_lib::links::extract_urls;
///
/// let urls = extract_urls("[Fed](https://www.federalreserve.gov) and <http://example.com>");
/// assert_eq!(urls, vec!["https://www.federalreserve.gov", "http://example.com"]);
/// ```
pub fn extract_urls(text: &str) -> Vec<&str> {
    URL_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Checks the URLs in a block of text and appends a status glyph to each one.
pub struct LinkAnnotator<C> {
    checker: Arc<C>,
}

impl<C> Clone for LinkAnnotator<C> {
    fn clone(&self) -> Self {
        Self {
            checker: Arc::clone(&self.checker),
        }
    }
}

impl<C: LinkChecker + 'static> LinkAnnotator<C> {
    pub fn new(checker: C) -> Self {
        Self {
            checker: Arc::new(checker),
        }
    }

    /// Check every distinct URL in `text` and return the status of each.
    ///
    /// At most [`MAX_CONCURRENT_CHECKS`] checks run at a time, each on its own
    /// task. A task that panics or is aborted yields
    /// [`LinkStatus::ErrorDuringCheck`] for its URL and never affects the others.
    /// Returns once every check has settled.
    pub async fn check_all(&self, text: &str) -> BTreeMap<String, LinkStatus> {
        let unique: BTreeSet<String> = extract_urls(text).into_iter().map(String::from).collect();

        if unique.is_empty() {
            return BTreeMap::new();
        }

        let statuses: BTreeMap<String, LinkStatus> = stream::iter(unique)
            .map(|url| {
                let checker = Arc::clone(&self.checker);
                let task_url = url.clone();
                let handle = tokio::spawn(async move { checker.check(&task_url).await });
                async move {
                    let status = match handle.await {
                        Ok(reachable) => LinkStatus::from(reachable),
                        Err(e) => {
                            warn!(url = %url, error = %e, "Link check task did not complete");
                            LinkStatus::ErrorDuringCheck
                        }
                    };
                    (url, status)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_CHECKS)
            .collect()
            .await;

        let count = |wanted: LinkStatus| statuses.values().filter(|s| **s == wanted).count();
        info!(
            total = statuses.len(),
            valid = count(LinkStatus::Valid),
            invalid = count(LinkStatus::Invalid),
            errors = count(LinkStatus::ErrorDuringCheck),
            "Link annotation pass complete"
        );

        statuses
    }

    /// Return `text` with `" <glyph>"` appended after every URL occurrence.
    ///
    /// Text without URLs is returned unchanged. The result depends only on the
    /// status of each URL, never on the order in which checks finish.
    pub async fn annotate(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let statuses = self.check_all(text).await;
        if statuses.is_empty() {
            return text.to_string();
        }

        apply_statuses(text, &statuses).into_owned()
    }
}

/// Rewrite every URL occurrence in `text` using the precomputed statuses.
///
/// Substitution is a single pass over the same matches used for extraction,
/// so a URL that is a prefix of another URL never gets annotated inside the
/// longer one.
pub(crate) fn apply_statuses<'t>(
    text: &'t str,
    statuses: &BTreeMap<String, LinkStatus>,
) -> Cow<'t, str> {
    URL_RE.replace_all(text, |caps: &Captures| {
        let url = &caps[0];
        match statuses.get(url) {
            Some(status) => format!("{} {}", url, status.glyph()),
            None => url.to_string(),
        }
    })
}
