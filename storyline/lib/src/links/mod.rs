//! Best-effort verification of URLs found in generated text.
//!
//! The discovery prompt asks the model for source links, and models are happy
//! to invent plausible-looking URLs. This module checks every distinct URL in a
//! block of text with a HEAD request and annotates each occurrence inline with
//! a status glyph, so the reader can see at a glance which sources resolve.
//!
//! - [`checker`] - single-URL reachability ([`LinkChecker`], [`HttpLinkChecker`])
//! - [`annotate`] - URL extraction and concurrent annotation ([`LinkAnnotator`])
//!
//! ## Examples
//!
//! ```rust,no_run
//! use storyline_lib::links::{HttpLinkChecker, LinkAnnotator};
//!
//! # async fn example() -> Result<(), reqwest::Error> {
//! let annotator = LinkAnnotator::new(HttpLinkChecker::new()?);
//! let annotated = annotator.annotate("See https://www.reuters.com/markets for more.").await;
//! println!("{}", annotated);
//! # Ok(())
//! # }
//! ```

pub mod annotate;
pub mod checker;

use std::fmt;

pub use annotate::{LinkAnnotator, MAX_CONCURRENT_CHECKS, extract_urls};
pub use checker::{HttpLinkChecker, LINK_CHECK_TIMEOUT, LinkChecker, is_reachable_status};

/// Legend explaining the glyphs appended by [`LinkAnnotator::annotate`].
pub const GLYPH_LEGEND: &str = "✅ link reachable | ❌ link unreachable | ⚠️ error while checking";

/// Outcome of checking a single URL during one annotation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    /// The URL answered with a status in `[200, 400)`.
    Valid,
    /// The URL answered with any other status, or the request failed.
    Invalid,
    /// The check itself could not be evaluated (the task panicked or was aborted).
    ErrorDuringCheck,
}

impl LinkStatus {
    /// The glyph appended after each occurrence of the URL.
    pub fn glyph(self) -> &'static str {
        match self {
            LinkStatus::Valid => "✅",
            LinkStatus::Invalid => "❌",
            LinkStatus::ErrorDuringCheck => "⚠️",
        }
    }
}

impl From<bool> for LinkStatus {
    fn from(reachable: bool) -> Self {
        if reachable {
            LinkStatus::Valid
        } else {
            LinkStatus::Invalid
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LinkStatus::Valid => "valid",
            LinkStatus::Invalid => "invalid",
            LinkStatus::ErrorDuringCheck => "error",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyphs_are_distinct() {
        let glyphs = [
            LinkStatus::Valid.glyph(),
            LinkStatus::Invalid.glyph(),
            LinkStatus::ErrorDuringCheck.glyph(),
        ];
        assert_ne!(glyphs[0], glyphs[1]);
        assert_ne!(glyphs[1], glyphs[2]);
        assert_ne!(glyphs[0], glyphs[2]);
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(LinkStatus::from(true), LinkStatus::Valid);
        assert_eq!(LinkStatus::from(false), LinkStatus::Invalid);
    }

    #[test]
    fn test_legend_mentions_every_glyph() {
        for status in [
            LinkStatus::Valid,
            LinkStatus::Invalid,
            LinkStatus::ErrorDuringCheck,
        ] {
            assert!(GLYPH_LEGEND.contains(status.glyph()));
        }
    }
}
