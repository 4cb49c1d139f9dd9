//! Browser-driven extraction: page parsers plus the navigation, pagination
//! and detail-visit logic that feeds them.

pub mod detail;
pub mod diagnostics;
pub mod fields;
pub mod navigate;
pub mod paginate;
pub mod parsers;

use thiserror::Error;

pub use self::detail::visit_details;
pub use self::diagnostics::{DiagnosticSink, TracingSink};
pub use self::navigate::{CookiePolicy, NavStep, NavigationError, Navigator};
pub use self::paginate::{NextControl, PaginationError, expand_all, walk_pages};

/// A page could not be turned into rows at all.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector '{css}': {reason}")]
    Selector { css: String, reason: String },

    #[error("could not find the {0} block")]
    MissingBlock(&'static str),

    #[error("no entries found on the {0} listing")]
    EmptyListing(&'static str),
}
