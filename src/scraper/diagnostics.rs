//! Where extraction reports what it could not find.
//!
//! Components take a `&dyn DiagnosticSink` instead of logging directly, so
//! the extraction rules can be tested without a subscriber installed.

use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// None of a field's selectors matched.
    FieldMissing { field: &'static str, context: String },
    /// A listing entry without a name, a link, or both. The entry is kept.
    ItemIncomplete {
        name: Option<String>,
        link: Option<String>,
    },
    /// A detail page could not be visited or read. The item is dropped.
    ItemDropped { name: String, cause: String },
    /// A table row whose cell count differs from its header.
    RowShape { expected: usize, found: usize },
    /// A listing page yielded nothing at all.
    EmptyListing { context: String },
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::FieldMissing { field, context } => {
                warn!("{}: could not extract {}", context, field)
            }
            Diagnostic::ItemIncomplete { name, link } => match (name, link) {
                (Some(name), None) => warn!("Could not get the link of '{}'", name),
                (None, Some(link)) => warn!("Could not get the name of the film at {}", link),
                _ => warn!("Listing entry with neither name nor link"),
            },
            Diagnostic::ItemDropped { name, cause } => {
                error!("Error extracting data from the film {}: {}", name.to_uppercase(), cause)
            }
            Diagnostic::RowShape { expected, found } => {
                error!("Row has {} cells but the header has {}", found, expected)
            }
            Diagnostic::EmptyListing { context } => {
                error!("{}: no entries found in the page", context)
            }
        }
    }
}

/// Keeps every diagnostic in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: std::sync::Mutex<Vec<Diagnostic>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().unwrap().clone()
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter_map(|d| match d {
                Diagnostic::FieldMissing { field, .. } => Some(field),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries.lock().unwrap().push(diagnostic);
    }
}
