//! Field-level extraction rules shared by every section parser.
//!
//! A [`FieldChain`] is an ordered list of ways to read one field from an
//! element. The first attempt that yields a value wins; if none does, the
//! field is null and a diagnostic is reported.

use crate::models::Extracted;
use crate::scraper::ExtractError;
use crate::scraper::diagnostics::{Diagnostic, DiagnosticSink};
use scraper::{ElementRef, Selector};
use tracing::trace;

pub fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        css: css.to_string(),
        reason: e.to_string(),
    })
}

/// All text below `el`, trimmed.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Readers ───────────────────────────────────────────────────────────────────

/// Trimmed text of the first match of `sel`.
pub fn first_text(sel: &Selector) -> impl Fn(ElementRef<'_>) -> Option<String> + '_ {
    move |scope| scope.select(sel).next().map(element_text)
}

/// Trimmed value of `attr` on the first match of `sel` carrying it.
pub fn first_attr<'s>(
    sel: &'s Selector,
    attr: &'s str,
) -> impl Fn(ElementRef<'_>) -> Option<String> + 's {
    move |scope| {
        scope
            .select(sel)
            .find_map(|el| el.value().attr(attr))
            .map(|v| v.trim().to_string())
    }
}

/// Texts of every `item` inside the first `container`. Present (possibly
/// empty) whenever the container exists.
pub fn texts_within<'s>(
    container: &'s Selector,
    item: &'s Selector,
) -> impl Fn(ElementRef<'_>) -> Option<Vec<String>> + 's {
    move |scope| {
        scope
            .select(container)
            .next()
            .map(|c| c.select(item).map(element_text).collect())
    }
}

/// Texts of every match of `sel`; absent when nothing matches.
pub fn texts_of(sel: &Selector) -> impl Fn(ElementRef<'_>) -> Option<Vec<String>> + '_ {
    move |scope| {
        let values: Vec<String> = scope.select(sel).map(element_text).collect();
        (!values.is_empty()).then_some(values)
    }
}

/// `attr` of every match of `sel`; absent when nothing matches.
pub fn attrs_of<'s>(
    sel: &'s Selector,
    attr: &'s str,
) -> impl Fn(ElementRef<'_>) -> Option<Vec<String>> + 's {
    move |scope| {
        let matches: Vec<ElementRef<'_>> = scope.select(sel).collect();
        if matches.is_empty() {
            return None;
        }
        Some(
            matches
                .into_iter()
                .filter_map(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string())
                .collect(),
        )
    }
}

// ── Chains ────────────────────────────────────────────────────────────────────

type Reader<'s, T> = Box<dyn Fn(ElementRef<'_>) -> Option<T> + 's>;

struct Attempt<'s, T> {
    label: &'static str,
    read: Reader<'s, T>,
}

pub struct FieldChain<'s, T> {
    field: &'static str,
    attempts: Vec<Attempt<'s, T>>,
}

impl<'s, T> FieldChain<'s, T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            attempts: Vec::new(),
        }
    }

    /// Append an attempt; attempts run in the order they were added.
    pub fn or(
        mut self,
        label: &'static str,
        read: impl Fn(ElementRef<'_>) -> Option<T> + 's,
    ) -> Self {
        self.attempts.push(Attempt {
            label,
            read: Box::new(read),
        });
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    /// First successful attempt, without reporting anything.
    pub fn try_resolve(&self, scope: ElementRef<'_>) -> Option<T> {
        self.attempts.iter().find_map(|attempt| {
            let value = (attempt.read)(scope);
            if value.is_some() {
                trace!("{} read via {}", self.field, attempt.label);
            }
            value
        })
    }
}

/// Collects the missing fields of one row while it is being extracted.
pub struct RowScope<'a> {
    sink: &'a dyn DiagnosticSink,
    context: String,
    missing: Vec<&'static str>,
}

impl<'a> RowScope<'a> {
    pub fn new(sink: &'a dyn DiagnosticSink, context: impl Into<String>) -> Self {
        Self {
            sink,
            context: context.into(),
            missing: Vec::new(),
        }
    }

    pub fn field<T>(&mut self, chain: &FieldChain<'_, T>, scope: ElementRef<'_>) -> Option<T> {
        let value = chain.try_resolve(scope);
        if value.is_none() {
            self.mark_missing(chain.field());
        }
        value
    }

    /// Record a field the caller resolved some other way.
    pub fn mark_missing(&mut self, field: &'static str) {
        self.sink.report(Diagnostic::FieldMissing {
            field,
            context: self.context.clone(),
        });
        self.missing.push(field);
    }

    pub fn finish<R>(self, record: R) -> Extracted<R> {
        Extracted {
            record,
            missing: self.missing,
        }
    }
}

// ── Multi-valued fields ───────────────────────────────────────────────────────

/// `["USA", "UK"]` → `"USA, UK"`, with quote characters removed.
pub fn join_values(values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.replace(['\'', '"'], ""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cast lists end with a credit that is not an actor; drop it when there is
/// more than one entry.
pub fn drop_trailing_credit(mut names: Vec<String>) -> Vec<String> {
    if names.len() > 1 {
        names.pop();
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::diagnostics::RecordingSink;
    use scraper::Html;

    fn genres_chain<'s>(
        chips: &'s Selector,
        chip: &'s Selector,
        links: &'s Selector,
    ) -> FieldChain<'s, Vec<String>> {
        FieldChain::new("genres")
            .or("type chips", texts_within(chips, chip))
            .or("genre links", texts_of(links))
    }

    #[test]
    fn test_primary_selector_wins() {
        let doc = Html::parse_fragment(
            r#"<div><div class="types-wrapper"><span class="type"> Drama </span></div>
               <a class="genre">Comedy</a></div>"#,
        );
        let (chips, chip, links) = (
            selector(".types-wrapper").unwrap(),
            selector(".type").unwrap(),
            selector("a.genre").unwrap(),
        );
        let chain = genres_chain(&chips, &chip, &links);
        let sink = RecordingSink::default();
        let mut row = RowScope::new(&sink, "test");

        let genres = row.field(&chain, doc.root_element());

        assert_eq!(genres, Some(vec!["Drama".to_string()]));
        assert!(row.finish(()).is_complete());
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_fallback_used_when_primary_absent() {
        let doc = Html::parse_fragment(
            r#"<div><a class="genre">Comedy</a><a class="genre">Romance</a></div>"#,
        );
        let (chips, chip, links) = (
            selector(".types-wrapper").unwrap(),
            selector(".type").unwrap(),
            selector("a.genre").unwrap(),
        );
        let chain = genres_chain(&chips, &chip, &links);
        let sink = RecordingSink::default();
        let mut row = RowScope::new(&sink, "test");

        let genres = row.field(&chain, doc.root_element());

        assert_eq!(genres, Some(vec!["Comedy".to_string(), "Romance".to_string()]));
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_all_absent_is_null_with_diagnostic() {
        let doc = Html::parse_fragment("<div><p>nothing here</p></div>");
        let (chips, chip, links) = (
            selector(".types-wrapper").unwrap(),
            selector(".type").unwrap(),
            selector("a.genre").unwrap(),
        );
        let chain = genres_chain(&chips, &chip, &links);
        let sink = RecordingSink::default();
        let mut row = RowScope::new(&sink, "row 1");

        let genres = row.field(&chain, doc.root_element());
        let extracted = row.finish(genres);

        assert_eq!(extracted.record, None);
        assert_eq!(extracted.missing, vec!["genres"]);
        assert_eq!(
            sink.entries(),
            vec![Diagnostic::FieldMissing {
                field: "genres",
                context: "row 1".into()
            }]
        );
    }

    #[test]
    fn test_first_text_is_trimmed_first_match() {
        let doc = Html::parse_fragment(
            r#"<div><span class="date">  2021 </span><span class="date">1999</span></div>"#,
        );
        let sel = selector("span.date").unwrap();
        assert_eq!(first_text(&sel)(doc.root_element()), Some("2021".to_string()));
    }

    #[test]
    fn test_attrs_of_collects_in_markup_order() {
        let doc = Html::parse_fragment(
            r#"<div><img class="nflag" alt="USA"><img class="nflag" alt="UK"><img class="nflag" alt="USA"></div>"#,
        );
        let sel = selector("img.nflag").unwrap();
        assert_eq!(
            attrs_of(&sel, "alt")(doc.root_element()),
            Some(vec!["USA".to_string(), "UK".to_string(), "USA".to_string()])
        );
    }

    #[test]
    fn test_drop_trailing_credit() {
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(drop_trailing_credit(names(&[])), names(&[]));
        assert_eq!(drop_trailing_credit(names(&["Solo"])), names(&["Solo"]));
        assert_eq!(
            drop_trailing_credit(names(&["A", "B", "Animation"])),
            names(&["A", "B"])
        );
        assert_eq!(drop_trailing_credit(names(&["A", "B"])), names(&["A"]));
    }

    #[test]
    fn test_join_values_and_split_back() {
        let values = vec!["USA".to_string(), "UK".to_string()];
        let joined = join_values(&values);
        assert_eq!(joined, "USA, UK");
        let split: Vec<String> = joined.split(", ").map(str::to_string).collect();
        assert_eq!(split, values);
    }

    #[test]
    fn test_join_values_strips_quotes() {
        let values = vec!["Ocean's Eleven".to_string(), "\"Quoted\"".to_string()];
        assert_eq!(join_values(&values), "Oceans Eleven, Quoted");
    }
}
