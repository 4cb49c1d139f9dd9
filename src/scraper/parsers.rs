//! Page parsers: one function per kind of page the site serves.
//!
//! Every function takes the page markup, parses it, and drops the parsed
//! document before returning, so nothing parsed outlives the page it came
//! from.

use crate::models::{
    BoxOfficeTable, Extracted, ItemRef, NetflixRatedRecord, NetflixReleaseRecord, ReleaseRecord,
    TopFilmRecord,
};
use crate::scraper::ExtractError;
use crate::scraper::diagnostics::{Diagnostic, DiagnosticSink};
use crate::scraper::fields::{
    FieldChain, RowScope, attrs_of, drop_trailing_credit, element_text, first_attr, first_text,
    join_values, selector, texts_of, texts_within,
};
use scraper::{ElementRef, Html, Selector};

// ── Listings ──────────────────────────────────────────────────────────────────

/// Name and link of every `title_css` entry, in page order.
fn parse_item_refs(
    html: &str,
    title_css: &str,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<ItemRef>, ExtractError> {
    let doc = Html::parse_document(html);
    let title_sel = selector(title_css)?;
    let link_sel = selector("a")?;

    let mut items = Vec::new();
    for entry in doc.select(&title_sel) {
        let link = entry
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);
        let name = Some(element_text(entry)).filter(|n| !n.is_empty());

        let item = ItemRef { name, link };
        if item.name.is_none() || item.link.is_none() {
            sink.report(Diagnostic::ItemIncomplete {
                name: item.name.clone(),
                link: item.link.clone(),
            });
        }
        items.push(item);
    }
    Ok(items)
}

/// The new-releases listing. A page without any film title means the
/// navigation landed somewhere else.
pub fn parse_release_links(
    html: &str,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<ItemRef>, ExtractError> {
    let items = parse_item_refs(html, ".movie-title", sink)?;
    if items.is_empty() {
        return Err(ExtractError::EmptyListing("new releases"));
    }
    Ok(items)
}

/// The top-1000 listing, after every "show more" has been expanded.
pub fn parse_top_links(html: &str, sink: &dyn DiagnosticSink) -> Result<Vec<ItemRef>, ExtractError> {
    let items = parse_item_refs(html, ".mc-title", sink)?;
    if items.is_empty() {
        sink.report(Diagnostic::EmptyListing {
            context: "top 1000".into(),
        });
    }
    Ok(items)
}

// ── Detail pages ──────────────────────────────────────────────────────────────

/// The `dd` right after the `dt` whose text contains `label`.
fn definition_of(scope: ElementRef<'_>, dt: &Selector, label: &str) -> Option<String> {
    scope
        .select(dt)
        .find(|el| el.text().collect::<String>().contains(label))
        .and_then(|el| {
            el.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sib| sib.value().name() == "dd")
        })
        .map(element_text)
}

/// Producers and running time from a film page.
pub fn parse_release_detail(
    html: &str,
    title: Option<String>,
    sink: &dyn DiagnosticSink,
) -> Result<Extracted<ReleaseRecord>, ExtractError> {
    let doc = Html::parse_document(html);
    let producer_sel = selector(".card-producer")?;
    let dt_sel = selector("dt")?;

    let producers = FieldChain::new("producers").or("card producer", first_text(&producer_sel));
    let duration = FieldChain::new("duration").or("running time", |scope| {
        definition_of(scope, &dt_sel, "Running time")
    });

    let root = doc.root_element();
    let mut row = RowScope::new(sink, format!("release '{}'", title.as_deref().unwrap_or("?")));
    let record = ReleaseRecord {
        producers: row.field(&producers, root),
        duration: row.field(&duration, root),
        title,
    };
    Ok(row.finish(record))
}

/// Directors, genres and cast from a film page.
pub fn parse_top_detail(
    html: &str,
    title: Option<String>,
    sink: &dyn DiagnosticSink,
) -> Result<Extracted<TopFilmRecord>, ExtractError> {
    let doc = Html::parse_document(html);
    let link_sel = selector("a")?;
    let directors_sel = selector(".directors")?;
    let genres_sel = selector(".card-genres")?;
    let cast_debug_sel = selector(".card-cast-debug")?;
    let cast_sel = selector(".card-cast")?;

    let directors =
        FieldChain::new("directors").or("directors", texts_within(&directors_sel, &link_sel));
    let genres = FieldChain::new("genres").or("card genres", texts_within(&genres_sel, &link_sel));
    let actors = FieldChain::new("actors")
        .or("debug cast", texts_within(&cast_debug_sel, &link_sel))
        .or("cast", texts_within(&cast_sel, &link_sel));

    let root = doc.root_element();
    let mut row = RowScope::new(sink, format!("top film '{}'", title.as_deref().unwrap_or("?")));
    let record = TopFilmRecord {
        directors: row.field(&directors, root).map(|v| join_values(&v)),
        genres: row.field(&genres, root).map(|v| join_values(&v)),
        actors: row
            .field(&actors, root)
            .map(|v| join_values(&drop_trailing_credit(v))),
        title,
    };
    Ok(row.finish(record))
}

// ── Box office ────────────────────────────────────────────────────────────────

const BOX_OFFICE_HEADER: &str = "Box Office USA";

/// The "Box Office USA" table, with its own header row as columns.
pub fn parse_box_office(
    html: &str,
    sink: &dyn DiagnosticSink,
) -> Result<BoxOfficeTable, ExtractError> {
    let doc = Html::parse_document(html);
    let header_sel = selector(".header")?;
    let thead_sel = selector("thead")?;
    let tbody_sel = selector("tbody")?;
    let th_sel = selector("th")?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;

    let block = doc
        .select(&header_sel)
        .find(|h| element_text(*h).starts_with(BOX_OFFICE_HEADER))
        .and_then(|h| h.parent())
        .and_then(ElementRef::wrap)
        .ok_or(ExtractError::MissingBlock(BOX_OFFICE_HEADER))?;

    let (Some(thead), Some(tbody)) = (
        block.select(&thead_sel).next(),
        block.select(&tbody_sel).next(),
    ) else {
        return Err(ExtractError::MissingBlock("box office table header or body"));
    };

    let columns: Vec<String> = thead.select(&th_sel).map(element_text).collect();

    let mut rows = Vec::new();
    for tr in tbody.select(&tr_sel) {
        let cells: Vec<String> = tr.select(&td_sel).map(element_text).collect();
        if cells.len() != columns.len() {
            sink.report(Diagnostic::RowShape {
                expected: columns.len(),
                found: cells.len(),
            });
        }
        rows.push(cells);
    }

    Ok(BoxOfficeTable { columns, rows })
}

// ── Netflix ───────────────────────────────────────────────────────────────────

/// Selectors shared by every Netflix card layout.
struct CardSelectors {
    chips: Selector,
    chip: Selector,
    genre_links: Selector,
    titled_link: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            chips: selector(".types-wrapper")?,
            chip: selector(".type")?,
            genre_links: selector("a.genre")?,
            titled_link: selector("a[title]")?,
        })
    }

    fn genres(&self) -> FieldChain<'_, Vec<String>> {
        FieldChain::new("genres")
            .or("type chips", texts_within(&self.chips, &self.chip))
            .or("genre links", texts_of(&self.genre_links))
    }

    fn title(&self) -> FieldChain<'_, String> {
        FieldChain::new("title").or("link title", first_attr(&self.titled_link, "title"))
    }
}

/// Upcoming Netflix releases on the current calendar page.
///
/// Films are grouped under date headers; the first group on a page marks its
/// date differently from the rest.
pub fn parse_netflix_releases(
    html: &str,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<Extracted<NetflixReleaseRecord>>, ExtractError> {
    let doc = Html::parse_document(html);
    let group_sel = selector("div#main-wrapper-rdcat")?;
    let film_sel = selector(".top-movie")?;
    let flag_sel = selector("img.nflag")?;
    let first_date_sel = selector(".rdate-cat.rdate-cat-first")?;
    let date_sel = selector(".rdate-cat")?;
    let cards = CardSelectors::new()?;

    let release_date = FieldChain::new("release date")
        .or("first date", first_text(&first_date_sel))
        .or("group date", first_text(&date_sel));
    let countries = FieldChain::new("countries").or("flags", attrs_of(&flag_sel, "alt"));
    let genres = cards.genres();
    let title = cards.title();

    let mut rows = Vec::new();
    for (g, group) in doc.select(&group_sel).enumerate() {
        let date = release_date.try_resolve(group);

        for (i, film) in group.select(&film_sel).enumerate() {
            let mut row = RowScope::new(sink, format!("netflix release {}.{}", g + 1, i + 1));
            if date.is_none() {
                row.mark_missing(release_date.field());
            }
            let record = NetflixReleaseRecord {
                origin_country: row.field(&countries, film).map(|v| join_values(&v)),
                genres: row.field(&genres, film).map(|v| join_values(&v)),
                title: row.field(&title, film),
                release_date: date.clone(),
            };
            rows.push(row.finish(record));
        }
    }
    Ok(rows)
}

/// Which Netflix ranking a page belongs to. The two share a layout except
/// for where the vote count sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    MostVoted,
    Best,
}

impl Ranking {
    fn votes_css(self) -> &'static str {
        match self {
            Ranking::MostVoted => ".rat-count.countcat",
            Ranking::Best => ".rat-count",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Ranking::MostVoted => "most voted",
            Ranking::Best => "best rated",
        }
    }
}

/// Netflix most-voted or best-rated listing.
pub fn parse_netflix_ranking(
    html: &str,
    ranking: Ranking,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<Extracted<NetflixRatedRecord>>, ExtractError> {
    let doc = Html::parse_document(html);
    let film_sel = selector("div.top-movie")?;
    let year_sel = selector("span.date")?;
    let data_sel = selector("div.mc-data")?;
    let div_sel = selector("div")?;
    let flag_sel = selector("img.nflag")?;
    let votes_sel = selector(ranking.votes_css())?;
    let rating_sel = selector(".avg-rating")?;
    let cards = CardSelectors::new()?;

    let year = FieldChain::new("release year").or("date", first_text(&year_sel));
    // Only the first unclassed block under the first data panel carries the origin flags.
    let flags = attrs_of(&flag_sel, "alt");
    let countries = FieldChain::new("countries").or("data flags", move |film| {
        let block = film
            .select(&data_sel)
            .next()?
            .select(&div_sel)
            .find(|d| d.value().attr("class").is_none())?;
        flags(block)
    });
    let votes = FieldChain::new("votes").or("rating count", first_text(&votes_sel));
    let rating = FieldChain::new("rating").or("average", first_text(&rating_sel));
    let genres = cards.genres();
    let title = cards.title();

    let mut rows = Vec::new();
    for (i, film) in doc.select(&film_sel).enumerate() {
        let mut row = RowScope::new(sink, format!("netflix {} {}", ranking.label(), i + 1));
        let record = NetflixRatedRecord {
            title: row.field(&title, film),
            origin_country: row.field(&countries, film).map(|v| join_values(&v)),
            genres: row.field(&genres, film).map(|v| join_values(&v)),
            release_date: row.field(&year, film),
            votes: row.field(&votes, film),
            rating: row.field(&rating, film),
        };
        rows.push(row.finish(record));
    }
    Ok(rows)
}

/// Whether the page still offers a control matching `css`.
pub fn has_control(html: &str, css: &str) -> Result<bool, ExtractError> {
    let doc = Html::parse_document(html);
    let sel = selector(css)?;
    Ok(doc.select(&sel).next().is_some())
}
