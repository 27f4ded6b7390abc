//! Raw feed bytes → [`FeedSnapshot`], via `feed-rs`.
//!
//! The `feed-rs` model is mapped onto this crate's own value types so that
//! equality and the wire format do not depend on the parser's internals.

use std::io::Read;

use feed_rs::model;
use feed_rs::parser::{self, ParseFeedError};

use feed_trigger_core::{Category, Content, Entry, FeedKind, FeedMeta, FeedSnapshot, Link, Person};

/// Parse an RSS, Atom or JSON feed from `source`.
///
/// Parsing the same bytes always yields equal snapshots.
pub fn parse_feed<R: Read>(source: R) -> Result<FeedSnapshot, ParseFeedError> {
    let feed = parser::Builder::new()
        .id_generator(stable_id)
        .build()
        .parse(source)?;
    Ok(from_model(feed))
}

/// Id for feeds and entries that carry none.
///
/// Linked items get `feed-rs`'s link/title hash. Anything else stays empty
/// and is told apart by its remaining fields, never by a random UUID.
fn stable_id(links: &[model::Link], title: &Option<model::Text>, uri: Option<&str>) -> String {
    if links.is_empty() {
        String::new()
    } else {
        parser::generate_id(links, title, uri)
    }
}

fn from_model(feed: model::Feed) -> FeedSnapshot {
    let meta = FeedMeta {
        kind: kind(&feed.feed_type),
        id: feed.id,
        title: feed.title.map(|t| t.content),
        link: feed.links.first().map(|l| l.href.clone()),
        links: feed.links.into_iter().map(link).collect(),
        description: feed.description.map(|t| t.content),
        language: feed.language,
        updated: feed.updated,
        published: feed.published,
        authors: feed.authors.into_iter().map(person).collect(),
        categories: feed.categories.into_iter().map(category).collect(),
        generator: feed.generator.map(|g| g.content),
        rights: feed.rights.map(|t| t.content),
    };
    let entries = feed.entries.into_iter().map(entry).collect();
    FeedSnapshot { meta, entries }
}

fn entry(e: model::Entry) -> Entry {
    Entry {
        id: e.id,
        title: e.title.map(|t| t.content),
        link: e.links.first().map(|l| l.href.clone()),
        links: e.links.into_iter().map(link).collect(),
        summary: e.summary.map(|t| t.content),
        content: e.content.map(|c| Content {
            body: c.body,
            content_type: c.content_type.to_string(),
            src: c.src.map(|l| l.href),
        }),
        authors: e.authors.into_iter().map(person).collect(),
        categories: e.categories.into_iter().map(category).collect(),
        published: e.published,
        updated: e.updated,
        rights: e.rights.map(|t| t.content),
        source: e.source,
    }
}

fn kind(feed_type: &model::FeedType) -> FeedKind {
    match feed_type {
        model::FeedType::Atom => FeedKind::Atom,
        model::FeedType::JSON => FeedKind::Json,
        model::FeedType::RSS0 => FeedKind::Rss0,
        model::FeedType::RSS1 => FeedKind::Rss1,
        model::FeedType::RSS2 => FeedKind::Rss2,
    }
}

fn link(l: model::Link) -> Link {
    Link {
        href: l.href,
        rel: l.rel,
        media_type: l.media_type,
        title: l.title,
        length: l.length,
    }
}

fn person(p: model::Person) -> Person {
    Person {
        name: p.name,
        uri: p.uri,
        email: p.email,
    }
}

fn category(c: model::Category) -> Category {
    Category {
        term: c.term,
        scheme: c.scheme,
        label: c.label,
    }
}
