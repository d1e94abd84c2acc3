//! Next.js data route synthesis.
//!
//! Every page on the site has a JSON twin served from
//! `/_next/data/{build_id}/{route}.json`, where `build_id` changes with every
//! deployment. These routes also expect the dynamic route segments repeated as
//! query parameters.

use std::{collections::BTreeMap, fmt};

/// Turns a card name into the slug the site uses in its routes.
///
/// Only spaces, apostrophes and commas are touched; any other punctuation is
/// kept because the site keeps it too.
pub fn normalize_card_name(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "-")
        .replace(['\'', ','], "")
}

/// Page families that have Next.js data routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Commanders,
    Combos,
    AverageDecks,
    Decks,
    DeckPreview,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commanders => "commanders",
            Self::Combos => "combos",
            Self::AverageDecks => "average-decks",
            Self::Decks => "decks",
            Self::DeckPreview => "deckpreview",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price tier variants of commander pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Budget {
    Budget,
    Expensive,
}

impl Budget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Expensive => "expensive",
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional route modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UriOptions<'a> {
    pub slug: Option<&'a str>,
    pub theme: Option<&'a str>,
    pub budget: Option<Budget>,
}

/// A synthesized data route: the full uri plus the query parameters to send
/// with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub uri: String,
    pub query: BTreeMap<String, String>,
}

impl DataRequest {
    /// Builds the data route for `subject` under `endpoint`.
    ///
    /// Query parameters are assigned in order and a later assignment replaces
    /// an earlier one: a budget tier always wins `themeName` over a theme.
    pub fn new(
        root: &str,
        build_id: &str,
        endpoint: Endpoint,
        subject: &str,
        options: UriOptions<'_>,
    ) -> Self {
        let subject = normalize_card_name(subject);
        let mut query = BTreeMap::new();
        query.insert("commanderName".to_owned(), subject.clone());
        let mut uri = format!("{root}/_next/data/{build_id}/{endpoint}/{subject}");

        if let Some(theme) = options.theme {
            uri.push('/');
            uri.push_str(theme);
            if options.budget.is_none() {
                query.insert("themeName".to_owned(), theme.to_owned());
            }
        }

        match options.budget {
            Some(budget) => {
                uri.push('/');
                uri.push_str(budget.as_str());
                uri.push_str(".json");
                query.insert("themeName".to_owned(), budget.as_str().to_owned());
            }
            None => uri.push_str(".json"),
        }

        if let Some(slug) = options.slug {
            query.insert("slug".to_owned(), slug.to_owned());
        }

        if endpoint == Endpoint::Combos {
            query.insert("colors".to_owned(), subject);
        }

        Self { uri, query }
    }
}
