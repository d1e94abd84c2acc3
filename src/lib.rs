//! Client for the data behind edhrec.com.
//!
//! The site doesn't have a public api. Its pages are rendered by Next.js,
//! which serves the data of every page as JSON under a route namespaced by the
//! id of the current deployment. [`Edhrec`] discovers that id, synthesizes the
//! data routes, unwraps the framework's envelope and memoizes the expensive
//! lookups for a day.

pub mod build_id;
pub mod cache;
pub mod client;
pub mod colors;
pub mod envelope;
pub mod top;
pub mod uri;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use client::{Edhrec, EdhrecBuilder};
pub use top::Timeframe;
pub use uri::{normalize_card_name, Budget};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One ranked list from a commander page, e.g. "Top Creatures".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub header: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cardviews: Vec<Value>,
}

impl CardList {
    /// Reads every list out of a page's `cardlists` array. Entries that
    /// aren't shaped like a list are skipped, the rest are kept.
    pub fn from_cardlists(lists: &Value) -> Vec<Self> {
        lists
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|list| match Self::deserialize(list) {
                Ok(list) => Some(list),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed card list");
                    None
                }
            })
            .collect()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageDeck {
    /// The commander as it was asked for.
    pub commander: String,
    pub decklist: Option<Value>,
}

/// A deck reduced to card names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedDeck {
    pub commanders: Vec<String>,
    pub cardlists: Vec<DeckSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSection {
    pub header: String,
    pub cards: Vec<String>,
}

impl SimplifiedDeck {
    /// Reshapes the data of a deck preview page. `None` if the page doesn't
    /// have the commanders or the card lists.
    pub fn from_deck(deck: &Value) -> Option<Self> {
        let commanders = deck
            .get("commanders")?
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .map(ToOwned::to_owned)
            .collect();
        let cardlists = deck
            .pointer("/container/json_dict/cardlists")?
            .as_array()?
            .iter()
            .filter_map(|list| {
                let header = list.get("header")?.as_str()?.to_owned();
                let cards = list
                    .get("cardviews")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|card| card.get("name")?.as_str())
                    .map(ToOwned::to_owned)
                    .collect();
                Some(DeckSection { header, cards })
            })
            .collect();
        Some(Self {
            commanders,
            cardlists,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reqwest({0})")]
    Reqwest(#[from] reqwest::Error),
    #[error("Json({0})")]
    Json(#[from] serde_json::Error),
    #[error("unknown color combination {given:?}, valid combinations are: {valid}")]
    UnknownColors { given: Vec<String>, valid: String },
    #[error("InvalidUrl({0})")]
    InvalidUrl(String),
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn simplifies_deck_preview() {
        let deck = json!({
            "commanders": ["Edgar Markov", null],
            "cards": 100,
            "container": {"json_dict": {"cardlists": [
                {"header": "Creatures", "tag": "creatures", "cardviews": [
                    {"name": "Bloodline Keeper", "sanitized": "bloodline-keeper"},
                    {"name": "Cordial Vampire"}
                ]},
                {"header": "Lands", "cardviews": [{"name": "Swamp"}]},
                {"cardviews": [{"name": "No Header"}]}
            ]}}
        });
        let simplified = SimplifiedDeck::from_deck(&deck).unwrap();
        assert_eq!(simplified.commanders, ["Edgar Markov"]);
        assert_eq!(
            simplified.cardlists,
            [
                DeckSection {
                    header: "Creatures".into(),
                    cards: vec!["Bloodline Keeper".into(), "Cordial Vampire".into()],
                },
                DeckSection {
                    header: "Lands".into(),
                    cards: vec!["Swamp".into()],
                },
            ]
        );
    }

    #[test]
    fn card_lists_tolerate_null_fields() {
        let lists = json!([
            {"header": "Creatures", "tag": "creatures", "cardviews": [{"name": "Cordial Vampire"}]},
            {"header": null, "tag": "lands", "cardviews": [{"name": "Swamp"}]},
            {"header": "Instants", "tag": "instants", "cardviews": null},
            {"header": 7, "tag": "broken"},
            "not a list"
        ]);
        let lists = CardList::from_cardlists(&lists);
        assert_eq!(lists.len(), 3);
        assert_eq!(lists[0].header, "Creatures");
        assert_eq!(lists[1].header, "");
        assert_eq!(lists[1].tag.as_deref(), Some("lands"));
        assert_eq!(lists[1].cardviews, [json!({"name": "Swamp"})]);
        assert_eq!(lists[2].tag.as_deref(), Some("instants"));
        assert!(lists[2].cardviews.is_empty());
    }

    #[test]
    fn card_lists_need_an_array() {
        assert!(CardList::from_cardlists(&json!({"cardviews": []})).is_empty());
    }

    #[test]
    fn simplifying_requires_commanders_and_lists() {
        assert_eq!(SimplifiedDeck::from_deck(&json!({"commanders": []})), None);
        assert_eq!(
            SimplifiedDeck::from_deck(&json!({"container": {"json_dict": {"cardlists": []}}})),
            None
        );
    }
}
