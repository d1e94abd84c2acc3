//! Paginated commander rankings.
//!
//! Rankings are served as blocks of [`PAGE_SIZE`] card views. The first block
//! sits inside the page's card list container and every block carries a
//! `more` pointer to the next one.

use futures::{stream, Stream};
use serde::Deserialize;
use serde_json::Value;

use crate::{Edhrec, Result};

pub const PAGE_SIZE: usize = 100;

/// Window the commander ranking is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Week,
    Month,
    #[default]
    AllTime,
}

impl Timeframe {
    pub(crate) fn page(self) -> &'static str {
        match self {
            Self::Week => "commanders/week",
            Self::Month => "commanders/month",
            Self::AllTime => "commanders",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Block {
    #[serde(default)]
    cardviews: Vec<CardView>,
    more: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardView {
    name: Option<String>,
}

impl Block {
    fn from_response(response: Value) -> Option<Self> {
        let block = match response.pointer("/container/json_dict/cardlists/0") {
            Some(first) => first.clone(),
            None => response,
        };
        match serde_json::from_value(block) {
            Ok(block) => Some(block),
            Err(e) => {
                tracing::warn!(error = %e, "unexpected ranking block");
                None
            }
        }
    }
}

struct Cursor<'a> {
    client: &'a Edhrec,
    next: Option<String>,
    block: Block,
    index: usize,
    n: usize,
}

/// Streams the first `n` commander names of the ranking at `page`.
///
/// Nothing is requested until the stream is polled; a new block is fetched
/// when the index reaches a multiple of [`PAGE_SIZE`]. Ends early when the
/// ranking runs out.
pub(crate) fn commander_names<'a>(
    client: &'a Edhrec,
    page: &str,
    n: usize,
) -> impl Stream<Item = Result<String>> + 'a {
    let cursor = Cursor {
        client,
        next: Some(client.page_url(&format!("{page}.json"))),
        block: Block::default(),
        index: 0,
        n,
    };
    stream::try_unfold(cursor, |mut cursor| async move {
        if cursor.index >= cursor.n {
            return Ok(None);
        }
        if cursor.index % PAGE_SIZE == 0 {
            let Some(uri) = cursor.next.take() else {
                tracing::warn!(index = cursor.index, "ranking has no more blocks");
                return Ok(None);
            };
            let response = cursor.client.get_json(&uri, None).await?;
            let Some(block) = Block::from_response(response) else {
                return Ok(None);
            };
            cursor.next = block
                .more
                .as_deref()
                .map(|more| cursor.client.page_url(more));
            cursor.block = block;
        }
        let name = cursor
            .block
            .cardviews
            .get_mut(cursor.index % PAGE_SIZE)
            .and_then(|view| view.name.take());
        let Some(name) = name else {
            tracing::warn!(index = cursor.index, "ranking ended early");
            return Ok(None);
        };
        cursor.index += 1;
        Ok::<_, crate::Error>(Some((name, cursor)))
    })
}
