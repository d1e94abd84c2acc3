//! Color identities and the archetype names the site files commanders under.

use crate::Error;

const WUBRG: [char; 5] = ['w', 'u', 'b', 'r', 'g'];

/// Every color identity, keyed by its letters in WUBRG order.
pub static ARCHETYPES: [(&str, &str); 32] = [
    ("", "colorless"),
    ("w", "mono-white"),
    ("u", "mono-blue"),
    ("b", "mono-black"),
    ("r", "mono-red"),
    ("g", "mono-green"),
    ("wu", "azorius"),
    ("ub", "dimir"),
    ("br", "rakdos"),
    ("rg", "gruul"),
    ("wg", "selesnya"),
    ("wb", "orzhov"),
    ("ur", "izzet"),
    ("bg", "golgari"),
    ("wr", "boros"),
    ("ug", "simic"),
    ("wub", "esper"),
    ("ubr", "grixis"),
    ("brg", "jund"),
    ("wrg", "naya"),
    ("wug", "bant"),
    ("wbg", "abzan"),
    ("wur", "jeskai"),
    ("ubg", "sultai"),
    ("wbr", "mardu"),
    ("urg", "temur"),
    ("wubr", "yore-tiller"),
    ("ubrg", "glint-eye"),
    ("wbrg", "dune-brood"),
    ("wurg", "ink-treader"),
    ("wubg", "witch-maw"),
    ("wubrg", "five-color"),
];

/// Resolves a set of color letters to its archetype name.
///
/// Order, case and repeats don't matter: `["b", "w"]`, `["W", "b"]` and
/// `["w", "b", "b"]` all name orzhov. Anything that isn't one of the five
/// color letters is rejected.
pub fn archetype<I, S>(colors: I) -> Result<&'static str, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let given = colors
        .into_iter()
        .map(|c| c.as_ref().to_lowercase())
        .collect::<Vec<_>>();
    let slots = given
        .iter()
        .map(|color| {
            let mut chars = color.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => WUBRG.iter().position(|&w| w == c),
                _ => None,
            }
        })
        .collect::<Option<Vec<_>>>();
    let Some(slots) = slots else {
        return Err(unknown(given));
    };
    let mut present = [false; 5];
    for i in slots {
        present[i] = true;
    }
    let key = WUBRG
        .iter()
        .zip(present)
        .filter_map(|(c, p)| p.then_some(*c))
        .collect::<String>();
    ARCHETYPES
        .iter()
        .find(|(letters, _)| *letters == key)
        .map(|(_, name)| *name)
        .ok_or_else(|| unknown(given))
}

fn unknown(given: Vec<String>) -> Error {
    Error::UnknownColors {
        given,
        valid: ARCHETYPES
            .iter()
            .map(|(letters, name)| format!("{name} [{letters}]"))
            .collect::<Vec<_>>()
            .join(", "),
    }
}
