use lazy_static::lazy_static;
use scraper::{Html, Selector};
use serde::Deserialize;

/// Build id of the last deployment known to work, used when the live one can't
/// be discovered.
pub const FALLBACK_BUILD_ID: &str = "mI7k8IZ23x74LocK_h-qe";

#[derive(Debug, Deserialize)]
struct NextData {
    #[serde(rename = "buildId")]
    build_id: Option<String>,
}

/// Extracts the build id from a server rendered page.
///
/// Next.js embeds its bootstrap state as JSON in
/// `<script id="__NEXT_DATA__" type="application/json">`. A missing script block
/// and one whose content isn't valid JSON are treated the same: `None`.
pub fn parse_build_id(page: &str) -> Option<String> {
    lazy_static! {
        static ref NEXT_DATA: Selector =
            Selector::parse(r#"script#__NEXT_DATA__[type="application/json"]"#).unwrap();
    };
    let doc = Html::parse_document(page);
    let script = doc.select(&NEXT_DATA).next()?;
    let props = script.text().collect::<String>();
    match serde_json::from_str::<NextData>(&props) {
        Ok(data) => data.build_id,
        Err(e) => {
            tracing::debug!(error = %e, "__NEXT_DATA__ is not valid json");
            None
        }
    }
}
