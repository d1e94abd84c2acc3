use serde_json::Value;

/// Strips the `{"pageProps": {"data": ...}}` envelope Next.js puts around page
/// data. Anything that doesn't have that shape yields `None`.
pub fn page_data(response: Value) -> Option<Value> {
    let Value::Object(mut response) = response else {
        return None;
    };
    match response.remove("pageProps")? {
        Value::Object(mut props) => props.remove("data").filter(|d| !d.is_null()),
        _ => None,
    }
}
