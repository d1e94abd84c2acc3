//! Tests for the paginated commander rankings.

use edhrec::{Edhrec, Error, Timeframe};
use futures::{StreamExt, TryStreamExt};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn names(range: std::ops::Range<usize>) -> Vec<Value> {
    range
        .map(|i| json!({"name": format!("Commander {i}"), "sanitized": format!("commander-{i}")}))
        .collect()
}

fn client(server: &MockServer) -> Edhrec {
    Edhrec::builder()
        .base_url(server.uri())
        .json_url(server.uri())
        .build()
        .unwrap()
}

async fn mount_ranking(server: &MockServer, page: &str, second_block_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/pages/{page}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "header": "Top Commanders",
            "container": {"json_dict": {"cardlists": [
                {"cardviews": names(0..100), "more": format!("{page}/past-100.json")}
            ]}}
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/pages/{page}/past-100.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cardviews": names(100..200),
            "more": format!("{page}/past-200.json")
        })))
        .expect(second_block_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn yields_exactly_n_names_across_blocks() {
    let server = MockServer::start().await;
    mount_ranking(&server, "commanders/week", 1).await;

    let top = client(&server)
        .top_commanders(Timeframe::Week, 150)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    assert_eq!(top.len(), 150);
    assert_eq!(top[0], "Commander 0");
    assert_eq!(top[99], "Commander 99");
    assert_eq!(top[100], "Commander 100");
    assert_eq!(top[149], "Commander 149");
}

#[tokio::test]
async fn second_block_is_fetched_only_at_index_100() {
    let server = MockServer::start().await;
    mount_ranking(&server, "commanders/month", 1).await;
    let client = client(&server);

    let top = client.top_commanders(Timeframe::Month, 101);
    futures::pin_mut!(top);

    assert!(server.received_requests().await.unwrap().is_empty());
    for i in 0..100 {
        assert_eq!(top.next().await.unwrap().unwrap(), format!("Commander {i}"));
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    assert_eq!(top.next().await.unwrap().unwrap(), "Commander 100");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert!(top.next().await.is_none());
}

#[tokio::test]
async fn first_block_is_enough_for_100() {
    let server = MockServer::start().await;
    mount_ranking(&server, "commanders", 0).await;

    let top = client(&server)
        .top_commanders(Timeframe::AllTime, 100)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    assert_eq!(top.len(), 100);
}

#[tokio::test]
async fn each_call_starts_from_the_top() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pages/commanders/week.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "container": {"json_dict": {"cardlists": [{"cardviews": names(0..100)}]}}
        })))
        .expect(2)
        .mount(&server)
        .await;
    let client = client(&server);

    for _ in 0..2 {
        let top = client
            .top_commanders(Timeframe::Week, 3)
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert_eq!(top, ["Commander 0", "Commander 1", "Commander 2"]);
    }
}

#[tokio::test]
async fn short_ranking_ends_early() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pages/commanders/week.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "container": {"json_dict": {"cardlists": [{"cardviews": names(0..40)}]}}
        })))
        .mount(&server)
        .await;

    let top = client(&server)
        .top_commanders(Timeframe::Week, 150)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    assert_eq!(top.len(), 40);
}

#[tokio::test]
async fn by_color_uses_the_archetype_page() {
    let server = MockServer::start().await;
    mount_ranking(&server, "commanders/orzhov", 0).await;
    let client = client(&server);

    let top = client
        .top_commanders_by_color(["b", "w"], 2)
        .unwrap()
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    assert_eq!(top, ["Commander 0", "Commander 1"]);
}

#[tokio::test]
async fn unknown_colors_fail_without_requests() {
    let server = MockServer::start().await;
    let client = client(&server);

    let Err(err) = client.top_commanders_by_color(["w", "x"], 10) else {
        panic!("accepted an unknown color");
    };

    assert!(matches!(err, Error::UnknownColors { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn http_errors_end_the_stream_with_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pages/commanders/week.json"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .top_commanders(Timeframe::Week, 10)
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Reqwest(_)));
}
