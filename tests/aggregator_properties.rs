// tests/aggregator_properties.rs
//
// Behavioural properties of the aggregation engine, driven through the facade
// with a scripted fetcher (no sockets).
//
// Covered:
// - TTL idempotence and TTL expiry
// - forced refresh bypasses fresh cache
// - partial failure isolation + bounded latency
// - stale fallback after a previously good fetch
// - deterministic tie-break by source registration order
// - unreadable payloads are not retried
// - end-to-end: json-array OK + markup-feed failing 3/3
// - source entries and view entries never share a cache key

mod common;

use std::time::{Duration, Instant};

use common::*;
use feedhub::ingest::error::NetworkError;
use feedhub::ingest::types::FeedFormat;

const LONG_TTL: Duration = Duration::from_secs(60);

#[tokio::test]
async fn second_call_within_ttl_hits_cache_and_is_identical() {
    let f = ScriptedFetcher::new();
    f.always(
        &url_of("a"),
        Ok(rss(&[
            ("A1", "https://a.test/1", "Mon, 01 Jan 2024 10:00:00 +0000"),
            ("A2", "https://a.test/2", "Mon, 01 Jan 2024 09:00:00 +0000"),
        ])),
    );
    f.always(&url_of("b"), Ok(dailyhot(&[("B1", "https://b.test/1")])));
    let svc = service(
        f.clone(),
        LONG_TTL,
        vec![
            source("a", "news", FeedFormat::MarkupFeed),
            source("b", "hot", FeedFormat::JsonArray),
        ],
    );

    let first = svc.get_items(None, 1, 50, false).await;
    let second = svc.get_items(None, 1, 50, false).await;

    assert_eq!(first.len(), 3);
    assert_eq!(first, second, "cached view must be returned unchanged");
    assert_eq!(f.calls(&url_of("a")), 1);
    assert_eq!(f.calls(&url_of("b")), 1);

    // A different view over the same sources reuses fresh per-source entries.
    let news_only = svc.get_items(Some("news"), 1, 50, false).await;
    assert_eq!(titles(&news_only), vec!["A1", "A2"]);
    assert_eq!(f.calls(&url_of("a")), 1);
}

#[tokio::test]
async fn expired_entries_are_fetched_again() {
    let f = ScriptedFetcher::new();
    f.always(&url_of("a"), Ok(dailyhot(&[("A1", "https://a.test/1")])));
    let svc = service(
        f.clone(),
        Duration::from_millis(30),
        vec![source("a", "hot", FeedFormat::JsonArray)],
    );

    svc.get_items(None, 1, 10, false).await;
    // 5x TTL headroom against slow timers
    tokio::time::sleep(Duration::from_millis(150)).await;
    svc.get_items(None, 1, 10, false).await;

    assert_eq!(f.calls(&url_of("a")), 2);
}

#[tokio::test]
async fn forced_refresh_always_fetches() {
    let f = ScriptedFetcher::new();
    f.sequence(
        &url_of("a"),
        vec![
            Ok(dailyhot(&[("old", "https://a.test/old")])),
            Ok(dailyhot(&[("new", "https://a.test/new")])),
        ],
    );
    let svc = service(f.clone(), LONG_TTL, vec![source("a", "hot", FeedFormat::JsonArray)]);

    let first = svc.get_items(None, 1, 10, false).await;
    let forced = svc.get_items(None, 1, 10, true).await;
    let cached = svc.get_items(None, 1, 10, false).await;

    assert_eq!(titles(&first), vec!["old"]);
    assert_eq!(titles(&forced), vec!["new"]);
    assert_eq!(titles(&cached), vec!["new"], "forced result is written back");
    assert_eq!(f.calls(&url_of("a")), 2);
}

#[tokio::test]
async fn failing_source_does_not_sink_the_others() {
    let f = ScriptedFetcher::new();
    f.always(
        &url_of("a"),
        Ok(rss(&[
            ("A-new", "https://a.test/1", "Mon, 01 Jan 2024 12:00:00 +0000"),
            ("A-old", "https://a.test/2", "Mon, 01 Jan 2024 08:00:00 +0000"),
        ])),
    );
    f.always(&url_of("b"), Err(NetworkError::Timeout(Duration::from_millis(5))));
    f.set_delay(&url_of("b"), Duration::from_millis(10));
    f.always(
        &url_of("c"),
        Ok(wp_posts(&[("C-mid", "https://c.test/1", "2024-01-01T10:00:00")])),
    );

    let svc = service(
        f.clone(),
        LONG_TTL,
        vec![
            source("a", "x", FeedFormat::MarkupFeed),
            source("b", "x", FeedFormat::MarkupFeed),
            source("c", "x", FeedFormat::PlatformRest),
        ],
    );

    let t0 = Instant::now();
    let items = svc.get_items(None, 1, 50, false).await;
    let elapsed = t0.elapsed();

    assert_eq!(titles(&items), vec!["A-new", "C-mid", "A-old"]);
    assert_eq!(f.calls(&url_of("b")), 3, "1 attempt + 2 retries");
    assert!(
        elapsed < Duration::from_secs(2),
        "bounded by B's own retry budget, took {elapsed:?}"
    );

    let err = svc.last_error().expect("B's failure is remembered");
    assert_eq!(err.source_id, "b");
    assert!(err.message.contains("3 attempt"));
    svc.clear_last_error();
    assert!(svc.last_error().is_none());
}

#[tokio::test]
async fn previously_good_source_serves_stale_data_when_it_fails() {
    let f = ScriptedFetcher::new();
    f.sequence(
        &url_of("a"),
        vec![
            Ok(dailyhot(&[("kept", "https://a.test/1")])),
            Err(NetworkError::Status {
                status: 503,
                url: url_of("a"),
            }),
        ],
    );
    // Zero TTL: nothing is ever fresh, every call goes upstream.
    let svc = service(f.clone(), Duration::ZERO, vec![source("a", "hot", FeedFormat::JsonArray)]);

    let good = svc.get_items(None, 1, 10, false).await;
    let stale = svc.get_items(None, 1, 10, false).await;

    assert_eq!(titles(&good), vec!["kept"]);
    assert_eq!(stale, good, "stale data replaces the failed fetch unchanged");
    assert_eq!(f.calls(&url_of("a")), 1 + 3);

    let entry = svc.aggregator().cache().read("source:a").unwrap();
    assert_eq!(entry.consecutive_failure_count, 1);
    assert_eq!(entry.data, good);
}

#[tokio::test]
async fn equal_timestamps_follow_registration_order() {
    let date = "2024-01-01T10:00:00";
    let f = ScriptedFetcher::new();
    f.always(&url_of("first"), Ok(wp_posts(&[("from-first", "https://f.test/1", date)])));
    f.always(&url_of("second"), Ok(wp_posts(&[("from-second", "https://s.test/1", date)])));

    let ordered = service(
        f.clone(),
        LONG_TTL,
        vec![
            source("first", "x", FeedFormat::PlatformRest),
            source("second", "x", FeedFormat::PlatformRest),
        ],
    );
    for _ in 0..3 {
        let items = ordered.get_items(None, 1, 10, true).await;
        assert_eq!(titles(&items), vec!["from-first", "from-second"]);
    }

    let reversed = service(
        f.clone(),
        LONG_TTL,
        vec![
            source("second", "x", FeedFormat::PlatformRest),
            source("first", "x", FeedFormat::PlatformRest),
        ],
    );
    let items = reversed.get_items(None, 1, 10, false).await;
    assert_eq!(titles(&items), vec!["from-second", "from-first"]);
}

#[tokio::test]
async fn unreadable_payload_is_not_retried() {
    let f = ScriptedFetcher::new();
    f.always(&url_of("a"), Ok("<html>maintenance</html>".into()));
    let svc = service(f.clone(), LONG_TTL, vec![source("a", "hot", FeedFormat::JsonArray)]);

    let items = svc.get_items(None, 1, 10, false).await;

    assert!(items.is_empty());
    assert_eq!(f.calls(&url_of("a")), 1);
    let err = svc.last_error().unwrap();
    assert!(err.message.contains("unreadable"), "got: {}", err.message);
}

#[tokio::test]
async fn end_to_end_json_ok_and_feed_down() {
    let f = ScriptedFetcher::new();
    f.always(
        &url_of("a"),
        Ok(dailyhot(&[("first", "https://a.test/1"), ("second", "https://a.test/2")])),
    );
    f.always(
        &url_of("b"),
        Err(NetworkError::Transport("connection refused".into())),
    );
    let svc = service(
        f.clone(),
        LONG_TTL,
        vec![
            source("a", "hot", FeedFormat::JsonArray),
            source("b", "news", FeedFormat::MarkupFeed),
        ],
    );

    let items = svc.get_items(None, 1, 10, false).await;

    assert_eq!(titles(&items), vec!["first", "second"]);
    assert!(items.iter().all(|i| i.source == "A" && i.category == "hot"));
    assert!(items
        .windows(2)
        .all(|w| w[0].published_at_millis >= w[1].published_at_millis));
    assert_eq!(f.calls(&url_of("b")), 3, "fails 3/3 attempts");
}

#[tokio::test]
async fn total_outage_without_cache_is_an_empty_list() {
    let f = ScriptedFetcher::new();
    f.always(&url_of("a"), Err(NetworkError::EmptyBody));
    let svc = service(f.clone(), LONG_TTL, vec![source("a", "hot", FeedFormat::JsonArray)]);

    assert!(svc.get_items(None, 1, 10, false).await.is_empty());
    let view = svc.aggregator().cache().read("view:all_1_10").unwrap();
    assert_eq!(view.consecutive_failure_count, 1);
}

#[tokio::test]
async fn source_id_shaped_like_a_view_key_keeps_its_own_entry() {
    let f = ScriptedFetcher::new();
    f.always(
        &url_of("all_1_10"),
        Ok(wp_posts(&[("from-x", "https://x.test/1", "2024-01-02T10:00:00")])),
    );
    f.always(
        &url_of("b"),
        Ok(wp_posts(&[("from-y", "https://y.test/1", "2024-01-01T10:00:00")])),
    );
    let svc = service(
        f.clone(),
        LONG_TTL,
        vec![
            source("all_1_10", "x", FeedFormat::PlatformRest),
            source("b", "y", FeedFormat::PlatformRest),
        ],
    );

    let all = svc.get_items(None, 1, 10, false).await;
    assert_eq!(titles(&all), vec!["from-x", "from-y"]);

    // The "all" view must not have overwritten the source's own entry.
    let only_x = svc.get_items(Some("x"), 1, 10, false).await;
    assert_eq!(titles(&only_x), vec!["from-x"]);
    assert!(only_x.iter().all(|i| i.category == "x"));

    let cache = svc.aggregator().cache();
    assert_eq!(titles(&cache.read("source:all_1_10").unwrap().data), vec!["from-x"]);
    assert_eq!(cache.read("view:all_1_10").unwrap().data, all);
}
