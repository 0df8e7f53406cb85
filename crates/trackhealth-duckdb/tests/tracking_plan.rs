use chrono::{NaiveDate, TimeZone, Utc};
use trackhealth_core::health::{HealthBackend, PageRequest, TrackingStatus};
use trackhealth_core::occurrence::Occurrence;
use trackhealth_core::window::DateWindow;
use trackhealth_duckdb::DuckDbBackend;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
}

fn occurrence(key: &str, date: &str, expected: &str, has_errors: bool) -> Occurrence {
    let date = d(date);
    Occurrence {
        occurrence_key: key.to_string(),
        date,
        event_timestamp: Utc
            .from_utc_datetime(&date.and_hms_opt(9, 30, 0).expect("time")),
        expected_event_name: expected.to_string(),
        event_name: expected.to_string(),
        user_pseudo_id: format!("user_{key}"),
        session_id: None,
        device_category: None,
        device_os: None,
        device_browser: None,
        page_location: Some("/".to_string()),
        is_missing_in_source: false,
        is_event_param_missing: has_errors,
        is_user_param_missing: false,
        is_item_param_missing: false,
        is_ecommerce_param_missing: false,
        has_missing_params: has_errors,
        missing_event_params: if has_errors {
            vec!["value".to_string()]
        } else {
            Vec::new()
        },
        missing_user_params: Vec::new(),
        missing_item_params: Vec::new(),
        missing_ecommerce_params: Vec::new(),
    }
}

async fn seed_two_events(db: &DuckDbBackend) {
    // Event A: 100 total, 50 errors (50%). Event B: 1000 total, 0 errors.
    let mut rows = Vec::new();
    for i in 0..100 {
        rows.push(occurrence(&format!("a_{i}"), "2025-06-01", "event_a", i < 50));
    }
    for i in 0..1000 {
        rows.push(occurrence(&format!("b_{i}"), "2025-06-01", "event_b", false));
    }
    db.insert_occurrences(&rows).await.expect("insert");
}

#[tokio::test]
async fn rollup_sorts_error_bucket_before_volume() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    seed_two_events(&db).await;

    let window = DateWindow::new(d("2025-06-01"), d("2025-06-01")).expect("window");
    let page = PageRequest::new(1, 10).expect("page");
    let view = db.get_tracking_plan(&window, None, &page).await.expect("view");

    // A (50% errors) sorts before B (0%) despite B's 10x volume.
    assert_eq!(view.tracking_plan.len(), 2);
    assert_eq!(view.tracking_plan[0].expected_event_name, "event_a");
    assert_eq!(view.tracking_plan[0].status, TrackingStatus::Error);
    assert_eq!(view.tracking_plan[1].expected_event_name, "event_b");
    assert_eq!(view.tracking_plan[1].status, TrackingStatus::Ok);

    // Derived totals come from the rollup, not an extra query.
    assert_eq!(view.stats.total_events, 1100);
    assert_eq!(view.stats.total_errors, 50);
    assert_eq!(view.stats.events_with_errors, 1);
    assert_eq!(view.stats.total_event_types, 2);
    assert!((view.stats.error_rate - 50.0 / 1100.0 * 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn pagination_derives_from_error_count_query() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    // 25 error occurrences.
    let rows: Vec<_> = (0..25)
        .map(|i| occurrence(&format!("e_{i}"), "2025-06-01", "purchase", true))
        .collect();
    db.insert_occurrences(&rows).await.expect("insert");

    let window = DateWindow::new(d("2025-06-01"), d("2025-06-01")).expect("window");
    let page = PageRequest::new(3, 10).expect("page");
    let view = db.get_tracking_plan(&window, None, &page).await.expect("view");

    assert_eq!(view.pagination.total_items, 25);
    assert_eq!(view.pagination.total_pages, 3);
    assert!(!view.pagination.has_next_page);
    assert!(view.pagination.has_prev_page);
    // Page 3 of 25 at size 10 holds the last 5 rows.
    assert_eq!(view.events_detail.len(), 5);
}

#[tokio::test]
async fn detail_pages_keep_lookalike_occurrences_distinct() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    // 25 distinct occurrences that agree on every visible attribute
    // except the key and user. They must stay 25 rows, not collapse.
    let rows: Vec<_> = (0..25)
        .map(|i| occurrence(&format!("twin_{i}"), "2025-06-01", "purchase", true))
        .collect();
    db.insert_occurrences(&rows).await.expect("insert");

    let window = DateWindow::new(d("2025-06-01"), d("2025-06-01")).expect("window");
    let page = PageRequest::new(1, 10).expect("page");
    let view = db.get_tracking_plan(&window, None, &page).await.expect("view");

    assert_eq!(view.pagination.total_items, 25);
    assert_eq!(view.events_detail.len(), 10);

    // Every returned row is a different occurrence.
    let mut keys: Vec<_> = view
        .events_detail
        .iter()
        .map(|r| r.occurrence_key.as_str())
        .collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), 10);
}

#[tokio::test]
async fn detail_rows_put_errors_first() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    db.insert_occurrences(&[
        occurrence("clean_1", "2025-06-01", "purchase", false),
        occurrence("bad_1", "2025-06-01", "purchase", true),
        occurrence("clean_2", "2025-06-02", "purchase", false),
    ])
    .await
    .expect("insert");

    let window = DateWindow::new(d("2025-06-01"), d("2025-06-02")).expect("window");
    let page = PageRequest::new(1, 10).expect("page");
    let view = db.get_tracking_plan(&window, None, &page).await.expect("view");

    assert_eq!(view.events_detail.len(), 3);
    assert!(view.events_detail[0].has_missing_params);
    assert_eq!(view.events_detail[0].missing_event_params, vec!["value"]);
    // Clean rows follow, newest first.
    assert!(!view.events_detail[1].has_missing_params);
    assert_eq!(view.events_detail[1].date, "2025-06-02");
}

#[tokio::test]
async fn event_filter_scopes_every_sub_query() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    seed_two_events(&db).await;

    let window = DateWindow::new(d("2025-06-01"), d("2025-06-01")).expect("window");
    let page = PageRequest::new(1, 10).expect("page");
    let view = db
        .get_tracking_plan(&window, Some("event_a"), &page)
        .await
        .expect("view");

    assert_eq!(view.tracking_plan.len(), 1);
    assert_eq!(view.tracking_plan[0].expected_event_name, "event_a");
    assert_eq!(view.stats.total_events, 100);
    assert_eq!(view.pagination.total_items, 50);
    assert!(view
        .events_detail
        .iter()
        .all(|r| r.expected_event_name == "event_a"));
}

#[tokio::test]
async fn chart_series_is_zero_filled_over_the_window() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    db.insert_occurrences(&[
        occurrence("x1", "2025-06-01", "purchase", true),
        occurrence("x2", "2025-06-03", "purchase", false),
    ])
    .await
    .expect("insert");

    let window = DateWindow::new(d("2025-06-01"), d("2025-06-03")).expect("window");
    let page = PageRequest::new(1, 10).expect("page");
    let view = db.get_tracking_plan(&window, None, &page).await.expect("view");

    assert_eq!(view.chart_data.len(), 3);
    assert_eq!(view.chart_data[0].date, "2025-06-01");
    assert_eq!(view.chart_data[0].pct_events_with_missing_params, 100.0);
    assert_eq!(view.chart_data[1].date, "2025-06-02");
    assert_eq!(view.chart_data[1].total_events, 0);
    assert_eq!(view.chart_data[1].pct_events_with_missing_params, 0.0);
    assert_eq!(view.chart_data[2].total_events, 1);
}
