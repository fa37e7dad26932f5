//! Live browser tests
//!
//! These require a local Chrome/Chromium and are ignored by default. Run
//! with `cargo test -- --ignored` on a machine with a browser installed.

use serde_json::json;
use webpilot::resolve::{click_by_text, ClickStrategy};
use webpilot::session::{BrowserConfig, Session};
use webpilot::tools::ToolRegistry;

fn live_config() -> BrowserConfig {
    BrowserConfig::builder()
        .headless(true)
        .sandbox(false)
        .nav_timeout_ms(10000)
        .build()
}

#[tokio::test]
#[ignore]
async fn test_concurrent_acquire_launches_one_browser() {
    let session = Session::new(live_config());

    let (a, b, c) = tokio::join!(session.acquire(), session.acquire(), session.acquire());
    let a = a.unwrap();
    let b = b.unwrap();
    let c = c.unwrap();

    // All callers observe the same page.
    let id = a.target_id().inner().clone();
    assert_eq!(*b.target_id().inner(), id);
    assert_eq!(*c.target_id().inner(), id);

    session.release().await;
}

#[tokio::test]
#[ignore]
async fn test_release_then_acquire_yields_fresh_browser() {
    let session = Session::new(live_config());

    let first = session.acquire().await.unwrap();
    let first_id = first.target_id().inner().clone();

    let report = session.release().await;
    assert!(report.was_open);

    let second = session.acquire().await.unwrap();
    assert_ne!(*second.target_id().inner(), first_id);

    session.release().await;
}

#[tokio::test]
#[ignore]
async fn test_failed_navigation_leaves_session_usable() {
    let session = Session::new(live_config());
    let registry = ToolRegistry::new();

    let outcome = registry
        .execute(
            &session,
            "visit_url",
            json!({"url": "http://unreachable.invalid"}),
        )
        .await;
    assert!(!outcome.is_success());

    // The next unrelated call still succeeds against the same session.
    let outcome = registry
        .execute(&session, "check_browser_status", json!({}))
        .await;
    assert!(outcome.is_success());

    session.release().await;
}

#[tokio::test]
#[ignore]
async fn test_invalid_selector_fails_fast() {
    let session = Session::new(live_config());
    let registry = ToolRegistry::new();
    registry.execute(&session, "open_browser", json!({})).await;

    // A rejected selector must not burn the whole resolution timeout.
    let start = std::time::Instant::now();
    let outcome = registry
        .execute(&session, "click_element", json!({"selector": "div[["}))
        .await;
    assert!(!outcome.is_success());
    assert!(start.elapsed() < std::time::Duration::from_secs(4));

    session.release().await;
}

#[tokio::test]
#[ignore]
async fn test_text_click_lands_on_button_before_link() {
    // "Submit" exists as both a button and a link; the click must land on
    // the button, and never through the link-role fallback.
    let dir = std::env::temp_dir().join(format!("webpilot-fixture-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let fixture = dir.join("submit.html");
    std::fs::write(
        &fixture,
        r##"<html><body>
            <button onclick="document.title='button-clicked'">Submit</button>
            <a href="#" onclick="document.title='link-clicked'">Submit</a>
        </body></html>"##,
    )
    .unwrap();

    let session = Session::new(live_config());
    let registry = ToolRegistry::new();
    let outcome = registry
        .execute(
            &session,
            "visit_url",
            json!({"url": format!("file://{}", fixture.display())}),
        )
        .await;
    assert!(outcome.is_success());

    let page = session.acquire().await.unwrap();
    let strategy = click_by_text(&page, "Submit").await.unwrap();
    assert_ne!(strategy, ClickStrategy::LinkRole);

    let title: String = page
        .evaluate("document.title")
        .await
        .unwrap()
        .into_value()
        .unwrap();
    assert_eq!(title, "button-clicked");

    session.release().await;
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
#[ignore]
async fn test_two_rapid_screenshots_produce_two_files() {
    let dir = std::env::temp_dir().join(format!("webpilot-live-{}", std::process::id()));
    let session = Session::new(
        BrowserConfig::builder()
            .headless(true)
            .sandbox(false)
            .screenshot_dir(dir.clone())
            .build(),
    );
    let registry = ToolRegistry::new();

    registry
        .execute(&session, "open_browser", json!({}))
        .await;

    let first = registry
        .execute(&session, "take_screenshot", json!({"filename": "step"}))
        .await;
    let second = registry
        .execute(&session, "take_screenshot", json!({"filename": "step"}))
        .await;
    assert!(first.is_success());
    assert!(second.is_success());

    let files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("step_"))
        .collect();
    assert_eq!(files.len(), 2);

    session.release().await;
    let _ = std::fs::remove_dir_all(&dir);
}
