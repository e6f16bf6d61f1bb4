//! End-to-end pipeline tests against the scripted driver

mod common;

use common::*;
use igcore::driver::SessionCookie;
use igcore::testing::{MockDriver, ScriptedPage};
use igcore::{ErrorCode, Extractor, MediaType, ScrapeOptions};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn extractor(driver: MockDriver) -> Extractor {
    Extractor::new(Arc::new(driver), ScrapeOptions::instant())
}

fn session_cookie() -> SessionCookie {
    SessionCookie {
        name: "sessionid".into(),
        value: "1234%3Aabcdef".into(),
        domain: ".instagram.com".into(),
        path: "/".into(),
        secure: true,
        http_only: true,
        expires: None,
    }
}

#[tokio::test]
async fn test_reel_yields_single_video_with_thumbnail() {
    let driver = MockDriver::new().with_page("https://www.instagram.com/reel/Cabc123/", ScriptedPage::html(reel_page("natgeo")));
    let stats = driver.stats();

    let result = extractor(driver)
        .extract("https://www.instagram.com/reel/Cabc123/?igsh=xyz", None)
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.count, 1);
    assert_eq!(result.username.as_deref(), Some("natgeo"));
    assert_eq!(result.media[0].media_type, MediaType::Video);
    assert_eq!(result.media[0].url, REEL_VIDEO);
    assert_eq!(result.media[0].thumbnail.as_deref(), Some(REEL_COVER));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["media"][0]["type"], "video");
    assert_eq!(json["media"][0]["thumbnail"], REEL_COVER);

    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.closed(), 1);
    assert_eq!(stats.profiles()[0].viewport, (1280, 720));
}

#[tokio::test]
async fn test_post_images_are_filtered() {
    let markup = page_with_json(
        "nasa",
        &[
            ("display_url", "https://scontent.cdninstagram.com/v/t51.2885-15/full_1080.jpg"),
            ("display_url", "https://scontent.cdninstagram.com/v/t51.2885-15/s150x150/thumb.jpg"),
            ("display_src", "https://scontent.cdninstagram.com/v/t51.2885-15/full_1080.jpg"),
            ("display_url", "https://example.com/not-cdn.jpg"),
        ],
    );
    let driver = MockDriver::new().with_page("https://www.instagram.com/p/POST1/", ScriptedPage::html(markup));

    let result = extractor(driver).extract("https://instagram.com/p/POST1/", None).await;

    assert!(result.success);
    let urls: Vec<&str> = result.media.iter().map(|m| m.url.as_str()).collect();
    assert_eq!(urls, vec!["https://scontent.cdninstagram.com/v/t51.2885-15/full_1080.jpg"]);
    assert_eq!(result.username.as_deref(), Some("nasa"));
}

#[tokio::test]
async fn test_carousel_fallback_walks_every_slide() {
    let page = ScriptedPage::html(bare_post_page("painter")).with_slides(vec![
        vec![slide_image("https://scontent.cdninstagram.com/v/t51/1.jpg")],
        vec![
            slide_image("https://scontent.cdninstagram.com/v/t51/1.jpg"),
            slide_image("https://scontent.cdninstagram.com/v/t51/2.jpg"),
        ],
        vec![slide_image("https://scontent.cdninstagram.com/v/t51/3.jpg")],
        vec![
            slide_video("blob:https://www.instagram.com/abc"),
            slide_video("https://scontent.cdninstagram.com/v/t50/4.mp4"),
        ],
    ]);
    let driver = MockDriver::new().with_page("https://www.instagram.com/p/CAROUSEL/", page);
    let stats = driver.stats();

    let result = extractor(driver).extract("https://www.instagram.com/p/CAROUSEL/", None).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(stats.advances(), 3);
    assert_eq!(result.count, 4);
    assert_eq!(result.username.as_deref(), Some("painter"));
    assert_eq!(result.media[3].media_type, MediaType::Video);
    assert_eq!(stats.closed(), 1);
}

#[tokio::test]
async fn test_reel_never_walks_carousel() {
    let page = ScriptedPage::html(bare_post_page("someone"))
        .with_slides(vec![vec![slide_image("https://scontent.cdninstagram.com/v/t51/1.jpg")]]);
    let driver = MockDriver::new().with_page("https://www.instagram.com/reel/EMPTY/", page);

    let result = extractor(driver).extract("https://www.instagram.com/reel/EMPTY/", None).await;

    assert!(!result.success);
    assert_eq!(result.code, Some(ErrorCode::NoMedia));
    assert_eq!(
        result.error.as_deref(),
        Some("Could not find media. The post may be private or unavailable.")
    );
}

#[tokio::test]
async fn test_not_found_page() {
    let driver = MockDriver::new().with_page("https://www.instagram.com/p/GONE/", ScriptedPage::html(not_found_page()));
    let stats = driver.stats();

    let result = extractor(driver).extract("https://www.instagram.com/p/GONE/", None).await;

    assert_eq!(result.code, Some(ErrorCode::NotFound));
    assert_eq!(result.error.as_deref(), Some("Post not found"));
    assert_eq!(stats.open_now(), 0);
}

#[tokio::test]
async fn test_invalid_url_opens_no_session() {
    let driver = MockDriver::new();
    let stats = driver.stats();
    let extractor = extractor(driver);

    for url in ["", "https://www.youtube.com/watch?v=1", "https://www.instagram.com/nasa/"] {
        let result = extractor.extract(url, None).await;
        assert_eq!(result.code, Some(ErrorCode::InvalidUrl), "{}", url);
        assert_eq!(result.count, 0);
    }
    assert_eq!(stats.opened(), 0);
}

#[tokio::test]
async fn test_navigation_error_closes_session() {
    let driver = MockDriver::new().with_page("https://www.instagram.com/p/BROKEN/", ScriptedPage::failing("net::ERR_NAME_NOT_RESOLVED"));
    let stats = driver.stats();

    let result = extractor(driver).extract("https://www.instagram.com/p/BROKEN/", None).await;

    assert_eq!(result.code, Some(ErrorCode::Error));
    assert_eq!(result.error.as_deref(), Some("Navigation failed: net::ERR_NAME_NOT_RESOLVED"));
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.closed(), 1);
}

#[tokio::test]
async fn test_request_timeout_closes_session() {
    let page = ScriptedPage::html(reel_page("slow")).with_delay(Duration::from_secs(3));
    let driver = MockDriver::new().with_page("https://www.instagram.com/reel/SLOW/", page);
    let stats = driver.stats();
    let options = ScrapeOptions::instant().with_request_timeout(Duration::from_millis(50));
    let extractor = Extractor::new(Arc::new(driver), options);

    let result = extractor.extract("https://www.instagram.com/reel/SLOW/", None).await;

    assert_eq!(result.code, Some(ErrorCode::Error));
    assert!(result.error.unwrap_or_default().starts_with("Timed out"));
    assert_eq!(stats.closed(), 1);
}

#[tokio::test]
async fn test_stuck_close_does_not_hang_request() {
    let driver = MockDriver::new()
        .with_page("https://www.instagram.com/reel/STUCK/", ScriptedPage::html(reel_page("stuck")))
        .with_close_delay(Duration::from_secs(30));
    let options = ScrapeOptions::instant().with_close_timeout(Duration::from_millis(50));
    let extractor = Extractor::new(Arc::new(driver), options);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        extractor.extract("https://www.instagram.com/reel/STUCK/", None),
    )
    .await
    .expect("request returned");

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.count, 1);
}

#[tokio::test]
async fn test_launch_failure_is_transport_error() {
    let driver = MockDriver::new().failing_launch("chrome not found");
    let result = extractor(driver).extract("https://www.instagram.com/p/ABC/", None).await;

    assert_eq!(result.code, Some(ErrorCode::Error));
    assert_eq!(result.error.as_deref(), Some("Browser launch failed: chrome not found"));
}

#[tokio::test]
async fn test_story_prefers_captured_video() {
    let mut responses = noise_responses();
    responses.push(story_image_response("1080x1920_story.jpg"));
    responses.push(story_video_response("story_a"));
    responses.push(story_video_response("story_b"));
    let page = ScriptedPage::html("<html><body></body></html>").with_responses(responses);
    let driver = MockDriver::new().with_page("https://www.instagram.com/stories/nasa/3141592653/", page);
    let stats = driver.stats();

    let result = extractor(driver)
        .extract("https://www.instagram.com/stories/nasa/3141592653", None)
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.count, 1);
    assert_eq!(result.media[0].media_type, MediaType::Video);
    assert!(result.media[0].url.contains("story_a"));
    assert_eq!(result.username.as_deref(), Some("nasa"));
    assert_eq!(result.story_id.as_deref(), Some("3141592653"));
    assert_eq!(stats.profiles()[0].viewport, (1920, 1080));
}

#[tokio::test]
async fn test_story_prefers_1080_image() {
    let responses = vec![
        story_image_response("640x1136_first.jpg"),
        story_image_response("1080x1920_second.jpg"),
    ];
    let page = ScriptedPage::html("<html></html>").with_responses(responses);
    let driver = MockDriver::new().with_page("https://www.instagram.com/stories/nasa/42/", page);

    let result = extractor(driver).extract("https://www.instagram.com/stories/nasa/42/", None).await;

    assert_eq!(result.count, 1);
    assert!(result.media[0].url.contains("1080x1920_second"));
}

#[tokio::test]
async fn test_story_merges_embedded_after_capture() {
    let markup = page_with_json(
        "nasa",
        &[("display_url", "https://scontent.cdninstagram.com/v/t51.2885-15/embedded.jpg")],
    );
    let page = ScriptedPage::html(markup).with_responses(noise_responses());
    let driver = MockDriver::new().with_page("https://www.instagram.com/stories/nasa/7/", page);

    let result = extractor(driver).extract("https://www.instagram.com/stories/nasa/7/", None).await;

    assert!(result.success);
    assert!(result.media[0].url.ends_with("embedded.jpg"));
}

#[tokio::test]
async fn test_story_without_media() {
    let page = ScriptedPage::html("<html></html>").with_responses(noise_responses());
    let driver = MockDriver::new().with_page("https://www.instagram.com/stories/nasa/8/", page);

    let result = extractor(driver).extract("https://www.instagram.com/stories/nasa/8/", None).await;

    assert_eq!(result.code, Some(ErrorCode::NoMedia));
    assert_eq!(
        result.error.as_deref(),
        Some("No media found. Story may require login or has expired.")
    );
}

#[tokio::test]
async fn test_request_cookies_override_defaults() {
    let driver = MockDriver::new().with_page("https://www.instagram.com/reel/C1/", ScriptedPage::html(reel_page("a")));
    let stats = driver.stats();
    let extractor = extractor(driver).with_cookies(vec![session_cookie()]);

    extractor.extract("https://www.instagram.com/reel/C1/", None).await;
    assert_eq!(stats.cookies_set(), 1);

    let mut other = session_cookie();
    other.name = "csrftoken".into();
    extractor
        .extract("https://www.instagram.com/reel/C1/", Some(&[session_cookie(), other]))
        .await;
    assert_eq!(stats.cookies_set(), 3);
}

#[tokio::test]
async fn test_concurrent_requests_use_separate_sessions() {
    let driver = MockDriver::new()
        .with_page("https://www.instagram.com/reel/R1/", ScriptedPage::html(reel_page("one")))
        .with_page("https://www.instagram.com/reel/R2/", ScriptedPage::html(reel_page("two")));
    let stats = driver.stats();
    let extractor = Arc::new(extractor(driver));

    let a = {
        let extractor = Arc::clone(&extractor);
        tokio::spawn(async move { extractor.extract("https://www.instagram.com/reel/R1/", None).await })
    };
    let b = {
        let extractor = Arc::clone(&extractor);
        tokio::spawn(async move { extractor.extract("https://www.instagram.com/reel/R2/", None).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a.username.as_deref(), Some("one"));
    assert_eq!(b.username.as_deref(), Some("two"));
    assert_eq!(stats.opened(), 2);
    assert_eq!(stats.open_now(), 0);
}
