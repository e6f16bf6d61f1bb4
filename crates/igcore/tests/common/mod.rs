//! Common test utilities
//!
//! Markup and response fixtures shared across integration tests

#![allow(dead_code)]

use igcore::driver::ObservedResponse;
use serde_json::{json, Value};

pub const REEL_VIDEO: &str = "https://scontent-iad3-1.cdninstagram.com/o1/v/t16/f2/m86/reel_720p.mp4?efg=abc&_nc_ht=scontent";
pub const REEL_COVER: &str = "https://scontent-iad3-1.cdninstagram.com/v/t51.2885-15/cover_1080.jpg?stp=dst-jpg";

/// Escape `/` the way Instagram's inline JSON does.
pub fn json_escaped(url: &str) -> String {
    url.replace('/', r"\/")
}

/// Post page whose inline JSON carries the given key/url pairs.
pub fn page_with_json(owner: &str, entries: &[(&str, &str)]) -> String {
    let fields: Vec<String> = entries
        .iter()
        .map(|(key, url)| format!(r#""{}":"{}""#, key, json_escaped(url)))
        .collect();
    format!(
        r#"<!DOCTYPE html><html><head><title>Instagram</title>
<meta property="og:title" content="Post by @{owner} on Instagram"></head>
<body><article><header><a href="/{owner}/">{owner}</a></header></article>
<script type="application/json">{{"items":[{{{fields}}}]}}</script></body></html>"#,
        owner = owner,
        fields = fields.join(",")
    )
}

/// Reel page with one video and its cover image.
pub fn reel_page(owner: &str) -> String {
    page_with_json(owner, &[("video_url", REEL_VIDEO), ("display_url", REEL_COVER)])
}

/// Post page with nothing embedded; media only reachable by walking the carousel.
pub fn bare_post_page(owner: &str) -> String {
    format!(
        r#"<html><head><title>@{owner} on Instagram</title></head><body><article></article></body></html>"#,
        owner = owner
    )
}

pub fn not_found_page() -> String {
    "<html><body><h2>Sorry, this page isn't available.</h2></body></html>".to_string()
}

/// Carousel image slide as the page script reports it.
pub fn slide_image(url: &str) -> Value {
    json!({
        "kind": "image",
        "srcset": format!("{url}?w=640 640w, {url} 1080w", url = url),
        "renderedWidth": 468.0
    })
}

pub fn slide_video(url: &str) -> Value {
    json!({"kind": "video", "src": url, "renderedWidth": 468.0})
}

/// Pad a URL with query noise until it is longer than `min_len`.
pub fn padded(url: &str, min_len: usize) -> String {
    let mut out = format!("{}?_nc_cat=1&oh=", url);
    while out.len() <= min_len {
        out.push('0');
    }
    out
}

pub fn story_video_response(name: &str) -> ObservedResponse {
    ObservedResponse::new(
        padded(&format!("https://scontent-iad3-1.cdninstagram.com/o1/v/t16/f2/m69/{}.mp4", name), 120),
        "video/mp4",
        200,
    )
}

pub fn story_image_response(path: &str) -> ObservedResponse {
    ObservedResponse::new(
        padded(&format!("https://scontent-iad3-1.cdninstagram.com/v/t51.2885-15/{}", path), 180),
        "image/jpeg",
        200,
    )
}

pub fn noise_responses() -> Vec<ObservedResponse> {
    vec![
        ObservedResponse::new("https://www.instagram.com/stories/nasa/1/", "text/html", 200),
        ObservedResponse::new("https://static.cdninstagram.com/rsrc.php/v3/logo.png", "image/png", 200),
        ObservedResponse::new(
            padded("https://scontent.cdninstagram.com/v/t51.2885-19/profile_pic.jpg", 180),
            "image/jpeg",
            200,
        ),
    ]
}
