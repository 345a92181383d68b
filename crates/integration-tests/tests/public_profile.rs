//! Public profile page and server plumbing.

#![allow(clippy::unwrap_used)]

use linkbio_core::{Color, NewLink, SocialLinksPatch};
use linkbio_integration_tests::{PROFILE_NAME, TestApp};

fn new_link(name: &str, url: &str) -> NewLink {
    NewLink {
        name: name.to_owned(),
        url: url.to_owned(),
        background_color: Color::default_background(),
        text_color: Color::default_text(),
    }
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    assert_eq!(app.get("/health/ready").await.status(), 200);
}

#[tokio::test]
async fn test_empty_profile() {
    let app = TestApp::spawn().await;

    let response = app.get("/").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains(PROFILE_NAME));
    assert!(body.contains("No links available right now."));
    assert!(!body.contains("aria-label=\"Social networks\""));
}

#[tokio::test]
async fn test_links_render_oldest_first() {
    let app = TestApp::spawn().await;
    app.seed_link(&new_link("First", "https://example.com/1")).await;
    app.seed_link(&new_link("Second", "https://example.com/2")).await;

    let body = app.get("/").await.text().await.unwrap();
    let first = body.find("https://example.com/1").unwrap();
    let second = body.find("https://example.com/2").unwrap();
    assert!(first < second);
    assert!(body.contains("background-color: #121212; color: #f1f1f1"));
}

#[tokio::test]
async fn test_social_icons_only_for_present_networks_in_display_order() {
    let app = TestApp::spawn().await;
    app.seed_social(&SocialLinksPatch {
        facebook: Some("https://facebook.com/me".to_owned()),
        instagram: Some("https://instagram.com/me".to_owned()),
        youtube: Some("https://youtube.com/@me".to_owned()),
    })
    .await;

    let body = app.get("/").await.text().await.unwrap();
    let facebook = body.find("https://facebook.com/me").unwrap();
    let youtube = body.find("https://youtube.com/@me").unwrap();
    let instagram = body.find("https://instagram.com/me").unwrap();
    assert!(facebook < youtube && youtube < instagram);

    app.seed_social(&SocialLinksPatch {
        youtube: Some(String::new()),
        ..SocialLinksPatch::default()
    })
    .await;
    let body = app.get("/").await.text().await.unwrap();
    assert!(!body.contains("social-youtube"));
    assert!(body.contains("social-facebook"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app.get("/no/such/page").await;
    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().contains("This page does not exist."));
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let app = TestApp::spawn().await;

    let response = app.get("/").await;
    let headers = response.headers();
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
    assert!(headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn test_static_assets_served() {
    let app = TestApp::spawn().await;

    let response = app.get("/static/app.js").await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("EventSource"));
}

#[tokio::test]
async fn test_script_locks_fields_while_submitting() {
    let app = TestApp::spawn().await;

    let script = app.get("/static/app.js").await.text().await.unwrap();
    assert!(script.contains("input.readOnly = true"));
    assert!(script.contains("b.disabled = true"));

    let css = app.get("/static/main.css").await.text().await.unwrap();
    assert!(css.contains(".form.is-submitting input"));
}
