use muse_core::likes::NoticeLevel;
use muse_core::{Creation, CreationKind, NewCreation, Notice};
use pretty_assertions::assert_eq;

use crate::cli::{ApiArgs, CompletionShell};
use crate::commands::common::{
    creation_to_list_item, format_creation_lines, format_relative_time, parse_creation_id,
    ApiSettings,
};
use crate::commands::completions::render_completions;
use crate::commands::feed::reveal_pages;
use crate::commands::like::notice_lines;
use crate::error::CliError;

fn liked_creation() -> Creation {
    let mut creation = NewCreation::new(
        "owner",
        "A watercolor fox reading by candlelight",
        "https://img/fox.png",
        CreationKind::Image,
    )
    .published(true)
    .into_creation();
    creation.set_liked("fan", true);
    creation
}

#[test]
fn settings_prefer_flags_over_environment() {
    let args = ApiArgs {
        api_url: Some("https://flag.example.com".to_string()),
        token: None,
        user_id: None,
    };
    let settings = ApiSettings::from_lookup(&args, |name| match name {
        "MUSE_API_URL" => Some("https://env.example.com".to_string()),
        "MUSE_API_TOKEN" => Some("env-token".to_string()),
        "MUSE_USER_ID" => Some("  ".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(settings.api_url, "https://flag.example.com");
    assert_eq!(settings.token, "env-token");
    assert_eq!(settings.user_id, None);
    assert!(matches!(settings.require_user_id(), Err(CliError::Config(_))));
}

#[test]
fn settings_require_url_and_token() {
    let err = ApiSettings::from_lookup(&ApiArgs::default(), |_| None).unwrap_err();
    assert!(err.to_string().contains("MUSE_API_URL"));
}

#[test]
fn settings_debug_redacts_token() {
    let args = ApiArgs {
        api_url: Some("https://api.example.com".to_string()),
        token: Some("very-secret".to_string()),
        user_id: Some("u1".to_string()),
    };
    let settings = ApiSettings::from_lookup(&args, |_| None).unwrap();
    let debug = format!("{settings:?}");
    assert!(!debug.contains("very-secret"));
    assert!(debug.contains("[REDACTED]"));
}

#[test]
fn creation_ids_are_validated() {
    assert!(matches!(parse_creation_id("  "), Err(CliError::EmptyCreationId)));
    assert!(matches!(
        parse_creation_id("nope"),
        Err(CliError::InvalidCreationId(_))
    ));
    let creation = liked_creation();
    assert_eq!(
        parse_creation_id(&format!(" {} ", creation.id)).unwrap(),
        creation.id
    );
}

#[test]
fn feed_pages_reveal_in_steps() {
    assert_eq!(reveal_pages(40, 0).visible_count(), 15);
    assert_eq!(reveal_pages(40, 1).visible_count(), 25);
    assert_eq!(reveal_pages(23, 5).visible_count(), 23);
    assert!(!reveal_pages(23, 1).has_more());
}

#[test]
fn creation_lines_mark_viewer_likes() {
    let creation = liked_creation();
    let creations = [creation];

    let as_fan = format_creation_lines(&creations, Some("fan"));
    assert!(as_fan[0].contains("♥ 1"));
    assert!(as_fan[0].contains("image"));

    let anonymous = format_creation_lines(&creations, None);
    assert!(anonymous[0].contains("♡ 1"));
}

#[test]
fn list_item_json_uses_wire_names() {
    let creation = liked_creation();
    let value = serde_json::to_value(creation_to_list_item(&creation, Some("fan"))).unwrap();
    assert_eq!(value["type"], "image");
    assert_eq!(value["likes"], 1);
    assert_eq!(value["liked_by_me"], true);

    let value = serde_json::to_value(creation_to_list_item(&creation, None)).unwrap();
    assert!(value.get("liked_by_me").is_none());
}

#[test]
fn relative_time_buckets() {
    let now = 1_700_000_000_000;
    assert_eq!(format_relative_time(now - 5_000, now), "just now");
    assert_eq!(format_relative_time(now - 3 * 60_000, now), "3m ago");
    assert_eq!(format_relative_time(now - 2 * 3_600_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 86_400_000, now), "3d ago");
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("muse"));
    assert!(script.contains("feed"));
}

#[test]
fn like_notices_are_rendered_for_stderr() {
    let notices = [Notice {
        level: NoticeLevel::Error,
        message: "Too many requests: Rate limit exceeded for toggle_like".to_string(),
    }];
    assert_eq!(
        notice_lines(&notices),
        vec!["error: Too many requests: Rate limit exceeded for toggle_like".to_string()]
    );
    assert_eq!(CliError::LikeNotApplied.to_string(), "Like was not applied");
}
