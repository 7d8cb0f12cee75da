use std::collections::HashMap;
use std::env;

use chrono::Utc;
use muse_core::util::normalize_text_option;
use muse_core::{Creation, CreationId, MuseClient};
use serde::Serialize;

use crate::cli::ApiArgs;
use crate::error::CliError;

/// Resolved connection settings for one invocation
#[derive(Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub api_url: String,
    pub token: String,
    pub user_id: Option<String>,
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiSettings")
            .field("api_url", &self.api_url)
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl ApiSettings {
    pub fn resolve(args: &ApiArgs) -> Result<Self, CliError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(args, |name| values.get(name).cloned())
    }

    /// Flags win over environment variables
    pub fn from_lookup(
        args: &ApiArgs,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CliError> {
        let pick = |flag: &Option<String>, name: &str| {
            normalize_text_option(flag.clone()).or_else(|| normalize_text_option(lookup(name)))
        };

        let api_url = pick(&args.api_url, "MUSE_API_URL").ok_or_else(|| {
            CliError::Config("Set MUSE_API_URL or pass --api-url".to_string())
        })?;
        let token = pick(&args.token, "MUSE_API_TOKEN").ok_or_else(|| {
            CliError::Config("Set MUSE_API_TOKEN or pass --token".to_string())
        })?;
        let user_id = pick(&args.user_id, "MUSE_USER_ID");

        Ok(Self {
            api_url,
            token,
            user_id,
        })
    }

    pub fn client(&self) -> Result<MuseClient, CliError> {
        Ok(MuseClient::new(&self.api_url, &self.token)?)
    }

    pub fn require_user_id(&self) -> Result<&str, CliError> {
        self.user_id.as_deref().ok_or_else(|| {
            CliError::Config("Set MUSE_USER_ID or pass --user-id to toggle likes".to_string())
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreationListItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    pub content: String,
    pub publish: bool,
    pub likes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_me: Option<bool>,
    pub created_at: i64,
    pub relative_time: String,
}

pub fn creation_to_list_item(creation: &Creation, viewer: Option<&str>) -> CreationListItem {
    let now_ms = Utc::now().timestamp_millis();
    CreationListItem {
        id: creation.id.to_string(),
        kind: creation.kind.to_string(),
        prompt: creation.prompt.clone(),
        content: creation.content.clone(),
        publish: creation.publish,
        likes: creation.like_count(),
        liked_by_me: viewer.map(|user_id| creation.is_liked_by(user_id)),
        created_at: creation.created_at,
        relative_time: format_relative_time(creation.created_at, now_ms),
    }
}

pub fn format_creation_lines(creations: &[Creation], viewer: Option<&str>) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    creations
        .iter()
        .map(|creation| format_creation_line(creation, viewer, now_ms))
        .collect()
}

fn format_creation_line(creation: &Creation, viewer: Option<&str>, now_ms: i64) -> String {
    let id = creation.id.to_string();
    let short_id = id.chars().take(13).collect::<String>();
    let kind = creation.kind.as_str();
    let preview = creation.prompt_preview(40);
    let heart = if viewer.is_some_and(|user_id| creation.is_liked_by(user_id)) {
        '♥'
    } else {
        '♡'
    };
    let likes = format!("{heart} {}", creation.like_count());
    let relative_time = format_relative_time(creation.created_at, now_ms);

    format!("{short_id:<13}  {kind:<13}  {preview:<40}  {likes:<6}  {relative_time}")
}

pub fn parse_creation_id(raw: &str) -> Result<CreationId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyCreationId);
    }
    trimmed
        .parse()
        .map_err(|_| CliError::InvalidCreationId(trimmed.to_string()))
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
