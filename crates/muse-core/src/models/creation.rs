//! Creation model

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a creation, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CreationId(Uuid);

impl CreationId {
    /// Create a new unique creation ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CreationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CreationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CreationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// What kind of content a creation holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CreationKind {
    /// Long-form generated article
    Article,
    /// List of generated blog titles
    BlogTitle,
    /// Generated or transformed image (content is a URL)
    Image,
    /// Review of an uploaded resume
    ResumeReview,
}

impl CreationKind {
    /// Wire/storage name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::BlogTitle => "blog-title",
            Self::Image => "image",
            Self::ResumeReview => "resume-review",
        }
    }
}

impl fmt::Display for CreationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "article" => Ok(Self::Article),
            "blog-title" => Ok(Self::BlogTitle),
            "image" => Ok(Self::Image),
            "resume-review" => Ok(Self::ResumeReview),
            other => Err(format!("unknown creation type `{other}`")),
        }
    }
}

/// A stored unit of generated content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creation {
    /// Unique identifier
    pub id: CreationId,
    /// Owner's user id
    pub user_id: String,
    /// Prompt shown alongside the content
    pub prompt: String,
    /// Text body or image URL, depending on `kind`
    pub content: String,
    #[serde(rename = "type")]
    pub kind: CreationKind,
    /// Visible in the community feed
    #[serde(default)]
    pub publish: bool,
    /// User ids that liked this creation
    #[serde(default)]
    pub likes: BTreeSet<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Creation {
    /// Whether `user_id` is in the liker set
    #[must_use]
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.contains(user_id)
    }

    /// Number of likers
    #[must_use]
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Add or remove `user_id` so that membership equals `liked`.
    ///
    /// Returns `true` when the set changed.
    pub fn set_liked(&mut self, user_id: &str, liked: bool) -> bool {
        if liked {
            self.likes.insert(user_id.to_string())
        } else {
            self.likes.remove(user_id)
        }
    }

    /// Prompt truncated to `max_len` characters with a trailing ellipsis
    #[must_use]
    pub fn prompt_preview(&self, max_len: usize) -> String {
        if self.prompt.chars().count() > max_len {
            let head: String = self.prompt.chars().take(max_len).collect();
            format!("{head}...")
        } else {
            self.prompt.clone()
        }
    }
}

/// Input for persisting a new creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCreation {
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    pub kind: CreationKind,
    pub publish: bool,
}

impl NewCreation {
    pub fn new(
        user_id: impl Into<String>,
        prompt: impl Into<String>,
        content: impl Into<String>,
        kind: CreationKind,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            prompt: prompt.into(),
            content: content.into(),
            kind,
            publish: false,
        }
    }

    #[must_use]
    pub const fn published(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }

    /// Materialize with a fresh id and the current timestamp
    #[must_use]
    pub fn into_creation(self) -> Creation {
        Creation {
            id: CreationId::new(),
            user_id: self.user_id,
            prompt: self.prompt,
            content: self.content,
            kind: self.kind,
            publish: self.publish,
            likes: BTreeSet::new(),
            created_at: crate::util::unix_millis_now(),
        }
    }
}
