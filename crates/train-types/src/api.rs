use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// -- Listing --

/// Board ordering. Unknown keys fall back to [`SortBy::Newest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Newest,
    MostLiked,
    MostDisliked,
}

impl SortBy {
    pub const ALL: [SortBy; 3] = [SortBy::Newest, SortBy::MostLiked, SortBy::MostDisliked];

    /// Lenient parse used for the `sortBy` query parameter.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw {
            Some("mostLiked") => Self::MostLiked,
            Some("mostDisliked") => Self::MostDisliked,
            _ => Self::Newest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::MostLiked => "mostLiked",
            Self::MostDisliked => "mostDisliked",
        }
    }

    /// Button label shown on the board.
    pub fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::MostLiked => "Most Helpful",
            Self::MostDisliked => "Most Discussed",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMessagesQuery {
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

/// Maximum number of messages returned by a list call.
pub const LIST_LIMIT: u32 = 20;

// -- Creating --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Upper bound on message length, counted in characters after trimming.
pub const MAX_MESSAGE_CHARS: usize = 1000;

// -- Reactions --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Like,
    Dislike,
}

impl ReactionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Like => Self::Dislike,
            Self::Dislike => Self::Like,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reaction action '{}'", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for ReactionAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Body of `PATCH /messages`. Both fields are optional on the wire so that
/// missing values can be reported with a specific message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReactMessageRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

// -- Errors --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
