use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters of a post's text used when it is displayed as a one-liner.
pub const POST_LABEL_CHARS: usize = 15;

/// Longest comment accepted.
pub const COMMENT_MAX_CHARS: usize = 500;

/// Longest group title accepted.
pub const GROUP_TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_joined: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
    /// Path of the attached image, relative to the uploads directory.
    pub image: Option<String>,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label: String = self.text.chars().take(POST_LABEL_CHARS).collect();
        f.write_str(&label)
    }
}
