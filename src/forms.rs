//! Input parsing and validation for the HTML forms.
//!
//! Validation never touches the store beyond the lookups passed in; failures
//! come back as [`FormErrors`] so the form can be redisplayed with messages
//! next to each field.

use axum::body::Bytes;
use axum::extract::Multipart;
use serde::Deserialize;

use crate::db::models::{Group, COMMENT_MAX_CHARS};
use crate::db::posts::PostFields;
use crate::db::users::NewUser;
use crate::error::AppResult;

pub const REQUIRED: &str = "This field is required.";

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

/// Field-level validation messages, in the order they were found
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormErrors {
    entries: Vec<(&'static str, String)>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|(f, _)| *f == field)
    }

    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, msg)| msg.as_str())
            .collect()
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// An uploaded file as received
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
}

impl Upload {
    /// Lowercased extension of the original file name, if it names an image type
    pub fn image_extension(&self) -> Option<String> {
        let mime = mime_guess::from_path(&self.file_name).first()?;
        if mime.type_() != mime_guess::mime::IMAGE {
            return None;
        }
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Sniff the first bytes for the common raster formats
pub fn looks_like_image(data: &[u8]) -> bool {
    data.starts_with(b"\x89PNG\r\n\x1a\n")
        || data.starts_with(&[0xFF, 0xD8, 0xFF])
        || data.starts_with(b"GIF87a")
        || data.starts_with(b"GIF89a")
        || (data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP")
        || data.starts_with(b"BM")
}

/// Raw create/edit post submission
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group: String,
    pub image: Option<Upload>,
}

/// A post submission that passed validation; the image is not stored yet
#[derive(Debug, Clone)]
pub struct ValidPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<Upload>,
}

impl ValidPost {
    /// Fields to write, with `image` replaced by the stored path when there is one
    pub fn into_fields(self, stored_image: Option<String>) -> PostFields {
        PostFields {
            text: self.text,
            group_id: self.group_id,
            image: stored_image,
        }
    }
}

impl PostInput {
    pub async fn from_multipart(multipart: &mut Multipart) -> AppResult<Self> {
        let mut input = PostInput::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "text" => input.text = field.text().await?,
                "group" => input.group = field.text().await?,
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let data = field.bytes().await?;
                    // An empty file input still submits a nameless part
                    if !file_name.is_empty() || !data.is_empty() {
                        input.image = Some(Upload { file_name, data });
                    }
                }
                other => tracing::debug!("Ignoring unexpected form field {:?}", other),
            }
        }
        Ok(input)
    }

    pub fn validate(&self, groups: &[Group]) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::default();

        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_id = match self.group.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add(
                        "group",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
        };

        if let Some(upload) = &self.image {
            if upload.data.is_empty() {
                errors.add("image", "The submitted file is empty.");
            } else if upload.image_extension().is_none() || !looks_like_image(&upload.data) {
                errors.add(
                    "image",
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                );
            }
        }

        errors.into_result(ValidPost {
            text,
            group_id,
            image: self.image.clone(),
        })
    }

    /// The selected group id for redisplay, 0 when none
    pub fn selected_group(&self) -> i64 {
        self.group.trim().parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentInput {
    #[serde(default)]
    pub text: String,
}

impl CommentInput {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        } else if text.chars().count() > COMMENT_MAX_CHARS {
            errors.add(
                "text",
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    COMMENT_MAX_CHARS,
                    text.chars().count()
                ),
            );
        }
        errors.into_result(text)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl SignupInput {
    /// Check the submission; `username_taken` reports whether a name is in use.
    /// The returned user still carries an empty password hash.
    pub fn validate(&self, username_taken: bool) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::default();

        let username = self.username.trim().to_string();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > USERNAME_MAX_CHARS
            || !username
                .chars()
                .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if username_taken {
            errors.add("username", "A user with that username already exists.");
        }

        let email = self.email.trim().to_string();
        if !email.is_empty() && !is_plausible_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else {
            if self.password1.chars().count() < PASSWORD_MIN_CHARS {
                errors.add(
                    "password1",
                    format!(
                        "This password is too short. It must contain at least {} characters.",
                        PASSWORD_MIN_CHARS
                    ),
                );
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password1", "This password is entirely numeric.");
            }
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.into_result(NewUser {
            username,
            password_hash: String::new(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
