pub mod handlers;
pub mod password;
pub mod session;

use axum::http::{header, HeaderMap};

use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

pub const LOGIN_PATH: &str = "/auth/login/";

/// Login page URL that returns to `next` afterwards
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    // Slashes stay literal so the return path reads as a path
    format!("{}?next={}", LOGIN_PATH, encoded.replace("%2F", "/"))
}

/// Only same-site absolute paths are followed after login
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// Guard for author-only mutations
pub fn ensure_author(user: &CurrentUser, post: &Post) -> AppResult<()> {
    if post.author_id == user.id {
        Ok(())
    } else {
        Err(AppError::NotAuthor { post_id: post.id })
    }
}

pub fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

pub fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

pub fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn login_url_keeps_path_readable() {
        assert_eq!(login_url("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_url("/posts/1/edit/"),
            "/auth/login/?next=/posts/1/edit/"
        );
        assert_eq!(login_url("/?page=2"), "/auth/login/?next=/%3Fpage%3D2");
    }

    #[test]
    fn safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(Some("/create/")), "/create/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn ensure_author_matches_ids() {
        let post = Post {
            id: 3,
            text: "t".into(),
            pub_date: String::new(),
            author_id: 1,
            group_id: None,
            image: None,
        };
        let author = CurrentUser {
            id: 1,
            username: "a".into(),
        };
        let other = CurrentUser {
            id: 2,
            username: "b".into(),
        };
        assert!(ensure_author(&author, &post).is_ok());
        assert!(matches!(
            ensure_author(&other, &post),
            Err(AppError::NotAuthor { post_id: 3 })
        ));
    }

    #[test]
    fn cookie_lookup_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; yatube_session=abc123"),
        );
        assert_eq!(get_cookie_value(&headers, "yatube_session"), Some("abc123"));
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn session_cookie_shape() {
        assert_eq!(
            session_cookie("s", "tok", 2),
            "s=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=7200"
        );
        assert!(clear_session_cookie("s").contains("Max-Age=0"));
    }
}
