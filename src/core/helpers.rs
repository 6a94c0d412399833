use ammonia::Builder;
use regex::Regex;
use spin_sdk::key_value::Store;
use std::sync::OnceLock;
use uuid::Uuid;

pub fn store() -> Store {
    Store::open_default().expect("KV store must exist")
}

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Strip all HTML from user-supplied text; documents hold plain text only.
pub fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("Regex should compile"))
}

pub fn validate_username(username: &str) -> bool {
    username.len() >= crate::config::MIN_USERNAME_LENGTH
        && username.len() <= crate::config::MAX_USERNAME_LENGTH
        && username_regex().is_match(username)
}

/// Flip presence of `id` in a membership set. Returns true when it was added.
pub fn toggle_membership(set: &mut Vec<String>, id: &str) -> bool {
    if let Some(pos) = set.iter().position(|member| member == id) {
        set.remove(pos);
        false
    } else {
        set.push(id.to_string());
        true
    }
}
