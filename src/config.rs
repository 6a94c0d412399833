pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_LOCATION_LENGTH: usize = 100;
pub const MAX_POST_LENGTH: usize = 280;
pub const MAX_COMMENT_LENGTH: usize = 280;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const POSTS_PER_PAGE: usize = 20;

pub const USERS_LIST_KEY: &str = "users";
pub const FEED_KEY: &str = "feed";

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn auth_key(subject: &str) -> String {
    format!("authid:{}", subject)
}

pub fn post_key(post_id: &str) -> String {
    format!("post:{}", post_id)
}

pub fn comment_key(comment_id: &str) -> String {
    format!("comment:{}", comment_id)
}

pub fn notification_key(notification_id: &str) -> String {
    format!("notification:{}", notification_id)
}

pub fn notifications_key(user_id: &str) -> String {
    format!("notifications:{}", user_id)
}

pub fn media_key(media_id: &str) -> String {
    format!("media:{}", media_id)
}

pub fn media_meta_key(media_id: &str) -> String {
    format!("mediameta:{}", media_id)
}

pub fn jwt_secret() -> String {
    std::env::var("PLAZA_JWT_SECRET").unwrap_or_else(|_| "plaza-dev-secret".to_string())
}

pub fn token_leeway_secs() -> u64 {
    std::env::var("PLAZA_TOKEN_LEEWAY_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30)
}

pub fn seed_demo_enabled() -> bool {
    std::env::var("PLAZA_SEED_DEMO")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}
