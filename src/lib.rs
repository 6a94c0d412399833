use spin_sdk::{
    http::{IntoResponse, Request, Response},
    http_component,
};

pub mod auth;
pub mod comments;
pub mod config;
pub mod core;
pub mod media;
pub mod models;
pub mod notifications;
pub mod posts;
pub mod users;

use crate::core::errors::ApiError;
use crate::core::helpers::store;

// === Component entrypoint ===
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    route(req)
}

/// Dispatch a request across the API surface. Shared by the Spin component
/// and the native adapter binary.
pub fn route(req: Request) -> anyhow::Result<Response> {
    if config::seed_demo_enabled() {
        let _ = core::db::seed_demo_data(&store());
    }

    let method = req.method().to_string();
    let path = req.path().to_string();

    match (method.as_str(), path.as_str()) {
        ("GET", p) if p.starts_with("/api/users/profile/") => users::get_profile(p),
        ("POST", "/api/users/sync") => users::sync_user(req),
        ("GET", "/api/users/me") => users::get_me(req),
        ("PUT", "/api/users/profile") => users::update_profile(req),
        ("POST", p) if p.starts_with("/api/users/follow/") => users::follow_toggle(req),
        ("GET", "/api/posts") => posts::list_posts(req),
        ("POST", "/api/posts") => posts::create_post(req),
        ("POST", p) if p.starts_with("/api/posts/") && p.ends_with("/like") => {
            posts::like_post(req)
        }
        ("GET", p) if p.starts_with("/api/posts/user/") => posts::posts_by_username(p),
        ("GET", p) if p.starts_with("/api/posts/") => posts::get_post(p),
        ("DELETE", p) if p.starts_with("/api/posts/") => posts::delete_post(req),
        ("GET", p) if p.starts_with("/api/comments/post/") => comments::list_for_post(p),
        ("POST", p) if p.starts_with("/api/comments/post/") => comments::create_comment(req),
        ("DELETE", p) if p.starts_with("/api/comments/") => comments::delete_comment(req),
        ("GET", "/api/notifications") => notifications::list_notifications(req),
        ("DELETE", p) if p.starts_with("/api/notifications/") => {
            notifications::delete_notification(req)
        }
        ("GET", p) if p.starts_with("/api/media/") => media::serve_media(p),
        _ => Ok(ApiError::NotFound("Not found".to_string()).into()),
    }
}
