use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;

use crate::auth::{current_user, validate_token};
use crate::comments;
use crate::config::{
    comment_key, post_key, user_key, FEED_KEY, MAX_POST_LENGTH, POSTS_PER_PAGE,
};
use crate::core::errors::ApiError;
use crate::core::helpers::{
    new_id, now_iso, sanitize_text, store, toggle_membership, validate_uuid,
};
use crate::core::query_params::{get_int, parse_query_params};
use crate::media;
use crate::models::models::{NotificationKind, Post, PostView, User, UserSummary};
use crate::notifications;

/// Hydrate a stored post into its response shape. Posts whose author record
/// vanished are treated as gone.
pub fn post_view(store: &Store, post: &Post) -> anyhow::Result<Option<PostView>> {
    let author = match store.get_json::<User>(&user_key(&post.user_id))? {
        Some(user) => user,
        None => return Ok(None),
    };

    let mut comment_views = Vec::new();
    for comment_id in &post.comments {
        if let Some(view) = comments::comment_view_by_id(store, comment_id)? {
            comment_views.push(view);
        }
    }

    Ok(Some(PostView {
        id: post.id.clone(),
        user: UserSummary::from_user(&author),
        content: post.content.clone(),
        image: post.image.clone(),
        likes: post.likes.clone(),
        comments: comment_views,
        created_at: post.created_at.clone(),
        updated_at: post.updated_at.clone(),
    }))
}

fn page_slice(ids: &[String], page: usize, per_page: usize) -> &[String] {
    let start = (page - 1).saturating_mul(per_page);
    if start >= ids.len() {
        return &[];
    }
    let end = (start + per_page).min(ids.len());
    &ids[start..end]
}

fn like_target(path: &str) -> Option<&str> {
    path.strip_prefix("/api/posts/")?.strip_suffix("/like")
}

// === HTTP Handlers ===

pub fn list_posts(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let params = parse_query_params(req.uri());
    let page = get_int(&params, "page", 1);

    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();

    let mut posts = Vec::new();
    for id in page_slice(&feed, page, POSTS_PER_PAGE) {
        if let Some(post) = store.get_json::<Post>(&post_key(id))? {
            if let Some(view) = post_view(&store, &post)? {
                posts.push(view);
            }
        }
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "posts": posts }))?)
        .build())
}

pub fn create_post(req: Request) -> anyhow::Result<Response> {
    let claims = match validate_token(&req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let me = match current_user(&store, &claims)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let content_type = match req.header("Content-Type").and_then(|h| h.as_str()) {
        Some(value) => value,
        None => {
            return Ok(ApiError::BadRequest("Expected multipart form data".to_string()).into())
        }
    };

    let upload = match media::parse_post_upload(content_type, req.body()) {
        Ok(upload) => upload,
        Err(err) => return Ok(err.into()),
    };

    let content = sanitize_text(upload.content.trim());
    if content.is_empty() && upload.image.is_none() {
        return Ok(
            ApiError::BadRequest("Post must contain text or an image".to_string()).into(),
        );
    }
    if content.len() > MAX_POST_LENGTH {
        return Ok(ApiError::BadRequest("Invalid content".to_string()).into());
    }

    let image = match &upload.image {
        Some(part) => Some(media::store_image(&store, part)?),
        None => None,
    };

    let post = Post {
        id: new_id(),
        user_id: me.id.clone(),
        content,
        image,
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&post_key(&post.id), &post)?;

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.insert(0, post.id.clone());
    store.set_json(FEED_KEY, &feed)?;

    tracing::info!(post_id = %post.id, user_id = %me.id, "post created");

    let view = PostView {
        id: post.id.clone(),
        user: UserSummary::from_user(&me),
        content: post.content.clone(),
        image: post.image.clone(),
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: post.created_at.clone(),
        updated_at: None,
    };

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "post": view }))?)
        .build())
}

pub fn get_post(path: &str) -> anyhow::Result<Response> {
    let post_id = path.trim_start_matches("/api/posts/");

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    match post_view(&store, &post)? {
        Some(view) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({ "post": view }))?)
            .build()),
        None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
    }
}

pub fn delete_post(req: Request) -> anyhow::Result<Response> {
    let claims = match validate_token(&req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let me = match current_user(&store, &claims)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let path = req.path();
    let post_id = path.trim_start_matches("/api/posts/");

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    if post.user_id != me.id {
        return Ok(ApiError::Forbidden.into());
    }

    for comment_id in &post.comments {
        store.delete(&comment_key(comment_id))?;
    }

    if let Some(image) = &post.image {
        media::delete_by_path(&store, image)?;
    }

    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    feed.retain(|id| id != post_id);
    store.set_json(FEED_KEY, &feed)?;

    store.delete(&post_key(post_id))?;

    tracing::info!(post_id, user_id = %me.id, "post deleted");

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(
            &serde_json::json!({ "message": "Post deleted successfully" }),
        )?)
        .build())
}

pub fn posts_by_username(path: &str) -> anyhow::Result<Response> {
    let raw = path.trim_start_matches("/api/posts/user/");
    let username = urlencoding::decode(raw)
        .unwrap_or(std::borrow::Cow::Borrowed(raw))
        .to_string();

    if username.is_empty() {
        return Ok(ApiError::BadRequest("Username required".to_string()).into());
    }

    let store = store();
    let user = match crate::users::find_user_by_username(&store, &username)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();

    let mut posts = Vec::new();
    for id in &feed {
        if let Some(post) = store.get_json::<Post>(&post_key(id))? {
            if post.user_id != user.id {
                continue;
            }
            if let Some(view) = post_view(&store, &post)? {
                posts.push(view);
            }
        }
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "posts": posts }))?)
        .build())
}

pub fn like_post(req: Request) -> anyhow::Result<Response> {
    let claims = match validate_token(&req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let me = match current_user(&store, &claims)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let path = req.path();
    let post_id = match like_target(path) {
        Some(id) if !id.is_empty() && validate_uuid(id) => id,
        _ => return Ok(ApiError::BadRequest("Post ID required".to_string()).into()),
    };

    let mut post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let liked = toggle_membership(&mut post.likes, &me.id);
    store.set_json(&post_key(post_id), &post)?;

    if liked && post.user_id != me.id {
        notifications::record(
            &store,
            NotificationKind::Like,
            &me.id,
            &post.user_id,
            Some(post_id),
            None,
        )?;
    }

    let message = if liked { "Post liked" } else { "Post unliked" };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "message": message }))?)
        .build())
}
