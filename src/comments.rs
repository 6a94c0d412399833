use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;

use crate::auth::{current_user, validate_token};
use crate::config::{comment_key, post_key, user_key, MAX_COMMENT_LENGTH};
use crate::core::errors::ApiError;
use crate::core::helpers::{new_id, now_iso, sanitize_text, store, validate_uuid};
use crate::models::models::{Comment, CommentView, NotificationKind, Post, User, UserSummary};
use crate::notifications;

pub fn comment_view(store: &Store, comment: &Comment) -> anyhow::Result<Option<CommentView>> {
    let author = match store.get_json::<User>(&user_key(&comment.user_id))? {
        Some(user) => user,
        None => return Ok(None),
    };

    Ok(Some(CommentView {
        id: comment.id.clone(),
        user: UserSummary::from_user(&author),
        post_id: comment.post_id.clone(),
        content: comment.content.clone(),
        likes: comment.likes.clone(),
        created_at: comment.created_at.clone(),
        updated_at: comment.updated_at.clone(),
    }))
}

pub fn comment_view_by_id(
    store: &Store,
    comment_id: &str,
) -> anyhow::Result<Option<CommentView>> {
    match store.get_json::<Comment>(&comment_key(comment_id))? {
        Some(comment) => comment_view(store, &comment),
        None => Ok(None),
    }
}

// === HTTP Handlers ===

pub fn list_for_post(path: &str) -> anyhow::Result<Response> {
    let post_id = path.trim_start_matches("/api/comments/post/");

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();

    let mut comments = Vec::new();
    if let Some(post) = store.get_json::<Post>(&post_key(post_id))? {
        for comment_id in &post.comments {
            if let Some(view) = comment_view_by_id(&store, comment_id)? {
                comments.push(view);
            }
        }
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "comments": comments }))?)
        .build())
}

pub fn create_comment(req: Request) -> anyhow::Result<Response> {
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
    let post_id = path.trim_start_matches("/api/comments/post/");

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let mut post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(value) => value,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let content = sanitize_text(value["content"].as_str().unwrap_or_default().trim());
    if content.is_empty() {
        return Ok(ApiError::BadRequest("Comment content is required".to_string()).into());
    }
    if content.len() > MAX_COMMENT_LENGTH {
        return Ok(ApiError::BadRequest("Invalid content".to_string()).into());
    }

    let comment = Comment {
        id: new_id(),
        user_id: me.id.clone(),
        post_id: post.id.clone(),
        content,
        likes: Vec::new(),
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&comment_key(&comment.id), &comment)?;

    post.comments.push(comment.id.clone());
    store.set_json(&post_key(&post.id), &post)?;

    if post.user_id != me.id {
        notifications::record(
            &store,
            NotificationKind::Comment,
            &me.id,
            &post.user_id,
            Some(&post.id),
            Some(&comment.id),
        )?;
    }

    tracing::info!(comment_id = %comment.id, post_id = %post.id, "comment created");

    let view = CommentView {
        id: comment.id.clone(),
        user: UserSummary::from_user(&me),
        post_id: comment.post_id.clone(),
        content: comment.content.clone(),
        likes: Vec::new(),
        created_at: comment.created_at.clone(),
        updated_at: None,
    };

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "comment": view }))?)
        .build())
}

pub fn delete_comment(req: Request) -> anyhow::Result<Response> {
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
    let comment_id = path.trim_start_matches("/api/comments/");

    if comment_id.is_empty() || !validate_uuid(comment_id) {
        return Ok(ApiError::BadRequest("Comment ID required".to_string()).into());
    }

    let comment = match store.get_json::<Comment>(&comment_key(comment_id))? {
        Some(comment) => comment,
        None => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    if comment.user_id != me.id {
        return Ok(ApiError::Forbidden.into());
    }

    store.delete(&comment_key(comment_id))?;

    // Detach from the parent post when it still exists.
    if let Some(mut post) = store.get_json::<Post>(&post_key(&comment.post_id))? {
        post.comments.retain(|id| id != comment_id);
        store.set_json(&post_key(&post.id), &post)?;
    }

    tracing::info!(comment_id, user_id = %me.id, "comment deleted");

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(
            &serde_json::json!({ "message": "Comment deleted successfully" }),
        )?)
        .build())
}
