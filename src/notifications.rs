use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;

use crate::auth::{current_user, validate_token};
use crate::config::{comment_key, notification_key, notifications_key, post_key, user_key};
use crate::core::errors::ApiError;
use crate::core::helpers::{new_id, now_iso, store, validate_uuid};
use crate::models::models::{
    Comment, CommentRef, Notification, NotificationKind, NotificationView, Post, PostRef, User,
    UserSummary,
};

/// Append an event record to the recipient's inbox. Callers decide when an
/// action warrants one; self-actions never reach here.
pub fn record(
    store: &Store,
    kind: NotificationKind,
    from_user_id: &str,
    to_user_id: &str,
    post_id: Option<&str>,
    comment_id: Option<&str>,
) -> anyhow::Result<()> {
    let notification = Notification {
        id: new_id(),
        from_user_id: from_user_id.to_string(),
        to_user_id: to_user_id.to_string(),
        kind,
        post_id: post_id.map(|s| s.to_string()),
        comment_id: comment_id.map(|s| s.to_string()),
        created_at: now_iso(),
    };

    store.set_json(&notification_key(&notification.id), &notification)?;

    let inbox_key = notifications_key(to_user_id);
    let mut inbox: Vec<String> = store.get_json(&inbox_key)?.unwrap_or_default();
    inbox.insert(0, notification.id.clone());
    store.set_json(&inbox_key, &inbox)?;

    Ok(())
}

fn notification_view(
    store: &Store,
    notification: &Notification,
) -> anyhow::Result<Option<NotificationView>> {
    let sender = match store.get_json::<User>(&user_key(&notification.from_user_id))? {
        Some(user) => user,
        // Sender record gone; the event is no longer renderable.
        None => return Ok(None),
    };

    let post = match &notification.post_id {
        Some(id) => store.get_json::<Post>(&post_key(id))?.map(|p| PostRef {
            id: p.id,
            content: p.content,
            image: p.image,
        }),
        None => None,
    };

    let comment = match &notification.comment_id {
        Some(id) => store
            .get_json::<Comment>(&comment_key(id))?
            .map(|c| CommentRef {
                id: c.id,
                content: c.content,
            }),
        None => None,
    };

    Ok(Some(NotificationView {
        id: notification.id.clone(),
        from: UserSummary::from_user(&sender),
        kind: notification.kind,
        post,
        comment,
        created_at: notification.created_at.clone(),
    }))
}

pub fn list_notifications(req: Request) -> anyhow::Result<Response> {
    let claims = match validate_token(&req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let me = match current_user(&store, &claims)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let ids: Vec<String> = store
        .get_json(&notifications_key(&me.id))?
        .unwrap_or_default();

    let mut notifications = Vec::new();
    for id in ids {
        if let Some(notification) = store.get_json::<Notification>(&notification_key(&id))? {
            if let Some(view) = notification_view(&store, &notification)? {
                notifications.push(view);
            }
        }
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(
            &serde_json::json!({ "notifications": notifications }),
        )?)
        .build())
}

pub fn delete_notification(req: Request) -> anyhow::Result<Response> {
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
    let notification_id = path.trim_start_matches("/api/notifications/");

    if notification_id.is_empty() || !validate_uuid(notification_id) {
        return Ok(ApiError::BadRequest("Notification ID required".to_string()).into());
    }

    match store.get_json::<Notification>(&notification_key(notification_id))? {
        // Deletion is scoped to the addressee; a foreign id reads as unknown.
        Some(notification) if notification.to_user_id == me.id => {
            store.delete(&notification_key(notification_id))?;

            let inbox_key = notifications_key(&me.id);
            let mut inbox: Vec<String> = store.get_json(&inbox_key)?.unwrap_or_default();
            inbox.retain(|id| id != notification_id);
            store.set_json(&inbox_key, &inbox)?;

            tracing::debug!(notification_id, "notification deleted");

            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(
                    &serde_json::json!({ "message": "Notification deleted successfully" }),
                )?)
                .build())
        }
        _ => Ok(ApiError::NotFound("Notification not found".to_string()).into()),
    }
}
