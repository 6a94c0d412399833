use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;

use crate::auth::{current_user, validate_token, Claims};
use crate::config::{
    auth_key, user_key, MAX_BIO_LENGTH, MAX_LOCATION_LENGTH, MAX_NAME_LENGTH,
    MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH, USERS_LIST_KEY,
};
use crate::core::errors::ApiError;
use crate::core::helpers::{
    new_id, now_iso, sanitize_text, store, validate_username, validate_uuid,
};
use crate::models::models::{NotificationKind, User};
use crate::notifications;

pub fn find_user_by_username(store: &Store, username: &str) -> anyhow::Result<Option<User>> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();

    for id in users {
        if let Some(user) = store.get_json::<User>(&user_key(&id))? {
            if user.username == username {
                return Ok(Some(user));
            }
        }
    }

    Ok(None)
}

fn user_response(status: u16, user: &User) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "user": user }))?)
        .build())
}

/// Pick a username seed from the token claims, falling back to the email
/// local part; anything outside the allowed alphabet is dropped.
fn username_base(claimed: Option<&str>, email: &str) -> String {
    let source = match claimed {
        Some(name) if !name.is_empty() => name,
        _ => email.split('@').next().unwrap_or_default(),
    };
    source
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .take(MAX_USERNAME_LENGTH)
        .collect()
}

fn unique_username(store: &Store, base: &str) -> anyhow::Result<String> {
    let mut base = base.to_string();
    if base.len() < MIN_USERNAME_LENGTH {
        base = format!("user{}", &new_id()[..8]);
    }

    if find_user_by_username(store, &base)?.is_none() {
        return Ok(base);
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}{}", base, n);
        if find_user_by_username(store, &candidate)?.is_none() {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Flip the follow edge between two users, updating both sides. Returns true
/// when the toggle created the edge.
fn apply_follow_toggle(me: &mut User, target: &mut User) -> bool {
    if let Some(pos) = me.following.iter().position(|id| id == &target.id) {
        me.following.remove(pos);
        target.followers.retain(|id| id != &me.id);
        false
    } else {
        me.following.push(target.id.clone());
        target.followers.push(me.id.clone());
        true
    }
}

// === HTTP Handlers ===

pub fn get_profile(path: &str) -> anyhow::Result<Response> {
    let raw = path.trim_start_matches("/api/users/profile/");
    let username = urlencoding::decode(raw)
        .unwrap_or(std::borrow::Cow::Borrowed(raw))
        .to_string();

    if username.is_empty() {
        return Ok(ApiError::BadRequest("Username required".to_string()).into());
    }

    let store = store();
    match find_user_by_username(&store, &username)? {
        Some(user) => user_response(200, &user),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

pub fn sync_user(req: Request) -> anyhow::Result<Response> {
    let claims = match validate_token(&req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    if let Some(existing) = current_user(&store, &claims)? {
        return Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({
                "user": existing,
                "message": "User already exists",
            }))?)
            .build());
    }

    let user = create_from_claims(&store, &claims)?;
    tracing::info!(user_id = %user.id, "user synced");

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "user": user,
            "message": "User created successfully",
        }))?)
        .build())
}

fn create_from_claims(store: &Store, claims: &Claims) -> anyhow::Result<User> {
    let base = username_base(claims.username.as_deref(), &claims.email);
    let username = unique_username(store, &base)?;

    let user = User {
        id: new_id(),
        auth_id: claims.sub.clone(),
        email: claims.email.clone(),
        first_name: sanitize_text(claims.first_name.as_deref().unwrap_or_default()),
        last_name: sanitize_text(claims.last_name.as_deref().unwrap_or_default()),
        username,
        profile_picture: None,
        banner_image: None,
        bio: None,
        location: None,
        followers: Vec::new(),
        following: Vec::new(),
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&user_key(&user.id), &user)?;
    store.set_json(&auth_key(&user.auth_id), &user.id)?;

    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    users.push(user.id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;

    Ok(user)
}

pub fn get_me(req: Request) -> anyhow::Result<Response> {
    let claims = match validate_token(&req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    match current_user(&store, &claims)? {
        Some(user) => user_response(200, &user),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

pub fn update_profile(req: Request) -> anyhow::Result<Response> {
    let claims = match validate_token(&req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let mut me = match current_user(&store, &claims)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(value) => value,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    if let Some(first_name) = value["first_name"].as_str() {
        if first_name.len() > MAX_NAME_LENGTH {
            return Ok(ApiError::BadRequest("First name too long".to_string()).into());
        }
        me.first_name = sanitize_text(first_name);
    }

    if let Some(last_name) = value["last_name"].as_str() {
        if last_name.len() > MAX_NAME_LENGTH {
            return Ok(ApiError::BadRequest("Last name too long".to_string()).into());
        }
        me.last_name = sanitize_text(last_name);
    }

    if let Some(username) = value["username"].as_str() {
        let username = sanitize_text(username);
        if !validate_username(&username) {
            return Ok(ApiError::BadRequest(
                "Username must be 3-30 characters: letters, digits, '_' or '.'".to_string(),
            )
            .into());
        }
        if username != me.username && find_user_by_username(&store, &username)?.is_some() {
            return Ok(ApiError::Conflict("Username already taken".to_string()).into());
        }
        me.username = username;
    }

    if let Some(bio) = value["bio"].as_str() {
        if bio.len() > MAX_BIO_LENGTH {
            return Ok(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()).into());
        }
        let bio = sanitize_text(bio);
        me.bio = if bio.is_empty() { None } else { Some(bio) };
    }

    if let Some(location) = value["location"].as_str() {
        if location.len() > MAX_LOCATION_LENGTH {
            return Ok(ApiError::BadRequest("Location too long".to_string()).into());
        }
        let location = sanitize_text(location);
        me.location = if location.is_empty() {
            None
        } else {
            Some(location)
        };
    }

    if let Some(picture) = value["profile_picture"].as_str() {
        me.profile_picture = if picture.is_empty() {
            None
        } else {
            Some(picture.to_string())
        };
    }

    if let Some(banner) = value["banner_image"].as_str() {
        me.banner_image = if banner.is_empty() {
            None
        } else {
            Some(banner.to_string())
        };
    }

    me.updated_at = Some(now_iso());
    store.set_json(&user_key(&me.id), &me)?;

    user_response(200, &me)
}

pub fn follow_toggle(req: Request) -> anyhow::Result<Response> {
    let claims = match validate_token(&req) {
        Some(claims) => claims,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let mut me = match current_user(&store, &claims)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let path = req.path();
    let target_id = path.trim_start_matches("/api/users/follow/");

    if target_id.is_empty() || !validate_uuid(target_id) {
        return Ok(ApiError::BadRequest("Invalid target user".to_string()).into());
    }
    if target_id == me.id {
        return Ok(ApiError::BadRequest("Users cannot follow themselves".to_string()).into());
    }

    let mut target = match store.get_json::<User>(&user_key(target_id))? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("Target user not found".to_string()).into()),
    };

    let followed = apply_follow_toggle(&mut me, &mut target);
    store.set_json(&user_key(&me.id), &me)?;
    store.set_json(&user_key(&target.id), &target)?;

    if followed {
        notifications::record(&store, NotificationKind::Follow, &me.id, &target.id, None, None)?;
    }

    let message = if followed {
        "User followed successfully"
    } else {
        "User unfollowed successfully"
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({ "message": message }))?)
        .build())
}
