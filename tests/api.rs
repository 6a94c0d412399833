use serde_json::json;
use std::sync::Mutex;

const BASE_URL: &str = "http://127.0.0.1:3000";
static TEST_LOCK: Mutex<()> = Mutex::new(());

fn lock_test() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap()
}

#[derive(serde::Serialize)]
struct TestClaims {
    sub: String,
    email: String,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    exp: usize,
    iat: usize,
}

fn mint_token(sub: &str, email: &str, username: Option<&str>) -> String {
    let secret =
        std::env::var("PLAZA_JWT_SECRET").unwrap_or_else(|_| "plaza-dev-secret".to_string());
    let now = unix_now();
    let claims = TestClaims {
        sub: sub.to_string(),
        email: email.to_string(),
        username: username.map(|u| u.to_string()),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        exp: now + 3600,
        iat: now,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to mint test token")
}

fn unix_now() -> usize {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

async fn server_running(client: &reqwest::Client) -> bool {
    client
        .get(format!("{}/api/posts", BASE_URL))
        .timeout(std::time::Duration::from_secs(2))
        .send()
        .await
        .is_ok()
}

/// Sync a fresh identity and return (token, user value).
async fn new_identity(client: &reqwest::Client, label: &str) -> (String, serde_json::Value) {
    let suffix = uuid::Uuid::new_v4().to_string()[..8].to_string();
    let sub = format!("ext_{}_{}", label, suffix);
    let email = format!("{}_{}@example.com", label, suffix);
    let username = format!("{}_{}", label, suffix);
    let token = mint_token(&sub, &email, Some(&username));

    let resp = client
        .post(format!("{}/api/users/sync", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to sync user");
    assert_eq!(resp.status(), 201, "fresh identity should create a user");

    let body = resp.json::<serde_json::Value>().await.unwrap();
    (token, body["user"].clone())
}

#[tokio::test]
async fn test_sync_me_and_profile_flow() {
    let _lock = lock_test();
    let client = reqwest::Client::new();
    if !server_running(&client).await {
        eprintln!("skipping: no server listening on {}", BASE_URL);
        return;
    }

    let (token, user) = new_identity(&client, "flow").await;
    let username = user["username"].as_str().unwrap().to_string();

    // Second sync finds the existing record.
    let resp = client
        .post(format!("{}/api/users/sync", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to re-sync user");
    assert_eq!(resp.status(), 200);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["message"], "User already exists");

    // Me returns the synced record.
    let resp = client
        .get(format!("{}/api/users/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to fetch me");
    assert_eq!(resp.status(), 200);
    let me = resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(me["user"]["username"], username.as_str());

    // Public profile lookup by username.
    let resp = client
        .get(format!("{}/api/users/profile/{}", BASE_URL, username))
        .send()
        .await
        .expect("Failed to fetch profile");
    assert_eq!(resp.status(), 200);

    // Unknown username yields an error body.
    let resp = client
        .get(format!("{}/api/users/profile/no_such_user_xyz", BASE_URL))
        .send()
        .await
        .expect("Failed to fetch missing profile");
    assert_eq!(resp.status(), 404);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    assert!(body["error"].is_string());

    // Requests without a token are rejected.
    let resp = client
        .get(format!("{}/api/users/me", BASE_URL))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_update_profile() {
    let _lock = lock_test();
    let client = reqwest::Client::new();
    if !server_running(&client).await {
        eprintln!("skipping: no server listening on {}", BASE_URL);
        return;
    }

    let (token, _user) = new_identity(&client, "edit").await;

    let resp = client
        .put(format!("{}/api/users/profile", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "bio": "hello there", "location": "Lisbon" }))
        .send()
        .await
        .expect("Failed to update profile");
    assert_eq!(resp.status(), 200);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["user"]["bio"], "hello there");
    assert_eq!(body["user"]["location"], "Lisbon");

    // Oversized bio is rejected.
    let resp = client
        .put(format!("{}/api/users/profile", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "bio": "b".repeat(501) }))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_follow_toggle_roundtrip() {
    let _lock = lock_test();
    let client = reqwest::Client::new();
    if !server_running(&client).await {
        eprintln!("skipping: no server listening on {}", BASE_URL);
        return;
    }

    let (token_a, user_a) = new_identity(&client, "fola").await;
    let (_token_b, user_b) = new_identity(&client, "folb").await;
    let a_id = user_a["id"].as_str().unwrap().to_string();
    let b_id = user_b["id"].as_str().unwrap().to_string();
    let b_username = user_b["username"].as_str().unwrap().to_string();

    // A follows B.
    let resp = client
        .post(format!("{}/api/users/follow/{}", BASE_URL, b_id))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("Failed to follow");
    assert_eq!(resp.status(), 200);

    let profile = client
        .get(format!("{}/api/users/profile/{}", BASE_URL, b_username))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let followers: Vec<String> = profile["user"]["followers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert!(followers.contains(&a_id));

    // Toggling again restores the original sets.
    let resp = client
        .post(format!("{}/api/users/follow/{}", BASE_URL, b_id))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("Failed to unfollow");
    assert_eq!(resp.status(), 200);

    let profile = client
        .get(format!("{}/api/users/profile/{}", BASE_URL, b_username))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert!(!profile["user"]["followers"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v.as_str() == Some(a_id.as_str())));

    // Self-follow is invalid.
    let resp = client
        .post(format!("{}/api/users/follow/{}", BASE_URL, a_id))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 400);

    // Unknown target is 404.
    let resp = client
        .post(format!(
            "{}/api/users/follow/{}",
            BASE_URL,
            uuid::Uuid::new_v4()
        ))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_post_comment_notification_lifecycle() {
    let _lock = lock_test();
    let client = reqwest::Client::new();
    if !server_running(&client).await {
        eprintln!("skipping: no server listening on {}", BASE_URL);
        return;
    }

    let (token_a, user_a) = new_identity(&client, "posta").await;
    let (token_b, _user_b) = new_identity(&client, "postb").await;
    let a_username = user_a["username"].as_str().unwrap().to_string();

    // 1. A creates a post with text and an image.
    let form = reqwest::multipart::Form::new()
        .text("content", "Integration test post")
        .part(
            "image",
            reqwest::multipart::Part::bytes(vec![137u8, 80, 78, 71])
                .file_name("pixel.png")
                .mime_str("image/png")
                .unwrap(),
        );
    let resp = client
        .post(format!("{}/api/posts", BASE_URL))
        .header("Authorization", format!("Bearer {}", token_a))
        .multipart(form)
        .send()
        .await
        .expect("Failed to create post");
    assert_eq!(resp.status(), 201);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    let post_id = body["post"]["id"].as_str().unwrap().to_string();
    let image_path = body["post"]["image"].as_str().unwrap().to_string();

    // The stored image is served back.
    let resp = client
        .get(format!("{}{}", BASE_URL, image_path))
        .send()
        .await
        .expect("Failed to fetch media");
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );

    // 2. The post shows up in listings.
    let resp = client
        .get(format!("{}/api/posts/{}", BASE_URL, post_id))
        .send()
        .await
        .expect("Failed to fetch post");
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/posts/user/{}", BASE_URL, a_username))
        .send()
        .await
        .expect("Failed to fetch user posts");
    assert_eq!(resp.status(), 200);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    assert!(body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"].as_str() == Some(post_id.as_str())));

    // 3. Double like by B returns the post to its baseline.
    for _ in 0..2 {
        let resp = client
            .post(format!("{}/api/posts/{}/like", BASE_URL, post_id))
            .header("Authorization", format!("Bearer {}", token_b))
            .send()
            .await
            .expect("Failed to toggle like");
        assert_eq!(resp.status(), 200);
    }
    let resp = client
        .get(format!("{}/api/posts/{}", BASE_URL, post_id))
        .send()
        .await
        .unwrap();
    let body = resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["post"]["likes"].as_array().unwrap().len(), 0);

    // 4. B comments; empty content is rejected.
    let resp = client
        .post(format!("{}/api/comments/post/{}", BASE_URL, post_id))
        .header("Authorization", format!("Bearer {}", token_b))
        .json(&json!({ "content": "nice one" }))
        .send()
        .await
        .expect("Failed to create comment");
    assert_eq!(resp.status(), 201);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    let comment_id = body["comment"]["id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{}/api/comments/post/{}", BASE_URL, post_id))
        .header("Authorization", format!("Bearer {}", token_b))
        .json(&json!({ "content": "" }))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{}/api/comments/post/{}", BASE_URL, post_id))
        .send()
        .await
        .expect("Failed to list comments");
    assert_eq!(resp.status(), 200);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    assert!(body["comments"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["id"].as_str() == Some(comment_id.as_str())));

    // 5. A's inbox recorded the like and the comment.
    let resp = client
        .get(format!("{}/api/notifications", BASE_URL))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("Failed to list notifications");
    assert_eq!(resp.status(), 200);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    let kinds: Vec<String> = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap().to_string())
        .collect();
    assert!(kinds.contains(&"like".to_string()));
    assert!(kinds.contains(&"comment".to_string()));
    let notification_id = body["notifications"][0]["id"].as_str().unwrap().to_string();

    // B cannot delete A's notification.
    let resp = client
        .delete(format!(
            "{}/api/notifications/{}",
            BASE_URL, notification_id
        ))
        .header("Authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 404);

    let resp = client
        .delete(format!(
            "{}/api/notifications/{}",
            BASE_URL, notification_id
        ))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("Failed to delete notification");
    assert_eq!(resp.status(), 200);

    // 6. Foreign deletes are forbidden and change nothing.
    let resp = client
        .delete(format!("{}/api/comments/{}", BASE_URL, comment_id))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 403);

    let resp = client
        .delete(format!("{}/api/posts/{}", BASE_URL, post_id))
        .header("Authorization", format!("Bearer {}", token_b))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 403);

    let resp = client
        .get(format!("{}/api/posts/{}", BASE_URL, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // 7. Owner deletes cascade.
    let resp = client
        .delete(format!("{}/api/posts/{}", BASE_URL, post_id))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .expect("Failed to delete post");
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/posts/{}", BASE_URL, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_post_content_validation() {
    let _lock = lock_test();
    let client = reqwest::Client::new();
    if !server_running(&client).await {
        eprintln!("skipping: no server listening on {}", BASE_URL);
        return;
    }

    let (token, _user) = new_identity(&client, "valid").await;

    // Neither text nor image.
    let form = reqwest::multipart::Form::new().text("content", "");
    let resp = client
        .post(format!("{}/api/posts", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 400);

    // Over the content limit.
    let form = reqwest::multipart::Form::new().text("content", "a".repeat(281));
    let resp = client
        .post(format!("{}/api/posts", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_requires_auth_and_unknown_ids() {
    let _lock = lock_test();
    let client = reqwest::Client::new();
    if !server_running(&client).await {
        eprintln!("skipping: no server listening on {}", BASE_URL);
        return;
    }

    // Creating a post without a token is rejected.
    let form = reqwest::multipart::Form::new().text("content", "anonymous post");
    let resp = client
        .post(format!("{}/api/posts", BASE_URL))
        .multipart(form)
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 401);

    let (token, _user) = new_identity(&client, "ghost").await;
    let missing = uuid::Uuid::new_v4();

    let resp = client
        .get(format!("{}/api/posts/{}", BASE_URL, missing))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 404);

    let resp = client
        .delete(format!("{}/api/comments/{}", BASE_URL, missing))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 404);

    let resp = client
        .delete(format!("{}/api/notifications/{}", BASE_URL, missing))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 404);
}
