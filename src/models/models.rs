use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub auth_id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub banner_image: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default)]
    pub following: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub image: Option<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub content: String,
    #[serde(default)]
    pub likes: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Notification {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub kind: NotificationKind,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct MediaMeta {
    pub content_type: String,
}

/// Author fields embedded in post, comment and notification responses.
#[derive(Serialize, Deserialize, Clone)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
}

impl UserSummary {
    pub fn from_user(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub struct CommentView {
    pub id: String,
    pub user: UserSummary,
    pub post_id: String,
    pub content: String,
    pub likes: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct PostView {
    pub id: String,
    pub user: UserSummary,
    pub content: String,
    pub image: Option<String>,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct PostRef {
    pub id: String,
    pub content: String,
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct CommentRef {
    pub id: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct NotificationView {
    pub id: String,
    pub from: UserSummary,
    pub kind: NotificationKind,
    pub post: Option<PostRef>,
    pub comment: Option<CommentRef>,
    pub created_at: String,
}
