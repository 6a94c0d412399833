use spin_sdk::key_value::Store;

use crate::config::{auth_key, post_key, user_key, FEED_KEY, USERS_LIST_KEY};
use crate::core::helpers::{new_id, now_iso};
use crate::models::models::{Post, User};

struct DemoUser {
    auth_id: &'static str,
    email: &'static str,
    first_name: &'static str,
    username: &'static str,
    bio: &'static str,
    posts: &'static [&'static str],
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        auth_id: "demo|ada",
        email: "ada@example.com",
        first_name: "Ada",
        username: "ada",
        bio: "First here, as usual.",
        posts: &["Hello from the demo seed!"],
    },
    DemoUser {
        auth_id: "demo|grace",
        email: "grace@example.com",
        first_name: "Grace",
        username: "grace",
        bio: "Shipping small things daily.",
        posts: &[
            "Trying out the posting flow.",
            "Second post, still works.",
        ],
    },
];

/// Create demo users with a couple of posts and one follow edge, once.
pub fn seed_demo_data(store: &Store) -> anyhow::Result<()> {
    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();

    let mut existing = Vec::new();
    for id in &users {
        if let Some(user) = store.get_json::<User>(&user_key(id))? {
            existing.push(user.username);
        }
    }

    let mut seeded_ids = Vec::new();
    for demo in DEMO_USERS {
        if existing.iter().any(|name| name == demo.username) {
            continue;
        }

        let user = User {
            id: new_id(),
            auth_id: demo.auth_id.to_string(),
            email: demo.email.to_string(),
            first_name: demo.first_name.to_string(),
            last_name: String::new(),
            username: demo.username.to_string(),
            profile_picture: None,
            banner_image: None,
            bio: Some(demo.bio.to_string()),
            location: None,
            followers: Vec::new(),
            following: Vec::new(),
            created_at: now_iso(),
            updated_at: None,
        };

        for content in demo.posts {
            let post = Post {
                id: new_id(),
                user_id: user.id.clone(),
                content: content.to_string(),
                image: None,
                likes: Vec::new(),
                comments: Vec::new(),
                created_at: now_iso(),
                updated_at: None,
            };
            store.set_json(&post_key(&post.id), &post)?;
            feed.insert(0, post.id);
        }

        store.set_json(&user_key(&user.id), &user)?;
        store.set_json(&auth_key(&user.auth_id), &user.id)?;
        users.push(user.id.clone());
        seeded_ids.push(user.id);
    }

    // Wire the first seeded pair together so the social graph is not empty.
    if let [first_id, second_id] = seeded_ids.as_slice() {
        if let (Some(mut first), Some(mut second)) = (
            store.get_json::<User>(&user_key(first_id))?,
            store.get_json::<User>(&user_key(second_id))?,
        ) {
            first.following.push(second.id.clone());
            second.followers.push(first.id.clone());
            store.set_json(&user_key(&first.id), &first)?;
            store.set_json(&user_key(&second.id), &second)?;
        }
    }

    store.set_json(USERS_LIST_KEY, &users)?;
    store.set_json(FEED_KEY, &feed)?;

    Ok(())
}
