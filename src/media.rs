use futures::stream;
use spin_sdk::http::Response;
use spin_sdk::key_value::Store;

use crate::config::{media_key, media_meta_key, MAX_IMAGE_BYTES};
use crate::core::errors::ApiError;
use crate::core::helpers::{new_id, store, validate_uuid};
use crate::models::models::MediaMeta;

pub struct PostUpload {
    pub content: String,
    pub image: Option<ImagePart>,
}

pub struct ImagePart {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Parse a `multipart/form-data` post body: a `content` text field and an
/// optional `image` file field.
pub fn parse_post_upload(content_type: &str, body: &[u8]) -> Result<PostUpload, ApiError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| ApiError::BadRequest("Expected multipart form data".to_string()))?;
    futures::executor::block_on(read_parts(boundary, body.to_vec()))
}

async fn read_parts(boundary: String, body: Vec<u8>) -> Result<PostUpload, ApiError> {
    let body_stream =
        stream::once(async move { Ok::<Vec<u8>, std::convert::Infallible>(body) });
    let mut multipart = multer::Multipart::new(body_stream, boundary);

    let mut content = String::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("content") => content = field.text().await.map_err(malformed)?,
            Some("image") => {
                let declared = field.content_type().map(|m| m.to_string());
                let file_name = field.file_name().map(|f| f.to_string());
                let data = field.bytes().await.map_err(malformed)?;
                if data.is_empty() {
                    continue;
                }
                let content_type = declared.unwrap_or_else(|| guess_type(file_name.as_deref()));
                if !content_type.starts_with("image/") {
                    return Err(ApiError::BadRequest(
                        "Only image uploads are supported".to_string(),
                    ));
                }
                if data.len() > MAX_IMAGE_BYTES {
                    return Err(ApiError::BadRequest("Image too large".to_string()));
                }
                image = Some(ImagePart {
                    bytes: data.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    Ok(PostUpload { content, image })
}

fn malformed(err: multer::Error) -> ApiError {
    ApiError::BadRequest(format!("Malformed upload: {}", err))
}

fn guess_type(file_name: Option<&str>) -> String {
    match file_name {
        Some(name) => mime_guess::from_path(name)
            .first_or_octet_stream()
            .to_string(),
        None => "application/octet-stream".to_string(),
    }
}

/// Persist image bytes and return the path the stored post will reference.
pub fn store_image(store: &Store, image: &ImagePart) -> anyhow::Result<String> {
    let media_id = new_id();
    store.set(&media_key(&media_id), &image.bytes)?;
    store.set_json(
        &media_meta_key(&media_id),
        &MediaMeta {
            content_type: image.content_type.clone(),
        },
    )?;
    Ok(format!("/api/media/{}", media_id))
}

/// Remove a stored image given the path recorded on a post.
pub fn delete_by_path(store: &Store, image_path: &str) -> anyhow::Result<()> {
    let media_id = image_path.trim_start_matches("/api/media/");
    if !media_id.is_empty() && validate_uuid(media_id) {
        store.delete(&media_key(media_id))?;
        store.delete(&media_meta_key(media_id))?;
    }
    Ok(())
}

pub fn serve_media(path: &str) -> anyhow::Result<Response> {
    let media_id = path.trim_start_matches("/api/media/");

    if media_id.is_empty() || !validate_uuid(media_id) {
        return Ok(ApiError::BadRequest("Media ID required".to_string()).into());
    }

    let store = store();
    let bytes = store.get(&media_key(media_id))?;
    let meta = store.get_json::<MediaMeta>(&media_meta_key(media_id))?;

    match (bytes, meta) {
        (Some(bytes), Some(meta)) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", meta.content_type.as_str())
            .body(bytes)
            .build()),
        _ => Ok(ApiError::NotFound("Media not found".to_string()).into()),
    }
}
