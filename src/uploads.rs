use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{error, info};

use crate::errors::RequestError;

pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;
pub const AVATAR_URL_PREFIX: &str = "/uploads/avatars";
const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

/// Lower-cased extension of an accepted image, checked against both the
/// file name and the declared mime type.
pub fn avatar_extension(file_name: &str, content_type: Option<&str>) -> Result<String, RequestError> {
    let not_an_image = || RequestError::bad_request("Only image files are allowed!");
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(not_an_image)?;
    let mime_ok = content_type
        .map(str::to_ascii_lowercase)
        .and_then(|mime| mime.strip_prefix("image/").map(str::to_string))
        .is_some_and(|subtype| ALLOWED_EXTENSIONS.contains(&subtype.as_str()));
    if !mime_ok {
        return Err(not_an_image());
    }
    Ok(extension)
}

/// `{user_id}-{unix_millis}-{random}.{ext}`
pub fn avatar_file_name(user_id: i64, unix_millis: i64, extension: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{user_id}-{unix_millis}-{suffix}.{extension}")
}

/// Writes the avatar under `{upload_dir}/avatars` and returns its public path.
pub async fn save_avatar(
    upload_dir: &Path,
    user_id: i64,
    file_name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<String, RequestError> {
    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(RequestError::bad_request("File too large. Max size is 5MB."));
    }
    let extension = avatar_extension(file_name, content_type)?;

    let directory: PathBuf = upload_dir.join("avatars");
    tokio::fs::create_dir_all(&directory).await.map_err(|e| {
        error!("Failed to create avatar directory: {}", e);
        RequestError::ServerError
    })?;

    let name = avatar_file_name(user_id, chrono::Utc::now().timestamp_millis(), &extension);
    tokio::fs::write(directory.join(&name), bytes)
        .await
        .map_err(|e| {
            error!("Failed to write avatar: {}", e);
            RequestError::ServerError
        })?;
    info!(user_id, file = %name, "stored avatar");
    Ok(format!("{AVATAR_URL_PREFIX}/{name}"))
}
