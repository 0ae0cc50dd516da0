use std::path::Path;

use retrophoto_core::config::WorkerConfig;
use retrophoto_core::db::UploadQueue;
use retrophoto_core::UploadPayload;

use crate::commands::common::{guess_content_type, open_queue};
use crate::error::CliError;

pub async fn run_enqueue(
    file: &Path,
    fingerprint: &str,
    session_id: Option<&str>,
    content_type: Option<&str>,
    db_path: &Path,
    config: &WorkerConfig,
) -> Result<(), CliError> {
    let content_type = match content_type {
        Some(content_type) => content_type.to_string(),
        None => guess_content_type(file)
            .ok_or_else(|| CliError::UnknownContentType(file.display().to_string()))?
            .to_string(),
    };
    let bytes = std::fs::read(file).map_err(|source| CliError::ReadPhoto {
        path: file.display().to_string(),
        source,
    })?;
    let file_name = file
        .file_name()
        .map_or_else(|| file.display().to_string(), |name| name.to_string_lossy().to_string());

    let mut payload = UploadPayload::new(file_name, content_type, bytes, fingerprint)?;
    if let Some(session_id) = session_id {
        payload = payload.with_session_id(session_id);
    }

    let queue = open_queue(db_path, config).await?;
    let id = queue.enqueue(payload).await?;

    println!("{id}");
    Ok(())
}
