//! Read a blend request JSON file.

use std::fs::File;
use std::path::Path;

use crate::domain::{BlendRequest, RequestPayload};
use crate::error::AppError;

pub fn read_request_json(path: &Path) -> Result<BlendRequest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open request JSON '{}': {e}", path.display())))?;
    let payload: RequestPayload =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid request JSON: {e}")))?;
    Ok(payload.into_request()?)
}
