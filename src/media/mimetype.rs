use std::path::Path;

use crate::error::{IngestError, Result};

/// Sniffs the file header. Unknown content is passed on to the decoder,
/// but content recognised as something other than an image is rejected up front.
pub fn ensure_image(path: &Path) -> Result<()> {
    let kind = infer::get_from_path(path).map_err(|source| IngestError::ImageIo {
        path: path.to_path_buf(),
        source,
    })?;

    match kind {
        Some(k) if k.matcher_type() != infer::MatcherType::Image => Err(IngestError::ImageDecode {
            path: path.to_path_buf(),
            reason: format!("not an image ({})", k.mime_type()),
        }),
        _ => Ok(()),
    }
}
