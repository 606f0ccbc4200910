use crate::{TransferError, UploadFile};

/// Rejects files that cannot be uploaded, before any chunk is produced.
///
/// Rejects:
/// - No file at all
/// - Zero-byte files
/// - Files larger than `max_size`
pub fn validate_upload(file: Option<&UploadFile>, max_size: u64) -> Result<(), TransferError> {
    let Some(file) = file else {
        return Err(TransferError::MissingFile);
    };
    validate_size(file.size(), max_size)
}

/// Size checks of [`validate_upload`], usable before a file is read.
pub fn validate_size(size: u64, max_size: u64) -> Result<(), TransferError> {
    if size == 0 {
        return Err(TransferError::EmptyFile);
    }
    if size > max_size {
        return Err(TransferError::FileTooLarge {
            size,
            max: max_size,
        });
    }

    Ok(())
}
