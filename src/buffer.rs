use crate::error::{PqCertKitError, Result};

/// Copies `encoded` into the caller's buffer and returns the length written.
///
/// When `out` is too short nothing is written and the error carries the
/// length needed, so the caller can retry with a larger buffer.
pub fn write_output(out: &mut [u8], encoded: &[u8]) -> Result<usize> {
    let required = encoded.len();
    let Some(dest) = out.get_mut(..required) else {
        return Err(PqCertKitError::BufferTooSmall { required });
    };
    dest.copy_from_slice(encoded);
    Ok(required)
}
