//! Fixed-size, order-preserving document chunking.

use crate::errors::MeiliError;

/// Split `items` into contiguous chunks of at most `batch_size` elements.
///
/// Chunk `i` holds `items[i * batch_size..(i + 1) * batch_size]`; an empty
/// input yields no chunks. A zero batch size is rejected before any request
/// is made.
pub fn split<T>(items: &[T], batch_size: usize) -> Result<Vec<&[T]>, MeiliError> {
    if batch_size == 0 {
        return Err(MeiliError::validation("Batch size must be greater than 0"));
    }
    Ok(items.chunks(batch_size).collect())
}
