//! Batch coordinator: groups the discovered files into consecutive batches
//! that are dispatched to workers in discovery order.

use crate::model::FileRecord;

/// Splits `records` into batches of at most `batch_size`, preserving order.
/// Fewer records than `batch_size` produce exactly one batch.
pub fn partition(records: Vec<FileRecord>, batch_size: usize) -> Vec<Vec<FileRecord>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size.min(records.len()));

    for record in records {
        current.push(record);
        if current.len() == batch_size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
