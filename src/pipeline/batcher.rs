use std::slice::Chunks;
use thiserror::Error;

pub const DEFAULT_BATCH_SIZE: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("batch size must be at least 1")]
    ZeroSize,
}

/// Splits `items` into consecutive chunks of at most `size`, keeping order.
/// Only the last chunk may be short.
pub fn batches<T>(items: &[T], size: usize) -> Result<Chunks<'_, T>, BatchError> {
    if size == 0 {
        return Err(BatchError::ZeroSize);
    }
    Ok(items.chunks(size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_five_items_make_ten_ten_five() {
        let items: Vec<u32> = (0..25).collect();
        let sizes: Vec<usize> = batches(&items, DEFAULT_BATCH_SIZE)
            .unwrap()
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn chunk_count_is_ceiling_and_concatenation_restores_input() {
        for n in 0..40usize {
            for size in 1..12usize {
                let items: Vec<usize> = (0..n).collect();
                let chunks: Vec<&[usize]> = batches(&items, size).unwrap().collect();
                assert_eq!(chunks.len(), n.div_ceil(size), "n={} size={}", n, size);
                if let Some((last, full)) = chunks.split_last() {
                    assert!(full.iter().all(|c| c.len() == size));
                    assert!(!last.is_empty() && last.len() <= size);
                }
                assert_eq!(chunks.concat(), items);
            }
        }
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let items: Vec<u8> = Vec::new();
        assert_eq!(batches(&items, 10).unwrap().count(), 0);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert_eq!(batches(&[1, 2, 3], 0).unwrap_err(), BatchError::ZeroSize);
    }
}
