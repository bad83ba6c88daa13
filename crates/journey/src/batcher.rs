use tracing::info;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Split `items` into consecutive slices of at most `size` elements.
/// A zero size is treated as one.
pub fn batches<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    let size = size.max(1);
    info!(items = items.len(), batch_size = size, "Chunking journeys into batches");
    items.chunks(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_batch_may_be_smaller() {
        let items: Vec<u32> = (0..250).collect();
        let sizes: Vec<usize> = batches(&items, DEFAULT_BATCH_SIZE).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_concatenation_reproduces_input() {
        let items: Vec<u32> = (0..37).collect();
        let rejoined: Vec<u32> = batches(&items, 5).flatten().copied().collect();
        assert_eq!(rejoined, items);
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        let items: Vec<u32> = Vec::new();
        assert_eq!(batches(&items, 10).count(), 0);
    }

    #[test]
    fn test_zero_size_does_not_panic() {
        let items = [1, 2, 3];
        assert_eq!(batches(&items, 0).count(), 3);
    }
}
