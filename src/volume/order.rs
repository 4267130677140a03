//! Extraction order for entries of spanned archives.

/// Runs shorter than this are insertion sorted.
const INSERTION_THRESHOLD: usize = 12;

/// Sorts entries so volumes are visited in non-decreasing order.
///
/// `key` returns `(start_disk, local_header_offset, index)`. Single-volume
/// archives ignore the disk. Keys are unique through the index, so the
/// result is deterministic.
pub fn order_by_volume<T, F>(items: &mut [T], multi_volume: bool, key: F)
where
    F: Fn(&T) -> (u32, u64, usize),
{
    let key = |item: &T| {
        let (disk, offset, index) = key(item);
        (if multi_volume { disk } else { 0 }, offset, index)
    };
    quicksort(items, &key, 0);
}

/// Quicksort recursing into the smaller partition and looping on the larger.
///
/// Returns the deepest recursion level reached.
fn quicksort<T, K, F>(mut items: &mut [T], key: &F, depth: usize) -> usize
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut max_depth = depth;
    loop {
        if items.len() <= INSERTION_THRESHOLD {
            insertion_sort(items, key);
            return max_depth;
        }
        let pivot = partition(items, key);
        let (left, right) = std::mem::take(&mut items).split_at_mut(pivot);
        let right = &mut right[1..];
        if left.len() < right.len() {
            max_depth = max_depth.max(quicksort(left, key, depth + 1));
            items = right;
        } else {
            max_depth = max_depth.max(quicksort(right, key, depth + 1));
            items = left;
        }
    }
}

fn partition<T, K, F>(items: &mut [T], key: &F) -> usize
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let last = items.len() - 1;
    let mid = last / 2;
    // median of three ends up at `mid`
    if key(&items[mid]) < key(&items[0]) {
        items.swap(mid, 0);
    }
    if key(&items[last]) < key(&items[0]) {
        items.swap(last, 0);
    }
    if key(&items[last]) < key(&items[mid]) {
        items.swap(last, mid);
    }
    items.swap(mid, last);

    let pivot = key(&items[last]);
    let mut store = 0;
    for i in 0..last {
        if key(&items[i]) < pivot {
            items.swap(i, store);
            store += 1;
        }
    }
    items.swap(store, last);
    store
}

fn insertion_sort<T, K, F>(items: &mut [T], key: &F)
where
    K: Ord,
    F: Fn(&T) -> K,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && key(&items[j]) < key(&items[j - 1]) {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Item {
        disk: u32,
        offset: u64,
        index: usize,
    }

    fn key(item: &Item) -> (u32, u64, usize) {
        (item.disk, item.offset, item.index)
    }

    #[test]
    fn test_volumes_non_decreasing() {
        let disks = [3, 1, 2, 1, 3];
        let mut items: Vec<Item> = disks
            .iter()
            .enumerate()
            .map(|(index, &disk)| Item {
                disk,
                offset: 100 - index as u64,
                index,
            })
            .collect();
        order_by_volume(&mut items, true, key);
        let order: Vec<u32> = items.iter().map(|i| i.disk).collect();
        assert_eq!(order, vec![1, 1, 2, 3, 3]);
        // ties on disk fall back to offset
        assert_eq!(items[0].index, 3);
        assert_eq!(items[1].index, 1);
    }

    #[test]
    fn test_single_volume_sorts_by_offset() {
        let mut items = vec![
            Item { disk: 5, offset: 30, index: 0 },
            Item { disk: 0, offset: 10, index: 1 },
            Item { disk: 2, offset: 20, index: 2 },
        ];
        order_by_volume(&mut items, false, key);
        let indexes: Vec<usize> = items.iter().map(|i| i.index).collect();
        assert_eq!(indexes, vec![1, 2, 0]);
    }

    #[test]
    fn test_depth_bounded_on_adversarial_input() {
        for n in [1_000usize, 10_000, 50_000] {
            // sorted, reversed and all-equal-disk inputs
            let mut sorted: Vec<(u32, u64, usize)> = (0..n).map(|i| (0, i as u64, i)).collect();
            let mut reversed: Vec<(u32, u64, usize)> =
                (0..n).rev().map(|i| (1, i as u64, i)).collect();
            let bound = 2 * (usize::BITS - n.leading_zeros()) as usize;
            for items in [&mut sorted, &mut reversed] {
                let depth = quicksort(items, &|t: &(u32, u64, usize)| *t, 0);
                assert!(depth <= bound, "depth {depth} > {bound} for n={n}");
                assert!(items.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_matches_std_sort(
            raw in prop::collection::vec((0u32..4, 0u64..1000), 0..300),
            multi in any::<bool>(),
        ) {
            let mut items: Vec<Item> = raw
                .iter()
                .enumerate()
                .map(|(index, &(disk, offset))| Item { disk, offset, index })
                .collect();
            let mut expected = items.clone();
            expected.sort_by_key(|i| (if multi { i.disk } else { 0 }, i.offset, i.index));

            order_by_volume(&mut items, multi, key);
            prop_assert_eq!(items, expected);
        }
    }
}
