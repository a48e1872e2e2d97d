use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Disjoint train/test row indices, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Number of test rows for `n` rows; both partitions keep at least one row when `n >= 2`.
pub fn test_size(n: usize, test_fraction: f64) -> usize {
    if n < 2 {
        return 0;
    }
    let raw = (n as f64 * test_fraction).round() as usize;
    raw.clamp(1, n - 1)
}

/// Shuffle `0..n` and cut off `test_size(n, test_fraction)` rows for testing.
pub fn split_indices(n: usize, test_fraction: f64, seed: Option<u64>) -> Split {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut rng_for(seed));
    let cut = test_size(n, test_fraction);
    finish(order[cut..].to_vec(), order[..cut].to_vec())
}

/// Split each class separately so class shares are kept in both partitions.
///
/// The overall test size is `test_size(n, test_fraction)`, shared across
/// classes by largest remainder. A class never gives up its last training
/// row; if that leaves the test partition empty one row is moved over.
pub fn stratified_split(labels: &[usize], test_fraction: f64, seed: Option<u64>) -> Split {
    let mut rng = rng_for(seed);
    let class_count = labels.iter().copied().max().map_or(0, |max| max + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); class_count];
    for (row, &label) in labels.iter().enumerate() {
        by_class[label].push(row);
    }
    let cuts = class_quotas(&by_class, test_size(labels.len(), test_fraction));

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (rows, &cut) in by_class.iter_mut().zip(&cuts) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..cut]);
        train.extend_from_slice(&rows[cut..]);
    }

    if test.is_empty() && labels.len() >= 2 {
        let donor = by_class
            .iter()
            .filter(|rows| rows.len() >= 2)
            .max_by_key(|rows| rows.len())
            .and_then(|rows| rows.first().copied())
            .or_else(|| train.first().copied());
        if let Some(row) = donor {
            train.retain(|&idx| idx != row);
            test.push(row);
        }
    }
    finish(train, test)
}

/// Per-class test counts summing to `total` where the class caps allow.
fn class_quotas(by_class: &[Vec<usize>], total: usize) -> Vec<usize> {
    let n: usize = by_class.iter().map(Vec::len).sum();
    if n == 0 {
        return vec![0; by_class.len()];
    }
    let caps: Vec<usize> = by_class.iter().map(|rows| rows.len().saturating_sub(1)).collect();
    let exact: Vec<f64> = by_class
        .iter()
        .map(|rows| rows.len() as f64 * total as f64 / n as f64)
        .collect();
    let mut cuts: Vec<usize> = exact
        .iter()
        .zip(&caps)
        .map(|(&quota, &cap)| (quota.floor() as usize).min(cap))
        .collect();

    let mut order: Vec<usize> = (0..by_class.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });
    let mut remaining = total.saturating_sub(cuts.iter().sum());
    while remaining > 0 {
        let mut placed = false;
        for &class in &order {
            if remaining == 0 {
                break;
            }
            if cuts[class] < caps[class] {
                cuts[class] += 1;
                remaining -= 1;
                placed = true;
            }
        }
        if !placed {
            break;
        }
    }
    cuts
}

fn finish(mut train: Vec<usize>, mut test: Vec<usize>) -> Split {
    train.sort_unstable();
    test.sort_unstable();
    Split { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fixed_seed_gives_identical_partitions() {
        assert_eq!(split_indices(50, 0.3, Some(5)), split_indices(50, 0.3, Some(5)));
        assert_ne!(split_indices(50, 0.3, Some(5)), split_indices(50, 0.3, Some(6)));
    }

    #[test]
    fn partitions_cover_all_rows_without_overlap() {
        let split = split_indices(37, 0.25, Some(1));
        assert_eq!(split.train.len() + split.test.len(), 37);
        let train: HashSet<_> = split.train.iter().collect();
        assert!(split.test.iter().all(|idx| !train.contains(idx)));
        assert_eq!(split.test.len(), 9);
    }

    #[test]
    fn extreme_fractions_keep_both_sides_non_empty() {
        let split = split_indices(2, 0.99, Some(0));
        assert_eq!((split.train.len(), split.test.len()), (1, 1));
        let split = split_indices(10, 0.0, Some(0));
        assert_eq!(split.test.len(), 1);
    }

    #[test]
    fn stratified_split_keeps_class_shares() {
        let labels: Vec<usize> = (0..40).map(|i| usize::from(i >= 30)).collect();
        let split = stratified_split(&labels, 0.2, Some(3));
        let test_ones = split.test.iter().filter(|&&idx| labels[idx] == 1).count();
        assert_eq!(split.test.len(), 8);
        assert_eq!(test_ones, 2);
        assert_eq!(split.train.len() + split.test.len(), 40);
    }

    #[test]
    fn stratified_split_with_singleton_classes_still_tests_something() {
        let labels = vec![0, 1, 2, 2];
        let split = stratified_split(&labels, 0.1, Some(3));
        assert!(!split.test.is_empty());
        assert!(!split.train.is_empty());
    }

    #[test]
    fn stratified_split_follows_fraction_with_many_small_classes() {
        let labels: Vec<usize> = (0..20).map(|i| i / 2).collect();
        let split = stratified_split(&labels, 0.1, Some(9));
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 18);
        let classes: HashSet<_> = split.test.iter().map(|&idx| labels[idx]).collect();
        assert_eq!(classes.len(), 2);
    }

    #[test]
    fn stratified_split_matches_plain_split_size() {
        let labels: Vec<usize> = (0..53).map(|i| i % 7).collect();
        for fraction in [0.1, 0.25, 0.4] {
            let split = stratified_split(&labels, fraction, Some(1));
            assert_eq!(split.test.len(), test_size(53, fraction), "{fraction}");
        }
    }
}
