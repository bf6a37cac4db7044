//! Fuzzy comparison of wiki bullets.
//!
//! Scores are a longest-common-subsequence ratio over characters, which
//! rewards shared word order ("Use regex for parsing" vs "Use regex to parse")
//! rather than raw edit distance.

/// Default score at or above which two bullets are treated as the same fact.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Compare two strings, returning a score in `[0.0, 1.0]`.
///
/// Case-insensitive and symmetric. Returns `1.0` exactly when the trimmed,
/// lowercased strings are identical.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let lcs = lcs_len(&a, &b);
    #[allow(clippy::cast_precision_loss)]
    let ratio = (2 * lcs) as f64 / (a.len() + b.len()) as f64;
    ratio
}

/// Check whether two strings are near-duplicates under `threshold`.
#[must_use]
pub fn is_similar(a: &str, b: &str, threshold: f64) -> bool {
    similarity(a, b) >= threshold
}

fn normalize(s: &str) -> Vec<char> {
    s.trim().to_lowercase().chars().collect()
}

/// Length of the longest common subsequence, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for &lc in long {
        for (j, &sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}
