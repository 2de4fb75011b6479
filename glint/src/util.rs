//! Name suggestions for unknown-symbol diagnostics

/// Edit distance between two names, two-row dynamic programming
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Largest distance still worth suggesting for a name of this length
fn suggestion_threshold(name: &str) -> usize {
    (name.chars().count() / 3).max(1)
}

/// Closest candidate to `name`, if any is close enough; ties go to the first
/// candidate in sorted order so suggestions are stable across runs
pub fn closest_name<'a>(name: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let threshold = suggestion_threshold(name);
    let lowered = name.to_lowercase();
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable();

    sorted
        .into_iter()
        .filter(|c| *c != name)
        .map(|c| (edit_distance(&lowered, &c.to_lowercase()), c))
        .filter(|(d, _)| *d <= threshold)
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| c)
}

/// `; did you mean `x`?` suffix for a diagnostic message, or nothing
pub fn suggestion_suffix(suggestion: Option<&str>) -> String {
    suggestion
        .map(|s| format!("; did you mean `{s}`?"))
        .unwrap_or_default()
}
