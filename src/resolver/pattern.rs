//! `GOPRIVATE`-style prefix patterns.
//!
//! A pattern list is comma-separated. Each glob matches when it covers a
//! whole-segment prefix of the module path; `*` and `?` wildcards match
//! within a single segment only.

#[derive(Debug, Clone, Default)]
pub struct PrefixPatterns {
    patterns: Vec<String>,
}

impl PrefixPatterns {
    pub fn new(globs: &str) -> Self {
        Self {
            patterns: globs
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether any pattern matches a whole-segment prefix of `target`.
    pub fn matches(&self, target: &str) -> bool {
        self.patterns.iter().any(|p| prefix_match(p, target))
    }
}

fn prefix_match(pattern: &str, target: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let target_segments: Vec<&str> = target.split('/').collect();
    if pattern_segments.len() > target_segments.len() {
        return false;
    }
    pattern_segments
        .iter()
        .zip(&target_segments)
        .all(|(p, t)| segment_match(p, t))
}

/// Glob match over one path segment with single-star backtracking.
fn segment_match(pattern: &str, segment: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let segment: Vec<char> = segment.chars().collect();

    let (mut pi, mut si) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while si < segment.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == segment[si]) {
            pi += 1;
            si += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star = Some((pi, si));
            pi += 1;
        } else if let Some((star_pi, star_si)) = star {
            pi = star_pi + 1;
            si = star_si + 1;
            star = Some((star_pi, star_si + 1));
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }
    pi == pattern.len()
}
