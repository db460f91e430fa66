//! Multi-factor file relevance scorer (§4.3).
//!
//! Every factor is normalized to `[0, 1]` before weighting; the final
//! score is the weighted sum, not renormalized. The scorer is a pure
//! function of its inputs and the weight table — no learning, no
//! persistence.

use crate::config::Weights;
use crate::project::files::RawFile;
use crate::types::{FileEntry, Millis, Score};
use std::collections::HashMap;

const RECENT_MODIFICATION_HORIZON_DAYS: i64 = 30;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

const SIZE_OPTIMAL_MIN: u64 = 1_000;
const SIZE_OPTIMAL_MAX: u64 = 50_000;
const SIZE_ACCEPTABLE_MIN: u64 = 100;
const SIZE_ACCEPTABLE_MAX: u64 = 200_000;
const SIZE_HARD_CEILING: u64 = 1_000_000;
const SIZE_OVERSIZED_SCORE: f64 = 0.05;

const GIT_ACTIVITY_COMMIT_CAP: u32 = 5;

/// Extension → weight table for the file-type-priority factor. Unknown
/// extensions score 0 for this factor.
const EXTENSION_WEIGHTS: &[(&str, f64)] = &[
    ("rs", 1.0),
    ("ts", 0.95),
    ("tsx", 0.95),
    ("js", 0.9),
    ("jsx", 0.9),
    ("py", 0.95),
    ("go", 0.95),
    ("java", 0.9),
    ("c", 0.9),
    ("h", 0.85),
    ("cpp", 0.9),
    ("hpp", 0.85),
    ("rb", 0.85),
    ("toml", 0.7),
    ("yaml", 0.65),
    ("yml", 0.65),
    ("json", 0.55),
    ("md", 0.5),
    ("mdx", 0.5),
    ("txt", 0.3),
    ("lock", 0.1),
    ("log", 0.05),
];

/// Directory-name → weight table for the directory-importance factor.
/// Applied to every path segment; the factor value is the max over
/// segments, so a file nested under a high-weight directory inherits it
/// regardless of depth.
const DIRECTORY_WEIGHTS: &[(&str, f64)] = &[
    ("src", 1.0),
    ("lib", 0.9),
    ("crates", 0.9),
    ("app", 0.85),
    ("cmd", 0.8),
    ("internal", 0.75),
    ("pkg", 0.75),
    ("api", 0.75),
    ("config", 0.6),
    ("scripts", 0.5),
    ("docs", 0.4),
    ("examples", 0.35),
    ("test", 0.3),
    ("tests", 0.3),
    ("fixtures", 0.2),
    ("vendor", 0.1),
    ("node_modules", 0.0),
];

/// Per-file git activity signal: presence in the recent-commit set,
/// scaled by commit count within the lookback window.
#[derive(Debug, Clone, Default)]
pub struct GitActivity<'a> {
    pub recent_commit_file_set: &'a [String],
    pub commit_counts: &'a HashMap<String, u32>,
}

/// Scores one file against the weight table, returning a [`Score`] in
/// `[0, 1]`.
#[must_use]
pub fn score_file(file: &RawFile, now: Millis, weights: &Weights, git: &GitActivity<'_>) -> Score {
    let recent = recent_modification_factor(file.modified_at, now);
    let size = file_size_factor(file.size_bytes);
    let file_type = file_type_factor(file.extension.as_deref());
    let directory = directory_factor(&file.relative_path);
    let git_activity = git_activity_factor(&file.relative_path, git);

    let total = recent * weights.recent_modification
        + size * weights.file_size_optimality
        + file_type * weights.file_type_priority
        + directory * weights.directory_importance
        + git_activity * weights.git_activity;

    Score::new(total)
}

fn recent_modification_factor(modified_at: Millis, now: Millis) -> f64 {
    let age_ms = (now.0 - modified_at.0).max(0);

    if age_ms <= HOUR_MS {
        return 1.0;
    }
    if age_ms <= DAY_MS {
        return lerp(age_ms, HOUR_MS, DAY_MS, 1.0, 0.10);
    }
    let week_ms = 7 * DAY_MS;
    if age_ms <= week_ms {
        return lerp(age_ms, DAY_MS, week_ms, 0.10, 0.01);
    }
    let horizon_ms = RECENT_MODIFICATION_HORIZON_DAYS * DAY_MS;
    if age_ms <= horizon_ms {
        return lerp(age_ms, week_ms, horizon_ms, 0.01, 0.0);
    }
    0.0
}

fn lerp(x: i64, x0: i64, x1: i64, y0: f64, y1: f64) -> f64 {
    if x1 <= x0 {
        return y1;
    }
    let t = (x - x0) as f64 / (x1 - x0) as f64;
    y0 + t.clamp(0.0, 1.0) * (y1 - y0)
}

fn file_size_factor(size_bytes: u64) -> f64 {
    if size_bytes > SIZE_HARD_CEILING {
        return SIZE_OVERSIZED_SCORE;
    }
    if (SIZE_OPTIMAL_MIN..=SIZE_OPTIMAL_MAX).contains(&size_bytes) {
        return 1.0;
    }
    if size_bytes < SIZE_OPTIMAL_MIN {
        if size_bytes < SIZE_ACCEPTABLE_MIN {
            return 0.0;
        }
        return lerp_u(size_bytes, SIZE_ACCEPTABLE_MIN, SIZE_OPTIMAL_MIN, 0.0, 1.0);
    }
    // size_bytes > SIZE_OPTIMAL_MAX
    if size_bytes > SIZE_ACCEPTABLE_MAX {
        return lerp_u(size_bytes, SIZE_ACCEPTABLE_MAX, SIZE_HARD_CEILING, 0.1, SIZE_OVERSIZED_SCORE);
    }
    lerp_u(size_bytes, SIZE_OPTIMAL_MAX, SIZE_ACCEPTABLE_MAX, 1.0, 0.1)
}

fn lerp_u(x: u64, x0: u64, x1: u64, y0: f64, y1: f64) -> f64 {
    if x1 <= x0 {
        return y1;
    }
    let t = (x - x0) as f64 / (x1 - x0) as f64;
    y0 + t.clamp(0.0, 1.0) * (y1 - y0)
}

fn file_type_factor(extension: Option<&str>) -> f64 {
    let Some(ext) = extension else { return 0.0 };
    EXTENSION_WEIGHTS
        .iter()
        .find(|(name, _)| *name == ext)
        .map_or(0.0, |(_, weight)| *weight)
}

fn directory_factor(relative_path: &str) -> f64 {
    relative_path
        .split('/')
        .filter_map(|segment| DIRECTORY_WEIGHTS.iter().find(|(name, _)| *name == segment))
        .map(|(_, weight)| *weight)
        .fold(0.0, f64::max)
}

fn git_activity_factor(relative_path: &str, git: &GitActivity<'_>) -> f64 {
    if !git.recent_commit_file_set.iter().any(|p| p == relative_path) {
        return 0.0;
    }
    let count = git.commit_counts.get(relative_path).copied().unwrap_or(1);
    (count.min(GIT_ACTIVITY_COMMIT_CAP) as f64) / (GIT_ACTIVITY_COMMIT_CAP as f64)
}

/// Sorts scored file entries per §4.3's tie-break rule: score descending,
/// then modified time descending, then lexicographic path.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.modified_at.cmp(&a.modified_at))
            .then_with(|| a.relative_path.cmp(&b.relative_path))
    });
}
