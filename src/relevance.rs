//! Additive keyword heuristic scoring how well an article matches the region and query.

/// Stems of the region name; each one found adds [`KEYWORD_WEIGHT`].
pub const REGION_KEYWORDS: [&str; 3] = ["тула", "тульск", "област"];

pub const KEYWORD_WEIGHT: f64 = 0.3;

/// Added once when any comma-separated segment of the query is found verbatim.
pub const QUERY_SEGMENT_WEIGHT: f64 = 0.4;

/// Score `title`/`summary` against the region keywords and `query`, clamped to `[0, 1]`.
///
/// Matching is case-insensitive. Query segments are used as written
/// (no trimming), so `"Тула, Тульская область"` contributes the segments
/// `"тула"` and `" тульская область"`. An empty segment (as in `""` or
/// `"тула,"`) is contained in any text and always matches.
pub fn score(title: &str, summary: &str, query: &str) -> f64 {
    let title = title.to_lowercase();
    let summary = summary.to_lowercase();
    let query = query.to_lowercase();
    let mentions = |needle: &str| title.contains(needle) || summary.contains(needle);

    let mut total = 0.0;
    for keyword in REGION_KEYWORDS {
        if mentions(keyword) {
            total += KEYWORD_WEIGHT;
        }
    }

    if query.split(',').any(mentions) {
        total += QUERY_SEGMENT_WEIGHT;
    }

    total.clamp(0.0, 1.0)
}
