use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use quiver_types::Candidate;

/// Match-quality scorer using nucleo, with an explicit exact/prefix
/// bonus so literal name matches always outrank scattered fuzzy hits.
pub struct SearchEngine {
    matcher: Matcher,
}

impl SearchEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
        }
    }

    /// Score how well `query_lower` matches `low_name`.
    /// Returns `None` when the name does not match at all.
    ///
    /// Fuzzy subsequence matches carry the full nucleo score plus the
    /// name bonus. A name that only shares a leading run with the
    /// query ("fire" against "filezilla") still matches, scored well
    /// below any subsequence hit so it ranks after them.
    pub fn match_quality(&mut self, query_lower: &str, low_name: &str) -> Option<f64> {
        if query_lower.is_empty() {
            return None;
        }

        let pattern = Pattern::new(
            query_lower,
            CaseMatching::Smart,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );

        let mut buf = Vec::new();
        let haystack = Utf32Str::new(low_name, &mut buf);
        if let Some(fuzzy) = pattern.score(haystack, &mut self.matcher) {
            return Some(f64::from(fuzzy) + Self::name_match_bonus(query_lower, low_name));
        }

        Self::leading_run_quality(query_lower, low_name)
    }

    /// Fallback for names the fuzzy matcher rejects: score the run of
    /// leading characters the name shares with the query, scaled by
    /// query coverage and capped at 100 so it never outranks a real
    /// subsequence match.
    // Char counts are tiny, f64 represents them exactly
    #[allow(clippy::cast_precision_loss)]
    fn leading_run_quality(query_lower: &str, low_name: &str) -> Option<f64> {
        let overlap = query_lower
            .chars()
            .zip(low_name.chars())
            .take_while(|(q, n)| q == n)
            .count();
        if overlap == 0 {
            return None;
        }
        Some(overlap as f64 / query_lower.chars().count().max(1) as f64 * 100.0)
    }

    /// Calculate name match bonus based on how well query matches name:
    /// - Exact match: +500
    /// - Prefix match: +250 to +499 based on coverage (query.len / name.len)
    /// - Non-prefix: 0
    ///
    /// This is what puts "Firefox" above "FileZilla" for query "fire".
    // String lengths are usize, coverage ratio uses f64 for precision
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn name_match_bonus(query: &str, name: &str) -> f64 {
        let query_lower = query.to_lowercase();
        let name_lower = name.to_lowercase();

        if query_lower == name_lower {
            return 500.0;
        }

        if name_lower.starts_with(&query_lower) {
            let coverage = query.len() as f64 / name.len() as f64;
            return 250.0 + (coverage * 250.0);
        }

        0.0
    }

    /// Stable-sort candidates by match quality (descending), then
    /// usage count (descending). Equal-ranked candidates keep their
    /// original relative order, which makes source order the final
    /// tie-break key. Candidates the query does not match at all stay
    /// in the list with quality zero; dropping them is the catalog's
    /// decision, not the ranker's.
    pub fn rank(&mut self, query_lower: &str, candidates: &mut Vec<Candidate>) {
        if candidates.is_empty() {
            return;
        }

        let mut keyed: Vec<(f64, Candidate)> = candidates
            .drain(..)
            .map(|c| {
                let quality = self.match_quality(query_lower, &c.low_name).unwrap_or(0.0);
                (quality, c)
            })
            .collect();

        keyed.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.1.usage.cmp(&a.1.usage))
        });

        candidates.extend(keyed.into_iter().map(|(_, c)| c));
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}
