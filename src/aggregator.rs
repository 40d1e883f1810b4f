//! PerProgramAggregator (§4.4) and PerProgramElection (§4.7): groups call
//! sites by `(function, return-type)`, tracks which sites are still
//! ambiguously "wrapped" by their caller, and, once a program's log has
//! been fully read, elects each function's candidate error constraints.

use crate::config::Tunables;
use crate::context::ParseContext;
use crate::error::{RetSpecError, Result};
use crate::path::{CallPath, FollowerEdge, classify_line, InputLine};
use crate::range::{Count, RangeList};
use crate::stats::ValueStats;
use crate::value::{BinKey, Value};
use crate::vote::ExtremeVoter;
use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use std::rc::Rc;

/// Ordered map/set keyed by the codebase's usual fast, non-cryptographic
/// hasher, used wherever iteration order (sorted-by-key output, stable
/// diagnostics) should be deterministic rather than incidental.
pub type FoldIndexMap<K, V> = IndexMap<K, V, foldhash::quality::RandomState>;
pub type FoldIndexSet<K> = IndexSet<K, foldhash::quality::RandomState>;

/// A function/return-type key, shared by the per-program and inter-program
/// election tiers.
pub type FunctionKey = (SmolStr, char);

/// `(n, p5, median, p95)` over a sorted copy of `counts`, matching the
/// upstream tool's integer-index percentile picks exactly (not an
/// interpolated percentile): `lower = counts[n/20]`, `median` averages the
/// two middle elements for even `n`, `upper = counts[n*19/20]`. Used both by
/// `FunctionRecord::generate_votes` (median follow-path length per
/// constraint) and by the inter-program election's strength threshold
/// (§4.8).
pub fn counts_to_stats(counts: &[u64]) -> Option<(usize, u64, f64, u64)> {
    let n = counts.len();
    if n == 0 {
        return None;
    }
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let middle = n / 2;
    let median = if n % 2 == 0 {
        (sorted[middle] as f64 + sorted[middle - 1] as f64) / 2.0
    } else {
        sorted[middle] as f64
    };
    let lower = sorted[n / 20];
    let upper = sorted[n * 19 / 20];
    Some((n, lower, median, upper))
}

/// Per-observation detail kept alongside a `FunctionRecord`'s branch
/// histogram, needed to compute each candidate constraint's exit-count and
/// median follow-path length at `generate_votes` time, data the numeric
/// `ValueStats` histogram alone can't answer.
#[derive(Clone, Copy, Debug)]
struct Observation {
    length: u64,
    is_error_exit: bool,
}

/// A candidate error constraint considered during per-program election
/// (§4.7): its non-exit observation count, median follow-path length, and
/// whether it was ultimately chosen by the threshold-vote route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VotePoint {
    pub count: u64,
    pub length: f64,
    pub chosen_threshold: bool,
}

impl VotePoint {
    fn new(count: u64, length: f64) -> Self {
        Self {
            count,
            length,
            chosen_threshold: false,
        }
    }
}

/// What a `FunctionRecord` casts into the shared inter-program vote bag
/// (§4.7's "casting" step).
#[derive(Clone, Debug)]
pub enum CastVote {
    Infallible,
    Keys(Vec<BinKey>),
    Range(RangeList),
}

/// One `(function, return-type)` bucket within a single program's log
/// (§3's FunctionRecord). Accumulates a branch-value histogram plus enough
/// per-observation detail to run §4.7's two-stage election.
pub struct FunctionRecord {
    name: SmolStr,
    type_tag: char,
    rangify: bool,
    branch_stat: ValueStats,
    bins: FoldIndexMap<BinKey, Vec<Observation>>,
    site_paths: FoldIndexMap<SmolStr, Vec<(FollowerEdge, Rc<CallPath>)>>,
    bin_limit: usize,
    low_ratio: f64,
    high_ratio: f64,
    unknown_count: u64,
    known_count: u64,
    vote_points: Option<Vec<(BinKey, VotePoint)>>,
    exit_votes: Option<Vec<BinKey>>,
    threshold_infallible: bool,
    threshold_votes: Option<Vec<BinKey>>,
}

impl FunctionRecord {
    fn new(name: SmolStr, type_tag: char, tunables: &Tunables) -> Self {
        let rangify = type_tag == crate::value::INT_TAG;
        let branch_stat = ValueStats::for_type_tag(type_tag, false)
            .unwrap_or_else(|| ValueStats::new_integer(false));
        Self {
            name,
            type_tag,
            rangify,
            branch_stat,
            bins: FoldIndexMap::default(),
            site_paths: FoldIndexMap::default(),
            bin_limit: tunables.bin_limit,
            low_ratio: tunables.low_ratio,
            high_ratio: tunables.high_ratio,
            unknown_count: 0,
            known_count: 0,
            vote_points: None,
            exit_votes: None,
            threshold_infallible: false,
            threshold_votes: None,
        }
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn type_tag(&self) -> char {
        self.type_tag
    }

    pub fn branch_stat(&self) -> &ValueStats {
        &self.branch_stat
    }

    pub fn site_paths(&self) -> impl Iterator<Item = (&SmolStr, &[(FollowerEdge, Rc<CallPath>)])> {
        self.site_paths.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn total_count(&self) -> f64 {
        self.branch_stat.total_weight()
    }

    /// Fold in one observed callee segment. `site` is the call-site's
    /// location (the function is already this record's own key, so the
    /// location alone disambiguates sites within it).
    pub fn add(&mut self, edge: &FollowerEdge, path: &Rc<CallPath>) {
        let site = edge.segment.location.location.clone();
        self.site_paths
            .entry(site)
            .or_default()
            .push((edge.clone(), Rc::clone(path)));

        let value = &edge.segment.value;
        self.branch_stat.update(value, value.weight());
        if let Some(key) = bin_key_of(value) {
            self.bins.entry(key).or_default().push(Observation {
                length: edge.count,
                is_error_exit: path.caller.is_error_exit,
            });
        }

        if value.is_unknown() {
            self.unknown_count += 1;
        } else {
            self.known_count += 1;
        }
    }

    /// The disabled-by-default "too many unknown return values" heuristic
    /// (§9). Always `false` unless `Tunables::too_many_unknown_enabled`.
    pub fn too_many_unknown(&self, tunables: &Tunables) -> bool {
        if !tunables.too_many_unknown_enabled {
            return false;
        }
        let mut voter: ExtremeVoter<bool> = ExtremeVoter::new(false, tunables.high_ratio);
        for _ in 0..self.unknown_count {
            voter.tally(true, 1.0);
        }
        for _ in 0..self.known_count {
            voter.tally(false, 1.0);
        }
        matches!(voter.vote(), Some(winners) if winners == vec![true])
    }

    fn check_bins(&self, n_bins: usize) -> bool {
        n_bins > self.bin_limit
    }

    /// Per-program election (§4.7): exit-vote first, threshold-vote as
    /// fallback. Errors if every observed bin was the unknown/unconstrained
    /// bucket (there is nothing to vote over).
    pub fn generate_votes(&mut self) -> Result<()> {
        let mut vote_points = Vec::new();
        let mut most_exit_vote: ExtremeVoter<BinKey> =
            ExtremeVoter::with_options(false, self.high_ratio, 1, self.rangify, Some(self.rangify), self.rangify);
        let mut any_bins = false;

        for (key, observations) in &self.bins {
            if is_unvotable(key) {
                continue;
            }
            any_bins = true;
            let original_count = observations.len() as u64;
            let exit_count = observations.iter().filter(|o| o.is_error_exit).count() as u64;
            let count = original_count - exit_count;
            most_exit_vote.tally(key.clone(), exit_count as f64);
            if original_count > 0 {
                let lengths: Vec<u64> = observations.iter().map(|o| o.length).collect();
                let median = counts_to_stats(&lengths).map(|(_, _, m, _)| m).unwrap_or(0.0);
                vote_points.push((key.clone(), VotePoint::new(count, median)));
            }
        }

        if !any_bins {
            return Err(RetSpecError::Parse {
                message: format!("passed empty vote statistic for {}", self.name),
                context: vec![],
            });
        }

        self.exit_votes = most_exit_vote.vote();
        self.vote_points = Some(vote_points);
        self.tally_threshold();

        if let Some(winners) = self.threshold_votes.clone() {
            if let Some(points) = &mut self.vote_points {
                for point in points.iter_mut() {
                    if winners.contains(&point.0) {
                        point.1.chosen_threshold = true;
                    }
                }
            }
        }
        Ok(())
    }

    fn tally_threshold(&mut self) {
        let vote_points = self.vote_points.clone().unwrap_or_default();
        let mut least_count_vote: ExtremeVoter<BinKey> =
            ExtremeVoter::with_options(true, self.low_ratio, 2, self.rangify, Some(self.rangify), self.rangify);
        let mut shortest_path_vote: ExtremeVoter<BinKey> =
            ExtremeVoter::with_options(true, self.low_ratio, 2, self.rangify, Some(self.rangify), self.rangify);
        let mut bins: FoldIndexSet<String> = FoldIndexSet::default();

        for (key, point) in &vote_points {
            bins.insert(key.label());
            least_count_vote.tally(key.clone(), point.count as f64);
            shortest_path_vote.tally(key.clone(), point.length);
        }

        if self.check_bins(bins.len()) {
            self.threshold_infallible = true;
            return;
        }

        self.threshold_votes = least_count_vote
            .vote()
            .or_else(|| shortest_path_vote.vote());
    }

    /// One-line human summary of this function's per-program vote, for
    /// `--log-level debug` diagnostics (§10.6). Mirrors the upstream tool's
    /// `vote_str()`/`finish()` report text without being parsed back in.
    pub fn vote_summary(&self) -> String {
        match &self.exit_votes {
            Some(winners) if !winners.is_empty() => {
                format!("Votes: F {} {} winner(s), route=exit", self.name, winners.len())
            }
            _ => {
                if self.threshold_infallible {
                    format!("Votes: P {} infallible", self.name)
                } else {
                    match &self.threshold_votes {
                        Some(winners) => format!(
                            "Votes: F {} {} winner(s), route=threshold",
                            self.name,
                            winners.len()
                        ),
                        None => format!("Votes: P {} infallible", self.name),
                    }
                }
            }
        }
    }

    /// Casts this program's verdict for this function into the inter-program
    /// vote bag (§4.7's final paragraph).
    pub fn cast_vote(&self) -> CastVote {
        let (votes, infallible) = match &self.exit_votes {
            Some(winners) => (Some(winners.clone()), false),
            None => (self.threshold_votes.clone(), self.threshold_infallible),
        };

        let Some(votes) = votes.filter(|_| !infallible) else {
            return CastVote::Infallible;
        };

        if self.rangify {
            let mut combined = RangeList::empty(false);
            for key in &votes {
                if let BinKey::IntRange(node) = key {
                    combined.add(&RangeList::single(node.clone(), false));
                }
            }
            CastVote::Range(combined)
        } else {
            CastVote::Keys(votes)
        }
    }
}

fn bin_key_of(value: &Value) -> Option<BinKey> {
    match value.bin_key() {
        Some(key) => Some(key),
        None => value.int_ranges().and_then(|ranges| {
            // A multi-range integer observation has no single whole-value
            // key; each of its flattened nodes is its own candidate bin.
            ranges.ranges().first().map(|n| BinKey::IntRange(n.clone()))
        }),
    }
}

fn is_unvotable(key: &BinKey) -> bool {
    matches!(
        key,
        BinKey::Bool(crate::value::BoolValue::Unknown)
            | BinKey::Pointer(crate::value::PtrValue::Unknown)
            | BinKey::IntUnconstrained
    )
}

/// Groups call sites by `(function, return-type)` across one program's log
/// (§4.4). Tracks wrapped-vs-unwrapped call sites so that a callee value the
/// caller merely returns unchanged (never actually inspected) doesn't pollute
/// the branch histograms.
pub struct PerProgramAggregator {
    tunables: Tunables,
    seen: FoldIndexSet<String>,
    functions: FoldIndexMap<FunctionKey, FunctionRecord>,
    not_wrapped: FoldIndexSet<(SmolStr, SmolStr)>,
    maybe_wrapped: FoldIndexMap<(SmolStr, SmolStr), Vec<(FollowerEdge, Rc<CallPath>)>>,
}

impl PerProgramAggregator {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            seen: FoldIndexSet::default(),
            functions: FoldIndexMap::default(),
            not_wrapped: FoldIndexSet::default(),
            maybe_wrapped: FoldIndexMap::default(),
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = (&FunctionKey, &FunctionRecord)> {
        self.functions.iter()
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = (&FunctionKey, &mut FunctionRecord)> {
        self.functions.iter_mut()
    }

    /// Processes one raw input line (prefix not yet stripped). Lines without
    /// the recognized prefix are ignored. Returns `Ok(true)` if the line was
    /// a path (for the caller's diagnostic line counters), `Ok(false)` if it
    /// was ignored or a reset marker.
    pub fn handle_line(&mut self, raw: &str, ctx: &mut ParseContext) -> Result<bool> {
        match classify_line(raw) {
            None => Ok(false),
            Some(InputLine::NewFile) => {
                self.not_wrapped.clear();
                self.maybe_wrapped.clear();
                Ok(false)
            }
            Some(InputLine::Path(body)) => {
                let path = CallPath::parse(body).map_err(|e| attach_context(e, ctx))?;
                let key = path.path_key();
                if self.seen.contains(&key) {
                    return Ok(true);
                }
                self.seen.insert(key);
                let path = Rc::new(path);
                for edge in path.followers.clone() {
                    self.handle_callee(edge, Rc::clone(&path));
                }
                Ok(true)
            }
        }
    }

    fn handle_callee(&mut self, edge: FollowerEdge, path: Rc<CallPath>) {
        let site_key = (edge.segment.location.function.clone(), edge.segment.location.location.clone());

        let should_add = if self.not_wrapped.contains(&site_key) {
            true
        } else if !path.caller.value.same_assignments(&edge.segment.value) {
            self.not_wrapped.insert(site_key.clone());
            true
        } else {
            false
        };

        if should_add {
            self.flush_unwrapped(&site_key);
            self.add_callee(&edge, &path);
        } else {
            self.maybe_wrapped
                .entry(site_key)
                .or_default()
                .push((edge, path));
        }
    }

    fn flush_unwrapped(&mut self, site_key: &(SmolStr, SmolStr)) {
        if let Some(pending) = self.maybe_wrapped.shift_remove(site_key) {
            for (edge, path) in pending {
                self.add_callee(&edge, &path);
            }
        }
    }

    fn add_callee(&mut self, edge: &FollowerEdge, path: &Rc<CallPath>) {
        let key: FunctionKey = (edge.segment.location.function.clone(), edge.segment.value.type_tag());
        let tunables = self.tunables;
        let record = self
            .functions
            .entry(key.clone())
            .or_insert_with(|| FunctionRecord::new(key.0.clone(), key.1, &tunables));
        record.add(edge, path);
    }
}

fn attach_context(err: RetSpecError, ctx: &ParseContext) -> RetSpecError {
    match err {
        RetSpecError::Parse { message, .. } => RetSpecError::Parse {
            message,
            context: ctx.snapshot(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunables() -> Tunables {
        Tunables::default()
    }

    fn agg() -> PerProgramAggregator {
        PerProgramAggregator::new(tunables())
    }

    #[test]
    fn counts_to_stats_odd_length() {
        let (n, lower, median, upper) = counts_to_stats(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(n, 5);
        assert_eq!(lower, 1);
        assert_eq!(median, 3.0);
        assert_eq!(upper, 5);
    }

    #[test]
    fn counts_to_stats_even_length_averages_middle() {
        let (_, _, median, _) = counts_to_stats(&[1, 2, 3, 4]).unwrap();
        assert_eq!(median, 2.5);
    }

    #[test]
    fn counts_to_stats_empty_is_none() {
        assert!(counts_to_stats(&[]).is_none());
    }

    #[test]
    fn ignores_unprefixed_lines() {
        let mut a = agg();
        let mut ctx = ParseContext::new();
        assert_eq!(a.handle_line("not an autoepex line", &mut ctx).unwrap(), false);
        assert!(a.functions().next().is_none());
    }

    #[test]
    fn new_file_resets_wrapping_state_not_functions() {
        let mut a = agg();
        let mut ctx = ParseContext::new();
        a.handle_line("AutoEPEx: g a.c:10;I5#1@main a.c:20;I0", &mut ctx)
            .unwrap();
        assert_eq!(a.functions().count(), 1);
        a.handle_line("AutoEPEx: NEW FILE", &mut ctx).unwrap();
        assert_eq!(a.functions().count(), 1);
        assert!(a.not_wrapped.is_empty());
    }

    #[test]
    fn dedups_identical_path_lines() {
        let mut a = agg();
        let mut ctx = ParseContext::new();
        let line = "AutoEPEx: g a.c:10;I5#1@main a.c:20;I0";
        a.handle_line(line, &mut ctx).unwrap();
        a.handle_line(line, &mut ctx).unwrap();
        let (_, record) = a.functions().next().unwrap();
        assert_eq!(record.total_count(), 1.0);
    }

    #[test]
    fn unwrapped_observation_is_added_immediately() {
        let mut a = agg();
        let mut ctx = ParseContext::new();
        // Caller's value carries no symbol, callee's does, so `same_assignments`
        // is false and this is immediately classified unwrapped.
        let line = "AutoEPEx: g a.c:10;I&x:=5#1@main a.c:20;I0";
        a.handle_line(line, &mut ctx).unwrap();
        let (_, record) = a.functions().next().unwrap();
        assert_eq!(record.total_count(), 1.0);
    }

    #[test]
    fn wrapped_observation_is_buffered_until_proven_unwrapped() {
        let mut a = agg();
        let mut ctx = ParseContext::new();
        // Both callee and caller carry the same symbol: looks wrapped, so it
        // is buffered and does not yet show up in any FunctionRecord.
        let line = "AutoEPEx: g a.c:10;I&x:=5#1@main a.c:20;I&x:=5";
        a.handle_line(line, &mut ctx).unwrap();
        assert!(a.functions().next().is_none());

        // A second, differently-symboled observation at the same site
        // proves the site unwrapped and flushes both observations in.
        let line2 = "AutoEPEx: g a.c:10;I&x:=5#1@main a.c:20;I&y:=5";
        a.handle_line(line2, &mut ctx).unwrap();
        let (_, record) = a.functions().next().unwrap();
        assert_eq!(record.total_count(), 2.0);
    }

    #[test]
    fn generate_votes_errors_on_empty_statistic() {
        let mut record = FunctionRecord::new(SmolStr::new("g"), crate::value::INT_TAG, &tunables());
        assert!(record.generate_votes().is_err());
    }

    #[test]
    fn generate_votes_picks_exit_winner() {
        let mut a = agg();
        let mut ctx = ParseContext::new();
        a.handle_line("AutoEPEx: g a.c:10;I-1#1@main a.c:20;I-1$", &mut ctx)
            .unwrap();
        a.handle_line("AutoEPEx: g a.c:11;I0#1@main a.c:20;I0", &mut ctx)
            .unwrap();
        let (_, record) = a.functions_mut().next().unwrap();
        record.generate_votes().unwrap();
        assert!(record.exit_votes.is_some());
        assert!(record.vote_summary().contains("route=exit"));
    }

    #[test]
    fn vote_summary_reports_infallible_before_any_election() {
        let mut a = agg();
        let mut ctx = ParseContext::new();
        a.handle_line("AutoEPEx: g a.c:10;I0#1@main a.c:20;I0", &mut ctx)
            .unwrap();
        let (_, record) = a.functions().next().unwrap();
        assert_eq!(record.vote_summary(), "Votes: P g infallible");
    }

    #[test]
    fn cast_vote_is_infallible_when_no_election_won() {
        let mut a = agg();
        let mut ctx = ParseContext::new();
        // Two equally-weighted, never-exiting values: neither the exit
        // vote nor the threshold vote can break the tie, so the program
        // casts an infallible vote for this function.
        a.handle_line("AutoEPEx: g a.c:10;I0#1@main a.c:20;I0", &mut ctx)
            .unwrap();
        a.handle_line("AutoEPEx: g a.c:11;I1#1@main a.c:21;I0", &mut ctx)
            .unwrap();
        let (_, record) = a.functions_mut().next().unwrap();
        record.generate_votes().unwrap();
        assert!(matches!(record.cast_vote(), CastVote::Infallible));
    }

    #[test]
    fn too_many_unknown_disabled_by_default() {
        let record = FunctionRecord::new(SmolStr::new("g"), crate::value::INT_TAG, &tunables());
        assert!(!record.too_many_unknown(&tunables()));
    }
}
