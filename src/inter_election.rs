//! InterProgramElection (§4.8): merges every program's per-function verdict
//! into the final [`ErrorSpec`]. Two independent routes feed the same spec:
//! a normalized value-histogram vote and a per-program cast-vote tally. The
//! normalized route always wins when it produces a valid result.

use crate::aggregator::{CastVote, FoldIndexMap, FunctionKey, FunctionRecord, counts_to_stats};
use crate::config::Tunables;
use crate::range::{Count, RangeList};
use crate::spec::{ErrorSpec, SpecEntry};
use crate::value::BinKey;
use crate::vote::ExtremeVoter;

/// One program's cast vote for a single function, carried with the
/// strength used to decide whether it counts toward the per-program-cast
/// tally (§4.8 step 1-2).
struct CastRecord {
    vote: CastVote,
    strength: f64,
}

/// Accumulates every program's cast vote and normalized histogram for one
/// `(function, return-type)` across the whole run.
#[derive(Default)]
struct FunctionBallot {
    casts: Vec<CastRecord>,
    normalized: Vec<Vec<(BinKey, f64)>>,
    rangify: bool,
}

/// Merges per-program [`FunctionRecord`]s into a final [`ErrorSpec`]
/// (§4.8). Call [`Self::add_program`] once per program after that program's
/// [`crate::aggregator::PerProgramAggregator`] has finished parsing and each
/// of its functions has had `generate_votes` called, then
/// [`Self::finish`] once at the end.
pub struct InterProgramElection {
    tunables: Tunables,
    ballots: FoldIndexMap<FunctionKey, FunctionBallot>,
}

impl InterProgramElection {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            ballots: FoldIndexMap::default(),
        }
    }

    /// Folds in one program's elected `FunctionRecord`s.
    pub fn add_program<'a>(&mut self, functions: impl Iterator<Item = (&'a FunctionKey, &'a FunctionRecord)>) {
        for (key, record) in functions {
            let ballot = self.ballots.entry(key.clone()).or_insert_with(|| FunctionBallot {
                rangify: record.type_tag() == crate::value::INT_TAG,
                ..Default::default()
            });
            ballot.casts.push(CastRecord {
                vote: record.cast_vote(),
                strength: record.total_count(),
            });
            ballot.normalized.push(
                record
                    .branch_stat()
                    .gen_normalized(&Count::scalar(record.total_count() as u64)),
            );
        }
    }

    /// Elects the final spec: normalized route first, per-program cast
    /// route filling in anything the normalized route left unresolved.
    pub fn finish(self) -> ErrorSpec {
        let mut spec = ErrorSpec::new();
        let bin_limit = self.tunables.bin_limit;
        let low_ratio = self.tunables.low_ratio;
        let vote_ratio = self.tunables.vote_ratio;

        for (key, ballot) in &self.ballots {
            if let Some(entry) = normalized_route(ballot, low_ratio, bin_limit) {
                spec.insert_if_absent(key.0.clone(), key.1, entry);
            }
        }
        for (key, ballot) in &self.ballots {
            if let Some(entry) = cast_route(ballot, vote_ratio, bin_limit) {
                spec.insert_if_absent(key.0.clone(), key.1, entry);
            }
        }
        spec
    }
}

/// Sums each program's normalized histogram, then runs one inverted
/// (least-frequent-wins) `ExtremeVoter` over the combined totals.
fn normalized_route(ballot: &FunctionBallot, low_ratio: f64, bin_limit: usize) -> Option<SpecEntry> {
    let mut totals: FoldIndexMap<BinKey, f64> = FoldIndexMap::default();
    for histogram in &ballot.normalized {
        for (key, weight) in histogram {
            *totals.entry(key.clone()).or_insert(0.0) += weight;
        }
    }
    if totals.is_empty() || totals.len() > bin_limit {
        return None;
    }

    let mut voter: ExtremeVoter<BinKey> =
        ExtremeVoter::with_options(true, low_ratio, 1, ballot.rangify, Some(ballot.rangify), ballot.rangify);
    for (key, weight) in &totals {
        voter.tally(key.clone(), *weight);
    }
    let winners = voter.vote()?;
    keys_to_entry(&winners, ballot.rangify)
}

/// Tallies every program's cast vote, weighting by `share` for programs
/// whose strength clears the percentile-derived threshold (§4.8 step 1-2).
fn cast_route(ballot: &FunctionBallot, vote_ratio: f64, bin_limit: usize) -> Option<SpecEntry> {
    if ballot.casts.is_empty() {
        return None;
    }
    let strengths: Vec<u64> = ballot.casts.iter().map(|c| c.strength as u64).collect();
    let threshold = counts_to_stats(&strengths)
        .map(|(_, lower, _, _)| lower.max(2))
        .unwrap_or(2);

    let mut key_shares: FoldIndexMap<BinKey, f64> = FoldIndexMap::default();
    let mut range_total = RangeList::empty(ballot.rangify);
    let mut infallible_share = 0.0_f64;

    for cast in &ballot.casts {
        if (cast.strength as u64) < threshold {
            continue;
        }
        match &cast.vote {
            CastVote::Infallible => infallible_share += 1.0,
            CastVote::Range(ranges) => range_total.add(ranges),
            CastVote::Keys(keys) => {
                if keys.is_empty() {
                    continue;
                }
                let share = 1.0 / keys.len() as f64;
                for key in keys {
                    *key_shares.entry(key.clone()).or_insert(0.0) += share;
                }
            }
        }
    }

    if ballot.rangify {
        if range_total.is_empty() {
            return if infallible_share > 0.0 {
                Some(SpecEntry::Infallible)
            } else {
                None
            };
        }
        if range_total.ranges().len() > bin_limit {
            return Some(SpecEntry::Infallible);
        }
        let smoothed = crate::range::smoothen(&range_total);
        return Some(SpecEntry::from_ranges(smoothed));
    }

    if key_shares.is_empty() {
        return if infallible_share > 0.0 {
            Some(SpecEntry::Infallible)
        } else {
            None
        };
    }
    if key_shares.len() > bin_limit {
        return Some(SpecEntry::Infallible);
    }

    let top_share = key_shares.values().cloned().fold(f64::MIN, f64::max);
    if infallible_share > top_share {
        return Some(SpecEntry::Infallible);
    }

    let mut voter: ExtremeVoter<BinKey> = ExtremeVoter::with_options(false, vote_ratio, 1, false, Some(false), false);
    for (key, share) in &key_shares {
        voter.tally(key.clone(), *share);
    }
    match voter.vote() {
        Some(winners) => keys_to_entry(&winners, false),
        None => Some(SpecEntry::Infallible),
    }
}

fn keys_to_entry(winners: &[BinKey], rangify: bool) -> Option<SpecEntry> {
    if rangify {
        let mut combined = RangeList::empty(false);
        for key in winners {
            if let BinKey::IntRange(node) = key {
                combined.add(&RangeList::single(node.clone(), false));
            }
        }
        if combined.is_empty() {
            return None;
        }
        Some(SpecEntry::from_ranges(crate::range::smoothen(&combined)))
    } else {
        winners.first().and_then(SpecEntry::from_bin_key)
    }
}
