//! Generic threshold-based voters (§4.5/§4.6), used by both the
//! per-program and inter-program election tiers, and by the spec checker's
//! per-function unchecked-suppression decision.

/// Elects the tally/tallies with the extreme (maximum, or minimum when
/// `inverted`) strength, using a leave-one-out mean plus a whole-sample
/// standard-deviation threshold.
#[derive(Clone, Debug)]
pub struct ExtremeVoter<V> {
    inverted: bool,
    threshold_ratio: f64,
    min_votes: usize,
    allow_tie: bool,
    only_threshold: bool,
    rangify: bool,
    tallies: Vec<(V, f64)>,
    total_strength: f64,
    total_strength_square: f64,
    top_strength: Option<f64>,
}

impl<V: Clone> ExtremeVoter<V> {
    pub fn new(inverted: bool, threshold_ratio: f64) -> Self {
        Self::with_options(inverted, threshold_ratio, 1, false, None, false)
    }

    /// `only_threshold` defaults to `rangify` when not given explicitly,
    /// matching the upstream constructor's `only_threshold = None → rangify`.
    pub fn with_options(
        inverted: bool,
        threshold_ratio: f64,
        min_votes: usize,
        allow_tie: bool,
        only_threshold: Option<bool>,
        rangify: bool,
    ) -> Self {
        Self {
            inverted,
            threshold_ratio,
            min_votes,
            allow_tie,
            only_threshold: only_threshold.unwrap_or(rangify),
            rangify,
            tallies: Vec::new(),
            total_strength: 0.0,
            total_strength_square: 0.0,
            top_strength: None,
        }
    }

    pub fn n_distinct_votes(&self) -> usize {
        self.tallies.len()
    }

    pub fn tally(&mut self, vote: V, strength: f64) {
        let used = if self.inverted { -strength } else { strength };
        self.tallies.push((vote, used));
        self.total_strength += used;
        self.total_strength_square += used * used;
        self.top_strength = Some(self.top_strength.map_or(used, |top: f64| top.max(used)));
    }

    /// The winning votes, or `None` if there is no clear winner. Range-mode
    /// combination of winners into a single `RangeList` is the caller's
    /// responsibility (see `crate::aggregator`/`crate::inter_election`).
    /// This just returns the elected keys.
    pub fn vote(&self) -> Option<Vec<V>> {
        let count = self.tallies.len();
        if count < self.min_votes {
            return None;
        }
        if count == 1 {
            return Some(vec![self.tallies[0].0.clone()]);
        }

        let rest_count = (count - 1) as f64;
        let average_strength = self.total_strength / count as f64;
        let mut variance_numerator =
            self.total_strength_square - average_strength * self.total_strength;
        if variance_numerator < 0.0 {
            variance_numerator = 0.0;
        }
        let whole_stdev = (variance_numerator / rest_count).sqrt();

        let allow_multiple = self.allow_tie || self.rangify;
        let top_strength = self.top_strength.unwrap_or(f64::MIN);

        let mut choices = Vec::new();
        for (vote, strength) in &self.tallies {
            // A leave-one-out stdev is computed here but then immediately
            // overwritten with the whole-sample value, so only the
            // whole-sample stdev is ever live.
            let rest_total_strength = self.total_strength - strength;
            let rest_average_strength = rest_total_strength / rest_count;
            let stdev = whole_stdev;

            let threshold = rest_average_strength + self.threshold_ratio * stdev;
            if *strength >= threshold && (self.only_threshold || *strength == top_strength) {
                choices.push(vote.clone());
            }
        }

        let n_choices = choices.len();
        if n_choices == 0 || n_choices == self.tallies.len() || (!allow_multiple && n_choices > 1) {
            return None;
        }

        Some(choices)
    }
}

/// Binary true/false vote with a threshold decided by the variance between
/// the two tallies (§4.6).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolarVoter {
    true_count: u64,
    false_count: u64,
}

impl PolarVoter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, vote: bool) {
        if vote {
            self.true_count += 1;
        } else {
            self.false_count += 1;
        }
    }

    pub fn true_count(&self) -> u64 {
        self.true_count
    }

    pub fn false_count(&self) -> u64 {
        self.false_count
    }

    /// `false` if fewer than `min_true` true votes were cast; `true` if no
    /// false votes were ever cast; otherwise decided by a variance-based
    /// threshold over the two tallies.
    pub fn choose(&self, threshold_ratio: f64, min_true: u64) -> bool {
        if self.true_count < min_true {
            return false;
        }
        if self.false_count == 0 {
            return true;
        }
        let total = (self.true_count + self.false_count) as f64;
        let var_numerator = (self.true_count * self.false_count) as f64;
        let stdev = (var_numerator / (total * (total - 1.0))).sqrt();
        let threshold = self.false_count as f64 + threshold_ratio * stdev;
        self.true_count as f64 > threshold
    }
}

impl std::ops::Add for PolarVoter {
    type Output = PolarVoter;

    fn add(self, other: PolarVoter) -> PolarVoter {
        PolarVoter {
            true_count: self.true_count + other.true_count,
            false_count: self.false_count + other.false_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_voter_returns_none_below_min_votes() {
        let mut voter: ExtremeVoter<usize> = ExtremeVoter::with_options(false, 1.0, 2, false, None, false);
        voter.tally(0, 5.0);
        assert_eq!(voter.vote(), None);
    }

    #[test]
    fn extreme_voter_single_vote_wins_trivially() {
        let mut voter: ExtremeVoter<usize> = ExtremeVoter::new(false, 1.0);
        voter.tally(7, 3.0);
        assert_eq!(voter.vote(), Some(vec![7]));
    }

    #[test]
    fn extreme_voter_picks_clear_maximum() {
        let mut voter: ExtremeVoter<&str> = ExtremeVoter::new(false, 1.0);
        voter.tally("a", 1.0);
        voter.tally("b", 1.0);
        voter.tally("c", 100.0);
        assert_eq!(voter.vote(), Some(vec!["c"]));
    }

    #[test]
    fn extreme_voter_inverted_picks_minimum() {
        let mut voter: ExtremeVoter<&str> = ExtremeVoter::new(true, 1.0);
        voter.tally("a", 100.0);
        voter.tally("b", 100.0);
        voter.tally("c", 1.0);
        assert_eq!(voter.vote(), Some(vec!["c"]));
    }

    #[test]
    fn extreme_voter_rejects_when_all_tied() {
        let mut voter: ExtremeVoter<&str> = ExtremeVoter::new(false, 1.0);
        voter.tally("a", 5.0);
        voter.tally("b", 5.0);
        assert_eq!(voter.vote(), None);
    }

    #[test]
    fn extreme_voter_rejects_multiple_non_tied_winners_without_allow_tie() {
        let mut voter: ExtremeVoter<&str> = ExtremeVoter::new(false, 0.0);
        voter.tally("a", 100.0);
        voter.tally("b", 100.0);
        voter.tally("c", 1.0);
        assert_eq!(voter.vote(), None);
    }

    #[test]
    fn extreme_voter_allows_multiple_winners_with_allow_tie() {
        let mut voter: ExtremeVoter<&str> = ExtremeVoter::with_options(false, 0.0, 1, true, None, false);
        voter.tally("a", 100.0);
        voter.tally("b", 100.0);
        voter.tally("c", 1.0);
        let winners = voter.vote().unwrap();
        assert!(winners.contains(&"a"));
        assert!(winners.contains(&"b"));
        assert!(!winners.contains(&"c"));
    }

    #[test]
    fn polar_voter_rejects_below_min_true() {
        let mut p = PolarVoter::new();
        p.add(true);
        assert!(!p.choose(1.0, 2));
    }

    #[test]
    fn polar_voter_accepts_with_no_false_votes() {
        let mut p = PolarVoter::new();
        p.add(true);
        p.add(true);
        assert!(p.choose(1.0, 2));
    }

    #[test]
    fn polar_voter_threshold_formula() {
        let mut p = PolarVoter::new();
        for _ in 0..10 {
            p.add(true);
        }
        for _ in 0..2 {
            p.add(false);
        }
        // total=12, var=10*2/(12*11)=0.1515.., stdev=0.389, threshold=2+0.389*1.0
        assert!(p.choose(1.0, 0));
    }

    #[test]
    fn polar_voter_add_is_component_wise() {
        let mut a = PolarVoter::new();
        a.add(true);
        let mut b = PolarVoter::new();
        b.add(false);
        b.add(false);
        let sum = a + b;
        assert_eq!(sum.true_count(), 1);
        assert_eq!(sum.false_count(), 2);
    }
}
