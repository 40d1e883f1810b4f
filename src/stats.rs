//! ValueStats: per-type histograms of weighted return-value observations.
//! A [`ValueStats`] is both the branch histogram a [`crate::aggregator`]
//! `FunctionRecord` accumulates per call site and, divided by a base count
//! via [`ValueStats::gen_normalized`], the per-function summary the
//! inter-program normalized route (§4.8) compares across programs.

use crate::range::{Count, RangeList, RangeNode};
use crate::value::{BinKey, BoolValue, PtrValue, Value};

/// Whether a spec's range exactly matches an observed constraint, the spec
/// covers a wider span than observed, or the spec misses part of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coverage {
    Exact,
    Under,
    Over,
}

fn zero_count(as_list: bool) -> Count {
    if as_list {
        Count::contributors(std::iter::empty())
    } else {
        Count::scalar(0)
    }
}

#[derive(Clone, Debug)]
pub struct BoolStat {
    as_list: bool,
    true_count: Count,
    false_count: Count,
    unknown_count: Count,
}

impl BoolStat {
    pub fn new(as_list: bool) -> Self {
        Self {
            as_list,
            true_count: zero_count(as_list),
            false_count: zero_count(as_list),
            unknown_count: zero_count(as_list),
        }
    }

    fn update(&mut self, value: BoolValue, weight: Count) {
        match value {
            BoolValue::True => self.true_count.add_assign(&weight),
            BoolValue::False => self.false_count.add_assign(&weight),
            BoolValue::Unknown => self.unknown_count.add_assign(&weight),
        }
    }

    pub fn has_unknown(&self) -> bool {
        !self.unknown_count.is_zero()
    }

    pub fn covers(&self, key: BoolValue) -> (Coverage, Option<String>) {
        if self.has_unknown() {
            if key == BoolValue::Unknown {
                (Coverage::Exact, None)
            } else {
                (Coverage::Over, Some("u".to_string()))
            }
        } else if key == BoolValue::Unknown {
            (Coverage::Under, Some("u".to_string()))
        } else {
            (Coverage::Exact, None)
        }
    }
}

#[derive(Clone, Debug)]
pub struct PtrStat {
    as_list: bool,
    not_null_count: Count,
    null_count: Count,
    unknown_count: Count,
}

impl PtrStat {
    pub fn new(as_list: bool) -> Self {
        Self {
            as_list,
            not_null_count: zero_count(as_list),
            null_count: zero_count(as_list),
            unknown_count: zero_count(as_list),
        }
    }

    fn update(&mut self, value: PtrValue, weight: Count) {
        match value {
            PtrValue::NotNull => self.not_null_count.add_assign(&weight),
            PtrValue::Null => self.null_count.add_assign(&weight),
            PtrValue::Unknown => self.unknown_count.add_assign(&weight),
        }
    }

    pub fn has_unknown(&self) -> bool {
        !self.unknown_count.is_zero()
    }

    pub fn covers(&self, key: PtrValue) -> (Coverage, Option<String>) {
        if self.has_unknown() {
            if key == PtrValue::Unknown {
                (Coverage::Exact, None)
            } else {
                (Coverage::Over, Some("u".to_string()))
            }
        } else if key == PtrValue::Unknown {
            (Coverage::Under, Some("u".to_string()))
        } else {
            (Coverage::Exact, None)
        }
    }
}

#[derive(Clone, Debug)]
pub struct IntStat {
    ranges: RangeList,
}

impl IntStat {
    pub fn new(as_list: bool) -> Self {
        Self {
            ranges: RangeList::empty(as_list),
        }
    }

    fn update(&mut self, ranges: Option<&RangeList>, weight: Count) {
        match ranges {
            None => self.ranges.increment(weight),
            Some(observed) => {
                let mut incoming = observed.clone_top(weight);
                incoming.flatten();
                if incoming.ranges().is_empty() {
                    self.ranges.increment(incoming.rest());
                } else {
                    self.ranges.add(&incoming);
                }
            }
        }
    }

    pub fn ranges(&self) -> &RangeList {
        &self.ranges
    }

    pub fn has_unknown(&self) -> bool {
        self.ranges.has_rest()
    }

    /// `key = None` queries the unconstrained bucket.
    pub fn covers(&self, key: Option<&RangeNode>) -> (Coverage, Option<String>) {
        if self.ranges.has_rest() {
            return if key.is_none() {
                (Coverage::Exact, None)
            } else {
                (Coverage::Over, Some("u".to_string()))
            };
        }
        let key = match key {
            None => return (Coverage::Under, Some("u".to_string())),
            Some(k) => k,
        };

        let coverers = self.ranges.get_coverers(Some(key));
        if coverers.is_empty() {
            return (Coverage::Under, Some(key.short_str()));
        }

        let beginning = coverers[0].least;
        if beginning < key.least {
            return (Coverage::Over, Some(coverers[0].short_str()));
        }
        if beginning > key.least {
            let missing = RangeNode::new(key.least, beginning - 1, Count::scalar(0));
            return (Coverage::Under, Some(missing.short_str()));
        }

        let end = coverers.last().unwrap().most;
        if end > key.most {
            return (Coverage::Over, Some(coverers.last().unwrap().short_str()));
        }
        if end < key.most {
            let missing = RangeNode::new(end + 1, key.most, Count::scalar(0));
            return (Coverage::Under, Some(missing.short_str()));
        }

        let mut last_end = key.least;
        for coverer in &coverers {
            let pre_gap = coverer.least - 1;
            if last_end < pre_gap {
                let missing = RangeNode::new(last_end, pre_gap, Count::scalar(0));
                return (Coverage::Under, Some(missing.short_str()));
            }
            last_end = coverer.most + 1;
        }
        (Coverage::Exact, None)
    }
}

/// Per-type histogram of weighted return-value observations, keyed by
/// [`BinKey`].
#[derive(Clone, Debug)]
pub enum ValueStats {
    Bool(BoolStat),
    Pointer(PtrStat),
    Integer(IntStat),
}

impl ValueStats {
    pub fn new_bool(as_list: bool) -> Self {
        ValueStats::Bool(BoolStat::new(as_list))
    }

    pub fn new_pointer(as_list: bool) -> Self {
        ValueStats::Pointer(PtrStat::new(as_list))
    }

    pub fn new_integer(as_list: bool) -> Self {
        ValueStats::Integer(IntStat::new(as_list))
    }

    pub fn for_type_tag(tag: char, as_list: bool) -> Option<Self> {
        match tag {
            crate::value::BOOL_TAG => Some(Self::new_bool(as_list)),
            crate::value::PTR_TAG => Some(Self::new_pointer(as_list)),
            crate::value::INT_TAG => Some(Self::new_integer(as_list)),
            _ => None,
        }
    }

    /// Fold one observation into the histogram. Panics if `value`'s type
    /// tag does not match this histogram. Callers are expected to route
    /// observations to the right `FunctionRecord` before calling this.
    pub fn update(&mut self, value: &Value, weight: Count) {
        match (self, value) {
            (ValueStats::Bool(stat), Value::Bool { value, .. }) => stat.update(*value, weight),
            (ValueStats::Pointer(stat), Value::Pointer { value, .. }) => stat.update(*value, weight),
            (ValueStats::Integer(stat), Value::Integer { ranges, .. }) => {
                stat.update(ranges.as_ref(), weight)
            }
            _ => panic!("ValueStats::update called with mismatched value type"),
        }
    }

    pub fn has_unknown(&self) -> bool {
        match self {
            ValueStats::Bool(s) => s.has_unknown(),
            ValueStats::Pointer(s) => s.has_unknown(),
            ValueStats::Integer(s) => s.has_unknown(),
        }
    }

    /// All observed bins, including the unknown/unconstrained bucket.
    pub fn entries(&self) -> Vec<(BinKey, Count)> {
        match self {
            ValueStats::Bool(stat) => [
                (BinKey::Bool(BoolValue::True), stat.true_count.clone()),
                (BinKey::Bool(BoolValue::False), stat.false_count.clone()),
                (BinKey::Bool(BoolValue::Unknown), stat.unknown_count.clone()),
            ]
            .into_iter()
            .filter(|(_, c)| !c.is_zero())
            .collect(),
            ValueStats::Pointer(stat) => [
                (BinKey::Pointer(PtrValue::NotNull), stat.not_null_count.clone()),
                (BinKey::Pointer(PtrValue::Null), stat.null_count.clone()),
                (BinKey::Pointer(PtrValue::Unknown), stat.unknown_count.clone()),
            ]
            .into_iter()
            .filter(|(_, c)| !c.is_zero())
            .collect(),
            ValueStats::Integer(stat) => {
                let mut entries: Vec<_> = stat
                    .ranges
                    .ranges()
                    .iter()
                    .map(|n| (BinKey::IntRange(n.clone()), n.count()))
                    .collect();
                if stat.ranges.has_rest() {
                    entries.push((BinKey::IntUnconstrained, stat.ranges.rest()));
                }
                entries
            }
        }
    }

    /// Observed bins excluding the unknown/unconstrained bucket, the set
    /// of candidates the per-program election tallies over (§4.7 excludes
    /// the unconstrained bin from voting entirely).
    pub fn votable_entries(&self) -> Vec<(BinKey, Count)> {
        self.entries()
            .into_iter()
            .filter(|(key, _)| {
                !matches!(
                    key,
                    BinKey::Bool(BoolValue::Unknown)
                        | BinKey::Pointer(PtrValue::Unknown)
                        | BinKey::IntUnconstrained
                )
            })
            .collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.entries().iter().map(|(_, c)| c.weight()).sum()
    }

    /// Per-key observation share, dividing every bin's weight by `base`'s
    /// weight (or its contributor count in list mode). Used by the
    /// inter-program normalized route (§4.8) to compare histograms across
    /// programs on equal footing.
    pub fn gen_normalized(&self, base: &Count) -> Vec<(BinKey, f64)> {
        let base_weight = base.weight();
        self.entries()
            .into_iter()
            .map(|(key, count)| {
                let ratio = if base_weight == 0.0 {
                    0.0
                } else {
                    count.weight() / base_weight
                };
                (key, ratio)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::BinKey;

    #[test]
    fn bool_stat_tracks_counts() {
        let mut stats = ValueStats::new_bool(false);
        stats.update(
            &Value::Bool {
                value: BoolValue::True,
                symbol: None,
                weight: Count::scalar(1),
            },
            Count::scalar(1),
        );
        stats.update(
            &Value::Bool {
                value: BoolValue::True,
                symbol: None,
                weight: Count::scalar(1),
            },
            Count::scalar(1),
        );
        let entries = stats.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, BinKey::Bool(BoolValue::True));
        assert_eq!(entries[0].1.weight(), 2.0);
    }

    #[test]
    fn bool_stat_excludes_unknown_from_votable() {
        let mut stats = ValueStats::new_bool(false);
        stats.update(
            &Value::Bool {
                value: BoolValue::Unknown,
                symbol: None,
                weight: Count::scalar(1),
            },
            Count::scalar(3),
        );
        assert_eq!(stats.entries().len(), 1);
        assert!(stats.votable_entries().is_empty());
    }

    #[test]
    fn bool_covers_exact_when_no_unknown() {
        let stats = BoolStat::new(false);
        assert_eq!(stats.covers(BoolValue::True).0, Coverage::Exact);
    }

    #[test]
    fn bool_covers_under_when_spec_only_has_unknown_bucket_missing() {
        let mut stat = BoolStat::new(false);
        stat.update(BoolValue::Unknown, Count::scalar(1));
        assert_eq!(stat.covers(BoolValue::True).0, Coverage::Over);
    }

    #[test]
    fn pointer_stat_tracks_counts() {
        let mut stats = ValueStats::new_pointer(false);
        stats.update(
            &Value::Pointer {
                value: PtrValue::Null,
                symbol: None,
                weight: Count::scalar(1),
            },
            Count::scalar(1),
        );
        assert_eq!(stats.entries(), vec![(BinKey::Pointer(PtrValue::Null), Count::scalar(1))]);
    }

    #[test]
    fn integer_stat_bins_literal_values() {
        let mut stats = ValueStats::new_integer(false);
        let five = Value::Integer {
            ranges: Some(RangeList::single(RangeNode::point(5, Count::scalar(1)), false)),
            symbol: None,
            weight: Count::scalar(1),
        };
        stats.update(&five, Count::scalar(1));
        let entries = stats.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.label(), "5_5");
    }

    #[test]
    fn integer_stat_tracks_unconstrained_as_rest() {
        let mut stats = ValueStats::new_integer(false);
        stats.update(
            &Value::Integer {
                ranges: None,
                symbol: None,
                weight: Count::scalar(1),
            },
            Count::scalar(2),
        );
        assert!(stats.has_unknown());
        let entries = stats.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, BinKey::IntUnconstrained);
    }

    #[test]
    fn integer_covers_exact_for_matching_bound() {
        let mut stat = IntStat::new(false);
        stat.update(
            Some(&RangeList::single(RangeNode::new(0, 10, Count::scalar(1)), false)),
            Count::scalar(1),
        );
        let key = RangeNode::new(0, 10, Count::scalar(1));
        assert_eq!(stat.covers(Some(&key)).0, Coverage::Exact);
    }

    #[test]
    fn integer_covers_under_for_missing_range() {
        let stat = IntStat::new(false);
        let key = RangeNode::new(0, 10, Count::scalar(1));
        assert_eq!(stat.covers(Some(&key)).0, Coverage::Under);
    }

    #[test]
    fn integer_covers_over_when_coverer_wider() {
        let mut stat = IntStat::new(false);
        stat.update(
            Some(&RangeList::single(RangeNode::new(0, 100, Count::scalar(1)), false)),
            Count::scalar(1),
        );
        let key = RangeNode::new(0, 10, Count::scalar(1));
        assert_eq!(stat.covers(Some(&key)).0, Coverage::Over);
    }

    #[test]
    fn gen_normalized_divides_by_base() {
        let mut stats = ValueStats::new_bool(false);
        stats.update(
            &Value::Bool {
                value: BoolValue::True,
                symbol: None,
                weight: Count::scalar(1),
            },
            Count::scalar(4),
        );
        let normalized = stats.gen_normalized(&Count::scalar(8));
        assert_eq!(normalized[0].1, 0.5);
    }
}
