//! RangeAlgebra: discrete, weighted integer-interval sets with union, overlap,
//! containment and coverer search. A [`RangeList`] is a union of disjoint
//! intervals (flat [`RangeNode`]s) plus a catch-all `rest` bucket for
//! observations whose integer value was unconstrained.
//!
//! The splice algorithm in [`RangeList::add`] mirrors the interval-tree
//! merge used by the upstream path-sensitive checker this crate's input
//! format comes from: binary search locates the window of existing nodes an
//! incoming range overlaps, that window is rebuilt node-by-node (cutting
//! leading/trailing slivers, merging counts where ranges coincide exactly,
//! and partitioning a node into children when an incoming range only
//! partially covers it), and the gaps between untouched nodes are filled in
//! directly from the incoming range.

use crate::value::BinKey;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub const RANGE_DELIM: &str = "_";
pub const RANGES_DELIM: &str = ",";

/// A semi-ring weight: either a plain observation count, or an opaque list
/// of contributors (e.g. per-program ids), summed by concatenation instead
/// of addition. Scalar is the default; list mode is only used where the
/// aggregator is explicitly asked to track provenance rather than a count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Count {
    Scalar(u64),
    Contributors(SmallVec<[u32; 4]>),
}

impl Count {
    pub fn scalar(n: u64) -> Self {
        Count::Scalar(n)
    }

    pub fn contributors(ids: impl IntoIterator<Item = u32>) -> Self {
        Count::Contributors(ids.into_iter().collect())
    }

    fn zero(as_list: bool) -> Self {
        if as_list {
            Count::Contributors(SmallVec::new())
        } else {
            Count::Scalar(0)
        }
    }

    /// `len` in the semi-ring sense: the scalar value itself, or the number
    /// of contributors.
    pub fn weight(&self) -> f64 {
        match self {
            Count::Scalar(n) => *n as f64,
            Count::Contributors(v) => v.len() as f64,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Count::Scalar(n) => *n == 0,
            Count::Contributors(v) => v.is_empty(),
        }
    }

    pub fn combine(&self, other: &Count) -> Count {
        match (self, other) {
            (Count::Scalar(a), Count::Scalar(b)) => Count::Scalar(a + b),
            (Count::Contributors(a), Count::Contributors(b)) => {
                let mut merged = a.clone();
                merged.extend(b.iter().copied());
                Count::Contributors(merged)
            }
            // Mixed-mode combination should never happen: a RangeList is
            // internally consistent about `as_list`. Fall back to scalar
            // addition of weights rather than panicking on malformed input.
            (a, b) => Count::Scalar(a.weight() as u64 + b.weight() as u64),
        }
    }

    pub fn add_assign(&mut self, addition: &Count) {
        *self = self.combine(addition);
    }
}

/// A closed interval `[least, most]` with a count, possibly partitioned
/// into non-overlapping `children` when a later `add` only partially
/// covered it. A node is "flat" when `children` is `None`.
#[derive(Clone, Debug)]
pub struct RangeNode {
    pub least: i64,
    pub most: i64,
    count: Count,
    children: Option<Vec<RangeNode>>,
}

impl RangeNode {
    pub fn new(least: i64, most: i64, count: Count) -> Self {
        debug_assert!(least <= most, "RangeNode requires least <= most");
        Self {
            least,
            most,
            count,
            children: None,
        }
    }

    pub fn point(value: i64, count: Count) -> Self {
        Self::new(value, value, count)
    }

    pub fn count(&self) -> Count {
        self.count.clone()
    }

    pub fn overlaps(&self, other: &RangeNode) -> bool {
        self.least <= other.most && self.most >= other.least
    }

    pub fn contains(&self, other: &RangeNode) -> bool {
        self.least <= other.least && other.most <= self.most
    }

    fn create_shrinked_bounds(&self, least: i64, most: i64) -> RangeNode {
        let new_least = least.max(self.least);
        let new_most = most.min(self.most);
        RangeNode {
            least: new_least,
            most: new_most,
            count: self.count.clone(),
            children: None,
        }
    }

    /// Self's range, clipped to fit inside `to_fit`'s bounds.
    pub fn create_shrinked(&self, to_fit: &RangeNode) -> RangeNode {
        self.create_shrinked_bounds(to_fit.least, to_fit.most)
    }

    /// The part of `self` strictly below `cutter`, if any remains.
    pub fn cut_above(&self, cutter: &RangeNode) -> Option<RangeNode> {
        let cut = cutter.least - 1;
        let new_most = cut.min(self.most);
        if self.least > new_most {
            None
        } else {
            Some(RangeNode::new(self.least, new_most, self.count.clone()))
        }
    }

    /// The part of `self` strictly above `cutter`, if any remains.
    pub fn cut_below(&self, cutter: &RangeNode) -> Option<RangeNode> {
        let cut = cutter.most + 1;
        let new_least = cut.max(self.least);
        if new_least > self.most {
            None
        } else {
            Some(RangeNode::new(new_least, self.most, self.count.clone()))
        }
    }

    /// The part of `self` strictly between two neighboring nodes.
    pub fn cut_between(&self, low_cutter: &RangeNode, high_cutter: &RangeNode) -> Option<RangeNode> {
        let lowest = low_cutter.most + 1;
        let highest = high_cutter.least - 1;
        if lowest > highest {
            return None;
        }
        let shrunk = self.create_shrinked_bounds(lowest, highest);
        if shrunk.least > shrunk.most {
            None
        } else {
            Some(shrunk)
        }
    }

    /// A copy of this node's bounds with a fresh count and no children.
    pub fn clone_top(&self, value: Count) -> RangeNode {
        RangeNode::new(self.least, self.most, value)
    }

    /// Recursively expand children into a flat, childless sequence.
    pub fn flatten(&self) -> Vec<RangeNode> {
        match &self.children {
            None => vec![self.clone_flat_self()],
            Some(children) => children.iter().flat_map(|c| c.flatten()).collect(),
        }
    }

    fn clone_flat_self(&self) -> RangeNode {
        RangeNode {
            least: self.least,
            most: self.most,
            count: self.count.clone(),
            children: None,
        }
    }

    /// Add `new` (already assumed overlapping `self`) into this node,
    /// clipping it to `self`'s bounds first. Mirrors the upstream
    /// `RangeNode.add`/`_add` pair: an exact-bounds match just merges the
    /// count; a partial match partitions this node into children.
    pub fn add(&mut self, new: &RangeNode) {
        let shrunk = new.create_shrinked(self);
        if shrunk.least <= shrunk.most {
            self.add_exact(&shrunk);
        }
    }

    fn add_exact(&mut self, new: &RangeNode) {
        let combo_count = self.count.combine(&new.count);
        if self.children.is_none() {
            if self.least < new.least {
                let old_less = self.cut_above(new);
                let new_combo = RangeNode::new(new.least, new.most, combo_count);
                if self.most > new.most {
                    let old_more = self.cut_below(new);
                    self.children = Some(
                        [old_less, Some(new_combo), old_more]
                            .into_iter()
                            .flatten()
                            .collect(),
                    );
                } else {
                    self.children = Some([old_less, Some(new_combo)].into_iter().flatten().collect());
                }
            } else if self.most > new.most {
                let new_combo = RangeNode::new(new.least, new.most, combo_count);
                let old_more = self.cut_below(new);
                self.children = Some([Some(new_combo), old_more].into_iter().flatten().collect());
            } else {
                self.count = combo_count;
            }
        } else if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.overlaps(new) {
                    let shrunk_for_child = new.create_shrinked(child);
                    child.add(&shrunk_for_child);
                }
            }
        }
    }

    pub fn increment(&mut self, addition: &Count) {
        match &mut self.children {
            None => self.count.add_assign(addition),
            Some(children) => {
                for child in children.iter_mut() {
                    child.increment(addition);
                }
            }
        }
    }

    pub fn short_str(&self) -> String {
        format!("{}{RANGE_DELIM}{}", self.least, self.most)
    }
}

/// A CoverRange marker: just the bounds of a node, used by [`RangeBinder`]
/// to track the outer covering range for coverage reporting without
/// duplicating count data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoverRange {
    pub least: i64,
    pub most: i64,
}

impl CoverRange {
    pub fn new(node: &RangeNode) -> Self {
        Self {
            least: node.least,
            most: node.most,
        }
    }

    pub fn short_str(&self) -> String {
        format!("{}{RANGE_DELIM}{}", self.least, self.most)
    }
}

/// A set of outer covering ranges, used to distinguish "observed span
/// exceeds spec" from "spec misses a sub-range" when checking coverage.
#[derive(Clone, Debug, Default)]
pub struct RangeBinder {
    ranges: indexmap::IndexSet<CoverRange, foldhash::fast::RandomState>,
}

impl RangeBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, node: &RangeNode) {
        self.ranges.insert(CoverRange::new(node));
    }

    pub fn union(&self, other: &RangeBinder) -> RangeBinder {
        let mut combined = self.ranges.clone();
        combined.extend(other.ranges.iter().copied());
        RangeBinder { ranges: combined }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoverRange> {
        self.ranges.iter()
    }
}

/// Ordered sequence of disjoint, weighted integer intervals plus a `rest`
/// bucket for unconstrained observations.
#[derive(Clone, Debug)]
pub struct RangeList {
    as_list: bool,
    ranges: Vec<RangeNode>,
    rest: Count,
}

impl RangeList {
    pub fn empty(as_list: bool) -> Self {
        Self {
            as_list,
            ranges: Vec::new(),
            rest: Count::zero(as_list),
        }
    }

    pub fn single(node: RangeNode, as_list: bool) -> Self {
        Self {
            as_list,
            ranges: node.flatten(),
            rest: Count::zero(as_list),
        }
    }

    /// Build a RangeList from already-flat or nested nodes, validating that
    /// the flattened result is sorted and non-overlapping. Returns an error
    /// describing the offending pair if not. This is the entry point used
    /// when parsing externally supplied integer ranges (§6/§7).
    pub fn try_new(nodes: Vec<RangeNode>, as_list: bool) -> Result<Self, String> {
        let mut ranges = Vec::new();
        for node in nodes {
            if let Some(last) = ranges.last() {
                let last: &RangeNode = last;
                let first_new = node.flatten();
                if let Some(first) = first_new.first()
                    && first.least <= last.most
                {
                    return Err(format!(
                        "overlapping or out-of-order ranges, {} and {}",
                        last.short_str(),
                        first.short_str()
                    ));
                }
                ranges.extend(first_new);
            } else {
                ranges.extend(node.flatten());
            }
        }
        Ok(Self {
            as_list,
            ranges,
            rest: Count::zero(as_list),
        })
    }

    pub fn with_rest(mut self, rest: Count) -> Self {
        self.rest = rest;
        self
    }

    pub fn as_list(&self) -> bool {
        self.as_list
    }

    pub fn rest(&self) -> Count {
        self.rest.clone()
    }

    pub fn has_rest(&self) -> bool {
        !self.rest.is_zero()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && !self.has_rest()
    }

    pub fn ranges(&self) -> &[RangeNode] {
        &self.ranges
    }

    /// Re-expand any nodes holding children into flat siblings. Idempotent.
    pub fn flatten(&mut self) {
        if self.ranges.iter().any(|n| n.children.is_some()) {
            let flat: Vec<RangeNode> = self.ranges.iter().flat_map(|n| n.flatten()).collect();
            self.ranges = flat;
        }
    }

    pub fn clone_flat(&self) -> RangeList {
        let mut clone = self.clone();
        clone.flatten();
        clone
    }

    /// A copy of this list's bounds with every node's count reset to
    /// `value` and no rest.
    pub fn clone_top(&self, value: Count) -> RangeList {
        let ranges = self.ranges.iter().map(|n| n.clone_top(value.clone())).collect();
        RangeList {
            as_list: self.as_list,
            ranges,
            rest: Count::zero(self.as_list),
        }
    }

    /// A shadow RangeList tracking, for every contributing range, the outer
    /// covering node, used by [`crate::stats`] coverage reporting.
    pub fn clone_binder(&self) -> (RangeList, RangeBinder) {
        let mut binder = RangeBinder::new();
        let clone = self.clone_top(Count::scalar(0));
        for node in &clone.ranges {
            binder.append(node);
        }
        (clone, binder)
    }

    fn gen_number(&self, value: &Count) -> f64 {
        value.weight()
    }

    /// Divide every count by `base`'s weight (or the length of `base` when
    /// list-weighted), producing a per-program-normalized ratio per range
    /// plus the `rest` bucket, if any. Mirrors `ValueStats::gen_normalized`'s
    /// float-precise accounting rather than rounding through `Count`.
    pub fn gen_normalized(&self, base: &Count) -> Vec<(BinKey, f64)> {
        let base_number = self.gen_number(base);
        let ratio = |count: &Count| {
            if base_number == 0.0 {
                0.0
            } else {
                count.weight() / base_number
            }
        };
        let mut entries: Vec<(BinKey, f64)> = self
            .ranges
            .iter()
            .map(|node| (BinKey::IntRange(node.clone()), ratio(&node.count)))
            .collect();
        if self.has_rest() {
            entries.push((BinKey::IntUnconstrained, ratio(&self.rest)));
        }
        entries
    }

    fn search_least(&self, least: i64, first: usize) -> usize {
        if self.ranges.is_empty() {
            return 0;
        }
        let last = self.ranges.len() - 1;
        if least > self.ranges[last].most {
            return last + 1;
        }
        let mut lo = first.min(last);
        let mut hi = last;
        loop {
            if lo == hi {
                return lo;
            }
            let mid = (lo + hi + 1) / 2;
            if self.ranges[mid].most >= least {
                if mid == lo || self.ranges[mid - 1].most < least {
                    return mid;
                }
                hi = mid - 1;
            } else {
                lo = mid + 1;
            }
        }
    }

    fn search_most(&self, most: i64, first: usize) -> i64 {
        if self.ranges.is_empty() || first >= self.ranges.len() || most < self.ranges[first].least {
            return first as i64 - 1;
        }
        let last = self.ranges.len() - 1;
        let mut lo = first;
        let mut hi = last;
        loop {
            if lo == hi {
                return lo as i64;
            }
            let mid = (lo + hi + 1) / 2;
            if self.ranges[mid].least <= most {
                if mid == hi || self.ranges[mid + 1].least > most {
                    return mid as i64;
                }
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }
    }

    /// Splice a single incoming node into the list, starting the search no
    /// earlier than index `start`. Returns the new progress cursor.
    fn splice_one(&mut self, new_range: RangeNode, start: usize) -> usize {
        let add_first = self.search_least(new_range.least, start);
        let add_last = self.search_most(new_range.most, start);

        let mut new_ranges: Vec<RangeNode> = Vec::with_capacity(self.ranges.len() + 2);
        new_ranges.extend(self.ranges[..add_first.min(self.ranges.len())].iter().cloned());

        if add_first < self.ranges.len() {
            let mut first = self.ranges[add_first].clone();
            if first.overlaps(&new_range) {
                if let Some(pre_cut) = new_range.cut_above(&first) {
                    new_ranges.push(pre_cut);
                }
                first.add(&new_range);
                new_ranges.push(first);
            } else {
                new_ranges.push(new_range.clone());
                new_ranges.push(first);
            }
        } else {
            new_ranges.push(new_range.clone());
        }

        let mut inter_i = add_first as i64;
        while inter_i < add_last {
            let inter = inter_i as usize;
            let current_range = self.ranges[inter].clone();
            let next_range_orig = self.ranges[inter + 1].clone();
            if let Some(between) = new_range.cut_between(&current_range, &next_range_orig) {
                new_ranges.push(between);
            }
            if inter_i < add_last - 1 {
                let mut next_range = next_range_orig;
                next_range.add(&new_range);
                new_ranges.push(next_range);
            }
            inter_i += 1;
        }

        let mut effective_add_last = add_last;
        if add_last >= 0 && (add_last as usize) < self.ranges.len() {
            let last_idx = add_last as usize;
            let mut last = self.ranges[last_idx].clone();
            if last.overlaps(&new_range) {
                let post_cut = new_range.cut_below(&last);
                if add_last > add_first as i64 {
                    last.add(&new_range);
                    new_ranges.push(last);
                }
                if let Some(post_cut) = post_cut {
                    new_ranges.push(post_cut);
                }
            }
        }

        if effective_add_last == add_first as i64 - 1 {
            effective_add_last = add_first as i64;
        }

        let tail_start = (effective_add_last + 1).max(0) as usize;
        if tail_start < self.ranges.len() {
            new_ranges.extend(self.ranges[tail_start..].iter().cloned());
        }

        self.ranges = new_ranges;
        add_first
    }

    /// Increment the `rest` bucket.
    pub fn increment(&mut self, addition: Count) {
        self.rest = self.rest.combine(&addition);
    }

    /// Union `other` into `self`, summing counts at overlaps.
    ///
    /// Two edge cases short-circuit the splice: an `other` with no concrete
    /// ranges just bumps `rest`; and when `self` has no concrete ranges yet,
    /// `other`'s ranges become `self`'s ranges with the prior `rest` count
    /// distributed as an increment across every one of them (self's `rest`
    /// is otherwise preserved, only gaining `other`'s rest if any).
    pub fn add(&mut self, other: &RangeList) {
        if other.ranges.is_empty() && other.has_rest() {
            self.increment(other.rest.clone());
            return;
        }
        if self.ranges.is_empty() {
            let prior_rest = self.rest.clone();
            let mut incoming = other.clone_flat();
            for node in incoming.ranges.iter_mut() {
                if !prior_rest.is_zero() {
                    node.increment(&prior_rest);
                }
            }
            self.ranges = incoming.ranges;
            if other.has_rest() {
                self.rest = self.rest.combine(&other.rest);
            }
            return;
        }
        let mut start = 0usize;
        let mut flat_other = other.clone_flat();
        flat_other.flatten();
        for new_range in flat_other.ranges {
            start = self.splice_one(new_range, start);
        }
    }

    pub fn contains(&self, node: Option<&RangeNode>) -> bool {
        match node {
            None => self.has_rest(),
            Some(node) => self.ranges.iter().any(|r| r.contains(node)),
        }
    }

    pub fn contains_list(&self, other: &RangeList) -> bool {
        if other.has_rest() && !self.has_rest() {
            return false;
        }
        other.ranges.iter().all(|r| self.contains(Some(r)))
    }

    fn overlaps_single_from(&self, other_range: &RangeNode, start: usize) -> (bool, i64) {
        let new_start = self.search_least(other_range.least, start);
        let new_end = self.search_most(other_range.most, start);
        (new_start as i64 <= new_end, new_end)
    }

    pub fn overlaps_single(&mut self, other_range: &RangeNode) -> bool {
        self.flatten();
        self.overlaps_single_from(other_range, 0).0
    }

    pub fn overlaps(&mut self, other: &mut RangeList) -> bool {
        if self.has_rest() || other.has_rest() {
            return true;
        }
        self.flatten();
        other.flatten();
        let mut current_start = 0usize;
        for other_range in &other.ranges {
            let (result, next_start) = self.overlaps_single_from(other_range, current_start);
            if result {
                return true;
            } else if next_start >= self.ranges.len() as i64 {
                return false;
            } else if next_start < 0 {
                current_start = 0;
            } else {
                current_start = next_start as usize;
            }
        }
        false
    }

    fn find_single_overlaps_from(
        &self,
        other_range: &RangeNode,
        start: usize,
    ) -> (Vec<(RangeNode, (Count, Count))>, i64) {
        let new_start = self.search_least(other_range.least, start);
        let new_end = self.search_most(other_range.most, start);
        let mut overlaps = Vec::new();
        if new_end >= 0 {
            let hi = (new_end as usize + 1).min(self.ranges.len());
            for current_range in &self.ranges[new_start.min(self.ranges.len())..hi] {
                if current_range.overlaps(other_range) {
                    let overlap = current_range.create_shrinked(other_range);
                    overlaps.push((overlap, (current_range.count(), other_range.count())));
                }
            }
        }
        (overlaps, new_end)
    }

    pub fn find_single_overlaps(&mut self, other_range: &RangeNode) -> Vec<(RangeNode, (Count, Count))> {
        self.flatten();
        self.find_single_overlaps_from(other_range, 0).0
    }

    pub fn find_overlaps(&mut self, other: &mut RangeList) -> Vec<(RangeNode, (Count, Count))> {
        self.flatten();
        other.flatten();
        let mut current_start = 0usize;
        let mut overlaps = Vec::new();
        for other_range in &other.ranges {
            let (mut new_overlaps, new_start) = self.find_single_overlaps_from(other_range, current_start);
            current_start = new_start.max(0) as usize;
            overlaps.append(&mut new_overlaps);
        }
        overlaps
    }

    /// The self-nodes overlapping `node`'s interval; empty if none and
    /// `node` falls entirely outside the covered span.
    pub fn get_coverers(&self, node: Option<&RangeNode>) -> Vec<&RangeNode> {
        let node = match node {
            None => return Vec::new(),
            Some(n) => n,
        };
        let least_index = self.search_least(node.least, 0);
        let most_index = self.search_most(node.most, 0);
        if most_index < 0 || most_index as usize >= self.ranges.len() || least_index as i64 > most_index {
            return Vec::new();
        }
        self.ranges[least_index..=most_index as usize].iter().collect()
    }

    pub fn is_exactly(&self, value: i64) -> bool {
        if self.has_rest() || self.ranges.len() != 1 {
            return false;
        }
        let node = &self.ranges[0];
        node.least == value && node.most == value
    }

    pub fn get_exact(&self) -> Option<i64> {
        if self.has_rest() || self.ranges.len() != 1 {
            return None;
        }
        let node = &self.ranges[0];
        if node.least != node.most {
            None
        } else {
            Some(node.least)
        }
    }

    fn includes_single_from(&self, other_range: &RangeNode, start: usize) -> (bool, i64) {
        let new_start = self.search_least(other_range.least, start);
        let new_end = self.search_most(other_range.most, start);
        let mut does_overlap = false;
        if new_end >= 0 {
            let hi = (new_end as usize + 1).min(self.ranges.len());
            for current_range in &self.ranges[new_start.min(self.ranges.len())..hi] {
                if current_range.contains(other_range) {
                    does_overlap = true;
                    break;
                }
            }
        }
        (does_overlap, new_end)
    }

    /// True iff some self-node fully covers some node of `other`.
    pub fn includes(&mut self, other: &mut RangeList) -> bool {
        self.flatten();
        other.flatten();
        let mut current_start = 0usize;
        for single_node in &other.ranges {
            let (does_overlap, next_start) = self.includes_single_from(single_node, current_start);
            if does_overlap {
                return true;
            } else if next_start >= self.ranges.len() as i64 {
                return false;
            } else if next_start < 0 {
                current_start = 0;
            } else {
                current_start = next_start as usize;
            }
        }
        false
    }

    pub fn get_most_known(&self) -> Option<i64> {
        self.ranges.last().map(|n| n.most)
    }

    pub fn get_least_known(&self) -> Option<i64> {
        self.ranges.first().map(|n| n.least)
    }

    pub fn short_str(&self) -> String {
        let node_strs: Vec<String> = self.ranges.iter().map(|n| n.short_str()).collect();
        let joined = node_strs.join(RANGES_DELIM);
        if self.has_rest() {
            format!("Unspecified: {:?} {joined}", self.rest)
        } else {
            joined
        }
    }
}

/// Collapse sequences of flat nodes where consecutive nodes touch
/// (`prev.most == next.least`) into a single wider node with count reset to
/// 1. Runs after inter-program election so the final error ranges read as
/// contiguous spans rather than many one-wide bins.
pub fn generate_smooth(ranges: &[RangeNode]) -> RangeList {
    let mut smoothened: Vec<RangeNode> = Vec::new();
    let mut last: Option<RangeNode> = None;

    for range_node in ranges {
        last = match last {
            None => Some(range_node.clone_top(Count::scalar(1))),
            Some(prev) if prev.most == range_node.least => {
                Some(RangeNode::new(prev.least, range_node.most, Count::scalar(1)))
            }
            Some(prev) => {
                smoothened.push(prev);
                Some(range_node.clone_top(Count::scalar(1)))
            }
        };
    }
    if let Some(last) = last {
        smoothened.push(last);
    }

    RangeList {
        as_list: false,
        ranges: smoothened,
        rest: Count::scalar(0),
    }
}

pub fn smoothen(range_list: &RangeList) -> RangeList {
    generate_smooth(&range_list.ranges)
}
