//! PathModel (§4.3, §6): parses one input path line into an ordered chain
//! of callee segments followed by a caller segment, collapsing consecutive
//! duplicate callees (loop normalization) and computing the follower-edge
//! chain used by the per-program aggregator's vote statistics.

use crate::error::{ErrorContext, RetSpecError, Result};
use crate::range::Count;
use crate::value::Value;
use smol_str::SmolStr;

const LINE_PREFIX: &str = "AutoEPEx: ";
const NEW_FILE_MARKER: &str = "NEW FILE";
const SEGMENT_DELIM: char = '@';
const EXIT_SUFFIX: char = '$';
const COUNT_DELIM: char = '#';
const LOC_DELIM: char = ';';

/// A parsed `func<SP>loc` pair shared by callee and caller segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub function: SmolStr,
    pub location: SmolStr,
}

impl Location {
    /// `file:func`, used as the caller's dedup/grouping key (§4.3).
    pub fn general_location(&self) -> String {
        let file = self.location.split(':').next().unwrap_or(&self.location);
        format!("{file}:{}", self.function)
    }

    fn key(&self) -> String {
        format!("{} {}", self.function, self.location)
    }
}

/// One callee hop in a call path, before loop-collapse.
#[derive(Clone, Debug)]
pub struct CalleeSegment {
    pub location: Location,
    pub value: Value,
    /// Number of paths this segment (as observed) accounts for.
    pub count: u64,
}

impl CalleeSegment {
    fn value_str_key(&self) -> String {
        // Two segments are "the same" for loop-collapse purposes when they
        // share function, location, and the textual shape of the value,
        // approximated here by its type tag, symbol, and bin key.
        format!(
            "{:?}|{:?}|{:?}",
            self.value.type_tag(),
            self.value.symbol().map(|s| s.as_str()),
            self.value.bin_key()
        )
    }

    fn same_segment(&self, other: &CalleeSegment) -> bool {
        self.location == other.location && self.value_str_key() == other.value_str_key()
    }
}

/// A follower edge links a callee segment to the next one (or to the
/// caller, for the last callee), carrying the cumulative path count of
/// everything from this point to the end of the chain.
#[derive(Clone, Debug)]
pub struct FollowerEdge {
    pub segment: CalleeSegment,
    pub count: u64,
}

/// The caller's own segment: its location plus its observed return value
/// and whether this path constitutes an error-exit.
#[derive(Clone, Debug)]
pub struct CallerSegment {
    pub location: Location,
    pub value: Value,
    pub is_error_exit: bool,
}

/// One parsed, loop-collapsed call path.
#[derive(Clone, Debug)]
pub struct CallPath {
    /// Collapsed callee chain with cumulative follower counts, outermost
    /// (closest to the caller) first.
    pub followers: Vec<FollowerEdge>,
    pub caller: CallerSegment,
    pub is_exit: bool,
    /// First callee's cumulative follower count if there's more than one
    /// callee, else 0 (matches the upstream tool's `length` field).
    pub length: u64,
}

impl CallPath {
    /// Parses one stripped (prefix already removed) path line.
    pub fn parse(line: &str) -> Result<CallPath> {
        let (body, is_exit) = match line.strip_suffix(EXIT_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (line, false),
        };

        let parts: Vec<&str> = body.split(SEGMENT_DELIM).collect();
        let (callee_parts, caller_part) = parts
            .split_last()
            .ok_or_else(|| RetSpecError::Parse {
                message: "empty path line".to_string(),
                context: vec![line.to_string()],
            })?;
        let caller_part = *caller_part;

        let mut pre_callees = Vec::with_capacity(callee_parts.len());
        for part in callee_parts {
            pre_callees.push(parse_callee_segment(part, line)?);
        }

        let collapsed = collapse_duplicates(pre_callees);

        let caller = parse_caller_segment(caller_part, line, is_exit)?;

        let followers = build_followers(collapsed);
        let length = if followers.len() > 1 {
            followers[0].count
        } else {
            0
        };

        Ok(CallPath {
            followers,
            caller,
            is_exit,
            length,
        })
    }

    pub fn n_callees(&self) -> usize {
        self.followers.len()
    }

    /// The deduplication key: each callee's `function location;value_str`
    /// joined by `@`, then the caller's key, then the exit suffix.
    pub fn path_key(&self) -> String {
        let mut key = String::new();
        for edge in &self.followers {
            key.push_str(&edge.segment.location.key());
            key.push(LOC_DELIM);
            key.push_str(&edge.segment.value_str_key());
            key.push(SEGMENT_DELIM);
        }
        key.push_str(&self.caller.location.key());
        key.push(LOC_DELIM);
        key.push_str(&format!("{:?}", self.caller.value.bin_key()));
        if self.is_exit {
            key.push(EXIT_SUFFIX);
        }
        key
    }
}

/// Strips the `AutoEPEx: ` prefix and detects the `NEW FILE` marker.
/// Returns `None` for lines that carry neither (to be ignored).
pub enum InputLine<'a> {
    NewFile,
    Path(&'a str),
}

pub fn classify_line(raw: &str) -> Option<InputLine<'_>> {
    let stripped = raw.strip_prefix(LINE_PREFIX)?;
    if stripped == NEW_FILE_MARKER {
        Some(InputLine::NewFile)
    } else {
        Some(InputLine::Path(stripped))
    }
}

fn parse_callee_segment(part: &str, raw_line: &str) -> Result<CalleeSegment> {
    let hash_idx = part.rfind(COUNT_DELIM).ok_or_else(|| RetSpecError::Parse {
        message: format!("callee segment missing count: {part:?}"),
        context: vec![raw_line.to_string()],
    })?;
    let (head, count_str) = (&part[..hash_idx], &part[hash_idx + 1..]);
    let count: u64 = count_str.parse().map_err(|_| RetSpecError::Parse {
        message: format!("malformed callee count {count_str:?}"),
        context: vec![raw_line.to_string()],
    })?;

    let (location, value_str) = split_location(head, raw_line)?;
    let value = Value::parse(value_str, Count::scalar(count))?;

    Ok(CalleeSegment {
        location,
        value,
        count,
    })
}

fn parse_caller_segment(part: &str, raw_line: &str, is_exit: bool) -> Result<CallerSegment> {
    let (location, value_str) = split_location(part, raw_line)?;
    let value = Value::parse(value_str, Count::scalar(1))?;
    let is_error_exit = is_exit && !value.is_exactly(0);

    Ok(CallerSegment {
        location,
        value,
        is_error_exit,
    })
}

/// Splits `func<SP>loc;<value-string>` into its location and value-string
/// halves.
fn split_location<'a>(segment: &'a str, raw_line: &str) -> Result<(Location, &'a str)> {
    let semi_idx = segment.find(LOC_DELIM).ok_or_else(|| RetSpecError::Parse {
        message: format!("segment missing ';' separator: {segment:?}"),
        context: vec![raw_line.to_string()],
    })?;
    let (func_loc, value_str) = (&segment[..semi_idx], &segment[semi_idx + 1..]);

    let space_idx = func_loc.find(' ').ok_or_else(|| RetSpecError::Parse {
        message: format!("segment missing function/location separator: {func_loc:?}"),
        context: vec![raw_line.to_string()],
    })?;
    let (function, location) = (&func_loc[..space_idx], &func_loc[space_idx + 1..]);

    Ok((
        Location {
            function: SmolStr::new(function),
            location: SmolStr::new(location),
        },
        value_str,
    ))
}

/// Collapses consecutive identical (function, location, value-string)
/// segments to one, innermost callee first in the input order.
fn collapse_duplicates(segments: Vec<CalleeSegment>) -> Vec<CalleeSegment> {
    let mut collapsed: Vec<CalleeSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let Some(last) = collapsed.last() {
            if last.same_segment(&segment) {
                continue;
            }
        }
        collapsed.push(segment);
    }
    collapsed
}

/// Reverse-walks the collapsed callee list to build cumulative follower
/// counts: the last callee's count is its own observed count; every
/// earlier callee's count is its own plus its follower's.
fn build_followers(collapsed: Vec<CalleeSegment>) -> Vec<FollowerEdge> {
    let mut edges: Vec<FollowerEdge> = Vec::with_capacity(collapsed.len());
    let mut follower_count: Option<u64> = None;
    for segment in collapsed.into_iter().rev() {
        let count = segment.count + follower_count.unwrap_or(0);
        follower_count = Some(count);
        edges.push(FollowerEdge { segment, count });
    }
    edges.reverse();
    edges
}
