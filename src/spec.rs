//! ErrorSpec: the persisted mapping from `(function, return-type)` to the
//! value(s) that constitute an error return (§3, §6). Produced by
//! [`crate::inter_election::InterProgramElection`], consumed by
//! [`crate::checker::SpecChecker`].

use crate::error::{ErrorContext, RetSpecError, Result};
use crate::range::{Count, RANGES_DELIM, RangeList, RangeNode};
use crate::value::{BinKey, BoolValue, INT_TAG, PtrValue};
use smol_str::SmolStr;
use std::fmt;
use std::io::{BufRead, Write};

const LINE_PREFIX: &str = "ErrorSpec: ";
const INFALLIBLE_LABEL: &str = "INFALLIBLE";
const NEGATION_PREFIX: &str = "!";
const NON_ERROR_DELIM: &str = ";";

/// One function's error value, or a marker that it never fails.
#[derive(Clone, Debug, PartialEq)]
pub enum SpecEntry {
    Infallible,
    Bool(BoolValue),
    Pointer(PtrValue),
    Integer {
        ranges: RangeList,
        negated: bool,
        non_error: Option<RangeList>,
    },
}

impl SpecEntry {
    /// Builds a non-integer entry directly from an elected [`BinKey`].
    pub fn from_bin_key(key: &BinKey) -> Option<Self> {
        match key {
            BinKey::Bool(b) => Some(Self::Bool(*b)),
            BinKey::Pointer(p) => Some(Self::Pointer(*p)),
            BinKey::IntRange(_) | BinKey::IntUnconstrained => None,
        }
    }

    pub fn from_ranges(ranges: RangeList) -> Self {
        Self::Integer {
            ranges,
            negated: false,
            non_error: None,
        }
    }

    fn value_str(&self) -> String {
        match self {
            SpecEntry::Infallible => INFALLIBLE_LABEL.to_string(),
            SpecEntry::Bool(b) => b.label().to_string(),
            SpecEntry::Pointer(p) => p.label().to_string(),
            SpecEntry::Integer {
                ranges,
                negated,
                non_error,
            } => {
                let mut out = String::new();
                if *negated {
                    out.push_str(NEGATION_PREFIX);
                }
                out.push_str(&ranges_str(ranges));
                if let Some(non_error) = non_error {
                    out.push_str(NON_ERROR_DELIM);
                    out.push_str(&ranges_str(non_error));
                }
                out
            }
        }
    }

    fn parse_value(type_tag: char, raw: &str) -> Result<Self> {
        if raw == INFALLIBLE_LABEL {
            return Ok(Self::Infallible);
        }
        match type_tag {
            crate::value::BOOL_TAG => BoolValue::from_label(raw)
                .map(Self::Bool)
                .ok_or_else(|| spec_format_err(format!("unrecognized bool spec value {raw:?}"))),
            crate::value::PTR_TAG => PtrValue::from_label(raw)
                .map(Self::Pointer)
                .ok_or_else(|| spec_format_err(format!("unrecognized pointer spec value {raw:?}"))),
            INT_TAG => parse_integer_entry(raw),
            other => Err(spec_format_err(format!("unrecognized spec type tag {other:?}"))),
        }
    }
}

fn ranges_str(ranges: &RangeList) -> String {
    ranges
        .ranges()
        .iter()
        .map(|n| n.short_str())
        .collect::<Vec<_>>()
        .join(RANGES_DELIM)
}

fn parse_integer_entry(raw: &str) -> Result<SpecEntry> {
    let (negated, rest) = match raw.strip_prefix(NEGATION_PREFIX) {
        Some(stripped) => (true, stripped),
        None => (false, raw),
    };
    let (error_part, non_error_part) = match rest.split_once(NON_ERROR_DELIM) {
        Some((a, b)) => (a, Some(b)),
        None => (rest, None),
    };
    let ranges = parse_ranges(error_part)?;
    let non_error = non_error_part.map(parse_ranges).transpose()?;
    Ok(SpecEntry::Integer {
        ranges,
        negated,
        non_error,
    })
}

fn parse_ranges(raw: &str) -> Result<RangeList> {
    let mut nodes = Vec::new();
    for part in raw.split(RANGES_DELIM) {
        let (lo, hi) = part
            .split_once(crate::range::RANGE_DELIM)
            .ok_or_else(|| spec_format_err(format!("malformed range {part:?}")))?;
        let lo: i64 = lo
            .parse()
            .map_err(|_| spec_format_err(format!("non-integer range bound {lo:?}")))?;
        let hi: i64 = hi
            .parse()
            .map_err(|_| spec_format_err(format!("non-integer range bound {hi:?}")))?;
        nodes.push(RangeNode::new(lo, hi, Count::scalar(1)));
    }
    RangeList::try_new(nodes, false)
        .map_err(|e| spec_format_err(format!("overlapping or out-of-order spec ranges: {e}")))
}

fn spec_format_err(message: String) -> RetSpecError {
    RetSpecError::SpecFormat(message)
}

/// The full persisted error specification: every function the inter-program
/// election reached a verdict for, keyed by `(function, return-type)`.
#[derive(Clone, Debug, Default)]
pub struct ErrorSpec {
    entries: crate::aggregator::FoldIndexMap<(SmolStr, char), SpecEntry>,
}

impl ErrorSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, function: SmolStr, type_tag: char, entry: SpecEntry) {
        self.entries.insert((function, type_tag), entry);
    }

    /// Inserts only if no entry exists yet for this key. The per-program
    /// cast route must never override a normalized-route result (§4.8).
    pub fn insert_if_absent(&mut self, function: SmolStr, type_tag: char, entry: SpecEntry) {
        self.entries.entry((function, type_tag)).or_insert(entry);
    }

    pub fn get(&self, function: &str, type_tag: char) -> Option<&SpecEntry> {
        self.entries.get(&(SmolStr::new(function), type_tag))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(SmolStr, char), &SpecEntry)> {
        self.entries.iter()
    }

    /// Writes one `ErrorSpec: ` line per entry, sorted by `(function,
    /// type-tag)` so the output is stable across runs regardless of
    /// iteration/hash order.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        let mut rows: Vec<_> = self.entries.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        for ((function, type_tag), entry) in rows {
            writeln!(out, "{LINE_PREFIX}{function} {type_tag} {}", entry.value_str())
                .context("writing ErrorSpec line")?;
        }
        Ok(())
    }

    pub fn read_from<R: BufRead>(input: R) -> Result<Self> {
        let mut spec = Self::new();
        for (idx, line) in input.lines().enumerate() {
            let line = line.context("reading ErrorSpec line")?;
            let Some(body) = line.strip_prefix(LINE_PREFIX) else {
                continue;
            };
            let mut fields = body.splitn(3, ' ');
            let function = fields
                .next()
                .ok_or_else(|| spec_line_err(idx, "missing function name"))?;
            let type_tag = fields
                .next()
                .and_then(|t| t.chars().next())
                .ok_or_else(|| spec_line_err(idx, "missing type tag"))?;
            let value = fields
                .next()
                .ok_or_else(|| spec_line_err(idx, "missing value"))?;
            let value = value.split('\t').next().unwrap_or(value);
            let entry = SpecEntry::parse_value(type_tag, value)
                .map_err(|_| spec_line_err(idx, "malformed spec value"))?;
            spec.insert(SmolStr::new(function), type_tag, entry);
        }
        Ok(spec)
    }
}

fn spec_line_err(line_no: usize, message: &str) -> RetSpecError {
    RetSpecError::SpecFormat(format!("line {}: {message}", line_no + 1))
}

impl fmt::Display for ErrorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows: Vec<_> = self.entries.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        for ((function, type_tag), entry) in rows {
            writeln!(f, "{LINE_PREFIX}{function} {type_tag} {}", entry.value_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeNode;

    #[test]
    fn infallible_round_trips() {
        let mut spec = ErrorSpec::new();
        spec.insert(SmolStr::new("foo"), crate::value::BOOL_TAG, SpecEntry::Infallible);
        let mut buf = Vec::new();
        spec.write_to(&mut buf).unwrap();
        let parsed = ErrorSpec::read_from(buf.as_slice()).unwrap();
        assert_eq!(
            parsed.get("foo", crate::value::BOOL_TAG),
            Some(&SpecEntry::Infallible)
        );
    }

    #[test]
    fn bool_value_round_trips() {
        let mut spec = ErrorSpec::new();
        spec.insert(SmolStr::new("bar"), crate::value::BOOL_TAG, SpecEntry::Bool(BoolValue::False));
        let mut buf = Vec::new();
        spec.write_to(&mut buf).unwrap();
        let parsed = ErrorSpec::read_from(buf.as_slice()).unwrap();
        assert_eq!(
            parsed.get("bar", crate::value::BOOL_TAG),
            Some(&SpecEntry::Bool(BoolValue::False))
        );
    }

    #[test]
    fn integer_ranges_round_trip() {
        let ranges = RangeList::try_new(
            vec![
                RangeNode::new(-1, -1, Count::scalar(1)),
                RangeNode::new(5, 5, Count::scalar(1)),
            ],
            false,
        )
        .unwrap();
        let mut spec = ErrorSpec::new();
        spec.insert(SmolStr::new("g"), INT_TAG, SpecEntry::from_ranges(ranges));
        let mut buf = Vec::new();
        spec.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.trim_end(), "ErrorSpec: g I -1_-1,5_5");
        let parsed = ErrorSpec::read_from(buf.as_slice()).unwrap();
        match parsed.get("g", INT_TAG).unwrap() {
            SpecEntry::Integer { ranges, negated, non_error } => {
                assert!(!*negated);
                assert!(non_error.is_none());
                assert_eq!(ranges.ranges().len(), 2);
            }
            other => panic!("expected integer entry, got {other:?}"),
        }
    }

    #[test]
    fn negated_with_non_error_round_trips() {
        let mut spec = ErrorSpec::new();
        let ranges = RangeList::single(RangeNode::new(0, 0, Count::scalar(1)), false);
        let non_error = RangeList::single(RangeNode::new(1, 100, Count::scalar(1)), false);
        spec.insert(
            SmolStr::new("h"),
            INT_TAG,
            SpecEntry::Integer {
                ranges,
                negated: true,
                non_error: Some(non_error),
            },
        );
        let mut buf = Vec::new();
        spec.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.trim_end(), "ErrorSpec: h I !0_0;1_100");
        let parsed = ErrorSpec::read_from(buf.as_slice()).unwrap();
        assert!(matches!(
            parsed.get("h", INT_TAG),
            Some(SpecEntry::Integer { negated: true, .. })
        ));
    }

    #[test]
    fn ignores_lines_without_prefix() {
        let input = "# a comment\nErrorSpec: z B INFALLIBLE\n";
        let parsed = ErrorSpec::read_from(input.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn insert_if_absent_does_not_override() {
        let mut spec = ErrorSpec::new();
        spec.insert(SmolStr::new("g"), INT_TAG, SpecEntry::Infallible);
        spec.insert_if_absent(
            SmolStr::new("g"),
            INT_TAG,
            SpecEntry::from_ranges(RangeList::single(RangeNode::new(0, 0, Count::scalar(1)), false)),
        );
        assert_eq!(parsed_entry(&spec), &SpecEntry::Infallible);
    }

    fn parsed_entry(spec: &ErrorSpec) -> &SpecEntry {
        spec.get("g", INT_TAG).unwrap()
    }
}
