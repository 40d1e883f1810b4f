//! ValueDomain: the typed observed-return-value domain parsed from the
//! checker's wire format (§6). A [`Value`] is one of void, boolean, pointer
//! or integer, each carrying an optional symbol tag (the variable the
//! checker believes the value flows from) and a weight used when the same
//! observation is folded into more than one histogram bin.

use crate::error::{ErrorContext, RetSpecError, Result};
use crate::range::{Count, RangeList, RangeNode};
use smol_str::SmolStr;

pub const VOID_TAG: char = 'V';
pub const BOOL_TAG: char = 'B';
pub const PTR_TAG: char = 'P';
pub const INT_TAG: char = 'I';

const SYMBOL_PREFIX: char = '&';
const ASSIGNMENT_DELIM: &str = ":=";
const CHAIN_DELIM: char = '\\';
const UNSIGNED_SUFFIX: char = 'U';

/// A three-valued boolean observation: the checker only ever commits to
/// `true`, `false`, or "could be either" when the execution path forks
/// without resolving the branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoolValue {
    True,
    False,
    Unknown,
}

impl BoolValue {
    fn parse(encoded: &str) -> Option<Self> {
        match encoded {
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "trueorfalse" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Short key used in histogram labels and the persisted spec format.
    pub fn label(self) -> &'static str {
        match self {
            Self::True => "t",
            Self::False => "f",
            Self::Unknown => "u",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "t" => Some(Self::True),
            "f" => Some(Self::False),
            "u" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// A pointer observation: not-null, null, or unresolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PtrValue {
    NotNull,
    Null,
    Unknown,
}

impl PtrValue {
    fn parse(encoded: &str) -> Option<Self> {
        match encoded {
            "notnull" => Some(Self::NotNull),
            "null" => Some(Self::Null),
            "nullornotnull" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotNull => "m",
            Self::Null => "n",
            Self::Unknown => "u",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "m" => Some(Self::NotNull),
            "n" => Some(Self::Null),
            "u" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Key identifying a single histogram bin. Bool and pointer values have
/// three fixed bins; integers bin by disjoint range, with a catch-all for
/// the unconstrained observations that §4.6 excludes from voting outright.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinKey {
    Bool(BoolValue),
    Pointer(PtrValue),
    IntRange(RangeNode),
    IntUnconstrained,
}

impl BinKey {
    pub fn label(&self) -> String {
        match self {
            BinKey::Bool(b) => b.label().to_string(),
            BinKey::Pointer(p) => p.label().to_string(),
            BinKey::IntRange(node) => node.short_str(),
            BinKey::IntUnconstrained => "Unspecified".to_string(),
        }
    }
}

/// One parsed return-value observation.
#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Bool {
        value: BoolValue,
        symbol: Option<SmolStr>,
        weight: Count,
    },
    Pointer {
        value: PtrValue,
        symbol: Option<SmolStr>,
        weight: Count,
    },
    /// `ranges = None` means the checker left the integer unconstrained
    /// (the assignment chain's final right-hand side was `u`).
    Integer {
        ranges: Option<RangeList>,
        symbol: Option<SmolStr>,
        weight: Count,
    },
}

impl Value {
    pub fn type_tag(&self) -> char {
        match self {
            Value::Void => VOID_TAG,
            Value::Bool { .. } => BOOL_TAG,
            Value::Pointer { .. } => PTR_TAG,
            Value::Integer { .. } => INT_TAG,
        }
    }

    pub fn symbol(&self) -> Option<&SmolStr> {
        match self {
            Value::Void => None,
            Value::Bool { symbol, .. } | Value::Pointer { symbol, .. } | Value::Integer { symbol, .. } => {
                symbol.as_ref()
            }
        }
    }

    pub fn weight(&self) -> Count {
        match self {
            Value::Void => Count::scalar(0),
            Value::Bool { weight, .. } | Value::Pointer { weight, .. } | Value::Integer { weight, .. } => {
                weight.clone()
            }
        }
    }

    /// True when the checker could not resolve the value at all: an
    /// unknown bool/pointer branch, or an unconstrained integer.
    pub fn is_unknown(&self) -> bool {
        match self {
            Value::Void => false,
            Value::Bool { value, .. } => value.is_unknown(),
            Value::Pointer { value, .. } => value.is_unknown(),
            Value::Integer { ranges, .. } => ranges.is_none(),
        }
    }

    /// True when this is an integer observation pinned to the single
    /// point `n`.
    pub fn is_exactly(&self, n: i64) -> bool {
        match self {
            Value::Integer {
                ranges: Some(list), ..
            } => list.is_exactly(n),
            _ => false,
        }
    }

    /// The histogram bin this observation falls into. For an integer
    /// spanning multiple disjoint ranges, callers must bin each range in
    /// `ranges()` independently; this returns the whole-value key only for
    /// void/bool/pointer/unconstrained-int cases.
    pub fn bin_key(&self) -> Option<BinKey> {
        match self {
            Value::Void => None,
            Value::Bool { value, .. } => Some(BinKey::Bool(*value)),
            Value::Pointer { value, .. } => Some(BinKey::Pointer(*value)),
            Value::Integer { ranges: None, .. } => Some(BinKey::IntUnconstrained),
            Value::Integer { ranges: Some(_), .. } => None,
        }
    }

    pub fn int_ranges(&self) -> Option<&RangeList> {
        match self {
            Value::Integer {
                ranges: Some(list), ..
            } => Some(list),
            _ => None,
        }
    }

    /// Whether two observations were assigned from the same symbol. Per
    /// the open-question decision in DESIGN.md, `false` whenever either
    /// side lacks a symbol tag, even if both are tagless.
    pub fn same_assignments(&self, other: &Value) -> bool {
        match (self.symbol(), other.symbol()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Whether this value's bin(s) overlap the given spec-side key. Used
    /// by the spec checker to test an observed value against a persisted
    /// [`crate::spec::ErrorSpec`] entry's range.
    pub fn overlaps_key(&self, key: &BinKey) -> bool {
        match (self, key) {
            (Value::Bool { value, .. }, BinKey::Bool(k)) => value == k,
            (Value::Pointer { value, .. }, BinKey::Pointer(k)) => value == k,
            (Value::Integer { ranges: None, .. }, BinKey::IntUnconstrained) => true,
            (Value::Integer { ranges: Some(list), .. }, BinKey::IntRange(node)) => {
                let mut probe = RangeList::single(node.clone(), false);
                let mut list = list.clone_flat();
                list.overlaps(&mut probe)
            }
            _ => false,
        }
    }

    /// Parse one value-string, including its leading type tag, per §6's
    /// grammar. `weight` is attached verbatim to the result.
    pub fn parse(raw: &str, weight: Count) -> Result<Value> {
        let mut chars = raw.chars();
        let tag = chars.next().context("empty value string")?;
        let rest = chars.as_str();

        match tag {
            VOID_TAG => Ok(Value::Void),
            BOOL_TAG => {
                let (symbol, encoded) = split_symbol(rest);
                let value = BoolValue::parse(encoded)
                    .ok_or_else(|| RetSpecError::Parse {
                        message: format!("unrecognized boolean encoding {encoded:?}"),
                        context: vec![raw.to_string()],
                    })?;
                Ok(Value::Bool { value, symbol, weight })
            }
            PTR_TAG => {
                let (symbol, encoded) = split_symbol(rest);
                let value = PtrValue::parse(encoded)
                    .ok_or_else(|| RetSpecError::Parse {
                        message: format!("unrecognized pointer encoding {encoded:?}"),
                        context: vec![raw.to_string()],
                    })?;
                Ok(Value::Pointer { value, symbol, weight })
            }
            INT_TAG => {
                let (symbol, encoded) = split_symbol(rest);
                let ranges = parse_int_encoding(encoded, raw)?;
                Ok(Value::Integer { ranges, symbol, weight })
            }
            other => Err(RetSpecError::Parse {
                message: format!("unknown value type tag {other:?}"),
                context: vec![raw.to_string()],
            }),
        }
    }
}

/// Strips a leading `&<symbol>:=` prefix, common to every value type.
fn split_symbol(untyped: &str) -> (Option<SmolStr>, &str) {
    if let Some(rest) = untyped.strip_prefix(SYMBOL_PREFIX) {
        if let Some(idx) = rest.find(ASSIGNMENT_DELIM) {
            let symbol = &rest[..idx];
            let value = &rest[idx + ASSIGNMENT_DELIM.len()..];
            return (Some(SmolStr::new(symbol)), value);
        }
    }
    (None, untyped)
}

/// Parses an integer's encoded value: either a plain literal, or an
/// assignment chain whose final right-hand side is `u` (unconstrained) or
/// a brace-bracket range set. Only the final right-hand side matters here
/// (see DESIGN.md for why the intermediate chain links are not modeled).
fn parse_int_encoding(encoded: &str, raw_line: &str) -> Result<Option<RangeList>> {
    if let Some(literal) = parse_int_literal(encoded) {
        return Ok(Some(RangeList::single(
            RangeNode::point(literal, Count::scalar(1)),
            false,
        )));
    }

    let rhs = match encoded.rfind(CHAIN_DELIM) {
        Some(idx) => &encoded[idx + CHAIN_DELIM.len_utf8()..],
        None => encoded,
    };

    if rhs == "u" {
        return Ok(None);
    }

    parse_braces_ranges(rhs, raw_line).map(Some)
}

fn parse_int_literal(s: &str) -> Option<i64> {
    let trimmed = s.strip_suffix(UNSIGNED_SUFFIX).unwrap_or(s);
    trimmed.parse::<i64>().ok()
}

/// Parses `{ [lo, hi], [lo, hi], ... }` into a [`RangeList`].
fn parse_braces_ranges(s: &str, raw_line: &str) -> Result<RangeList> {
    let inner = s
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| RetSpecError::Parse {
            message: format!("malformed integer range set {s:?}"),
            context: vec![raw_line.to_string()],
        })?
        .trim();

    let mut nodes = Vec::new();
    for part in split_bracket_groups(inner) {
        let pair = part
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']');
        let mut bounds = pair.split(',').map(str::trim);
        let lo = bounds
            .next()
            .and_then(parse_int_literal)
            .ok_or_else(|| RetSpecError::Parse {
                message: format!("malformed range bound in {part:?}"),
                context: vec![raw_line.to_string()],
            })?;
        let hi = bounds
            .next()
            .and_then(parse_int_literal)
            .ok_or_else(|| RetSpecError::Parse {
                message: format!("malformed range bound in {part:?}"),
                context: vec![raw_line.to_string()],
            })?;
        nodes.push(RangeNode::new(lo, hi, Count::scalar(1)));
    }

    let mut list = RangeList::empty(false);
    for node in nodes {
        list.add(&RangeList::single(node, false));
    }
    Ok(list)
}

fn split_bracket_groups(s: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in s.char_indices() {
        match ch {
            '[' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    groups.push(&s[start..=idx]);
                }
            }
            _ => {}
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_void() {
        let v = Value::parse("V", Count::Scalar(1)).unwrap();
        assert!(matches!(v, Value::Void));
        assert_eq!(v.type_tag(), VOID_TAG);
    }

    #[test]
    fn parses_bool_variants() {
        assert!(matches!(
            Value::parse("Btrue", Count::Scalar(1)).unwrap(),
            Value::Bool {
                value: BoolValue::True,
                ..
            }
        ));
        assert!(matches!(
            Value::parse("Bfalse", Count::Scalar(1)).unwrap(),
            Value::Bool {
                value: BoolValue::False,
                ..
            }
        ));
        let unknown = Value::parse("Btrueorfalse", Count::Scalar(1)).unwrap();
        assert!(unknown.is_unknown());
    }

    #[test]
    fn parses_pointer_variants() {
        assert!(matches!(
            Value::parse("Pnotnull", Count::Scalar(1)).unwrap(),
            Value::Pointer {
                value: PtrValue::NotNull,
                ..
            }
        ));
        assert!(matches!(
            Value::parse("Pnull", Count::Scalar(1)).unwrap(),
            Value::Pointer {
                value: PtrValue::Null,
                ..
            }
        ));
        assert!(Value::parse("Pnullornotnull", Count::Scalar(1)).unwrap().is_unknown());
    }

    #[test]
    fn parses_bool_with_symbol() {
        let v = Value::parse("B&x:=true", Count::Scalar(1)).unwrap();
        assert_eq!(v.symbol().map(|s| s.as_str()), Some("x"));
        assert!(matches!(
            v,
            Value::Bool {
                value: BoolValue::True,
                ..
            }
        ));
    }

    #[test]
    fn parses_integer_literal() {
        let v = Value::parse("I42", Count::Scalar(1)).unwrap();
        assert!(v.is_exactly(42));
        assert!(!v.is_unknown());
    }

    #[test]
    fn parses_integer_literal_with_unsigned_suffix() {
        let v = Value::parse("I7U", Count::Scalar(1)).unwrap();
        assert!(v.is_exactly(7));
    }

    #[test]
    fn parses_negative_integer_literal() {
        let v = Value::parse("I-3", Count::Scalar(1)).unwrap();
        assert!(v.is_exactly(-3));
    }

    #[test]
    fn parses_unconstrained_integer_chain() {
        let v = Value::parse("Ia:=b\\b:=u", Count::Scalar(1)).unwrap();
        assert!(v.is_unknown());
        assert_eq!(v.bin_key(), Some(BinKey::IntUnconstrained));
    }

    #[test]
    fn parses_ranged_integer_chain() {
        let v = Value::parse("Ia:=b\\b:={ [1, 2], [5, 6] }", Count::Scalar(1)).unwrap();
        let ranges = v.int_ranges().unwrap();
        assert!(ranges.contains(Some(&RangeNode::point(1, Count::scalar(1)))));
        assert!(ranges.contains(Some(&RangeNode::point(6, Count::scalar(1)))));
        assert!(!ranges.contains(Some(&RangeNode::point(3, Count::scalar(1)))));
    }

    #[test]
    fn parses_integer_with_outer_symbol_and_chain() {
        let v = Value::parse("I&y:=a:=b\\b:={ [0, 0] }", Count::Scalar(1)).unwrap();
        assert_eq!(v.symbol().map(|s| s.as_str()), Some("y"));
        assert!(v.is_exactly(0));
    }

    #[test]
    fn same_assignments_requires_both_symbols() {
        let a = Value::parse("B&x:=true", Count::Scalar(1)).unwrap();
        let b = Value::parse("B&x:=false", Count::Scalar(1)).unwrap();
        assert!(a.same_assignments(&b));

        let c = Value::parse("Btrue", Count::Scalar(1)).unwrap();
        assert!(!a.same_assignments(&c));
        assert!(!c.same_assignments(&c));
    }

    #[test]
    fn rejects_unknown_type_tag() {
        assert!(Value::parse("Zgarbage", Count::Scalar(1)).is_err());
    }

    #[test]
    fn rejects_empty_string() {
        assert!(Value::parse("", Count::Scalar(1)).is_err());
    }

    #[test]
    fn overlaps_key_bool() {
        let v = Value::parse("Btrue", Count::Scalar(1)).unwrap();
        assert!(v.overlaps_key(&BinKey::Bool(BoolValue::True)));
        assert!(!v.overlaps_key(&BinKey::Bool(BoolValue::False)));
    }

    #[test]
    fn bin_key_label_for_int_range() {
        let node = RangeNode::point(5, Count::scalar(1));
        let key = BinKey::IntRange(node);
        assert_eq!(key.label(), "5_5");
    }
}
