//! SpecChecker (§4.9): applies a persisted [`ErrorSpec`] to a freshly
//! parsed program's call sites, producing unchecked-return-value bug
//! reports grouped by caller (§6).

use crate::aggregator::{FoldIndexMap, PerProgramAggregator};
use crate::error::{ErrorContext, Result};
use crate::spec::ErrorSpec;
use crate::vote::PolarVoter;
use smol_str::SmolStr;
use std::fmt;
use std::io::Write;

const THRESHOLD_RATIO: f64 = 1.0;
const MIN_SITES: u64 = 2;
const UNCHECKED_MESSAGE: &str = "never checked";

/// One call site whose return value was never checked on any path, paired
/// with the callee it calls.
struct SiteReport {
    site: SmolStr,
    callee: SmolStr,
}

/// Every unchecked site belonging to one caller (`file:func`), in the
/// order they were discovered; sorted by site location at render time.
struct CallerReport {
    caller: SmolStr,
    sites: Vec<SiteReport>,
}

/// The rendered result of one [`SpecChecker::check`] run: bug reports
/// grouped by caller, plus the total bug count (§6, §7).
pub struct CheckReport {
    callers: Vec<CallerReport>,
    total: u64,
}

impl CheckReport {
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }

    /// Writes the bug-report file format: one block per caller, each site
    /// on its own indented line, then a trailing `Total: <N>` line.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        for caller_report in &self.callers {
            writeln!(out, "{}:", caller_report.caller).context("writing bug report caller block")?;
            for site in &caller_report.sites {
                writeln!(out, "\t{}->{}(): {UNCHECKED_MESSAGE}", site.site, site.callee)
                    .context("writing bug report site line")?;
            }
        }
        writeln!(out, "Total: {}", self.total).context("writing bug report total")?;
        Ok(())
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for caller_report in &self.callers {
            writeln!(f, "{}:", caller_report.caller)?;
            for site in &caller_report.sites {
                writeln!(f, "\t{}->{}(): {UNCHECKED_MESSAGE}", site.site, site.callee)?;
            }
        }
        writeln!(f, "Total: {}", self.total)
    }
}

/// How one call site's observed paths classify for the unchecked-return
/// check (§4.9).
struct SiteVerdict {
    /// Always `true` once a site has any observed path. Every site, wrapped
    /// or not, casts a vote into the per-function [`PolarVoter`].
    contributes: bool,
    /// `true` unless at least one path through the site was wrapped. A
    /// sometimes-wrapped site is silently skipped entirely.
    reportable: bool,
    /// `true` iff every observed path left the callee's return unchecked.
    always_unchecked: bool,
    /// The `file:func` location of the path's caller, if any path was seen.
    caller_location: Option<SmolStr>,
}

fn classify_site(paths: &[(crate::path::FollowerEdge, std::rc::Rc<crate::path::CallPath>)]) -> Option<SiteVerdict> {
    if paths.is_empty() {
        return None;
    }

    let mut any_wrapped = false;
    let mut always_unchecked = true;
    let mut caller_location = None;

    for (edge, path) in paths {
        let value = &edge.segment.value;
        let wrapped = value.symbol().is_some() && value.same_assignments(&path.caller.value);
        if wrapped {
            any_wrapped = true;
        }
        if !value.is_unknown() {
            always_unchecked = false;
        }
        if caller_location.is_none() {
            caller_location = Some(SmolStr::new(path.caller.location.general_location()));
        }
    }

    Some(SiteVerdict {
        contributes: true,
        reportable: !any_wrapped,
        always_unchecked,
        caller_location,
    })
}

/// Applies a persisted [`ErrorSpec`] against one program's parsed call
/// sites. One instance is reused across the programs the CLI is given, but
/// the per-function "conventionally unchecked" counters it accumulates are
/// per-program, matching the upstream checker's behavior of re-deriving
/// them fresh for each input log (§4.9).
pub struct SpecChecker<'a> {
    spec: &'a ErrorSpec,
    threshold_ratio: f64,
    min_sites: u64,
}

impl<'a> SpecChecker<'a> {
    pub fn new(spec: &'a ErrorSpec) -> Self {
        Self::with_options(spec, THRESHOLD_RATIO, MIN_SITES)
    }

    pub fn with_options(spec: &'a ErrorSpec, threshold_ratio: f64, min_sites: u64) -> Self {
        Self {
            spec,
            threshold_ratio,
            min_sites,
        }
    }

    /// Checks every function the aggregator observed that also carries a
    /// known spec entry, and renders the full bug-report text.
    pub fn check(&self, aggregator: &PerProgramAggregator) -> CheckReport {
        let mut check_counts: FoldIndexMap<SmolStr, PolarVoter> = FoldIndexMap::default();
        let mut pending: FoldIndexMap<SmolStr, Vec<SiteReport>> = FoldIndexMap::default();

        for (_, record) in aggregator.functions() {
            if self.spec.get(record.name(), record.type_tag()).is_none() {
                continue;
            }
            for (site, paths) in record.site_paths() {
                let Some(verdict) = classify_site(paths) else {
                    continue;
                };
                if verdict.contributes {
                    check_counts
                        .entry(record.name().clone())
                        .or_default()
                        .add(verdict.always_unchecked);
                }
                if !verdict.reportable || !verdict.always_unchecked {
                    continue;
                }
                if let Some(caller) = verdict.caller_location {
                    pending.entry(caller).or_default().push(SiteReport {
                        site: site.clone(),
                        callee: record.name().clone(),
                    });
                }
            }
        }

        let mut caller_names: Vec<SmolStr> = pending.keys().cloned().collect();
        caller_names.sort();

        let mut callers = Vec::new();
        let mut total = 0u64;
        for caller in caller_names {
            let mut sites = pending.shift_remove(&caller).unwrap_or_default();
            sites.sort_by(|a, b| a.site.cmp(&b.site));
            sites.retain(|site_report| {
                let votes = check_counts.get(&site_report.callee).copied().unwrap_or_default();
                !votes.choose(self.threshold_ratio, self.min_sites)
            });
            if sites.is_empty() {
                continue;
            }
            total += sites.len() as u64;
            callers.push(CallerReport {
                caller: caller.clone(),
                sites,
            });
        }

        CheckReport { callers, total }
    }
}
