//! End-to-end coverage of the inference path: parsing raw call-path lines
//! into a per-program aggregator, then electing a combined spec across
//! several programs via `InterProgramElection`.

use retspec::aggregator::PerProgramAggregator;
use retspec::config::Tunables;
use retspec::context::ParseContext;
use retspec::inter_election::InterProgramElection;
use retspec::spec::SpecEntry;
use retspec::value::{BOOL_TAG, BoolValue};

fn aggregate(lines: &[&str]) -> PerProgramAggregator {
    let mut agg = PerProgramAggregator::new(Tunables::default());
    let mut ctx = ParseContext::new();
    for line in lines {
        agg.handle_line(line, &mut ctx).unwrap();
    }
    for (_, record) in agg.functions_mut() {
        record.generate_votes().ok();
    }
    agg
}

#[test]
fn consistent_failure_across_programs_elects_that_value() {
    let tunables = Tunables::default();
    let mut election = InterProgramElection::new(tunables);

    let program_a = aggregate(&["AutoEPEx: may_fail a.c:10;Bfalse#1@main a.c:20;Btrueorfalse"]);
    let program_b = aggregate(&["AutoEPEx: may_fail b.c:10;Bfalse#1@main b.c:20;Btrueorfalse"]);
    election.add_program(program_a.functions());
    election.add_program(program_b.functions());

    let spec = election.finish();
    assert_eq!(
        spec.get("may_fail", BOOL_TAG),
        Some(&SpecEntry::Bool(BoolValue::False))
    );
}

#[test]
fn mixed_bool_outcomes_elect_bool_entry() {
    let tunables = Tunables::default();
    let mut election = InterProgramElection::new(tunables);

    let program = aggregate(&[
        "AutoEPEx: may_fail a.c:10;Btrue#1@main a.c:20;Btrueorfalse",
        "AutoEPEx: may_fail a.c:11;Btrue#1@main a.c:21;Btrueorfalse",
        "AutoEPEx: may_fail a.c:12;Bfalse#1@main a.c:22;Btrueorfalse",
    ]);
    election.add_program(program.functions());

    let spec = election.finish();
    assert!(spec.get("may_fail", BOOL_TAG).is_some());
}

#[test]
fn no_programs_yields_empty_spec() {
    let tunables = Tunables::default();
    let election = InterProgramElection::new(tunables);
    let spec = election.finish();
    assert!(spec.is_empty());
}
