mod support;

use proptest::prelude::*;
use support::{assert_contiguous, series, test_settings, FakeRemote, FakeStore, ManualClock};
use tradefill_application::scheduler::SyncService;
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::services::planner::PlanRequest;
use tradefill_domain::value_objects::bound::Bound;

#[derive(Debug, Clone)]
enum Step {
    Tick,
    Between(i64, i64),
    FromLiteralToNewest(i64),
    Overwrite(i64, i64),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Tick),
        (990i64..1_140, 0i64..60).prop_map(|(from, len)| Step::Between(from, from + len)),
        (990i64..1_130).prop_map(Step::FromLiteralToNewest),
        (990i64..1_140, 1i64..40).prop_map(|(from, len)| Step::Overwrite(from, from + len)),
    ]
}

fn request_for(step: &Step) -> PlanRequest {
    match step {
        Step::Tick => PlanRequest::forward_tick(),
        Step::Between(from, to) => PlanRequest::between(Bound::Literal(*from), Bound::Literal(*to)),
        Step::FromLiteralToNewest(from) => {
            PlanRequest::between(Bound::Literal(*from), Bound::Newest)
        }
        Step::Overwrite(from, to) => {
            PlanRequest::between(Bound::Literal(*from), Bound::Literal(*to)).with_overwrite(true)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn stored_series_stays_contiguous_across_any_sync_sequence(
        page_size in 3usize..15,
        chunk in 3i64..60,
        steps in prop::collection::vec(step_strategy(), 1..6),
    ) {
        let source = series(1, 250, 1_000);
        let remote = FakeRemote::new(page_size).with_series("AAA", source.clone());
        let store = FakeStore::default();
        let clock = ManualClock::at(2_000);
        let mut settings = test_settings();
        settings.backfill_chunk_seconds = chunk;
        let service = SyncService::new(&remote, &store, &clock, settings);

        for step in &steps {
            let outcome = service.sync_one("AAA", &request_for(step));
            prop_assert!(outcome.is_ok() || matches!(step, Step::Tick | Step::FromLiteralToNewest(_)),
                "{:?} failed: {:?}", step, outcome);

            let ids = store.ids("AAA");
            assert_contiguous(&ids);
            let coverage = store.coverage("AAA").unwrap();
            prop_assert_eq!(coverage.map(|c| c.oldest_id), ids.first().copied());
            prop_assert_eq!(coverage.map(|c| c.newest_id), ids.last().copied());
            prop_assert_eq!(outcome.final_coverage, coverage);
            for record in store.records("AAA") {
                prop_assert_eq!(&record, &source[(record.id - 1) as usize]);
            }
        }
    }
}
