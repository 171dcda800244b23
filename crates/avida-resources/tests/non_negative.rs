//! Resource quantities stay non-negative under arbitrary modification sequences.

use std::sync::Arc;

use avida_common::{ResourceDef, ResourceScope};
use avida_resources::{AccountingMethod, BankSettings, ResourceBank, ResourceHistory};
use proptest::prelude::*;

fn scope_strategy() -> impl Strategy<Value = ResourceScope> {
    prop::sample::select(ResourceScope::ALL.to_vec())
}

fn defs() -> Arc<[ResourceDef]> {
    vec![
        ResourceDef::new("glucose", 100.0).with_flow(1.0, 0.01),
        ResourceDef::new("maltose", 5.0),
        ResourceDef::new("lactose", 0.0).with_flow(0.5, 0.5),
    ]
    .into()
}

proptest! {
    #[test]
    fn modify_never_goes_negative(
        ops in prop::collection::vec(
            (scope_strategy(), prop::collection::vec(-500.0f64..500.0, 3), 0u64..200),
            0..64,
        )
    ) {
        let mut history = ResourceHistory::new();
        history.record(0, vec![10.0, 10.0, 10.0].into()).unwrap();
        let settings = BankSettings {
            method: AccountingMethod::Historical,
            cycles_per_update: 7,
            ..Default::default()
        };
        let mut bank = ResourceBank::initialize(defs(), Some(Arc::new(history)), settings).unwrap();

        let mut cycles = 0;
        for (scope, delta, elapsed) in ops {
            cycles += elapsed;
            bank.advance(cycles);
            bank.modify(scope, &delta).unwrap();
            for scope in ResourceScope::ALL {
                prop_assert!(bank.query(scope).is_non_negative());
            }
        }
    }
}
