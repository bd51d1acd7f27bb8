use proptest::prelude::*;
use rust_decimal::Decimal;
use stoactl_core::finance::{participation_percents, ParticipationShare};
use stoactl_core::leasing::data_hash;
use stoactl_core::states::lookup_state;

fn share_strategy() -> impl Strategy<Value = Vec<(u32, bool)>> {
    prop::collection::vec((1u32..50_000_000, any::<bool>()), 1..20)
}

proptest! {
    #[test]
    fn active_shares_sum_to_one_hundred(raw in share_strategy()) {
        let shares: Vec<ParticipationShare> = raw
            .iter()
            .enumerate()
            .map(|(i, (exposure, paid_off))| ParticipationShare {
                participation_id: i as i32,
                exposure: Decimal::from(*exposure),
                paid_off: *paid_off,
            })
            .collect();

        let pcts = participation_percents(&shares);
        prop_assert_eq!(pcts.len(), shares.len());

        let any_active = shares.iter().any(|s| !s.paid_off);
        let total: Decimal = pcts.iter().filter_map(|(_, p)| *p).sum();
        if any_active {
            let diff = (total - Decimal::ONE_HUNDRED).abs();
            prop_assert!(diff <= Decimal::new(1, 3), "sum was {}", total);
        } else {
            prop_assert_eq!(total, Decimal::ZERO);
        }

        for (share, (_, pct)) in shares.iter().zip(&pcts) {
            prop_assert_eq!(share.paid_off, pct.is_none());
        }
    }

    #[test]
    fn state_lookup_is_idempotent(input in "[A-Za-z .]{0,20}") {
        if let Some(code) = lookup_state(&input) {
            prop_assert_eq!(lookup_state(code), Some(code));
        }
    }

    #[test]
    fn data_hash_only_sees_length_and_prefix(n in 51usize..120, tail_value in any::<i64>()) {
        let rows: Vec<_> = (0..n)
            .map(|i| serde_json::json!({"Unit": i}).as_object().cloned().unwrap())
            .collect();
        let mut altered = rows.clone();
        altered[n - 1].insert("Unit".into(), serde_json::json!(tail_value));
        prop_assert_eq!(data_hash(&rows), data_hash(&altered));
    }
}
