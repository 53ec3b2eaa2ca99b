//! Balance engine properties
//!
//! The closing balance recurrence, status classification boundaries and
//! month-to-month rollover, checked over generated quantities.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    compute_closing, BalanceFigures, ComponentAmount, Entity, EntitySource, LedgerKind, PeriodKey,
    StockStatus, Transaction, TransactionSource,
};
use spice_erp_backend::config::ReconciliationConfig;
use spice_erp_backend::services::ReconciliationService;
use spice_erp_backend::store::MemoryStore;
use uuid::Uuid;

/// Quantity with two decimal places from a count of hundredths
fn qty(hundredths: i64) -> Decimal {
    Decimal::new(hundredths, 2)
}

fn stock_service(store: &Arc<MemoryStore>) -> ReconciliationService {
    let config = ReconciliationConfig::default();
    ReconciliationService::new(
        store.clone(),
        config.profile(LedgerKind::Stock),
        config.max_concurrency,
    )
}

// ============================================================================
// Closing Balance Recurrence
// ============================================================================
// closing = opening + sum(inflows) - sum(outflows) + adjustment, exactly.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_closing_is_exact_recurrence(
        opening in -100_000i64..100_000,
        inflows in prop::collection::vec(0i64..50_000, 0..5),
        outflows in prop::collection::vec(0i64..50_000, 0..5),
        adjustment in -10_000i64..10_000,
    ) {
        let inflows: Vec<Decimal> = inflows.into_iter().map(qty).collect();
        let outflows: Vec<Decimal> = outflows.into_iter().map(qty).collect();

        let closing = compute_closing(qty(opening), &inflows, &outflows, qty(adjustment));

        // Amounts here stay far inside the Decimal range
        let expected = qty(opening)
            + inflows.iter().copied().sum::<Decimal>()
            - outflows.iter().copied().sum::<Decimal>()
            + qty(adjustment);
        prop_assert_eq!(closing, Some(expected));
    }

    #[test]
    fn prop_figures_match_closing(
        opening in 0i64..100_000,
        purchases in 0i64..100_000,
        utilized in 0i64..100_000,
        adjustment in -5_000i64..5_000,
    ) {
        let figures = BalanceFigures::compute(
            qty(opening),
            vec![ComponentAmount::new("purchases", qty(purchases))],
            vec![ComponentAmount::new("utilized", qty(utilized))],
            qty(adjustment),
        )
        .unwrap();

        prop_assert_eq!(
            Some(figures.closing_balance),
            compute_closing(qty(opening), &[qty(purchases)], &[qty(utilized)], qty(adjustment))
        );
    }

    /// Changing only the adjustment moves the closing balance by the same delta
    #[test]
    fn prop_adjustment_shifts_closing_one_to_one(
        opening in 0i64..100_000,
        old in -5_000i64..5_000,
        new in -5_000i64..5_000,
    ) {
        let before = compute_closing(qty(opening), &[], &[], qty(old)).unwrap();
        let after = compute_closing(qty(opening), &[], &[], qty(new)).unwrap();
        prop_assert_eq!(after - before, qty(new) - qty(old));
    }

    /// Results past the Decimal range are reported, never wrapped or panicked on
    #[test]
    fn prop_out_of_range_closing_is_none(
        opening in 0i64..100_000,
        purchases in 1i64..100_000,
    ) {
        // Whole units: a sub-unit excess would round back into range
        let closing = compute_closing(
            Decimal::from(opening),
            &[Decimal::from(purchases)],
            &[],
            Decimal::MAX,
        );
        prop_assert_eq!(closing, None);

        let closing = compute_closing(
            -Decimal::from(opening),
            &[],
            &[Decimal::from(purchases)],
            Decimal::MIN,
        );
        prop_assert_eq!(closing, None);
    }
}

// ============================================================================
// Status Classification
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_non_positive_closing_is_out(
        closing in -100_000i64..=0,
        threshold in -1_000i64..100_000,
    ) {
        prop_assert_eq!(StockStatus::classify(qty(closing), qty(threshold)), StockStatus::Out);
    }

    #[test]
    fn prop_positive_below_threshold_is_low(
        closing in 1i64..100_000,
        gap in 1i64..10_000,
    ) {
        let threshold = qty(closing + gap);
        prop_assert_eq!(StockStatus::classify(qty(closing), threshold), StockStatus::Low);
    }

    #[test]
    fn prop_at_or_above_threshold_is_normal(
        threshold in 0i64..100_000,
        surplus in 0i64..10_000,
    ) {
        let closing = qty(threshold + surplus).max(qty(1));
        prop_assert_eq!(StockStatus::classify(closing, qty(threshold)), StockStatus::Normal);
    }
}

// ============================================================================
// Period Rollover
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn prop_previous_period_covers_day_before_first_day(year in 2000i32..2100, month in 1u32..=12) {
        let period = PeriodKey::new(year, month).unwrap();
        let previous = period.previous();
        prop_assert_eq!(previous.last_day().succ_opt(), Some(period.first_day()));
        prop_assert!(previous < period);
    }

    /// Each month opens at the previous month's stored closing balance
    #[test]
    fn prop_opening_equals_previous_closing(
        current_stock in 0i64..100_000,
        movements in prop::collection::vec((1u32..=3, 1u32..=28, 0i64..20_000, any::<bool>()), 0..12),
    ) {
        let store = Arc::new(MemoryStore::new());
        let entity = Entity {
            id: Uuid::new_v4(),
            source: EntitySource::RawMaterial,
            name: "Cinnamon".to_string(),
            category: "Bark".to_string(),
            unit: "kg".to_string(),
            minimum_threshold: qty(1_000),
            current_stock: qty(current_stock),
        };

        let reports = tokio_test::block_on(async {
            store.insert_entity(entity.clone()).await;
            for (month, day, amount, is_purchase) in &movements {
                let on = NaiveDate::from_ymd_opt(2024, *month, *day).unwrap();
                store
                    .record_transaction(Transaction {
                        id: Uuid::new_v4(),
                        source: if *is_purchase {
                            TransactionSource::StockPurchase
                        } else {
                            TransactionSource::Task
                        },
                        entity_id: entity.id,
                        occurred_on: on,
                        completed_on: None,
                        quantity: qty(*amount),
                        wastage: None,
                        process: (!*is_purchase).then(|| "Cleaning".to_string()),
                        channel_id: None,
                    })
                    .await;
            }

            let service = stock_service(&store);
            let mut reports = Vec::new();
            for month in 1..=3 {
                let date = NaiveDate::from_ymd_opt(2024, month, 1).unwrap();
                reports.push(service.reconcile_period(date, None, None).await.unwrap());
            }
            reports
        });

        let snapshots: Vec<_> = reports
            .iter()
            .map(|r| r.rows[0].snapshot().cloned().unwrap())
            .collect();

        prop_assert_eq!(snapshots[0].opening_balance, qty(current_stock));
        for pair in snapshots.windows(2) {
            prop_assert_eq!(pair[1].opening_balance, pair[0].closing_balance);
        }
        for snapshot in &snapshots {
            prop_assert!(snapshot.is_balanced());
            prop_assert_eq!(
                snapshot.status,
                StockStatus::classify(snapshot.closing_balance, qty(1_000))
            );
        }
    }
}
