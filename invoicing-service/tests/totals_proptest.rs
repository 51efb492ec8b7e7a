//! Property tests for invoice money arithmetic.

use invoicing_service::models::{format_amount, InvoiceTotals, LineItem};
use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

fn line_item() -> impl Strategy<Value = LineItem> {
    // quantity up to 1000.00, rate up to 100000.00
    (1i64..100_000, 0i64..10_000_000).prop_map(|(qty_cents, rate_cents)| {
        LineItem::new(
            "Work",
            Decimal::new(qty_cents, 2),
            Decimal::new(rate_cents, 2),
        )
        .expect("bounded amounts fit")
    })
}

fn tax_rate() -> impl Strategy<Value = Decimal> {
    // 0.00% to 30.00%
    (0i64..=3_000).prop_map(|bp| Decimal::new(bp, 2))
}

proptest! {
    #[test]
    fn total_is_subtotal_plus_rounded_tax(
        items in prop::collection::vec(line_item(), 1..20),
        rate in tax_rate(),
    ) {
        let totals = InvoiceTotals::compute(&items, rate).unwrap();

        let subtotal: Decimal = items
            .iter()
            .map(|i| {
                (i.quantity * i.rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            })
            .sum();
        prop_assert_eq!(totals.subtotal, subtotal);
        prop_assert_eq!(
            totals.tax,
            (subtotal * rate / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        );
        prop_assert_eq!(totals.total, totals.subtotal + totals.tax);
        prop_assert_eq!(totals.subtotal.scale(), 2);
        prop_assert_eq!(totals.tax.scale(), 2);
        prop_assert_eq!(totals.total.scale(), 2);
        prop_assert!(items.iter().all(|i| i.amount.scale() == 2));
    }

    #[test]
    fn zero_rate_means_zero_tax(items in prop::collection::vec(line_item(), 1..10)) {
        let totals = InvoiceTotals::compute(&items, Decimal::ZERO).unwrap();
        prop_assert_eq!(totals.tax, Decimal::ZERO);
        prop_assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn formatted_amount_has_two_decimals(cents in 0i64..1_000_000_000) {
        let formatted = format_amount(Decimal::new(cents, 3));
        let (_, fraction) = formatted.split_once('.').expect("decimal point");
        prop_assert_eq!(fraction.len(), 2);
    }
}
