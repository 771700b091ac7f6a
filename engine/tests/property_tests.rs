use proptest::prelude::*;
use medmeter_engine::billing::{calculate_billing, BillingCalculator};
use medmeter_engine::guidance::{get_tool_guidance, GuidanceCatalog};
use medmeter_engine::protocol::ProtocolHandler;
use medmeter_engine::prompts::PromptStore;
use rust_decimal::Decimal;
use sdk::billing::{round_currency, BillingOutcome};
use serde_json::Value;
use std::sync::Arc;

fn tier_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("basic"), Just("comprehensive"), Just("batch")]
}

fn class_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("standard".to_string()),
        Just("premium".to_string()),
        Just("enterprise".to_string()),
        "[a-z]{1,10}",
    ]
}

// Billing invariants
proptest! {
    #[test]
    fn test_total_is_subtotal_minus_discount(
        tier in tier_strategy(),
        count in 0i64..=10_000,
        class in class_strategy(),
    ) {
        let result = BillingCalculator::default().calculate(tier, count, &class).unwrap();

        prop_assert_eq!(result.final_total, result.subtotal - result.total_discount_amount);
        prop_assert!(result.final_total >= Decimal::ZERO);
        prop_assert_eq!(result.currency.as_str(), "USD");
    }

    #[test]
    fn test_currency_fields_have_two_places(
        tier in tier_strategy(),
        count in 0i64..=10_000,
        class in class_strategy(),
    ) {
        let result = BillingCalculator::default().calculate(tier, count, &class).unwrap();

        for amount in [
            result.subtotal,
            result.volume_discount_amount,
            result.customer_discount_amount,
            result.total_discount_amount,
            result.final_total,
        ] {
            prop_assert_eq!(round_currency(amount), amount);
        }
    }

    #[test]
    fn test_standard_class_pays_list_price_below_threshold(
        tier in tier_strategy(),
        count in 1i64..=10,
    ) {
        let calculator = BillingCalculator::default();
        let result = calculator.calculate(tier, count, "standard").unwrap();
        let unit_price = calculator.registry().get(tier).unwrap().unit_price;

        prop_assert_eq!(result.final_total, round_currency(unit_price * Decimal::from(count)));
    }

    #[test]
    fn test_volume_discount_only_for_large_batches(
        tier in tier_strategy(),
        count in 0i64..=100,
    ) {
        let result = BillingCalculator::default().calculate(tier, count, "standard").unwrap();
        let expected = tier == "batch" && count > 10;

        prop_assert_eq!(result.volume_discount_rate > Decimal::ZERO, expected);
    }

    #[test]
    fn test_discounts_never_raise_the_price(
        tier in tier_strategy(),
        count in 0i64..=1_000,
        class in class_strategy(),
    ) {
        let calculator = BillingCalculator::default();
        let discounted = calculator.calculate(tier, count, &class).unwrap();

        prop_assert!(discounted.final_total <= discounted.subtotal);
    }

    #[test]
    fn test_negative_counts_are_rejected(
        tier in tier_strategy(),
        count in i64::MIN..0,
    ) {
        match calculate_billing(tier, count, "standard") {
            BillingOutcome::Rejected { error } => prop_assert_eq!(error.code.as_str(), "invalid_input"),
            BillingOutcome::Billed(_) => prop_assert!(false, "negative count was billed"),
        }
    }

    #[test]
    fn test_unknown_tiers_are_rejected(name in "[a-z]{1,12}") {
        prop_assume!(!["basic", "comprehensive", "batch"].contains(&name.as_str()));

        prop_assert!(!calculate_billing(&name, 1, "standard").is_billed());
    }
}

// Guidance and protocol invariants
proptest! {
    #[test]
    fn test_guidance_never_fails(task in ".{0,40}") {
        let entry = get_tool_guidance(&task);

        prop_assert!(!entry.ordered_steps.is_empty());
        prop_assert_eq!(entry.task_kind, task);
    }

    #[test]
    fn test_every_line_gets_one_response_line(line in "[^\n\r]{0,120}") {
        let handler = ProtocolHandler::new(
            Arc::new(GuidanceCatalog::reference()),
            Arc::new(PromptStore::default()),
        );
        let response = handler.handle_line(&line);

        prop_assert!(!response.contains('\n'));
        let value: Value = serde_json::from_str(&response).unwrap();
        prop_assert_eq!(&value["jsonrpc"], "2.0");
    }
}
