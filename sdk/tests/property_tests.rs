use proptest::prelude::*;
use rust_decimal::Decimal;
use sdk::billing::round_currency;
use sdk::errors::{EngineError, ErrorExt};
use sdk::types::{RpcError, RpcResponse};

// Every error carries a non-empty static hint that never echoes its payload.
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "[a-zA-Z0-9 ]{8,40}") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::Parse(error_str.clone()),
            EngineError::UnknownMethod(error_str.clone()),
            EngineError::UnknownTier { tier: error_str.clone(), available: vec![] },
            EngineError::InvalidInput(error_str.clone()),
            EngineError::PromptNotFound(error_str.clone()),
            EngineError::capability("filesystem", error_str.clone()),
            EngineError::CapabilityNotEnabled(error_str.clone()),
            EngineError::Aborted(error_str.clone()),
            EngineError::Internal(error_str.clone()),
            EngineError::Network(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
            prop_assert!(!err.code().is_empty());
        }
    }
}

// Rounding to cents lands within half a cent and is idempotent.
proptest! {
    #[test]
    fn test_round_currency_bounds(mantissa in 0i64..10_000_000, scale in 0u32..6) {
        let amount = Decimal::new(mantissa, scale);
        let rounded = round_currency(amount);

        prop_assert!(rounded.scale() <= 2);
        prop_assert!((rounded - amount).abs() <= Decimal::new(5, 3));
        prop_assert_eq!(round_currency(rounded), rounded);
    }
}

// Error responses always serialize to a single line carrying the code.
proptest! {
    #[test]
    fn test_error_response_single_line(detail in "\\PC*", id in any::<i64>()) {
        let resp = RpcResponse::failure(id.into(), RpcError::internal_error(detail));
        let line = resp.to_line();

        prop_assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        prop_assert_eq!(&value["error"]["code"], &serde_json::json!(-32603));
        prop_assert_eq!(&value["id"], &serde_json::json!(id));
    }
}
