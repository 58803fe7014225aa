//! Proptest generators for property-based testing.

use proptest::prelude::*;

use consent_ledger_core::ConsentAction;

/// A scope field: never empty, never containing `|` or `,`, mixed case.
pub fn field() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,12}".prop_map(String::from)
}

/// A user id.
pub fn user_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("alice".to_string()),
        Just("bob".to_string()),
        Just("carol".to_string()),
        field(),
    ]
}

/// A small pool of column ids, so operations overlap.
pub fn column_id() -> impl Strategy<Value = String> {
    prop_oneof![Just("colA"), Just("colB"), Just("colC")].prop_map(String::from)
}

/// A comma-separated list of one to three column ids.
pub fn column_list() -> impl Strategy<Value = String> {
    prop::collection::vec(column_id(), 1..=3).prop_map(|columns| columns.join(","))
}

/// Grant or revoke.
pub fn action() -> impl Strategy<Value = ConsentAction> {
    prop_oneof![Just(ConsentAction::Grant), Just(ConsentAction::Revoke)]
}

/// One grant or revoke over shared scope attributes.
#[derive(Debug, Clone)]
pub struct ConsentOp {
    pub user_id: String,
    pub action: ConsentAction,
    pub columns: String,
}

impl ConsentOp {
    /// The action as an invocation argument.
    pub fn action_arg(&self) -> &'static str {
        match self.action {
            ConsentAction::Grant => "g",
            ConsentAction::Revoke => "r",
        }
    }
}

impl Arbitrary for ConsentOp {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (user_id(), action(), column_list())
            .prop_map(|(user_id, action, columns)| ConsentOp {
                user_id,
                action,
                columns,
            })
            .boxed()
    }
}

/// A sequence of up to `max_len` operations.
pub fn consent_ops(max_len: usize) -> impl Strategy<Value = Vec<ConsentOp>> {
    prop::collection::vec(any::<ConsentOp>(), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_ledger_core::FIELD_SEPARATOR;

    proptest! {
        #[test]
        fn test_fields_are_valid_arguments(f in field()) {
            prop_assert!(!f.is_empty());
            prop_assert!(!f.contains(FIELD_SEPARATOR));
            prop_assert!(!f.contains(','));
        }

        #[test]
        fn test_column_lists_parse(columns in column_list()) {
            let count = columns.split(',').count();
            prop_assert!((1..=3).contains(&count));
        }
    }
}
