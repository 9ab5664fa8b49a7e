use std::collections::HashMap;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_vec_from_string_or_vec;

use super::{codec::ParsedNode, Operation};
use crate::models::SubscriptionOutcome;

const SUBSCRIPTION_NOT_FOUND: &str = "Subscription not found";
const SUBSCRIPTION_ACCEPTED: &str = "Subscription accepted";
const SUBSCRIPTION_REJECTED: &str = "Subscription rejected";

/// Literals the validate operation answers with.
///
/// These are deployment configuration: until they are filled in, every
/// validate answer is unclassified and access is denied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateLiterals {
    #[serde(default, deserialize_with = "deserialize_vec_from_string_or_vec")]
    pub approved: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_vec_from_string_or_vec")]
    pub rejected: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_vec_from_string_or_vec")]
    pub not_found: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_vec_from_string_or_vec")]
    pub already_processed: Vec<String>,
}

/// Maps the free-text `return` literal of a response to a [`SubscriptionOutcome`].
///
/// Tables are per operation and matched exactly. Anything outside a table,
/// including a response without a `return` element, is `Unclassified`.
#[derive(Debug, Clone)]
pub struct ResultClassifier {
    validate: HashMap<String, SubscriptionOutcome>,
}

impl ResultClassifier {
    pub fn new(validate: &ValidateLiterals) -> Self {
        let mut table = HashMap::new();
        let groups = [
            (&validate.approved, SubscriptionOutcome::Approved),
            (&validate.rejected, SubscriptionOutcome::Rejected),
            (&validate.not_found, SubscriptionOutcome::NotFound),
            (&validate.already_processed, SubscriptionOutcome::AlreadyProcessed),
        ];
        for (literals, outcome) in groups {
            for literal in literals {
                if let Some(previous) = table.insert(literal.clone(), outcome) {
                    tracing::warn!(
                        "Validate literal {literal:?} configured as both {previous:?} and {outcome:?}; treating it as unclassified"
                    );
                    table.insert(literal.clone(), SubscriptionOutcome::Unclassified);
                }
            }
        }
        Self { validate: table }
    }

    pub fn classify(&self, node: &ParsedNode, operation: Operation) -> SubscriptionOutcome {
        match node.child_text("return") {
            Some(literal) => self.classify_literal(literal, operation),
            None => SubscriptionOutcome::Unclassified,
        }
    }

    pub fn classify_literal(&self, literal: &str, operation: Operation) -> SubscriptionOutcome {
        let outcome = match (operation, literal) {
            (Operation::Approve, SUBSCRIPTION_NOT_FOUND) => SubscriptionOutcome::NotFound,
            (Operation::Approve, SUBSCRIPTION_ACCEPTED) => SubscriptionOutcome::Approved,
            (Operation::Reject, SUBSCRIPTION_NOT_FOUND) => SubscriptionOutcome::NotFound,
            (Operation::Reject, SUBSCRIPTION_REJECTED) => SubscriptionOutcome::Rejected,
            (Operation::Validate, literal) => self
                .validate
                .get(literal)
                .copied()
                .unwrap_or(SubscriptionOutcome::Unclassified),
            _ => SubscriptionOutcome::Unclassified,
        };

        if outcome == SubscriptionOutcome::Unclassified {
            tracing::warn!("Unclassified {operation:?} result: {literal:?}");
        }
        outcome
    }
}

impl Default for ResultClassifier {
    fn default() -> Self {
        Self::new(&ValidateLiterals::default())
    }
}
