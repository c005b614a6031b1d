use crate::domain::{Behaviour, HeaderInformation, Round};
use std::collections::BTreeSet;
use std::fmt;

/// Why a consensus header was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Short label for metrics
    pub reason: &'static str,
    pub message: String,
}

impl ValidationFailure {
    fn new(reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

type Checked = Result<(), ValidationFailure>;

/// Stateless validation logic for consensus headers.
pub struct HeaderValidator;

impl HeaderValidator {
    /// Every check that runs before the block's transaction executes.
    pub fn validate_before_execution(header: &HeaderInformation, current: Option<&Round>) -> Checked {
        let Some(current) = current else {
            return Err(ValidationFailure::new("no_round", "No current round"));
        };

        Self::validate_sender(header, current)?;
        Self::validate_time_slots(&header.round)?;
        Self::validate_orders(&header.round)?;

        match header.behaviour {
            Behaviour::UpdateValue | Behaviour::UpdateValueWithoutPreviousInValue => {
                Self::validate_update_value(header, current)
            }
            Behaviour::TinyBlock => Self::validate_round_id(&header.round, current),
            Behaviour::NextRound => Self::validate_next_round(&header.round, current),
            Behaviour::NextTerm => Self::validate_next_term(&header.round, current),
            Behaviour::Nothing => Err(ValidationFailure::new(
                "nothing",
                "Nothing is not a block behaviour",
            )),
        }
    }

    /// Sender must be a miner of the current round
    pub fn validate_sender(header: &HeaderInformation, current: &Round) -> Checked {
        if current.is_in_miner_list(&header.sender) {
            Ok(())
        } else {
            Err(ValidationFailure::new(
                "not_a_miner",
                format!("Sender {} is not a current miner", header.sender),
            ))
        }
    }

    pub fn validate_time_slots(round: &Round) -> Checked {
        round
            .check_time_slots()
            .map_err(|e| ValidationFailure::new("time_slots", e))
    }

    /// Nonzero final orders must be distinct, one per miner with an out-value.
    pub fn validate_orders(round: &Round) -> Checked {
        let orders: BTreeSet<i64> = round
            .real_time_miners_information
            .values()
            .map(|m| m.final_order_of_next_round)
            .filter(|order| *order != 0)
            .collect();
        let mined = round.out_value_count();
        if orders.len() == mined {
            Ok(())
        } else {
            Err(ValidationFailure::new(
                "invalid_orders",
                format!(
                    "{} distinct next-round orders for {} mined miners",
                    orders.len(),
                    mined
                ),
            ))
        }
    }

    pub fn validate_round_id(round: &Round, current: &Round) -> Checked {
        if round.round_id() == current.round_id() {
            Ok(())
        } else {
            Err(ValidationFailure::new(
                "round_id",
                format!(
                    "Round id {} does not match current round id {}",
                    round.round_id(),
                    current.round_id()
                ),
            ))
        }
    }

    pub fn validate_update_value(header: &HeaderInformation, current: &Round) -> Checked {
        Self::validate_round_id(&header.round, current)?;

        let expected = current.out_value_count() + 1;
        let actual = header.round.out_value_count();
        if actual != expected {
            return Err(ValidationFailure::new(
                "out_value_count",
                format!("Expected {expected} out-values, header has {actual}"),
            ));
        }

        let complete = header
            .round
            .miner(&header.sender)
            .map_or(false, |m| m.out_value.is_some() && m.signature.is_some());
        if !complete {
            return Err(ValidationFailure::new(
                "missing_out_value",
                format!("Sender {} has no out-value or signature", header.sender),
            ));
        }
        Ok(())
    }

    pub fn validate_next_round(round: &Round, current: &Round) -> Checked {
        if round.round_number != current.round_number + 1 {
            return Err(ValidationFailure::new(
                "round_number",
                format!(
                    "Next round is {}, current is {}",
                    round.round_number, current.round_number
                ),
            ));
        }
        if round.term_number != current.term_number {
            return Err(ValidationFailure::new(
                "term_number",
                "NextRound cannot change the term",
            ));
        }
        if round
            .real_time_miners_information
            .values()
            .any(|m| m.in_value.is_some())
        {
            return Err(ValidationFailure::new(
                "in_value_leak",
                "Next round must not carry in-values",
            ));
        }
        Ok(())
    }

    pub fn validate_next_term(round: &Round, current: &Round) -> Checked {
        if round.term_number != current.term_number + 1
            || round.round_number != current.round_number + 1
        {
            return Err(ValidationFailure::new(
                "term_number",
                format!(
                    "Next term is round {} term {}, current is round {} term {}",
                    round.round_number,
                    round.term_number,
                    current.round_number,
                    current.term_number
                ),
            ));
        }
        Ok(())
    }

    /// The persisted round must hash like the header round.
    pub fn validate_after_execution(header: &HeaderInformation, persisted: Option<&Round>) -> Checked {
        let Some(persisted) = persisted else {
            return Err(ValidationFailure::new("no_round", "No current round"));
        };
        let include_previous_in_value =
            header.behaviour != Behaviour::UpdateValueWithoutPreviousInValue;

        let hash = |round: &Round| {
            round
                .get_hash(include_previous_in_value)
                .map_err(|e| ValidationFailure::new("serialization", e.to_string()))
        };
        let expected = hash(&header.round)?;
        let actual = hash(persisted)?;

        if expected == actual {
            Ok(())
        } else {
            Err(ValidationFailure::new(
                "round_hash",
                format!("Header round hash {expected} differs from persisted {actual}"),
            ))
        }
    }
}
