//! State log engine - Append-only ledger of state transitions.
//!
//! Every transition appends a [`state_log`] row and repoints the single
//! [`latest_state_log`] row for the (entity, flow) pair. Rows are never updated in
//! place, so the full history of a payment or employee is always available. The
//! engine does not know which transitions are legal; callers pick the next state.

use crate::{
    core::{
        lookups::{AssociatedType, Flow, State},
        validation::ValidationContainer,
    },
    entities::{LatestStateLog, StateLog, latest_state_log, state_log},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use serde_json::json;

/// The entity a state log row is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associated {
    /// A payment, by id
    Payment(i64),
    /// An employee, by id
    Employee(i64),
}

impl Associated {
    /// Lookup value stored on the log row.
    #[must_use]
    pub const fn associated_type(self) -> AssociatedType {
        match self {
            Self::Payment(_) => AssociatedType::Payment,
            Self::Employee(_) => AssociatedType::Employee,
        }
    }

    /// Payment id column value.
    #[must_use]
    pub const fn payment_id(self) -> Option<i64> {
        match self {
            Self::Payment(id) => Some(id),
            Self::Employee(_) => None,
        }
    }

    /// Employee id column value.
    #[must_use]
    pub const fn employee_id(self) -> Option<i64> {
        match self {
            Self::Employee(id) => Some(id),
            Self::Payment(_) => None,
        }
    }

    fn latest_condition(self, flow: Flow) -> Condition {
        let condition = Condition::all()
            .add(latest_state_log::Column::Flow.eq(flow))
            .add(latest_state_log::Column::AssociatedType.eq(self.associated_type()));
        match self {
            Self::Payment(id) => condition.add(latest_state_log::Column::PaymentId.eq(id)),
            Self::Employee(id) => condition.add(latest_state_log::Column::EmployeeId.eq(id)),
        }
    }

    fn history_condition(self, flow: Flow) -> Condition {
        let condition = Condition::all()
            .add(state_log::Column::Flow.eq(flow))
            .add(state_log::Column::AssociatedType.eq(self.associated_type()));
        match self {
            Self::Payment(id) => condition.add(state_log::Column::PaymentId.eq(id)),
            Self::Employee(id) => condition.add(state_log::Column::EmployeeId.eq(id)),
        }
    }
}

/// Builds the outcome payload stored with a state log.
pub fn build_outcome(message: &str, container: Option<&ValidationContainer>) -> Result<Json> {
    let mut outcome = json!({ "message": message });
    if let Some(container) = container {
        outcome["validation_container"] = serde_json::to_value(container)?;
    }
    Ok(outcome)
}

/// Appends a state log for `associated` ending in `end_state` and repoints the
/// latest state log of the state's flow to it.
///
/// Callers run this inside their batch transaction so the append and the
/// repoint commit together.
pub async fn create_finished_state_log<C>(
    db: &C,
    associated: Associated,
    end_state: State,
    outcome: Json,
    now: DateTime<Utc>,
) -> Result<state_log::Model>
where
    C: ConnectionTrait,
{
    let flow = end_state.flow();
    let latest = LatestStateLog::find()
        .filter(associated.latest_condition(flow))
        .one(db)
        .await?;

    let new_log = state_log::ActiveModel {
        flow: Set(flow),
        end_state: Set(end_state),
        outcome: Set(outcome),
        started_at: Set(now),
        ended_at: Set(now),
        associated_type: Set(associated.associated_type()),
        payment_id: Set(associated.payment_id()),
        employee_id: Set(associated.employee_id()),
        prev_state_log_id: Set(latest.as_ref().map(|l| l.state_log_id)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    match latest {
        Some(pointer) => {
            let mut pointer: latest_state_log::ActiveModel = pointer.into();
            pointer.state_log_id = Set(new_log.id);
            pointer.update(db).await?;
        }
        None => {
            latest_state_log::ActiveModel {
                flow: Set(flow),
                associated_type: Set(associated.associated_type()),
                payment_id: Set(associated.payment_id()),
                employee_id: Set(associated.employee_id()),
                state_log_id: Set(new_log.id),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    tracing::debug!(
        ?associated,
        end_state = %end_state,
        state_log_id = new_log.id,
        "Recorded state transition"
    );

    Ok(new_log)
}

/// Shorthand for [`create_finished_state_log`] with a message-only outcome.
pub async fn record_state<C>(
    db: &C,
    associated: Associated,
    end_state: State,
    message: &str,
    now: DateTime<Utc>,
) -> Result<state_log::Model>
where
    C: ConnectionTrait,
{
    let outcome = build_outcome(message, None)?;
    create_finished_state_log(db, associated, end_state, outcome, now).await
}

/// The state log the latest pointer of (`associated`, `flow`) refers to.
pub async fn get_latest_state_log<C>(
    db: &C,
    associated: Associated,
    flow: Flow,
) -> Result<Option<state_log::Model>>
where
    C: ConnectionTrait,
{
    let latest = LatestStateLog::find()
        .filter(associated.latest_condition(flow))
        .find_also_related(StateLog)
        .one(db)
        .await?;
    Ok(latest.and_then(|(_, log)| log))
}

/// The current state of `associated` in `flow`, if it has ever entered it.
pub async fn get_current_state<C>(
    db: &C,
    associated: Associated,
    flow: Flow,
) -> Result<Option<State>>
where
    C: ConnectionTrait,
{
    Ok(get_latest_state_log(db, associated, flow)
        .await?
        .map(|log| log.end_state))
}

/// Full history of `associated` in `flow`, oldest first.
pub async fn get_state_log_history<C>(
    db: &C,
    associated: Associated,
    flow: Flow,
) -> Result<Vec<state_log::Model>>
where
    C: ConnectionTrait,
{
    StateLog::find()
        .filter(associated.history_condition(flow))
        .order_by_asc(state_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Latest state logs of every entity of `associated_type` currently in `end_state`,
/// ordered by the entity id.
pub async fn get_all_latest_state_logs_in_end_state<C>(
    db: &C,
    associated_type: AssociatedType,
    end_state: State,
) -> Result<Vec<state_log::Model>>
where
    C: ConnectionTrait,
{
    let rows = LatestStateLog::find()
        .filter(latest_state_log::Column::Flow.eq(end_state.flow()))
        .filter(latest_state_log::Column::AssociatedType.eq(associated_type))
        .find_also_related(StateLog)
        .filter(state_log::Column::EndState.eq(end_state))
        .order_by_asc(latest_state_log::Column::PaymentId)
        .order_by_asc(latest_state_log::Column::EmployeeId)
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|(_, log)| log).collect())
}

/// Ids of payments currently in `end_state`, ascending.
pub async fn get_payment_ids_in_end_state<C>(db: &C, end_state: State) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    Ok(
        get_all_latest_state_logs_in_end_state(db, AssociatedType::Payment, end_state)
            .await?
            .into_iter()
            .filter_map(|log| log.payment_id)
            .collect(),
    )
}
