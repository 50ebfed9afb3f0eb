//! Order status state machine and its access-control guards.
//!
//! An order moves along `draft -> published -> handling -> done`, with
//! `cancelled` reachable from `draft`/`published` (by the customer) and
//! `handling` (by the assigned expert). `done` and `cancelled` are terminal.
//!
//! Every guarded action is evaluated in two independent layers:
//!
//! 1. **Identity/visibility** — is the actor the customer or expert of
//!    record (or, for `Accept`, *an* expert with no conflicting assignee)?
//!    Failure is reported as [`OrderAccessError::NotFound`] so an
//!    unauthorized actor cannot learn that the order exists.
//! 2. **Status validity** — is the action legal in the order's current
//!    status? Failure is [`OrderAccessError::WrongStatus`], telling the
//!    caller "you may act on orders like this, but not right now".
//!
//! The guards here decide; the repository re-verifies the expected status
//! (and, for `Accept`, the unassigned expert slot) inside a single
//! conditional `UPDATE`, so two interleaved requests cannot both win.

use serde::{Deserialize, Serialize};

use crate::principal::Principal;
use crate::types::DbId;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Draft,
    Published,
    Handling,
    Done,
    Cancelled,
}

impl OrderStatus {
    /// The canonical wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Published => "published",
            OrderStatus::Handling => "handling",
            OrderStatus::Done => "done",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Done | OrderStatus::Cancelled)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(OrderStatus::Draft),
            "published" => Ok(OrderStatus::Published),
            "handling" => Ok(OrderStatus::Handling),
            "done" => Ok(OrderStatus::Done),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity classification of the reviewed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Vulnerability {
    Critical,
    Major,
    Minor,
    Clear,
    #[default]
    Unknown,
}

impl Vulnerability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vulnerability::Critical => "critical",
            Vulnerability::Major => "major",
            Vulnerability::Minor => "minor",
            Vulnerability::Clear => "clear",
            Vulnerability::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for Vulnerability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Vulnerability::Critical),
            "major" => Ok(Vulnerability::Major),
            "minor" => Ok(Vulnerability::Minor),
            "clear" => Ok(Vulnerability::Clear),
            "unknown" => Ok(Vulnerability::Unknown),
            other => Err(format!("unknown vulnerability status: {other}")),
        }
    }
}

/// The facts about an order that guard evaluation needs.
///
/// Deliberately a snapshot, not the full row: the guards are pure and the
/// authoritative state is re-checked by the conditional update that applies
/// the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFacts {
    pub customer_id: DbId,
    pub expert_id: Option<DbId>,
    pub status: OrderStatus,
}

/// A guarded action against an existing order.
///
/// Order creation is not here: it has no existing order to guard and is
/// restricted to customers at the routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    /// Customer publishes a draft for experts to see.
    Confirm,
    /// Customer sets the rating (draft only).
    Rate,
    /// An unconflicted expert claims a published order.
    Accept,
    /// Customer (draft/published) or assigned expert (handling) cancels.
    Cancel,
    /// Customer signs off the expert's finished work.
    Complete,
    /// Customer attaches a file or image to the input payload.
    UploadInput,
    /// Assigned expert attaches a file or image to the result payload.
    UploadResult,
}

/// Why a guarded action was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OrderAccessError {
    /// The actor has no visibility rights over the order. Also used when
    /// the order genuinely does not exist, so the two are indistinguishable
    /// from outside.
    #[error("order not found")]
    NotFound,

    /// The actor is authorized in principle but the order's current status
    /// forbids the action.
    #[error("operation not allowed for orders in this status")]
    WrongStatus,
}

/// The status an order ends up in after a status-changing action.
///
/// Returns `None` for upload/rate actions, which do not move the order.
pub fn transition_target(action: OrderAction) -> Option<OrderStatus> {
    match action {
        OrderAction::Confirm => Some(OrderStatus::Published),
        OrderAction::Accept => Some(OrderStatus::Handling),
        OrderAction::Cancel => Some(OrderStatus::Cancelled),
        OrderAction::Complete => Some(OrderStatus::Done),
        OrderAction::Rate | OrderAction::UploadInput | OrderAction::UploadResult => None,
    }
}

/// Evaluate both guard layers for `actor` performing `action` on `order`.
pub fn check_action(
    order: &OrderFacts,
    actor: Principal,
    action: OrderAction,
) -> Result<(), OrderAccessError> {
    match action {
        OrderAction::Confirm | OrderAction::Rate => {
            owner_customer(order, actor)?;
            require_status(order, OrderStatus::Draft)
        }
        OrderAction::Complete => {
            owner_customer(order, actor)?;
            require_status(order, OrderStatus::Handling)
        }
        OrderAction::Accept => {
            // Any expert may claim, but only while no expert is assigned.
            // An already-claimed order is invisible to other experts.
            match actor {
                Principal::Expert(_) if order.expert_id.is_none() => {}
                _ => return Err(OrderAccessError::NotFound),
            }
            require_status(order, OrderStatus::Published)
        }
        OrderAction::Cancel => match actor {
            Principal::Customer(id) if order.customer_id == id => {
                match order.status {
                    OrderStatus::Draft | OrderStatus::Published => Ok(()),
                    _ => Err(OrderAccessError::WrongStatus),
                }
            }
            Principal::Expert(id) if order.expert_id == Some(id) => {
                require_status(order, OrderStatus::Handling)
            }
            _ => Err(OrderAccessError::NotFound),
        },
        OrderAction::UploadInput => owner_customer(order, actor),
        OrderAction::UploadResult => match actor {
            Principal::Expert(id) if order.expert_id == Some(id) => Ok(()),
            _ => Err(OrderAccessError::NotFound),
        },
    }
}

/// Identity guard: the actor must be the customer of record.
fn owner_customer(order: &OrderFacts, actor: Principal) -> Result<(), OrderAccessError> {
    match actor {
        Principal::Customer(id) if order.customer_id == id => Ok(()),
        _ => Err(OrderAccessError::NotFound),
    }
}

/// Status guard, applied only after the identity guard passed.
fn require_status(order: &OrderFacts, expected: OrderStatus) -> Result<(), OrderAccessError> {
    if order.status == expected {
        Ok(())
    } else {
        Err(OrderAccessError::WrongStatus)
    }
}
