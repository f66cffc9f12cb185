//! Trait seams for the out-of-process collaborators the core informs or
//! queries. Implementations live with the surrounding application; the core
//! ships no-op defaults so every service can run standalone.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::Period;

/// Events emitted after a committed state change. Delivery is
/// fire-and-forget: sink failures are the sink's problem and never roll back
/// the core mutation.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    BillPaid {
        bill_id: Uuid,
        amount: Decimal,
        payment_date: NaiveDate,
    },
    BillReversed {
        bill_id: Uuid,
        amount: Decimal,
    },
    PayrollGenerated {
        period: Period,
        snapshots: usize,
        failures: usize,
    },
}

/// Card-statement ("fatura") aggregator: recomputes the statement total for
/// the affected card and month whenever a card-linked bill changes.
pub trait StatementAggregator: Send + Sync {
    fn recompute_statement(&self, card_id: Uuid, month: u32, year: i32) -> Decimal;
}

/// Informed, never queried. Implementations must swallow their own failures.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &CoreEvent);
}

pub struct NoopStatements;

impl StatementAggregator for NoopStatements {
    fn recompute_statement(&self, _card_id: Uuid, _month: u32, _year: i32) -> Decimal {
        Decimal::ZERO
    }
}

pub struct NoopNotifier;

impl NotificationSink for NoopNotifier {
    fn notify(&self, _event: &CoreEvent) {}
}

/// Collaborator bundle threaded through the mutating services.
#[derive(Clone, Copy)]
pub struct Hooks<'a> {
    pub statements: &'a dyn StatementAggregator,
    pub notifier: &'a dyn NotificationSink,
}

impl<'a> Hooks<'a> {
    pub fn new(
        statements: &'a dyn StatementAggregator,
        notifier: &'a dyn NotificationSink,
    ) -> Self {
        Self {
            statements,
            notifier,
        }
    }

    pub fn noop() -> Hooks<'static> {
        Hooks {
            statements: &NoopStatements,
            notifier: &NoopNotifier,
        }
    }

    pub fn notify(&self, event: CoreEvent) {
        self.notifier.notify(&event);
    }

    /// Recompute the statement covering `date` for a card-linked bill change.
    pub fn recompute_card(&self, card_id: Uuid, date: NaiveDate) {
        let total = self
            .statements
            .recompute_statement(card_id, date.month(), date.year());
        tracing::debug!(%card_id, %total, "card statement recomputed");
    }
}
