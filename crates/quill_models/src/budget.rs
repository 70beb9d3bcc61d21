//! Shared cost ledger with reservations.

use quill_error::{BudgetError, BudgetErrorKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Slack for floating point noise when comparing amounts.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Default)]
struct Ledger {
    ceiling: Option<f64>,
    spent: f64,
    reserved: f64,
}

impl Ledger {
    fn remaining(&self) -> Option<f64> {
        self.ceiling
            .map(|ceiling| (ceiling - self.spent - self.reserved).max(0.0))
    }
}

/// Optional spend ceiling shared by every caller of a model manager.
///
/// Spend is admitted in two steps. [`CostBudget::reserve`] checks the
/// estimate against what is left and holds it; the returned
/// [`BudgetReservation`] is then committed with the actual cost, or released
/// when dropped. Both steps happen under the ledger lock, so concurrent
/// callers cannot both pass a check for the last dollar.
///
/// # Examples
///
/// ```
/// use quill_models::CostBudget;
///
/// let budget = CostBudget::with_ceiling(1.0).unwrap();
/// let reservation = budget.reserve(0.75).unwrap();
/// assert!(budget.reserve(0.5).is_err());
///
/// reservation.commit(0.25);
/// assert!((budget.spent() - 0.25).abs() < 1e-9);
/// assert!(budget.reserve(0.5).is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CostBudget {
    ledger: Arc<Mutex<Ledger>>,
}

impl CostBudget {
    /// A budget with no ceiling.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// A budget capped at `ceiling` USD.
    ///
    /// # Errors
    ///
    /// Returns error if the ceiling is negative or not finite.
    pub fn with_ceiling(ceiling: f64) -> Result<Self, BudgetError> {
        if !(ceiling.is_finite() && ceiling >= 0.0) {
            return Err(BudgetError::new(BudgetErrorKind::InvalidCeiling(ceiling)));
        }
        Ok(Self {
            ledger: Arc::new(Mutex::new(Ledger {
                ceiling: Some(ceiling),
                ..Ledger::default()
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ceiling in USD, if any.
    pub fn ceiling(&self) -> Option<f64> {
        self.lock().ceiling
    }

    /// Actual spend committed so far.
    pub fn spent(&self) -> f64 {
        self.lock().spent
    }

    /// Amount held by outstanding reservations.
    pub fn reserved(&self) -> f64 {
        self.lock().reserved
    }

    /// Budget left after spend and outstanding reservations; `None` if unlimited.
    pub fn remaining(&self) -> Option<f64> {
        self.lock().remaining()
    }

    /// Check whether `estimate` would currently fit, without holding it.
    ///
    /// # Errors
    ///
    /// Returns `Exceeded` if the estimate is larger than what is left.
    pub fn check(&self, estimate: f64) -> Result<(), BudgetError> {
        let ledger = self.lock();
        Self::admit(&ledger, estimate)
    }

    fn admit(ledger: &Ledger, estimate: f64) -> Result<(), BudgetError> {
        match ledger.remaining() {
            Some(remaining) if estimate > remaining + EPSILON => {
                Err(BudgetError::new(BudgetErrorKind::Exceeded {
                    estimated: estimate,
                    remaining,
                }))
            }
            _ => Ok(()),
        }
    }

    /// Hold `estimate` against the budget.
    ///
    /// # Errors
    ///
    /// Returns `Exceeded` if the estimate is larger than what is left; nothing
    /// is held in that case.
    pub fn reserve(&self, estimate: f64) -> Result<BudgetReservation, BudgetError> {
        let estimate = estimate.max(0.0);
        let mut ledger = self.lock();
        Self::admit(&ledger, estimate)?;
        ledger.reserved += estimate;
        debug!(estimate, reserved = ledger.reserved, "Reserved budget");
        Ok(BudgetReservation {
            ledger: Arc::clone(&self.ledger),
            amount: estimate,
            settled: false,
        })
    }
}

/// Budget held for one in-flight call.
///
/// Dropping the reservation without committing releases it.
#[derive(Debug)]
#[must_use = "dropping a reservation releases it immediately"]
pub struct BudgetReservation {
    ledger: Arc<Mutex<Ledger>>,
    amount: f64,
    settled: bool,
}

impl BudgetReservation {
    /// Amount held.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Replace the reservation with the actual cost, returning that cost.
    ///
    /// The provider has already billed the call, so the actual cost is
    /// recorded even when it overshoots the estimate; an overshoot past the
    /// ceiling is logged.
    pub fn commit(mut self, actual: f64) -> f64 {
        let actual = actual.max(0.0);
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.reserved = (ledger.reserved - self.amount).max(0.0);
        ledger.spent += actual;
        if let Some(ceiling) = ledger.ceiling {
            if ledger.spent > ceiling + EPSILON {
                warn!(
                    spent = ledger.spent,
                    ceiling,
                    estimated = self.amount,
                    actual,
                    "Actual cost exceeded estimate and pushed spend past the ceiling"
                );
            }
        }
        self.settled = true;
        actual
    }
}

impl Drop for BudgetReservation {
    fn drop(&mut self) {
        if !self.settled {
            let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
            ledger.reserved = (ledger.reserved - self.amount).max(0.0);
            debug!(released = self.amount, "Released budget reservation");
        }
    }
}

/// Running total of what a group of calls has been billed.
///
/// Counts every billed attempt, including empty responses and calls whose
/// overall invocation later failed, so a caller can account for spend even
/// when it has no response to read a cost from.
#[derive(Debug, Clone, Default)]
pub struct SpendMeter {
    total: Arc<Mutex<f64>>,
}

impl SpendMeter {
    /// A meter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a billed amount.
    pub fn add(&self, amount: f64) {
        *self.total.lock().unwrap_or_else(PoisonError::into_inner) += amount.max(0.0);
    }

    /// Total billed so far in USD.
    pub fn total(&self) -> f64 {
        *self.total.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
