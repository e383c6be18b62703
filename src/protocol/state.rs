//! # Demand counter and subscription lifecycle state.
//!
//! ```text
//!            request(n > 0) / emit
//!              ┌────────┐
//!              ▼        │
//!   start ──► Active ───┘
//!              │
//!              ├── cancel() ─────────────────► Cancelled
//!              ├── source exhausted ─────────► Terminated(Completed)
//!              └── request(n <= 0) / failure ► Terminated(Failed)
//! ```
//!
//! Both `Cancelled` and `Terminated(_)` are final: no resurrection.

/// Outstanding demand of one subscription.
///
/// Saturates at [`Demand::UNBOUNDED`] instead of overflowing, so an arbitrarily
/// large cumulative request behaves as unbounded demand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Demand(u64);

impl Demand {
    /// Demand that is never exhausted in practice.
    pub const UNBOUNDED: Demand = Demand(u64::MAX);

    /// Returns the raw counter value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    /// True once the counter reached its saturation point.
    #[inline]
    pub fn is_unbounded(self) -> bool {
        self.0 == u64::MAX
    }

    /// True if nothing is outstanding.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub(crate) fn add(&mut self, n: u64) {
        self.0 = self.0.saturating_add(n);
    }

    /// Consumes one unit of demand; `false` if none was left.
    #[inline]
    pub(crate) fn take_one(&mut self) -> bool {
        match self.0.checked_sub(1) {
            Some(rest) => {
                self.0 = rest;
                true
            }
            None => false,
        }
    }
}

/// How a subscription reached its terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The source was exhausted and `on_complete` was (or is being) delivered.
    Completed,
    /// A failure was signalled through `on_error`.
    Failed,
}

/// Lifecycle state of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Accepting demand and delivering elements.
    Active,
    /// Cancelled by the subscriber; no further signals.
    Cancelled,
    /// A terminal signal was issued.
    Terminated(Termination),
}

impl SubscriptionState {
    /// True for `Cancelled` and `Terminated(_)`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, SubscriptionState::Active)
    }
}
