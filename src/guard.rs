//! Boolean guards gating dependent reconciliation.
//!
//! A [`Guard`] decides, once per reconciliation pass, whether a dependent's
//! preconditions hold. Guards compose: [`AllOf`] and [`AnyOf`] combine
//! sub-guards in a fixed order with short-circuit evaluation, and [`Not`]
//! negates one. The leaf guards shipped here cover the common gates: a
//! condition of some type being `True` ([`ConditionTrue`]) and a field of the
//! observed dependent state matching an expected value ([`ObservedEquals`]).

use anyhow::Context;

use crate::condition::Condition;
use crate::context::ReconcileContext;
use crate::dependent::DependentRef;
use crate::reconcile::Primary;

/// A reusable precondition evaluated before a dependent is reconciled.
///
/// Guards are pure: they are evaluated fresh every pass, cause no side
/// effects, and perform no I/O of their own -- everything they need is in the
/// [`ReconcileContext`] the caller assembled before the pass. Returning `Err`
/// means the guard could not be evaluated at all; the reconciliation loop
/// fails the whole pass on it rather than treating it as `false`.
///
/// # Example
///
/// ```rust
/// use capstan::{DependentRef, Guard, ReconcileContext};
///
/// struct Platform {
///     paused: bool,
/// }
///
/// impl capstan::Primary for Platform {
///     fn generation(&self) -> i64 {
///         1
///     }
///
///     fn name(&self) -> &str {
///         "demo"
///     }
/// }
///
/// struct NotPaused;
///
/// impl Guard<Platform> for NotPaused {
///     fn is_met(
///         &self,
///         _dependent: &DependentRef,
///         primary: &Platform,
///         _ctx: &ReconcileContext,
///     ) -> anyhow::Result<bool> {
///         Ok(!primary.paused)
///     }
/// }
/// ```
pub trait Guard<P: Primary>: Sync + Send + 'static {
    /// Whether the dependent's precondition currently holds.
    fn is_met(
        &self,
        dependent: &DependentRef,
        primary: &P,
        ctx: &ReconcileContext,
    ) -> anyhow::Result<bool>;
}

/// Conjunction of guards, met when every sub-guard is met.
///
/// Sub-guards are fixed when the conjunction is assembled and evaluated
/// strictly in that order. The empty conjunction is met (vacuous truth), and
/// evaluation short-circuits: sub-guards after the first unmet one are not
/// invoked that pass. The first evaluation error aborts the conjunction
/// unchanged.
pub struct AllOf<P: Primary> {
    guards: Vec<Box<dyn Guard<P>>>,
}

impl<P: Primary> AllOf<P> {
    /// The empty conjunction, which is always met.
    pub fn new() -> Self {
        AllOf { guards: Vec::new() }
    }

    /// Append a sub-guard at the end of the evaluation order.
    pub fn with(mut self, guard: impl Guard<P>) -> Self {
        self.guards.push(Box::new(guard));
        self
    }
}

impl<P: Primary> Default for AllOf<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Primary> Guard<P> for AllOf<P> {
    fn is_met(
        &self,
        dependent: &DependentRef,
        primary: &P,
        ctx: &ReconcileContext,
    ) -> anyhow::Result<bool> {
        for guard in &self.guards {
            if !guard.is_met(dependent, primary, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Disjunction of guards, met when any sub-guard is met.
///
/// The dual of [`AllOf`]: the empty disjunction is never met, evaluation
/// stops at the first met sub-guard, and the first evaluation error aborts
/// the disjunction.
pub struct AnyOf<P: Primary> {
    guards: Vec<Box<dyn Guard<P>>>,
}

impl<P: Primary> AnyOf<P> {
    /// The empty disjunction, which is never met.
    pub fn new() -> Self {
        AnyOf { guards: Vec::new() }
    }

    /// Append a sub-guard at the end of the evaluation order.
    pub fn with(mut self, guard: impl Guard<P>) -> Self {
        self.guards.push(Box::new(guard));
        self
    }
}

impl<P: Primary> Default for AnyOf<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Primary> Guard<P> for AnyOf<P> {
    fn is_met(
        &self,
        dependent: &DependentRef,
        primary: &P,
        ctx: &ReconcileContext,
    ) -> anyhow::Result<bool> {
        for guard in &self.guards {
            if guard.is_met(dependent, primary, ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Negation of a guard. Evaluation errors pass through unchanged.
pub struct Not<P: Primary> {
    inner: Box<dyn Guard<P>>,
}

impl<P: Primary> Not<P> {
    /// Negate the given guard.
    pub fn new(guard: impl Guard<P>) -> Self {
        Not {
            inner: Box::new(guard),
        }
    }
}

impl<P: Primary> Guard<P> for Not<P> {
    fn is_met(
        &self,
        dependent: &DependentRef,
        primary: &P,
        ctx: &ReconcileContext,
    ) -> anyhow::Result<bool> {
        Ok(!self.inner.is_met(dependent, primary, ctx)?)
    }
}

/// Met when the current condition view records the given type with status
/// `True`.
///
/// This is how dependents gate on each other: the gateway's guard watches
/// `DatabaseReady`, so the gateway is only reconciled once the database's
/// condition went `True` -- whether earlier in the same pass or in a prior
/// one. An absent condition is simply not met.
pub struct ConditionTrue {
    type_: String,
}

impl ConditionTrue {
    /// Watch the condition with the given type.
    pub fn new(type_: &str) -> Self {
        ConditionTrue {
            type_: type_.to_owned(),
        }
    }
}

impl<P: Primary> Guard<P> for ConditionTrue {
    fn is_met(
        &self,
        _dependent: &DependentRef,
        _primary: &P,
        ctx: &ReconcileContext,
    ) -> anyhow::Result<bool> {
        Ok(ctx.condition(&self.type_).map_or(false, Condition::is_true))
    }
}

/// Met when the state observed under `key`, addressed by a JSON pointer,
/// equals an expected value.
///
/// Covers gates like "the deployed configuration checksum matches the desired
/// one". A snapshot that is present but has nothing at the pointer is an
/// ordinary mismatch; a `key` that was never observed this pass means the
/// guard cannot be evaluated, which is an error, not `false`.
pub struct ObservedEquals {
    key: String,
    pointer: String,
    expected: serde_json::Value,
}

impl ObservedEquals {
    /// Compare the value at `pointer` (RFC 6901) within the snapshot observed
    /// under `key` against `expected`.
    pub fn new(key: &str, pointer: &str, expected: serde_json::Value) -> Self {
        ObservedEquals {
            key: key.to_owned(),
            pointer: pointer.to_owned(),
            expected,
        }
    }
}

impl<P: Primary> Guard<P> for ObservedEquals {
    fn is_met(
        &self,
        dependent: &DependentRef,
        _primary: &P,
        ctx: &ReconcileContext,
    ) -> anyhow::Result<bool> {
        let snapshot = ctx.observed(&self.key).with_context(|| {
            format!(
                "nothing observed under {:?} while gating {}",
                self.key, dependent
            )
        })?;
        Ok(snapshot.pointer(&self.pointer) == Some(&self.expected))
    }
}
