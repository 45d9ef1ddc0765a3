//! Dependent resources, their reconcilers, and their place in the
//! reconciliation order.

use std::collections::BTreeMap;

use async_trait::async_trait;
use url::Url;

use crate::context::ReconcileContext;
use crate::guard::{AllOf, Guard};
use crate::reconcile::Primary;

/// Identifies one dependent resource of the platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DependentRef {
    kind: String,
    name: String,
}

impl DependentRef {
    /// Reference the dependent named `name` of resource kind `kind`.
    pub fn new(kind: &str, name: &str) -> Self {
        DependentRef {
            kind: kind.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Resource kind of the dependent, e.g. `Database`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Instance name of the dependent.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for DependentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// The outcome a dependent reconciler reports for one pass.
#[derive(Clone, Debug, PartialEq)]
pub enum Readiness {
    /// The dependent is fully ready and its endpoints can be published.
    Ready {
        /// Connection endpoints to publish, keyed by endpoint name.
        endpoints: BTreeMap<String, Url>,
    },
    /// The dependent is still converging and should be revisited next pass.
    InProgress {
        /// What the dependent is waiting on.
        message: String,
    },
    /// The dependent failed in a way further passes will not repair.
    Failed {
        /// What went wrong.
        message: String,
    },
}

impl Readiness {
    /// Ready, with nothing to publish.
    pub fn ready() -> Self {
        Readiness::Ready {
            endpoints: BTreeMap::new(),
        }
    }

    /// Ready, publishing a single named endpoint.
    pub fn ready_at(name: &str, endpoint: Url) -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(name.to_owned(), endpoint);
        Readiness::Ready { endpoints }
    }

    /// Still converging.
    pub fn in_progress(message: &str) -> Self {
        Readiness::InProgress {
            message: message.to_owned(),
        }
    }

    /// Irrecoverably failed.
    pub fn failed(message: &str) -> Self {
        Readiness::Failed {
            message: message.to_owned(),
        }
    }

    /// Whether this outcome is `Ready`.
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

/// Reconciles one dependent resource toward the primary's desired state.
///
/// Implementations create or update the real resource (or verify it) and
/// report how far it got as a [`Readiness`]. Returning `Err` records the
/// dependent's condition as `Unknown` for this pass and the loop moves on to
/// the next dependent; transient trouble is retried on the next pass. A
/// dependent that can never converge reports [`Readiness::Failed`] instead.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use capstan::{DependentRef, DependentReconciler, Readiness, ReconcileContext};
/// # struct Platform;
/// # impl capstan::Primary for Platform {
/// #     fn generation(&self) -> i64 {
/// #         1
/// #     }
/// #     fn name(&self) -> &str {
/// #         "demo"
/// #     }
/// # }
///
/// struct Database;
///
/// #[async_trait]
/// impl DependentReconciler<Platform> for Database {
///     async fn reconcile(
///         &self,
///         _dependent: &DependentRef,
///         _primary: &Platform,
///         _ctx: &ReconcileContext,
///     ) -> anyhow::Result<Readiness> {
///         todo!("create or update the database, then report its readiness")
///     }
/// }
/// ```
#[async_trait]
pub trait DependentReconciler<P: Primary>: Sync + Send + 'static {
    /// Drive the dependent toward its desired state and report the outcome.
    async fn reconcile(
        &self,
        dependent: &DependentRef,
        primary: &P,
        ctx: &ReconcileContext,
    ) -> anyhow::Result<Readiness>;
}

/// One entry in the reconciliation order: a dependent, the guard gating it,
/// and the reconciler that drives it.
///
/// By default a dependent is required for the platform to count as ready,
/// its guard is the empty conjunction (always met), and its outcome is
/// recorded under the condition type `<kind>Ready`.
pub struct Dependent<P: Primary> {
    pub(crate) dependent: DependentRef,
    pub(crate) condition_type: String,
    pub(crate) required: bool,
    pub(crate) guard: Box<dyn Guard<P>>,
    pub(crate) reconciler: Box<dyn DependentReconciler<P>>,
}

impl<P: Primary> Dependent<P> {
    /// A required, ungated dependent recording under `<kind>Ready`.
    pub fn new(dependent: DependentRef, reconciler: impl DependentReconciler<P>) -> Self {
        let condition_type = format!("{}Ready", dependent.kind());
        Dependent {
            dependent,
            condition_type,
            required: true,
            guard: Box::new(AllOf::new()),
            reconciler: Box::new(reconciler),
        }
    }

    /// Replace the guard gating this dependent.
    pub fn guard(mut self, guard: impl Guard<P>) -> Self {
        self.guard = Box::new(guard);
        self
    }

    /// Record this dependent's outcome under `type_` instead of the default.
    pub fn condition_type(mut self, type_: &str) -> Self {
        self.condition_type = type_.to_owned();
        self
    }

    /// Keep reconciling this dependent, but do not require it for the
    /// platform to count as ready.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct TestPlatform;

    impl Primary for TestPlatform {
        fn generation(&self) -> i64 {
            1
        }

        fn name(&self) -> &str {
            "test-platform"
        }
    }

    struct AlwaysReady;

    #[async_trait]
    impl DependentReconciler<TestPlatform> for AlwaysReady {
        async fn reconcile(
            &self,
            _dependent: &DependentRef,
            _primary: &TestPlatform,
            _ctx: &ReconcileContext,
        ) -> anyhow::Result<Readiness> {
            Ok(Readiness::ready_at(
                "database",
                Url::parse("postgres://db.internal:5432").unwrap(),
            ))
        }
    }

    #[test]
    fn test_ref_accessors_and_display() {
        let dependent = DependentRef::new("Database", "users-db");
        assert_eq!(dependent.kind(), "Database");
        assert_eq!(dependent.name(), "users-db");
        assert_eq!(dependent.to_string(), "Database/users-db");
    }

    #[test]
    fn test_readiness_constructors() {
        assert!(Readiness::ready().is_ready());
        assert!(!Readiness::in_progress("creating volume").is_ready());
        assert!(!Readiness::failed("quota exhausted").is_ready());

        match Readiness::ready_at("console", Url::parse("https://console.internal").unwrap()) {
            Readiness::Ready { endpoints } => {
                assert_eq!(endpoints["console"].as_str(), "https://console.internal/");
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_dependent_defaults_and_builder() {
        let entry = Dependent::new(DependentRef::new("Database", "users-db"), AlwaysReady);
        assert_eq!(entry.condition_type, "DatabaseReady");
        assert!(entry.required);

        let entry = Dependent::new(DependentRef::new("Console", "admin"), AlwaysReady)
            .condition_type("ConsoleAvailable")
            .optional();
        assert_eq!(entry.condition_type, "ConsoleAvailable");
        assert!(!entry.required);
    }

    #[tokio::test]
    async fn test_reconciler_seam_reports_readiness() {
        let entry = Dependent::new(DependentRef::new("Database", "users-db"), AlwaysReady);
        let outcome = entry
            .reconciler
            .reconcile(&entry.dependent, &TestPlatform, &ReconcileContext::new())
            .await
            .unwrap();
        assert!(outcome.is_ready());
    }
}
