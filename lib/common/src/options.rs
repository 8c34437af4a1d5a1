/// Options that control the planners of the logical layer.
///
/// The defaults enable sub-plan sharing and only verify the planner invariants in debug builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Whether overlapping components are planned once and shared between the plans.
    pub share_subplans: bool,
    /// Whether intermediate results are checked for connectivity, input satisfiability, and
    /// disjointness. These checks are at least quadratic and panic on a violation.
    pub verify_invariants: bool,
}

impl PlannerOptions {
    /// Creates a new [PlannerOptions] with the default values.
    pub fn new() -> Self {
        Self {
            share_subplans: true,
            verify_invariants: cfg!(debug_assertions),
        }
    }

    /// Sets whether shared sub-plans are planned only once.
    #[must_use]
    pub fn with_share_subplans(mut self, share_subplans: bool) -> Self {
        self.share_subplans = share_subplans;
        self
    }

    /// Sets whether the planner invariants are verified.
    #[must_use]
    pub fn with_verify_invariants(mut self, verify_invariants: bool) -> Self {
        self.verify_invariants = verify_invariants;
        self
    }
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self::new()
    }
}
