use axum::Router;

/// A service module that contributes HTTP routes.
///
/// The binary entry point collects modules and merges their routes into the
/// root Router, then wraps the result in the process-wide middleware stack.
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes, merged at the root path.
    fn routes(&self) -> Router;
}
