//! Per-run configuration shared by every operation.

use lumen_core::effective_jobs;
use lumen_io::FormatRegistry;

/// Everything an operation needs besides its inputs.
///
/// Built once at startup and passed by reference; nothing in lumen keeps
/// global state.
///
/// ```rust
/// use lumen_ops::Context;
///
/// let ctx = Context::new().with_jobs(4).with_ccmm(true);
/// assert_eq!(ctx.tasks(), 4);
/// assert!(ctx.formats.get("png").is_some());
/// ```
#[derive(Debug)]
pub struct Context {
    /// Codecs available for reading and writing.
    pub formats: FormatRegistry,
    /// Worker task count, `0` = one per rayon thread.
    pub jobs: usize,
    /// Allow the analytic transform for simple gamma profiles.
    pub ccmm_allowed: bool,
    /// Emit per-image debug dumps.
    pub verbose: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Context with the builtin codecs, automatic job count, LCMS only.
    pub fn new() -> Self {
        Self {
            formats: FormatRegistry::builtin(),
            jobs: 0,
            ccmm_allowed: false,
            verbose: false,
        }
    }

    /// Sets the job count.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Enables or disables the analytic transform.
    pub fn with_ccmm(mut self, allowed: bool) -> Self {
        self.ccmm_allowed = allowed;
        self
    }

    /// Enables verbose dumps.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Effective task count for range splitting.
    pub fn tasks(&self) -> usize {
        effective_jobs(self.jobs)
    }
}
