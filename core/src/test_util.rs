//! Place to put utilities that are only used by tests.

use crate::diagnostic::{DiagnosticRecord, DiagnosticSource};
use crate::error::{MenderError, MenderResult};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Returns a new temporary directory. Unlike the defaults in the `tempdir` and `tempfile` crates,
/// this directory is not world-accessible by default.
#[cfg(not(miri))]
pub fn tempdir() -> std::io::Result<tempfile::TempDir> {
    use std::fs::Permissions;
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o700));
    }
    builder.tempdir()
}

/// A diagnostic source that replays a scripted sequence of results, for testing code that
/// re-runs the compiler.
///
/// # Example
/// ```
/// use mender_core::DiagnosticSource;
/// use mender_core::test_util::MockDiagnosticSource;
/// let source = MockDiagnosticSource::new().then(vec![]).then(vec![]);
/// assert!(source.collect().unwrap().is_empty());
/// assert_eq!(source.calls(), 1);
/// ```
#[derive(Default)]
pub struct MockDiagnosticSource {
    responses: RefCell<VecDeque<MenderResult<Vec<DiagnosticRecord>>>>,
    calls: Cell<usize>,
}

impl MockDiagnosticSource {
    /// Creates a MockDiagnosticSource with nothing scripted.
    pub fn new() -> MockDiagnosticSource {
        MockDiagnosticSource::default()
    }

    /// Queues the records returned by the next unanswered `collect` call.
    pub fn then(self, records: Vec<DiagnosticRecord>) -> MockDiagnosticSource {
        self.responses.borrow_mut().push_back(Ok(records));
        self
    }

    /// Queues an error for the next unanswered `collect` call.
    pub fn then_fail(self, error: MenderError) -> MockDiagnosticSource {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    /// Number of times `collect` has been called.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl DiagnosticSource for MockDiagnosticSource {
    fn collect(&self) -> MenderResult<Vec<DiagnosticRecord>> {
        self.calls.set(self.calls.get() + 1);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(MenderError::Config("mock diagnostic source exhausted".into())))
    }
}
