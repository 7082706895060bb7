//! Issues a single remote command and reports its outcome.

use crate::collaborators::RemoteError;
use crate::errors::{Action, ControlError, Target};
use crate::health::ClusterReporter;

/// Runs one remote call against `target`, reporting it before it is sent and
/// again if it fails. The call is never retried.
pub(crate) fn issue<T>(
    reporter: &dyn ClusterReporter,
    target: Target,
    action: Action,
    call: impl FnOnce() -> Result<T, RemoteError>,
) -> Result<T, ControlError> {
    reporter.action_issued(&target, action);
    call().map_err(|source| {
        let error = ControlError::RemoteAction {
            target,
            action,
            source,
        };
        reporter.action_failed(&error);
        error
    })
}

/// Reports a failure that happened before any command could be sent.
pub(crate) fn refuse(reporter: &dyn ClusterReporter, error: ControlError) -> ControlError {
    reporter.action_failed(&error);
    error
}
