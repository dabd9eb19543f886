//! Access checks.
//!
//! The server answers a dry-run permission check with success or a fault. A
//! fault carrying the "permission denied" code means "no"; any other fault is
//! a real failure and goes back to the caller untouched.

use protocol::{QueryHandle, Transport, TransportFault};

use crate::ClientResult;

/// How a fault from an access check is interpreted.
#[derive(Debug)]
enum AccessFault {
    PermissionDenied,
    Other(TransportFault),
}

fn classify(fault: TransportFault, permission_denied: Option<i64>) -> AccessFault {
    match permission_denied {
        Some(code) if code == fault.code => AccessFault::PermissionDenied,
        _ => AccessFault::Other(fault),
    }
}

/// Runs the access check for `handle` with already-resolved `args`.
///
/// `permission_denied` is only evaluated when the check faults, so the error
/// table is not read for permitted calls. If it yields `None` (the code is
/// not in the table) every fault is re-raised.
pub(crate) async fn can_perform<F, Fut>(
    transport: &dyn Transport,
    handle: &QueryHandle,
    args: &[String],
    permission_denied: F,
) -> ClientResult<bool>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Option<i64>>,
{
    let Err(fault) = transport.raw_access_check(handle, args).await else {
        return Ok(true);
    };

    match classify(fault, permission_denied().await) {
        AccessFault::PermissionDenied => {
            tracing::debug!(handle = %handle, "access denied");
            Ok(false)
        }
        AccessFault::Other(fault) => Err(fault.into()),
    }
}
