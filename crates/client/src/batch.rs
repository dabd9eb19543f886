//! Blocking execution: run a query to completion on the caller's task.

use std::ops::ControlFlow;

use protocol::{QueryHandle, RawRecord, Transport, TransportFault};

use crate::formatter::{ExecutionStrategy, Row};
use crate::ClientResult;

/// Collects every row of `handle` into memory, in arrival order.
///
/// A fault discards the rows collected so far.
pub(crate) async fn collect_raw(
    transport: &dyn Transport,
    handle: &QueryHandle,
    args: &[String],
) -> Result<Vec<RawRecord>, TransportFault> {
    let mut rows = Vec::new();
    transport
        .raw_query(handle, args, &mut |raw| {
            rows.push(raw);
            ControlFlow::Continue(())
        })
        .await?;
    Ok(rows)
}

/// Runs `handle` and shapes each collected row with `strategy`.
///
/// Rows are only shaped once the transport reports completion, so a faulting
/// query produces no output at all.
pub(crate) async fn run<R>(
    transport: &dyn Transport,
    handle: &QueryHandle,
    strategy: &ExecutionStrategy,
    args: &[String],
) -> ClientResult<Vec<Row<R>>>
where
    R: FromIterator<(String, String)>,
{
    let rows = collect_raw(transport, handle, args).await?;
    tracing::debug!(handle = %handle, rows = rows.len(), "query completed");
    Ok(rows.into_iter().map(|raw| strategy.shape(raw)).collect())
}
