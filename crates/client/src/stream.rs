//! Streaming execution.
//!
//! A streaming query runs on its own tokio task (the worker), which owns the
//! raw-primitive call and is the only producer on a private channel. The
//! consumer side, [`PendingQuery`], is a [`futures::Stream`] of rows that are
//! yielded as they arrive.
//!
//! ## Channel protocol
//!
//! The worker sends, strictly in this order:
//!
//! 1. zero or more [`StreamMessage::Row`], in transport arrival order;
//! 2. at most one [`StreamMessage::Fault`];
//! 3. exactly one [`StreamMessage::End`].
//!
//! A channel that closes without `End` means the worker died; the consumer
//! reports [`ClientError::StreamInterrupted`].
//!
//! ## Cancellation
//!
//! [`PendingQuery::cancel`], or dropping the [`PendingQuery`], closes the
//! channel from the consumer side. The worker checks the channel before every
//! push and, once it is closed, asks the transport to stop delivering rows.

use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use futures::{Stream, StreamExt, TryStreamExt};
use protocol::{QueryHandle, QueryRunId, Record, Transport, TransportFault};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn, Instrument};

use crate::formatter::Row;
use crate::resolver::Resolved;
use crate::{ClientError, ClientResult};

/// One message from a streaming worker to its consumer.
#[derive(Debug)]
enum StreamMessage<R> {
    Row(Row<R>),
    Fault(TransportFault),
    End,
}

/// An in-flight streaming query.
///
/// Implements [`Stream`], yielding `Ok(row)` for every row in the order the
/// server produced them, then at most one `Err(_)` if the query faulted.
/// Finite and not restartable: once the stream has yielded `None` or an
/// error, it keeps yielding `None`.
#[derive(Debug)]
pub struct PendingQuery<R = Record> {
    handle: QueryHandle,
    args: Vec<String>,
    run_id: QueryRunId,
    receiver: mpsc::UnboundedReceiver<StreamMessage<R>>,
    finished: bool,
    fault: Option<TransportFault>,
}

impl<R> PendingQuery<R> {
    /// The query being streamed.
    pub fn handle(&self) -> &QueryHandle {
        &self.handle
    }

    /// The resolved argument list sent to the server.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Identifier of this run, as recorded on the worker's span.
    pub fn run_id(&self) -> QueryRunId {
        self.run_id
    }

    /// Returns `true` once the stream has ended, faulted or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The fault that terminated the stream, if any.
    pub fn fault(&self) -> Option<&TransportFault> {
        self.fault.as_ref()
    }

    /// Returns the next row; shorthand for [`StreamExt::next`].
    ///
    /// - `Some(Ok(row))` for every row, in the order the server produced them.
    /// - `Some(Err(_))` once if the query faulted, after all rows that were
    ///   produced before the fault.
    /// - `None` once the stream is exhausted, faulted or cancelled.
    pub async fn next(&mut self) -> Option<ClientResult<Row<R>>> {
        StreamExt::next(self).await
    }

    /// Drains the stream into memory.
    ///
    /// Produces the same rows as a blocking query. If the query faults, the
    /// rows received so far are dropped and only the fault is returned.
    pub async fn collect(self) -> ClientResult<Vec<Row<R>>> {
        TryStreamExt::try_collect(self).await
    }

    /// Abandons the stream.
    ///
    /// Rows still buffered are discarded and the worker stops at its next
    /// push.
    pub fn cancel(&mut self) {
        if !self.finished {
            debug!(handle = %self.handle, run_id = %self.run_id, "stream cancelled by consumer");
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.receiver.close();
    }
}

// Nothing in `PendingQuery` is structurally pinned.
impl<R> Unpin for PendingQuery<R> {}

impl<R> Stream for PendingQuery<R> {
    type Item = ClientResult<Row<R>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let item = match ready!(this.receiver.poll_recv(cx)) {
            Some(StreamMessage::Row(row)) => Some(Ok(row)),
            Some(StreamMessage::Fault(fault)) => {
                this.finish();
                this.fault = Some(fault.clone());
                Some(Err(ClientError::Transport(fault)))
            }
            Some(StreamMessage::End) => {
                this.finish();
                None
            }
            None => {
                this.finish();
                Some(Err(ClientError::StreamInterrupted {
                    handle: this.handle.clone(),
                }))
            }
        };
        Poll::Ready(item)
    }
}

impl<R> Drop for PendingQuery<R> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                handle = %self.handle,
                run_id = %self.run_id,
                "stream dropped before completion"
            );
        }
    }
}

/// Starts the worker for an already-resolved query and returns immediately.
///
/// Must be called from within a tokio runtime.
pub(crate) fn start<R>(
    transport: Arc<dyn Transport>,
    handle: QueryHandle,
    resolved: Resolved,
) -> PendingQuery<R>
where
    R: FromIterator<(String, String)> + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let run_id = QueryRunId::new_random();
    let span = tracing::debug_span!("query_stream", handle = %handle, run_id = %run_id);

    let args = resolved.args.clone();
    tokio::spawn(worker(transport, handle.clone(), resolved, sender).instrument(span));

    PendingQuery {
        handle,
        args,
        run_id,
        receiver,
        finished: false,
        fault: None,
    }
}

async fn worker<R>(
    transport: Arc<dyn Transport>,
    handle: QueryHandle,
    resolved: Resolved,
    sender: mpsc::UnboundedSender<StreamMessage<R>>,
) where
    R: FromIterator<(String, String)> + Send + 'static,
{
    debug!("streaming worker started");
    let Resolved { strategy, args } = resolved;
    let mut pushed = 0usize;

    let outcome = transport
        .raw_query(&handle, &args, &mut |raw| {
            if sender.is_closed() {
                return ControlFlow::Break(());
            }
            trace!(fields = raw.len(), "row received");
            match sender.send(StreamMessage::Row(strategy.shape(raw))) {
                Ok(()) => {
                    pushed += 1;
                    ControlFlow::Continue(())
                }
                Err(_) => ControlFlow::Break(()),
            }
        })
        .await;

    if sender.is_closed() {
        debug!(rows = pushed, "stream abandoned by consumer, worker stopping");
        return;
    }

    match outcome {
        Ok(()) => {
            debug!(rows = pushed, "streaming worker finished");
        }
        Err(fault) => {
            warn!(rows = pushed, code = fault.code, error = %fault, "streaming worker faulted");
            // A send only fails once the consumer has gone away.
            let _ = sender.send(StreamMessage::Fault(fault));
        }
    }
    let _ = sender.send(StreamMessage::End);
}
