//! Scripted in-memory transport shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use protocol::{ProtocolVersion, QueryHandle, RawRecord, RowSink, Transport, TransportFault};
use tokio::sync::Notify;

pub(crate) const HELP: &str = "_help";
pub(crate) const MR_PERM: i64 = 47_733_270;

/// Canned answer for one query handle.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    pub rows: Vec<RawRecord>,
    pub fault: Option<TransportFault>,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    access: Mutex<HashMap<String, TransportFault>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    lifecycle: Mutex<Vec<String>>,
    introspections: AtomicUsize,
    delivered: AtomicUsize,
    introspection_delay: Option<Duration>,
    row_delay: Option<Duration>,
    panic_after_rows: bool,
    pub query_done: Notify,
}

pub(crate) fn handle(name: &str) -> QueryHandle {
    QueryHandle::new(name).expect("non-empty test handle")
}

pub(crate) fn row(fields: &[&str]) -> RawRecord {
    fields.iter().map(|f| (*f).to_string()).collect()
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_introspection_delay(mut self, delay: Duration) -> Self {
        self.introspection_delay = Some(delay);
        self
    }

    pub fn with_row_delay(mut self, delay: Duration) -> Self {
        self.row_delay = Some(delay);
        self
    }

    /// Makes `raw_query` panic once the scripted rows have been delivered.
    pub fn panicking(mut self) -> Self {
        self.panic_after_rows = true;
        self
    }

    /// Scripts the `_help` answer for `handle`.
    pub fn describe(self, handle: &str, description: &str) -> Self {
        self.script_help(handle, vec![row(&[description])])
    }

    pub fn script_help(self, handle: &str, rows: Vec<RawRecord>) -> Self {
        self.scripts.lock().unwrap().insert(
            format!("{HELP} {handle}"),
            Script { rows, fault: None },
        );
        self
    }

    pub fn rows(self, handle: &str, rows: Vec<RawRecord>) -> Self {
        self.script(handle, Script { rows, fault: None })
    }

    pub fn script(self, handle: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(handle.to_string(), script);
        self
    }

    pub fn deny(self, handle: &str, fault: TransportFault) -> Self {
        self.access.lock().unwrap().insert(handle.to_string(), fault);
        self
    }

    pub fn introspections(&self) -> usize {
        self.introspections.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lifecycle(&self) -> Vec<String> {
        self.lifecycle.lock().unwrap().clone()
    }

    fn lookup(&self, handle: &QueryHandle, args: &[String]) -> Script {
        let key = if handle.as_str() == HELP {
            format!("{HELP} {}", args.first().map(String::as_str).unwrap_or_default())
        } else {
            handle.to_string()
        };
        self.scripts
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, server: &str) -> Result<(), TransportFault> {
        self.lifecycle.lock().unwrap().push(format!("connect {server}"));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportFault> {
        self.lifecycle.lock().unwrap().push("disconnect".to_string());
        Ok(())
    }

    async fn set_version(&self, version: ProtocolVersion) -> Result<(), TransportFault> {
        self.lifecycle
            .lock()
            .unwrap()
            .push(format!("version {}", version.as_wire()));
        Ok(())
    }

    async fn raw_query(
        &self,
        handle: &QueryHandle,
        args: &[String],
        sink: &mut RowSink<'_>,
    ) -> Result<(), TransportFault> {
        self.calls
            .lock()
            .unwrap()
            .push((handle.to_string(), args.to_vec()));

        if handle.as_str() == HELP {
            self.introspections.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.introspection_delay {
                tokio::time::sleep(delay).await;
            }
        }

        let script = self.lookup(handle, args);
        for raw in script.rows {
            if let Some(delay) = self.row_delay {
                tokio::time::sleep(delay).await;
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            if sink(raw).is_break() {
                self.query_done.notify_one();
                return Ok(());
            }
        }
        if self.panic_after_rows {
            panic!("scripted transport panicked in {handle}");
        }
        self.query_done.notify_one();
        match script.fault {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    async fn raw_access_check(
        &self,
        handle: &QueryHandle,
        args: &[String],
    ) -> Result<(), TransportFault> {
        self.calls
            .lock()
            .unwrap()
            .push((format!("access {handle}"), args.to_vec()));
        match self.access.lock().unwrap().get(handle.as_str()) {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }

    async fn noop(&self) -> Result<(), TransportFault> {
        Ok(())
    }

    async fn host(&self) -> Result<String, TransportFault> {
        Ok("MOIRA.MIT.EDU".to_string())
    }

    async fn motd(&self) -> Result<Option<String>, TransportFault> {
        Ok(None)
    }
}
