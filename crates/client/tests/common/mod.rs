//! In-memory Moira server used by the integration tests.
//!
//! Answers `_help` from a fixed description table and serves a tiny user
//! directory through `get_user_by_login` / `gubl`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use client::{ProtocolVersion, QueryHandle, RawRecord, Transport, TransportFault};
use protocol::RowSink;

pub const MR_PERM: i64 = 47_733_270;
pub const MR_NO_MATCH: i64 = 47_733_258;
pub const MR_NOT_CONNECTED: i64 = 47_733_271;

pub struct FakeMoira {
    help: HashMap<&'static str, &'static str>,
    users: Vec<[&'static str; 4]>,
    connected: Mutex<Option<String>>,
    version: Mutex<i32>,
    introspections: AtomicUsize,
    privileged: bool,
}

pub fn handle(name: &str) -> QueryHandle {
    QueryHandle::new(name).expect("non-empty handle")
}

fn no_match() -> TransportFault {
    TransportFault::new(MR_NO_MATCH, "No records in database match query")
}

impl FakeMoira {
    pub fn new(privileged: bool) -> Self {
        let help = HashMap::from([
            (
                "get_user_by_login",
                "get_user_by_login, gubl (login) => login, unix_uid, shell, status",
            ),
            (
                "gubl",
                "get_user_by_login, gubl (login) => login, unix_uid, shell, status",
            ),
            ("update_user_shell", "update_user_shell, uush (login, shell)"),
            ("uush", "update_user_shell, uush (login, shell)"),
        ]);
        let users = vec![
            ["broder", "1234", "/bin/zsh", "1"],
            ["jdreed", "5678", "/bin/bash", "1"],
            ["ghost", "9999", "/bin/false", "3"],
        ];
        Self {
            help,
            users,
            connected: Mutex::new(None),
            version: Mutex::new(0),
            introspections: AtomicUsize::new(0),
            privileged,
        }
    }

    pub fn introspections(&self) -> usize {
        self.introspections.load(Ordering::SeqCst)
    }

    pub fn version(&self) -> i32 {
        *self.version.lock().unwrap()
    }

    fn ensure_connected(&self) -> Result<(), TransportFault> {
        if self.connected.lock().unwrap().is_some() {
            Ok(())
        } else {
            Err(TransportFault::new(MR_NOT_CONNECTED, "Not connected to Moira server"))
        }
    }

    fn matches(pattern: &str, value: &str) -> bool {
        pattern == "*" || pattern == value
    }
}

#[async_trait]
impl Transport for FakeMoira {
    async fn connect(&self, server: &str) -> Result<(), TransportFault> {
        *self.connected.lock().unwrap() = Some(server.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportFault> {
        self.ensure_connected()?;
        *self.connected.lock().unwrap() = None;
        Ok(())
    }

    async fn set_version(&self, version: ProtocolVersion) -> Result<(), TransportFault> {
        *self.version.lock().unwrap() = version.as_wire();
        Ok(())
    }

    async fn raw_query(
        &self,
        handle: &QueryHandle,
        args: &[String],
        sink: &mut RowSink<'_>,
    ) -> Result<(), TransportFault> {
        self.ensure_connected()?;

        match handle.as_str() {
            "_help" => {
                self.introspections.fetch_add(1, Ordering::SeqCst);
                let target = args.first().map(String::as_str).unwrap_or_default();
                match self.help.get(target) {
                    Some(description) => {
                        let _ = sink(RawRecord::from([*description]));
                        Ok(())
                    }
                    None => Err(no_match()),
                }
            }
            "_list_users" => {
                for user in &self.users {
                    if sink(RawRecord::from([user[0]])).is_break() {
                        break;
                    }
                }
                Ok(())
            }
            "get_user_by_login" | "gubl" => {
                let pattern = args.first().map(String::as_str).unwrap_or("*");
                let mut found = false;
                for user in self.users.iter().filter(|u| Self::matches(pattern, u[0])) {
                    found = true;
                    if sink(RawRecord::from(*user)).is_break() {
                        return Ok(());
                    }
                }
                if found {
                    Ok(())
                } else {
                    Err(no_match())
                }
            }
            _ => Err(TransportFault::new(47_733_252, "Unknown query")),
        }
    }

    async fn raw_access_check(
        &self,
        handle: &QueryHandle,
        _args: &[String],
    ) -> Result<(), TransportFault> {
        self.ensure_connected()?;
        match handle.as_str() {
            "update_user_shell" | "uush" if !self.privileged => {
                Err(TransportFault::new(
                    MR_PERM,
                    "Insufficient permission to perform requested database access",
                ))
            }
            "update_user_shell" | "uush" | "get_user_by_login" | "gubl" => Ok(()),
            _ => Err(TransportFault::new(47_733_252, "Unknown query")),
        }
    }

    async fn noop(&self) -> Result<(), TransportFault> {
        self.ensure_connected()
    }

    async fn host(&self) -> Result<String, TransportFault> {
        self.ensure_connected()?;
        Ok(self
            .connected
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default()
            .to_uppercase())
    }

    async fn motd(&self) -> Result<Option<String>, TransportFault> {
        Ok(Some("Moira will be down for maintenance".to_string()))
    }
}
