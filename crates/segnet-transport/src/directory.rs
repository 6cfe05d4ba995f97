//! Static endpoint directory.
//!
//! Service locations are compiled-in rather than discovered: every named
//! endpoint maps to a fixed server port, and every client task id maps to a
//! fixed source port so that a server can identify who connected purely from
//! the peer address. Entry 0 of the client table is the wildcard: task 0
//! binds an ephemeral port and is reported as [`ANY_TASK`].

use crate::error::{NetError, Result};

/// Application (task) identifier.
pub type TaskId = u16;

/// Wildcard task id: client binds an ephemeral port.
pub const ANY_TASK: TaskId = 0;
/// Segment gateway.
pub const SGW_TASK: TaskId = 1;
/// Control server.
pub const CTL_TASK: TaskId = 2;
/// Monitor server.
pub const MON_TASK: TaskId = 3;
/// Segment HCD client.
pub const SEG_HCD_TASK: TaskId = 13;
/// Diagnostic monitor client.
pub const DIAG_MON_TASK: TaskId = 14;
/// The command server task.
pub const LSEB_CMD_TASK: TaskId = 120;

/// Endpoint name the command server listens on.
pub const LSEB_CMD_SRV: &str = "app_srv20";

/// Number of distinct tasks a single node will host.
pub const MAX_TASKS: usize = 24;

/// Transport flavor of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Tcp,
    Udp,
    Broadcast,
}

/// One named service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointEntry {
    pub name: String,
    pub kind: EndpointKind,
    pub task: TaskId,
    pub port: u16,
}

impl EndpointEntry {
    fn new(name: &str, kind: EndpointKind, task: TaskId, port: u16) -> Self {
        Self {
            name: name.to_string(),
            kind,
            task,
            port,
        }
    }
}

/// The endpoint and client port tables for one deployment.
#[derive(Debug, Clone)]
pub struct Directory {
    endpoints: Vec<EndpointEntry>,
    client_ports: Vec<(TaskId, u16)>,
}

impl Directory {
    /// Build a directory from explicit tables. Mostly useful for tests that
    /// need endpoints on ephemeral ports.
    pub fn new(endpoints: Vec<EndpointEntry>, client_ports: Vec<(TaskId, u16)>) -> Self {
        Self {
            endpoints,
            client_ports,
        }
    }

    /// The standard global-controller table: server endpoints on
    /// 8001..=8023, the telemetry broadcast on 8101, and client source
    /// ports on 9001..=9023.
    pub fn glc_default() -> Self {
        use EndpointKind::{Broadcast, Tcp};
        let endpoints = vec![
            EndpointEntry::new("sgw_srv", Tcp, SGW_TASK, 8001),
            EndpointEntry::new("ctl_srv", Tcp, CTL_TASK, 8002),
            EndpointEntry::new("mon_srv", Tcp, MON_TASK, 8003),
            EndpointEntry::new("app_srv1", Tcp, 101, 8004),
            EndpointEntry::new("app_srv2", Tcp, 102, 8005),
            EndpointEntry::new("app_srv3", Tcp, 4, 8006),
            EndpointEntry::new("app_srv4", Tcp, 5, 8007),
            EndpointEntry::new("app_srv5", Tcp, 6, 8008),
            EndpointEntry::new("app_srv6", Tcp, 7, 8009),
            EndpointEntry::new("app_srv7", Tcp, 8, 8010),
            EndpointEntry::new("app_srv8", Tcp, 9, 8011),
            EndpointEntry::new("app_srv9", Tcp, 10, 8012),
            EndpointEntry::new("app_srv10", Tcp, 11, 8013),
            EndpointEntry::new("app_srv11", Tcp, 111, 8014),
            EndpointEntry::new("app_srv12", Tcp, 112, 8015),
            EndpointEntry::new("app_srv13", Tcp, 113, 8016),
            EndpointEntry::new("app_srv14", Tcp, 114, 8017),
            EndpointEntry::new("app_srv15", Tcp, 115, 8018),
            EndpointEntry::new("app_srv16", Tcp, 116, 8019),
            EndpointEntry::new("app_srv17", Tcp, 117, 8020),
            EndpointEntry::new("app_srv18", Tcp, 118, 8021),
            EndpointEntry::new("app_srv19", Tcp, 119, 8022),
            EndpointEntry::new(LSEB_CMD_SRV, Tcp, LSEB_CMD_TASK, 8023),
            EndpointEntry::new("ant_brdcst", Broadcast, ANY_TASK, 8101),
        ];
        // Client source ports are indexed by task id: task t binds
        // 9000 + t, and the wildcard task binds ephemeral. Server tasks
        // (101 and up) have no client port.
        let client_ports = (0..MAX_TASKS as u16)
            .map(|t| (t, if t == ANY_TASK { 0 } else { 9000 + t }))
            .collect();
        Self {
            endpoints,
            client_ports,
        }
    }

    /// Look up an endpoint by name, requiring the expected kind.
    pub fn entry(&self, name: &str, kind: EndpointKind) -> Result<&EndpointEntry> {
        self.endpoints
            .iter()
            .find(|e| e.name == name && e.kind == kind)
            .ok_or_else(|| NetError::BadEndpoint(name.to_string()))
    }

    /// Server port for a named endpoint.
    pub fn port_of(&self, name: &str, kind: EndpointKind) -> Result<u16> {
        self.entry(name, kind).map(|e| e.port)
    }

    /// The fixed source port a client task binds before connecting.
    /// Port 0 means bind ephemeral.
    pub fn client_port(&self, task: TaskId) -> Result<u16> {
        self.client_ports
            .iter()
            .find(|&&(t, _)| t == task)
            .map(|&(_, p)| p)
            .ok_or(NetError::BadProcess(task))
    }

    /// Identify the task behind a peer source port. Checks the client port
    /// table first, then endpoint ports (a server may itself connect out).
    /// Unknown ports map to [`ANY_TASK`].
    pub fn task_for_port(&self, port: u16) -> TaskId {
        if let Some(&(task, _)) = self
            .client_ports
            .iter()
            .find(|&&(t, p)| p == port && t != ANY_TASK)
        {
            return task;
        }
        self.endpoints
            .iter()
            .find(|e| e.port == port)
            .map(|e| e.task)
            .unwrap_or(ANY_TASK)
    }

    pub fn endpoints(&self) -> &[EndpointEntry] {
        &self.endpoints
    }
}
