//! HostInformation - identity of the reporting process

use uuid::Uuid;

/// Identity attached to every outgoing payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInformation {
    /// Stable host id
    pub host_id: Uuid,
    /// Human readable host name
    pub display_name: String,
    /// Machine name
    pub machine_name: String,
}

impl HostInformation {
    /// Create host information
    pub fn new(host_id: Uuid, display_name: impl Into<String>, machine_name: impl Into<String>) -> Self {
        Self {
            host_id,
            display_name: display_name.into(),
            machine_name: machine_name.into(),
        }
    }

    /// Host information for the current process, with a fresh host id.
    ///
    /// The machine name comes from `HOSTNAME` / `COMPUTERNAME`, falling back to `localhost`.
    pub fn local() -> Self {
        let machine_name = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string());

        Self::new(Uuid::new_v4(), machine_name.clone(), machine_name)
    }

    /// Host id in the dash-less format expected by the collector
    pub fn host_id_string(&self) -> String {
        self.host_id.simple().to_string()
    }
}
