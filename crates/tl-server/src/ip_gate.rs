use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Enforces one live WebSocket session per source IP (SPEC_FULL.md §6.1).
/// [`IpLease`] is a RAII guard: the IP is freed the moment the lease is
/// dropped, which happens naturally when a session's bridging task exits.
#[derive(Default)]
pub struct IpGate {
    active: Mutex<HashSet<IpAddr>>,
}

impl IpGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Admits `ip`, returning a lease that releases it on drop, or `None`
    /// if that IP already holds a session.
    pub fn admit(self: &Arc<Self>, ip: IpAddr) -> Option<IpLease> {
        let mut active = self.active.lock().expect("ip gate lock poisoned");
        if active.insert(ip) {
            Some(IpLease { gate: self.clone(), ip })
        } else {
            None
        }
    }
}

pub struct IpLease {
    gate: Arc<IpGate>,
    ip: IpAddr,
}

impl Drop for IpLease {
    fn drop(&mut self) {
        self.gate.active.lock().expect("ip gate lock poisoned").remove(&self.ip);
    }
}
