//! Printer pool: readiness selection and bulk state snapshots.

use crate::moonraker::{PrinterApi, PrinterEndpoint, UNREACHABLE_STATE};
use std::sync::Arc;

/// The fixed, ordered printer pool plus the client used to poll it.
///
/// Both operations are stateless and re-poll on every call; there is no
/// caching or debouncing. Known limitation: two concurrent upload requests
/// can observe the same printer as ready and both send it a file, since
/// selection is not serialized.
pub struct PrinterPool {
    printers: Vec<PrinterEndpoint>,
    client: Arc<dyn PrinterApi>,
}

impl PrinterPool {
    pub fn new(printers: Vec<PrinterEndpoint>, client: Arc<dyn PrinterApi>) -> Self {
        Self { printers, client }
    }

    pub fn printers(&self) -> &[PrinterEndpoint] {
        &self.printers
    }

    pub fn client(&self) -> &dyn PrinterApi {
        self.client.as_ref()
    }

    /// Scan the pool in configured order and return the first printer that
    /// reports ready. Printers after the match are not polled.
    pub async fn find_ready(&self) -> Option<PrinterEndpoint> {
        for printer in &self.printers {
            if self.client.is_ready(printer).await {
                return Some(printer.clone());
            }
        }
        None
    }

    /// Poll every printer in the pool and collect its raw state label, in
    /// pool order. A printer whose state cannot be determined is reported
    /// as [`UNREACHABLE_STATE`]; one unreachable printer never aborts the
    /// remaining polls.
    pub async fn snapshot_states(&self) -> Vec<(PrinterEndpoint, String)> {
        let mut states = Vec::with_capacity(self.printers.len());
        for printer in &self.printers {
            let label = match self.client.query_status(printer).await {
                Ok(info) => info.state,
                Err(err) => {
                    tracing::warn!("Could not determine state of printer {}: {}", printer, err);
                    UNREACHABLE_STATE.to_string()
                }
            };
            states.push((printer.clone(), label));
        }
        states
    }
}
