//! Contains the data models for API responses.

use crate::moonraker::PrinterEndpoint;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one `/upload` dispatch. Every failure path carries a
/// human-readable message; the optional fields appear only on the paths
/// that produce them.
#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printer_url: Option<PrinterEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printer_states: Option<BTreeMap<String, String>>,
}

impl UploadResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            printer_url: None,
            printer_states: None,
        }
    }

    pub fn uploaded(printer: PrinterEndpoint) -> Self {
        Self {
            message: "File uploaded to a printer.".to_string(),
            printer_url: Some(printer),
            printer_states: None,
        }
    }

    pub fn upload_failed(printer: PrinterEndpoint) -> Self {
        Self {
            message: "Failed to upload file to printer.".to_string(),
            printer_url: Some(printer),
            printer_states: None,
        }
    }

    pub fn no_printer_available(states: Vec<(PrinterEndpoint, String)>) -> Self {
        Self {
            message: "No printer is currently available.".to_string(),
            printer_url: None,
            printer_states: Some(states_map(states)),
        }
    }
}

/// Collapse a state snapshot into the endpoint-to-label mapping served to
/// clients. Duplicate pool entries collapse to one key, like any JSON map.
pub fn states_map(states: Vec<(PrinterEndpoint, String)>) -> BTreeMap<String, String> {
    states
        .into_iter()
        .map(|(printer, state)| (printer.as_str().to_string(), state))
        .collect()
}
