//! QNAME conventions of the DNS wire surface (spec §6), and NOTIFY.
//!
//! Builds and parses the synthetic names used for the manifest/chunk
//! protocol. The three custom record types themselves live in
//! [`signpost_api::dns`]; this module carries naming plus the one
//! cross-daemon push, NOTIFY, which rides the admin HTTP transport (see
//! `signpost_api::dns::NotifyCommand`) rather than a raw DNS packet.

use crate::error::KdcError;
pub use signpost_api::dns::QType;
use signpost_api::dns::NotifyCommand;

/// `<node-id-fqdn><distribution-id>.<control-zone>` (spec §6: "the node id
/// is itself FQDN, hence the absence of a dot before the distribution id").
pub fn manifest_qname(control_zone: &str, node_id: &str, distribution_id: &str) -> String {
    format!("{node_id}{distribution_id}.{control_zone}")
}

/// `<idx>.<node-id-fqdn><distribution-id>.<control-zone>`.
pub fn chunk_qname(control_zone: &str, node_id: &str, distribution_id: &str, idx: u16) -> String {
    format!("{idx}.{}", manifest_qname(control_zone, node_id, distribution_id))
}

/// `<distribution-id>.<control-zone>`, the QNAME a NOTIFY carries.
pub fn notify_qname(control_zone: &str, distribution_id: &str) -> String {
    format!("{distribution_id}.{control_zone}")
}

/// The first label of a QNAME — the distribution identifier, for a NOTIFY
/// or a manifest query (spec §4.6 step 5, §4.8 step 1).
pub fn first_label(qname: &str) -> Option<&str> {
    qname.split('.').next().filter(|l| !l.is_empty())
}

/// Send a NOTIFY for `qname` to `addr`, carried as a small HTTP POST
/// rather than a raw DNS packet (see the module doc). `addr` is a base
/// URL (e.g. `http://node1.example:8181`); used both for the KDC's push
/// to a recipient node (`node_id: None`) and for a node's confirmation
/// push back (`node_id: Some(self)`).
pub async fn send_notify(addr: &str, qname: &str, node_id: Option<&str>) -> Result<(), KdcError> {
    let client = reqwest::Client::new();
    let url = format!("{}/notify", addr.trim_end_matches('/'));
    let command = NotifyCommand {
        qname: qname.to_string(),
        qtype: QType::Jsonmanifest,
        node_id: node_id.map(str::to_string),
    };
    let response = client
        .post(&url)
        .json(&command)
        .send()
        .await
        .map_err(|e| KdcError::TransportFailure(format!("NOTIFY to '{url}' failed: {e}")))?;
    if !response.status().is_success() {
        return Err(KdcError::TransportFailure(format!("NOTIFY to '{url}' returned {}", response.status())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_notify_qname() {
        assert_eq!(notify_qname("control.invalid.", "abcd"), "abcd.control.invalid.");
    }

    #[test]
    fn extracts_the_first_label() {
        assert_eq!(first_label("abcd.control.invalid."), Some("abcd"));
        assert_eq!(first_label(""), None);
    }
}
