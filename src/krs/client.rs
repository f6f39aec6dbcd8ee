//! The KRS's outbound HTTP client: pulling manifests/chunks from a KDC
//! and confirming completed installs back to it (spec §4.8 steps 2-3, 7).

use std::str::FromStr;

use bytes::Bytes;
use domain::base::Name;

use crate::error::KdcError;
use signpost_api::krs::{KrsQueryCommand, KrsQueryResult};
use signpost_api::Envelope;

/// Query `<kdc_addr>/krs/query` for the manifest of `distribution_id`.
pub async fn fetch_manifest(kdc_addr: &str, node_id: &str, distribution_id: &str) -> Result<signpost_api::krs::ManifestDto, KdcError> {
    match query_kmreq(kdc_addr, node_id, distribution_id, None).await? {
        KrsQueryResult::Manifest(m) => Ok(m),
        KrsQueryResult::Chunk(_) => Err(KdcError::TransportFailure("expected a manifest, got a chunk".into())),
    }
}

/// Query `<kdc_addr>/krs/query` for chunk `idx` of `distribution_id`.
pub async fn fetch_chunk(kdc_addr: &str, node_id: &str, distribution_id: &str, idx: u16) -> Result<signpost_api::krs::ChunkDto, KdcError> {
    match query_kmreq(kdc_addr, node_id, distribution_id, Some(idx)).await? {
        KrsQueryResult::Chunk(c) => Ok(c),
        KrsQueryResult::Manifest(_) => Err(KdcError::TransportFailure("expected a chunk, got a manifest".into())),
    }
}

async fn query_kmreq(kdc_addr: &str, node_id: &str, distribution_id: &str, chunk: Option<u16>) -> Result<KrsQueryResult, KdcError> {
    let node_id = Name::<Bytes>::from_str(node_id)
        .map_err(|_| KdcError::Validation(format!("invalid node id FQDN: '{node_id}'")))?;
    let command = KrsQueryCommand::QueryKmreq { node_id, distribution_id: distribution_id.to_string(), chunk };

    let url = format!("{}/krs/query", kdc_addr.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .json(&command)
        .send()
        .await
        .map_err(|e| KdcError::TransportFailure(format!("query to '{url}' failed: {e}")))?;

    let envelope: Envelope<KrsQueryResult> = response
        .json()
        .await
        .map_err(|e| KdcError::TransportFailure(format!("could not decode response from '{url}': {e}")))?;

    match envelope {
        Envelope::Ok { data, .. } => Ok(data),
        Envelope::Err { error_msg, .. } => Err(KdcError::TransportFailure(error_msg)),
    }
}

/// Send the confirmation NOTIFY back to the KDC that issued `distribution_id`
/// (spec §4.8 step 7).
pub async fn confirm(kdc_addr: &str, control_zone: &str, distribution_id: &str, node_id: &str) -> Result<(), KdcError> {
    let qname = crate::dns::notify_qname(control_zone, distribution_id);
    crate::dns::send_notify(kdc_addr, &qname, Some(node_id)).await
}
