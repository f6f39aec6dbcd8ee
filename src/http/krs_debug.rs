//! `/krs/debug`: manually drive a distribution fetch, bypassing NOTIFY,
//! for operators poking at a stuck edge signer.

use std::sync::Arc;

use base64::Engine;

use axum::extract::State;
use axum::Json;

use crate::center::Center;
use crate::error::KdcError;
use crate::http::{krs_keys, respond};
use crate::krs::{client, receiver};
use signpost_api::krs::{KrsDebugCommand, KrsDebugResult};

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<KrsDebugCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<KrsDebugResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: KrsDebugCommand) -> Result<KrsDebugResult, KdcError> {
    match command {
        KrsDebugCommand::FetchDistribution { kdc_addr, node_id, distribution_id } => {
            let node_id = node_id.to_string();
            let manifest = client::fetch_manifest(&kdc_addr, &node_id, &distribution_id).await?;
            let b64 = match &manifest.payload {
                Some(inline) => inline.clone(),
                None => {
                    let mut b64 = String::new();
                    for idx in 0..manifest.chunk_count {
                        let chunk = client::fetch_chunk(&kdc_addr, &node_id, &distribution_id, idx).await?;
                        b64.push_str(&chunk.data);
                    }
                    b64
                }
            };
            let payload = base64::engine::general_purpose::STANDARD
                .decode(&b64)
                .map_err(|e| KdcError::Validation(format!("manifest payload is not valid base64: {e}")))?;

            let content = manifest.metadata.get("content").and_then(|v| v.as_str()).unwrap_or_default();
            if content != "encrypted_keys" {
                return Err(KdcError::Validation(format!("debug fetch only installs 'encrypted_keys' content, got '{content}'")));
            }
            let rows = receiver::install_encrypted_keys(&center.pool, &manifest, &payload).await?;
            let installed = rows.iter().map(krs_keys::to_dto).collect::<Result<_, _>>()?;
            Ok(KrsDebugResult::Installed { installed })
        }
    }
}
