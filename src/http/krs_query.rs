//! `/krs/query`: `query-kmreq`, answered out of the manifest/chunk cache
//! (spec §4.7).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::center::Center;
use crate::error::KdcError;
use crate::http::respond;
use signpost_api::krs::{KrsQueryCommand, KrsQueryResult};

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<KrsQueryCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<KrsQueryResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: KrsQueryCommand) -> Result<KrsQueryResult, KdcError> {
    let control = center.control_params();
    match command {
        KrsQueryCommand::QueryKmreq { node_id, distribution_id, chunk: None } => {
            let manifest = center.transport.manifest(&center.pool, &node_id.to_string(), &distribution_id, &control).await?;
            Ok(KrsQueryResult::Manifest(manifest))
        }
        KrsQueryCommand::QueryKmreq { node_id, distribution_id, chunk: Some(idx) } => {
            let chunk = center.transport.chunk(&center.pool, &node_id.to_string(), &distribution_id, idx, &control).await?;
            Ok(KrsQueryResult::Chunk(chunk))
        }
    }
}
