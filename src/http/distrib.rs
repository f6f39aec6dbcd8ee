//! `/kdc/distrib`: list, state, completed, purge.
//!
//! Distribution rows are stored one per (distribution_id, recipient node)
//! pair; this handler groups them back into the distribution-id-shaped
//! view the API exposes.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use domain::base::Name;

use crate::catalog::store;
use crate::catalog::DistributionRow;
use crate::center::Center;
use crate::error::KdcError;
use crate::http::{fqdn, respond};
use signpost_api::distrib::{DistribCommand, DistributionDto, DistribResult};
use signpost_api::DistributionStatus;

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<DistribCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<DistribResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: DistribCommand) -> Result<DistribResult, KdcError> {
    let pool = &center.pool;
    match command {
        DistribCommand::List => {
            let rows = store::list_distributions(pool).await?;
            let mut dtos = Vec::new();
            for group in group_by_distribution_id(rows) {
                let confirmed = store::confirmed_nodes(pool, &group.0).await?;
                dtos.push(to_dto(&group.0, &group.1, &confirmed)?);
            }
            Ok(DistribResult::Distributions(dtos))
        }
        DistribCommand::State { distribution_id } => {
            let (records, confirmed) = store::distribution_state(pool, &distribution_id).await?;
            if records.is_empty() {
                return Err(KdcError::NotFound(format!("no distribution record for id {distribution_id}")));
            }
            Ok(DistribResult::Distribution(to_dto(&distribution_id, &records, &confirmed)?))
        }
        DistribCommand::Completed => {
            let rows = store::list_distributions(pool).await?;
            let mut dtos = Vec::new();
            for group in group_by_distribution_id(rows) {
                if group.1.iter().all(|r| r.status == "completed") {
                    let confirmed = store::confirmed_nodes(pool, &group.0).await?;
                    dtos.push(to_dto(&group.0, &group.1, &confirmed)?);
                }
            }
            Ok(DistribResult::Distributions(dtos))
        }
        DistribCommand::Purge { force } => {
            let purged = crate::distribution::gc(center, center.config.gc_grace_secs as i64, force).await?;
            Ok(DistribResult::Purged { purged })
        }
    }
}

fn group_by_distribution_id(rows: Vec<DistributionRow>) -> Vec<(String, Vec<DistributionRow>)> {
    let mut groups: Vec<(String, Vec<DistributionRow>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(id, _)| *id == row.distribution_id) {
            Some((_, records)) => records.push(row),
            None => groups.push((row.distribution_id.clone(), vec![row])),
        }
    }
    groups
}

fn to_dto(distribution_id: &str, records: &[DistributionRow], confirmed: &[String]) -> Result<DistributionDto, KdcError> {
    let first = records.first().ok_or_else(|| KdcError::NotFound(format!("no distribution record for id {distribution_id}")))?;
    let status = if records.iter().all(|r| r.status == "completed") {
        DistributionStatus::Completed
    } else {
        DistributionStatus::Pending
    };
    let recipients: Result<Vec<Name<Bytes>>, KdcError> = records.iter().map(|r| fqdn(&r.node)).collect();
    let confirmed: Result<Vec<Name<Bytes>>, KdcError> = confirmed.iter().map(|n| fqdn(n)).collect();
    Ok(DistributionDto {
        distribution_id: distribution_id.to_string(),
        zone: fqdn(&first.zone)?,
        key_id: first.key_id,
        recipients: recipients?,
        confirmed: confirmed?,
        status,
        created_at: first.created_at,
        completed_at: records.iter().filter_map(|r| r.completed_at).max(),
    })
}
