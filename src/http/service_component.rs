//! `/kdc/service-component`: add, delete, list, replace.
//!
//! `Replace` is the only command that can trigger distribution work, since
//! it is the one a `service-transaction` `commit` ultimately performs; a
//! direct `replace` call here bypasses the transaction's snapshot-drift
//! check and applies immediately (spec §4.4's delta engine still runs, via
//! [`crate::membership::compute_delta`], so distributions are still
//! planned and applied).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::catalog::store;
use crate::center::Center;
use crate::distribution;
use crate::error::KdcError;
use crate::http::{component::to_dto, respond};
use signpost_api::component::{ServiceComponentCommand, ServiceComponentResult};

pub async fn handle(
    State(center): State<Arc<Center>>,
    Json(command): Json<ServiceComponentCommand>,
) -> (axum::http::StatusCode, Json<signpost_api::Envelope<ServiceComponentResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: ServiceComponentCommand) -> Result<ServiceComponentResult, KdcError> {
    let pool = &center.pool;
    let now = crate::common::now();
    match command {
        ServiceComponentCommand::Add { service_id, component_id } => {
            store::assign_service_component(pool, service_id, &component_id, now).await?;
            Ok(ServiceComponentResult::Unit {})
        }
        ServiceComponentCommand::Delete { service_id, component_id } => {
            store::unassign_service_component(pool, service_id, &component_id).await?;
            Ok(ServiceComponentResult::Deleted { deleted: 1 })
        }
        ServiceComponentCommand::List { service_id } => {
            let mut components = Vec::new();
            for row in store::list_service_components(pool, service_id).await? {
                components.push(to_dto(&store::get_component(pool, &row.component_id).await?));
            }
            Ok(ServiceComponentResult::Components(components))
        }
        ServiceComponentCommand::Replace { service_id, component_ids } => {
            let now_ids: Vec<String> = store::list_service_components(pool, service_id)
                .await?
                .into_iter()
                .map(|r| r.component_id)
                .collect();
            let to_add: Vec<String> = component_ids.iter().filter(|c| !now_ids.contains(c)).cloned().collect();
            let to_remove: Vec<String> = now_ids.iter().filter(|c| !component_ids.contains(c)).cloned().collect();
            let report = crate::membership::compute_delta(pool, service_id, &now_ids, &to_add, &to_remove).await?;
            if !report.is_valid {
                return Err(KdcError::Validation(format!(
                    "service {service_id} would carry {} signing components, not exactly one",
                    report.summary
                )));
            }
            let mut tx = pool.begin().await.map_err(KdcError::from)?;
            store::replace_service_components(&mut tx, service_id, &component_ids, now).await?;
            tx.commit().await.map_err(KdcError::from)?;
            distribution::apply_delta(center, &report).await;
            Ok(ServiceComponentResult::Unit {})
        }
    }
}
