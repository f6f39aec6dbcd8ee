//! `/kdc/node-component`: add, delete, list.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::catalog::store;
use crate::center::Center;
use crate::error::KdcError;
use crate::http::{component::to_dto, respond};
use signpost_api::component::{NodeComponentCommand, NodeComponentResult};

pub async fn handle(
    State(center): State<Arc<Center>>,
    Json(command): Json<NodeComponentCommand>,
) -> (axum::http::StatusCode, Json<signpost_api::Envelope<NodeComponentResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: NodeComponentCommand) -> Result<NodeComponentResult, KdcError> {
    let pool = &center.pool;
    let now = crate::common::now();
    match command {
        NodeComponentCommand::Add { node_id, component_id } => {
            store::assign_node_component(pool, &node_id.to_string(), &component_id, now).await?;
            Ok(NodeComponentResult::Unit {})
        }
        NodeComponentCommand::Delete { node_id, component_id } => {
            store::unassign_node_component(pool, &node_id.to_string(), &component_id).await?;
            Ok(NodeComponentResult::Deleted { deleted: 1 })
        }
        NodeComponentCommand::List { node_id } => {
            let mut components = Vec::new();
            for row in store::list_node_components(pool, &node_id.to_string()).await? {
                components.push(to_dto(&store::get_component(pool, &row.component_id).await?));
            }
            Ok(NodeComponentResult::Components(components))
        }
    }
}
