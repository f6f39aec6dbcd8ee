//! `/kdc/node`: add, list, get, update, set-state, delete.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use base64::Engine;

use crate::catalog::store;
use crate::center::Center;
use crate::error::KdcError;
use crate::http::{fqdn, respond};
use signpost_api::node::{NodeCommand, NodeDto, NodeResult};
use signpost_api::NodeState;

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<NodeCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<NodeResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: NodeCommand) -> Result<NodeResult, KdcError> {
    let pool = &center.pool;
    let now = crate::common::now();
    match command {
        NodeCommand::Add { id, public_key, notify_addr } => {
            let public_key = base64::engine::general_purpose::STANDARD
                .decode(&public_key)
                .map_err(|e| KdcError::Validation(format!("node public key is not valid base64: {e}")))?;
            let node = store::create_node(pool, &id.to_string(), &public_key, notify_addr.as_deref(), now).await?;
            Ok(NodeResult::Node(to_node_dto(&node)?))
        }
        NodeCommand::List => {
            let nodes = store::list_nodes(pool).await?;
            Ok(NodeResult::Nodes(nodes.iter().map(to_node_dto).collect::<Result<_, _>>()?))
        }
        NodeCommand::Get { id } => {
            let node = store::get_node(pool, &id.to_string()).await?;
            Ok(NodeResult::Node(to_node_dto(&node)?))
        }
        NodeCommand::Update { id, notify_addr } => {
            let node = store::update_node(pool, &id.to_string(), notify_addr.as_deref(), now).await?;
            Ok(NodeResult::Node(to_node_dto(&node)?))
        }
        NodeCommand::SetState { id, state } => {
            let node = store::set_node_state(pool, &id.to_string(), node_state_str(state), now).await?;
            Ok(NodeResult::Node(to_node_dto(&node)?))
        }
        NodeCommand::Delete { id } => {
            store::delete_node(pool, &id.to_string()).await?;
            Ok(NodeResult::Deleted { deleted: 1 })
        }
    }
}

fn node_state_str(state: NodeState) -> &'static str {
    match state {
        NodeState::Online => "online",
        NodeState::Offline => "offline",
        NodeState::Compromised => "compromised",
        NodeState::Suspended => "suspended",
    }
}

fn parse_node_state(s: &str) -> Result<NodeState, KdcError> {
    match s {
        "online" => Ok(NodeState::Online),
        "offline" => Ok(NodeState::Offline),
        "compromised" => Ok(NodeState::Compromised),
        "suspended" => Ok(NodeState::Suspended),
        other => Err(KdcError::Validation(format!("unknown node state stored in catalog: '{other}'"))),
    }
}

fn to_node_dto(node: &crate::catalog::NodeRow) -> Result<NodeDto, KdcError> {
    Ok(NodeDto {
        id: fqdn(&node.id)?,
        public_key: base64::engine::general_purpose::STANDARD.encode(&node.public_key),
        notify_addr: node.notify_addr.clone(),
        state: parse_node_state(&node.state)?,
        last_seen: node.last_seen,
    })
}

