//! `/kdc/component`: add, list, get, update, delete.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::catalog::store;
use crate::center::Center;
use crate::error::KdcError;
use crate::http::respond;
use signpost_api::component::{ComponentCommand, ComponentDto, ComponentResult};

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<ComponentCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<ComponentResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: ComponentCommand) -> Result<ComponentResult, KdcError> {
    let pool = &center.pool;
    let now = crate::common::now();
    match command {
        ComponentCommand::Add { id, name } => {
            let system = id.starts_with("sign_");
            let component = store::create_component(pool, &id, &name, system, now).await?;
            Ok(ComponentResult::Component(to_dto(&component)))
        }
        ComponentCommand::List => {
            let components = store::list_components(pool).await?;
            Ok(ComponentResult::Components(components.iter().map(to_dto).collect()))
        }
        ComponentCommand::Get { id } => Ok(ComponentResult::Component(to_dto(&store::get_component(pool, &id).await?))),
        ComponentCommand::Update { id, active } => {
            let component = store::update_component(pool, &id, None, active, now).await?;
            Ok(ComponentResult::Component(to_dto(&component)))
        }
        ComponentCommand::Delete { id } => {
            let component = store::get_component(pool, &id).await?;
            if component.system {
                return Err(KdcError::Validation(format!("component '{id}' is a system component and cannot be deleted")));
            }
            store::delete_component(pool, &id).await?;
            Ok(ComponentResult::Deleted { deleted: 1 })
        }
    }
}

pub(crate) fn to_dto(component: &crate::catalog::ComponentRow) -> ComponentDto {
    ComponentDto { id: component.id.clone(), name: component.name.clone(), active: component.active, system: component.system }
}
