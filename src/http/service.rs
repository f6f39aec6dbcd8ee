//! `/kdc/service`: add, list, get, update, delete.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::catalog::store;
use crate::center::Center;
use crate::error::KdcError;
use crate::http::respond;
use signpost_api::service::{ServiceCommand, ServiceDto, ServiceResult};

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<ServiceCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<ServiceResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: ServiceCommand) -> Result<ServiceResult, KdcError> {
    let pool = &center.pool;
    let now = crate::common::now();
    match command {
        ServiceCommand::Add { name } => {
            let service = store::create_service(pool, &name, now).await?;
            Ok(ServiceResult::Service(to_dto(&service)))
        }
        ServiceCommand::List => {
            let services = store::list_services(pool).await?;
            Ok(ServiceResult::Services(services.iter().map(to_dto).collect()))
        }
        ServiceCommand::Get { id } => Ok(ServiceResult::Service(to_dto(&store::get_service(pool, id).await?))),
        ServiceCommand::Update { id, active } => {
            let service = store::update_service(pool, id, None, active, now).await?;
            Ok(ServiceResult::Service(to_dto(&service)))
        }
        ServiceCommand::Delete { id } => {
            store::delete_service(pool, id).await?;
            Ok(ServiceResult::Deleted { deleted: 1 })
        }
    }
}

fn to_dto(service: &crate::catalog::ServiceRow) -> ServiceDto {
    ServiceDto { id: service.id, name: service.name.clone(), active: service.active }
}
