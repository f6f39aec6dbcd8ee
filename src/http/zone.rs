//! `/kdc/zone`: add, list, get, get-keys, generate-key, encrypt-key,
//! update, delete, distrib-single, distrib-multi, transition, setstate,
//! delete-key, purge-keys, set-service.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use base64::Engine;
use bytes::Bytes;
use domain::base::Name;

use crate::catalog::store;
use crate::center::Center;
use crate::crypto::{hpke, keygen};
use crate::error::KdcError;
use crate::http::{fqdn, respond};
use crate::{distribution, state_machine};
use signpost_api::zone::{KeyDto, ZoneCommand, ZoneDto, ZoneResult};
use signpost_api::{Algorithm, KeyState, KeyType};

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<ZoneCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<ZoneResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: ZoneCommand) -> Result<ZoneResult, KdcError> {
    let pool = &center.pool;
    let now = crate::common::now();
    match command {
        ZoneCommand::Add { name, service_id } => {
            let zone = store::create_zone(pool, &name.to_string(), service_id, now).await?;
            Ok(ZoneResult::Zone(to_zone_dto(&zone)?))
        }
        ZoneCommand::List => {
            let zones = store::list_zones(pool).await?;
            Ok(ZoneResult::Zones(zones.iter().map(to_zone_dto).collect::<Result<_, _>>()?))
        }
        ZoneCommand::Get { name } => {
            let zone = store::get_zone(pool, &name.to_string()).await?;
            Ok(ZoneResult::Zone(to_zone_dto(&zone)?))
        }
        ZoneCommand::GetKeys { name } => {
            let keys = store::list_keys_for_zone(pool, &name.to_string()).await?;
            Ok(ZoneResult::Keys(keys.iter().map(to_key_dto).collect::<Result<_, _>>()?))
        }
        ZoneCommand::GenerateKey { name, key_type, algorithm } => {
            let key = generate_key(pool, &name, key_type, algorithm, now).await?;
            Ok(ZoneResult::Key(to_key_dto(&key)?))
        }
        ZoneCommand::EncryptKey { name: _, key_id, node_id } => {
            let key = store::get_key(pool, key_id).await?;
            let node = store::get_node(pool, &node_id.to_string()).await?;
            let ciphertext = hpke::encrypt(&node.public_key, &key.private_key)?;
            Ok(ZoneResult::Encrypted { ciphertext: base64::engine::general_purpose::STANDARD.encode(ciphertext) })
        }
        ZoneCommand::Update { name, active } => {
            let zone = store::update_zone(pool, &name.to_string(), active, now).await?;
            Ok(ZoneResult::Zone(to_zone_dto(&zone)?))
        }
        ZoneCommand::Delete { name } => {
            store::delete_zone(pool, &name.to_string()).await?;
            Ok(ZoneResult::Deleted { deleted: 1 })
        }
        ZoneCommand::DistribSingle { name: _, key_id, node_id } => {
            distribution::start(center, key_id, &[node_id.to_string()]).await?;
            Ok(ZoneResult::Unit {})
        }
        ZoneCommand::DistribMulti { name, key_id } => {
            let recipients = store::nodes_serving_zone(pool, &name.to_string()).await?.into_iter().map(|n| n.id).collect::<Vec<_>>();
            distribution::start(center, key_id, &recipients).await?;
            Ok(ZoneResult::Unit {})
        }
        ZoneCommand::Transition { key_id, to } | ZoneCommand::Setstate { key_id, to } => {
            let key = state_machine::transition(pool, key_id, to_event(to)?).await?;
            Ok(ZoneResult::Key(to_key_dto(&key)?))
        }
        ZoneCommand::DeleteKey { key_id } => {
            store::delete_key(pool, key_id).await?;
            Ok(ZoneResult::Deleted { deleted: 1 })
        }
        ZoneCommand::PurgeKeys { name: _ } => {
            let purged = state_machine::purge_removed(pool).await?;
            Ok(ZoneResult::Deleted { deleted: purged })
        }
        ZoneCommand::SetService { name, service_id } => {
            let zone = store::set_zone_service(pool, &name.to_string(), service_id, now).await?;
            Ok(ZoneResult::Zone(to_zone_dto(&zone)?))
        }
    }
}

async fn generate_key(
    pool: &sqlx::SqlitePool,
    zone: &Name<Bytes>,
    key_type: KeyType,
    algorithm: Algorithm,
    now: i64,
) -> Result<crate::catalog::KeyRow, KdcError> {
    let flags: u16 = match key_type {
        KeyType::Zsk => 256,
        KeyType::Ksk | KeyType::Csk => 257,
    };
    let generated = keygen::generate(algorithm, flags).map_err(|e| KdcError::CryptoFailure(e.to_string()))?;
    let distribution_id = crate::common::distribution_id_from_keytag(generated.keytag);
    let public_key_b64 = base64::engine::general_purpose::STANDARD.encode(&generated.public_key);
    store::insert_key(
        pool,
        &zone.to_string(),
        key_type_str(key_type),
        generated.keytag as i64,
        &distribution_id,
        &algorithm.to_string(),
        flags as i64,
        &public_key_b64,
        &generated.pkcs8,
        now,
    )
    .await
}

fn key_type_str(key_type: KeyType) -> &'static str {
    match key_type {
        KeyType::Ksk => "ksk",
        KeyType::Zsk => "zsk",
        KeyType::Csk => "csk",
    }
}

fn to_event(state: KeyState) -> Result<state_machine::Event, KdcError> {
    use state_machine::Event;
    Ok(match state {
        KeyState::Published => Event::Publish,
        KeyState::Standby => Event::Standby,
        KeyState::Active => Event::Activate,
        KeyState::ActiveDist => Event::ActivateDist,
        KeyState::ActiveCe => Event::ActivateCe,
        KeyState::Distributed => Event::Distribute,
        KeyState::Edgesigner => Event::Edgesigner,
        KeyState::Retired => Event::Retire,
        KeyState::Removed => Event::Remove,
        KeyState::Revoked => Event::Revoke,
        KeyState::Created => return Err(KdcError::Validation("'created' is an initial state, not a transition target".into())),
    })
}

fn to_zone_dto(zone: &crate::catalog::ZoneRow) -> Result<ZoneDto, KdcError> {
    Ok(ZoneDto { name: fqdn(&zone.name)?, active: zone.active, service_id: zone.service_id })
}

fn to_key_dto(key: &crate::catalog::KeyRow) -> Result<KeyDto, KdcError> {
    Ok(KeyDto {
        id: key.id,
        zone: fqdn(&key.zone)?,
        key_type: parse_key_type(&key.key_type)?,
        keytag: key.keytag as u16,
        distribution_id: key.distribution_id.clone(),
        algorithm: Algorithm::from_str(&key.algorithm).map_err(|e| KdcError::Validation(e.to_string()))?,
        flags: key.flags as u16,
        public_key: key.public_key.clone(),
        state: KeyState::from_str(&key.state).map_err(|e| KdcError::Validation(e.to_string()))?,
        created_at: key.created_at,
        published_at: key.published_at,
        activated_at: key.activated_at,
        retired_at: key.retired_at,
    })
}

pub(crate) fn parse_key_type(s: &str) -> Result<KeyType, KdcError> {
    match s {
        "ksk" => Ok(KeyType::Ksk),
        "zsk" => Ok(KeyType::Zsk),
        "csk" => Ok(KeyType::Csk),
        other => Err(KdcError::Validation(format!("unknown key type stored in catalog: '{other}'"))),
    }
}
