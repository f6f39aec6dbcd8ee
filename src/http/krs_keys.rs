//! `/krs/keys`: list, get, get-by-zone, hash, purge, delete.

use std::sync::Arc;
use std::str::FromStr;

use axum::extract::State;
use axum::Json;
use sha2::{Digest, Sha256};

use crate::catalog::store;
use crate::center::Center;
use crate::error::KdcError;
use crate::http::{fqdn, zone::parse_key_type, respond};
use signpost_api::krs::{InstalledKeyDto, KrsKeysCommand, KrsKeysResult};
use signpost_api::KeyState;

pub async fn handle(State(center): State<Arc<Center>>, Json(command): Json<KrsKeysCommand>) -> (axum::http::StatusCode, Json<signpost_api::Envelope<KrsKeysResult>>) {
    respond(run(&center, command).await)
}

async fn run(center: &Arc<Center>, command: KrsKeysCommand) -> Result<KrsKeysResult, KdcError> {
    let pool = &center.pool;
    match command {
        KrsKeysCommand::List => {
            let keys = store::list_installed_keys(pool).await?;
            Ok(KrsKeysResult::Keys(keys.iter().map(to_dto).collect::<Result<_, _>>()?))
        }
        KrsKeysCommand::GetByZone { zone } => {
            let keys = store::installed_keys_for_zone(pool, &zone.to_string()).await?;
            Ok(KrsKeysResult::Keys(keys.iter().map(to_dto).collect::<Result<_, _>>()?))
        }
        KrsKeysCommand::Get { zone, keytag } => {
            let key = store::get_installed_key(pool, &zone.to_string(), keytag as i64).await?;
            Ok(KrsKeysResult::Key(to_dto(&key)?))
        }
        KrsKeysCommand::Hash => {
            let keys = store::list_installed_keys(pool).await?;
            let mut hasher = Sha256::new();
            for key in &keys {
                hasher.update(key.zone.as_bytes());
                hasher.update(key.keytag.to_be_bytes());
                hasher.update(key.public_key.as_bytes());
                hasher.update(key.state.as_bytes());
            }
            let digest = hasher.finalize();
            let hash = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
            Ok(KrsKeysResult::Hash(hash))
        }
        KrsKeysCommand::Purge => {
            let purged = store::purge_installed_keys(pool).await?;
            Ok(KrsKeysResult::Purged { purged })
        }
        KrsKeysCommand::Delete { zone, keytag } => {
            let key = store::get_installed_key(pool, &zone.to_string(), keytag as i64).await?;
            store::delete_installed_key(pool, key.id).await?;
            Ok(KrsKeysResult::Deleted { deleted: 1 })
        }
    }
}

pub(crate) fn to_dto(key: &crate::catalog::InstalledKeyRow) -> Result<InstalledKeyDto, KdcError> {
    Ok(InstalledKeyDto {
        zone: fqdn(&key.zone)?,
        key_type: parse_key_type(&key.key_type)?,
        keytag: key.keytag as u16,
        algorithm: key.algorithm.clone(),
        public_key: key.public_key.clone(),
        state: KeyState::from_str(&key.state).map_err(|e| KdcError::Validation(e.to_string()))?,
        installed_at: key.installed_at,
        retired_at: key.retired_at,
        retire_time_secs: Some(key.retire_time_secs as u64),
    })
}
