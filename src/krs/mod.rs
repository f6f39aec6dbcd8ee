//! The Key Receiving Service (spec §4.8): a small daemon that runs on an
//! edge signer node, pulls distributions from a KDC, and installs them.

pub mod client;
pub mod receiver;
pub mod retirement;

use crate::catalog::store;
use crate::crypto::hpke;
use crate::error::KdcError;
use signpost_cfg::Config;
use sqlx::SqlitePool;

/// Load this node's identity, generating and persisting a fresh X25519 key
/// pair on first start (spec §4.1: every node has a long-term key pair).
pub async fn ensure_identity(pool: &SqlitePool, config: &Config) -> Result<crate::catalog::NodeIdentityRow, KdcError> {
    if let Some(identity) = store::get_node_identity(pool).await? {
        return Ok(identity);
    }
    let node_id = config
        .node_id
        .as_deref()
        .ok_or_else(|| KdcError::Validation("this KRS instance has no 'node_id' configured and no identity stored yet".into()))?;
    let keypair = hpke::generate_keypair()?;
    store::set_node_identity(pool, node_id, &keypair.public_key, &keypair.private_key).await
}
