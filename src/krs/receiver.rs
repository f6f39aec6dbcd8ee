//! Inbound distribution receipt (spec §4.8): turn a NOTIFY into an
//! installed key, or a surfaced test payload.

use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::catalog::store;
use crate::crypto::hpke;
use crate::error::KdcError;
use signpost_api::krs::ManifestDto;
use signpost_cfg::Config;

#[derive(Debug, Deserialize)]
struct EncryptedKeyEntry {
    zone_name: String,
    keytag: i64,
    key_type: String,
    algorithm: String,
    public_key: String,
    encrypted_key: String,
    ephemeral_pub_key: String,
}

/// Handle an inbound NOTIFY: extract the distribution id, fetch and verify
/// its manifest, dispatch on content, and confirm back to the KDC (spec
/// §4.8 steps 1-7).
pub async fn handle_notify(pool: &SqlitePool, config: &Config, qname: &str) -> Result<(), KdcError> {
    let distribution_id = crate::dns::first_label(qname)
        .ok_or_else(|| KdcError::Validation(format!("NOTIFY qname '{qname}' has no label to use as a distribution id")))?;
    let node_id = config
        .node_id
        .as_deref()
        .ok_or_else(|| KdcError::Validation("this KRS instance has no 'node_id' configured".into()))?;
    let kdc_addr = config
        .kdc_addr
        .as_deref()
        .ok_or_else(|| KdcError::Validation("this KRS instance has no 'kdc_addr' configured".into()))?;

    let manifest = crate::krs::client::fetch_manifest(kdc_addr, node_id, distribution_id).await?;
    let b64 = match &manifest.payload {
        Some(inline) => inline.clone(),
        None => fetch_all_chunks(kdc_addr, node_id, distribution_id, manifest.chunk_count).await?,
    };
    let payload = base64::engine::general_purpose::STANDARD
        .decode(&b64)
        .map_err(|e| KdcError::Validation(format!("manifest payload is not valid base64: {e}")))?;

    verify_checksum(&manifest.checksum, &payload)?;
    verify_freshness(&manifest.metadata, config.distribution_ttl_secs)?;

    let content = manifest.metadata.get("content").and_then(|v| v.as_str()).unwrap_or_default();
    match content {
        "encrypted_keys" => {
            install_encrypted_keys(pool, &manifest, &payload).await?;
        }
        "clear_text" | "encrypted_text" => {
            tracing::info!(
                "Distribution '{distribution_id}' carried a '{content}' test payload of {} bytes",
                payload.len()
            );
        }
        other => tracing::warn!("Distribution '{distribution_id}' has unrecognised content '{other}'; ignoring"),
    }

    crate::krs::client::confirm(kdc_addr, &config.control_zone, distribution_id, node_id).await
}

async fn fetch_all_chunks(kdc_addr: &str, node_id: &str, distribution_id: &str, chunk_count: u16) -> Result<String, KdcError> {
    let mut b64 = String::new();
    for idx in 0..chunk_count {
        let chunk = crate::krs::client::fetch_chunk(kdc_addr, node_id, distribution_id, idx).await?;
        b64.push_str(&chunk.data);
    }
    Ok(b64)
}

fn verify_checksum(expected: &str, payload: &[u8]) -> Result<(), KdcError> {
    let actual = format!("sha256:{:x}", Sha256::digest(payload));
    if actual != expected {
        return Err(KdcError::Validation(format!(
            "manifest checksum mismatch: expected '{expected}', computed '{actual}'"
        )));
    }
    Ok(())
}

fn verify_freshness(metadata: &serde_json::Value, distribution_ttl_secs: u64) -> Result<(), KdcError> {
    let timestamp = metadata
        .get("timestamp")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| KdcError::Validation("manifest metadata has no 'timestamp'".into()))?;
    let ttl = metadata
        .get("distribution_ttl")
        .and_then(|v| v.as_i64())
        .unwrap_or(distribution_ttl_secs as i64);
    let age = crate::common::now() - timestamp;
    if age < 0 || age > ttl {
        return Err(KdcError::Freshness(format!("manifest is {age}s old, exceeding its {ttl}s TTL")));
    }
    Ok(())
}

/// `content = "encrypted_keys"`: decrypt every entry with this node's
/// static private key and install it, retiring whatever previously held
/// the same (zone, key_type) hot state (spec §4.8 step 6).
pub(crate) async fn install_encrypted_keys(
    pool: &SqlitePool,
    manifest: &ManifestDto,
    payload: &[u8],
) -> Result<Vec<crate::catalog::InstalledKeyRow>, KdcError> {
    let identity = store::get_node_identity(pool)
        .await?
        .ok_or_else(|| KdcError::Validation("this KRS instance has no identity yet".into()))?;
    let entries: Vec<EncryptedKeyEntry> = serde_json::from_slice(payload)
        .map_err(|e| KdcError::Validation(format!("encrypted_keys payload is not valid JSON: {e}")))?;

    let distribution_id = manifest
        .metadata
        .get("distribution_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let retire_time_secs = manifest.metadata.get("retire_time").and_then(|v| v.as_i64()).unwrap_or(60 * 60 * 24);
    let now = crate::common::now();
    let mut installed_rows = Vec::with_capacity(entries.len());

    for entry in entries {
        let ephemeral_pub = base64::engine::general_purpose::STANDARD
            .decode(&entry.ephemeral_pub_key)
            .map_err(|e| KdcError::Validation(format!("bad ephemeral public key encoding: {e}")))?;
        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(&entry.encrypted_key)
            .map_err(|e| KdcError::Validation(format!("bad encrypted key encoding: {e}")))?;
        let mut envelope = Vec::with_capacity(ephemeral_pub.len() + ciphertext.len());
        envelope.extend_from_slice(&ephemeral_pub);
        envelope.extend_from_slice(&ciphertext);

        let private_key = hpke::decrypt(&identity.private_key, &envelope)?;

        let hot_state = if entry.key_type == "zsk" { "edgesigner" } else { "active" };
        let installed = store::install_key(
            pool,
            &entry.zone_name,
            &entry.key_type,
            entry.keytag,
            distribution_id,
            &entry.algorithm,
            &entry.public_key,
            &private_key,
            hot_state,
            retire_time_secs,
            now,
        )
        .await?;
        store::retire_other_installed_keys(pool, &entry.zone_name, &entry.key_type, hot_state, installed.id, now).await?;
        installed_rows.push(installed);
    }
    Ok(installed_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn accepts_a_fresh_manifest() {
        let metadata = serde_json::json!({"timestamp": crate::common::now(), "distribution_ttl": 300});
        assert!(verify_freshness(&metadata, 300).is_ok());
    }

    #[test]
    fn rejects_an_expired_manifest() {
        let metadata = serde_json::json!({"timestamp": crate::common::now() - 10_000, "distribution_ttl": 300});
        assert!(verify_freshness(&metadata, 300).is_err());
    }

    #[test]
    fn rejects_a_mismatched_checksum() {
        assert!(verify_checksum("sha256:deadbeef", b"hello").is_err());
    }

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.expect("in-memory pool");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
        pool
    }

    /// A KSK install must land in `active`, not some non-existent
    /// `active_ce` state the `installed_keys.state` CHECK constraint
    /// would reject.
    #[tokio::test]
    async fn ksk_install_lands_in_active_state() {
        let pool = test_pool().await;
        let node_keys = hpke::generate_keypair().unwrap();
        store::set_node_identity(&pool, "n1.example.test.", &node_keys.public_key, &node_keys.private_key).await.unwrap();

        let ksk_private_key = b"pretend-pkcs8-private-key-bytes".to_vec();
        let envelope = hpke::encrypt(&node_keys.public_key, &ksk_private_key).unwrap();
        let (ephemeral_pub, ciphertext) = envelope.split_at(32);

        let entries = serde_json::json!([{
            "zone_name": "example.test.",
            "key_id": 1,
            "keytag": 12345,
            "key_type": "ksk",
            "algorithm": "Ed25519",
            "public_key": "cHVibGljLWtleQ==",
            "encrypted_key": base64::engine::general_purpose::STANDARD.encode(ciphertext),
            "ephemeral_pub_key": base64::engine::general_purpose::STANDARD.encode(ephemeral_pub),
        }]);
        let payload = serde_json::to_vec(&entries).unwrap();
        let manifest = ManifestDto {
            chunk_count: 0,
            chunk_size: 0,
            checksum: String::new(),
            metadata: serde_json::json!({"distribution_id": "abcd", "retire_time": 86_400}),
            payload: None,
        };

        let installed = install_encrypted_keys(&pool, &manifest, &payload).await.unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].state, "active");
        assert_eq!(installed[0].key_type, "ksk");
    }
}
