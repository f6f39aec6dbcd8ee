//! Manifest/chunk transport (spec §4.7).
//!
//! Builds the JSONMANIFEST/JSONCHUNK payloads the distribution engine's
//! records answer to, caches them in memory keyed by `(node,
//! distribution_id)`, and splits oversized payloads into chunks the way a
//! DNS response bounded by `jsonchunk_max_size` would have to.

use base64::Engine;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::catalog::store;
use crate::error::KdcError;
use signpost_api::dns::KmctrlDto;
use signpost_api::krs::{ChunkDto, ManifestDto};

/// Above this base64 length, or if the packed record would exceed
/// [`INLINE_MAX_RECORD_LEN`], the payload is chunked instead of inlined
/// (spec §4.7's "~500 bytes" / "~1050 bytes" inline thresholds).
const INLINE_MAX_B64_LEN: usize = 500;
const INLINE_MAX_RECORD_LEN: usize = 1050;

/// Parameters from [`signpost_cfg::Config`] the transport needs but
/// shouldn't depend on the whole config type for (keeps this module
/// testable without a `Config` in scope).
pub struct ControlParams {
    pub jsonchunk_max_size: u32,
    pub distribution_ttl_secs: u64,
    pub retire_time_secs: u64,
}

#[derive(Clone)]
struct CachedManifest {
    manifest: ManifestDto,
    chunks: Vec<String>,
}

/// The in-memory manifest/chunk cache (spec §4.7: "invalidate on
/// delete-distribution or forced purge").
pub struct Cache {
    entries: Mutex<foldhash::HashMap<(String, String), CachedManifest>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(foldhash::HashMap::default()) }
    }

    pub async fn invalidate(&self, node: &str, distribution_id: &str) {
        self.entries.lock().await.remove(&(node.to_string(), distribution_id.to_string()));
    }

    pub async fn invalidate_all(&self) {
        self.entries.lock().await.clear();
    }

    /// Fetch (preparing lazily) the manifest for `(node, distribution_id)`.
    pub async fn manifest(&self, pool: &SqlitePool, node: &str, distribution_id: &str, control: &ControlParams) -> Result<ManifestDto, KdcError> {
        Ok(self.get_or_build(pool, node, distribution_id, control).await?.manifest.clone())
    }

    /// Fetch (preparing lazily) chunk `idx`. `NotFound` doubles as spec's
    /// `NoSuchChunk` for an out-of-range index.
    pub async fn chunk(&self, pool: &SqlitePool, node: &str, distribution_id: &str, idx: u16, control: &ControlParams) -> Result<ChunkDto, KdcError> {
        let cached = self.get_or_build(pool, node, distribution_id, control).await?;
        let data = cached
            .chunks
            .get(idx as usize)
            .ok_or_else(|| KdcError::NotFound(format!("no chunk {idx} for distribution '{distribution_id}' (NoSuchChunk)")))?;
        Ok(ChunkDto { sequence: idx, total: cached.chunks.len() as u16, data: data.clone() })
    }

    async fn get_or_build(&self, pool: &SqlitePool, node: &str, distribution_id: &str, control: &ControlParams) -> Result<CachedManifest, KdcError> {
        let key = (node.to_string(), distribution_id.to_string());
        if let Some(cached) = self.entries.lock().await.get(&key) {
            return Ok(cached.clone());
        }
        let prepared = build_encrypted_keys(pool, node, distribution_id, control).await?;
        self.entries.lock().await.insert(key, prepared.clone());
        Ok(prepared)
    }

    /// Prepare and cache a `content = "clear_text"` manifest, for test
    /// distributions exercising the transport (spec §4.7).
    pub async fn prepare_clear_text(&self, node: &str, distribution_id: &str, plaintext: &[u8], control: &ControlParams) -> ManifestDto {
        let prepared = pack("clear_text", plaintext.to_vec(), distribution_id, node, 0, control);
        let manifest = prepared.manifest.clone();
        self.entries.lock().await.insert((node.to_string(), distribution_id.to_string()), prepared);
        manifest
    }

    /// Prepare and cache a `content = "encrypted_text"` manifest: the
    /// payload is `ephemeral_pub(32) || hpke_ciphertext` (§F's Open
    /// Question resolution distinguishes this from `encrypted_keys`'s
    /// single-copy layout by duplicating the ephemeral key ahead of the
    /// self-describing HPKE envelope).
    pub async fn prepare_encrypted_text(
        &self,
        node: &str,
        distribution_id: &str,
        recipient_public_key: &[u8],
        plaintext: &[u8],
        control: &ControlParams,
    ) -> Result<ManifestDto, KdcError> {
        let envelope = crate::crypto::hpke::encrypt(recipient_public_key, plaintext)?;
        let mut wire = Vec::with_capacity(32 + envelope.len());
        wire.extend_from_slice(&envelope[..32]);
        wire.extend_from_slice(&envelope);
        let prepared = pack("encrypted_text", wire, distribution_id, node, 0, control);
        let manifest = prepared.manifest.clone();
        self.entries.lock().await.insert((node.to_string(), distribution_id.to_string()), prepared);
        Ok(manifest)
    }
}

/// `content = "encrypted_keys"`: every distribution record addressed to
/// `node` under `distribution_id`, packed into a JSON array (spec §4.7).
async fn build_encrypted_keys(pool: &SqlitePool, node: &str, distribution_id: &str, control: &ControlParams) -> Result<CachedManifest, KdcError> {
    let records: Vec<_> = store::distributions_for_id(pool, distribution_id)
        .await?
        .into_iter()
        .filter(|r| r.node == node)
        .collect();
    if records.is_empty() {
        return Err(KdcError::NotFound(format!("no distribution '{distribution_id}' addressed to node '{node}'")));
    }

    let mut entries = Vec::with_capacity(records.len());
    for record in &records {
        let key = store::get_key(pool, record.key_id).await?;
        entries.push(serde_json::json!({
            "zone_name": key.zone,
            "key_id": key.id,
            "keytag": key.keytag,
            "key_type": key.key_type,
            "algorithm": key.algorithm,
            "flags": key.flags,
            "public_key": key.public_key,
            "encrypted_key": base64::engine::general_purpose::STANDARD.encode(&record.ciphertext),
            "ephemeral_pub_key": base64::engine::general_purpose::STANDARD.encode(&record.ephemeral_pub),
        }));
    }
    let payload = serde_json::to_vec(&serde_json::Value::Array(entries)).expect("json always serializes");
    Ok(pack("encrypted_keys", payload, distribution_id, node, records.len(), control))
}

fn pack(content: &str, payload: Vec<u8>, distribution_id: &str, node: &str, zone_count: usize, control: &ControlParams) -> CachedManifest {
    let b64 = base64::engine::general_purpose::STANDARD.encode(&payload);
    let checksum = format!("sha256:{:x}", Sha256::digest(&payload));
    let metadata = serde_json::json!({
        "content": content,
        "distribution_id": distribution_id,
        "node_id": node,
        "zone_count": zone_count,
        "key_count": zone_count,
        "timestamp": crate::common::now(),
        "retire_time": control.retire_time_secs,
        "distribution_ttl": control.distribution_ttl_secs,
    });

    if b64.len() <= INLINE_MAX_B64_LEN && estimated_record_len(&b64) <= INLINE_MAX_RECORD_LEN {
        return CachedManifest {
            manifest: ManifestDto { chunk_count: 0, chunk_size: 0, checksum, metadata, payload: Some(b64) },
            chunks: Vec::new(),
        };
    }

    let chunk_size = (control.jsonchunk_max_size.max(1) as usize).min(b64.len().max(1));
    // base64's alphabet is pure ASCII, so byte-chunking never splits a
    // multi-byte character.
    let chunks: Vec<String> = b64.as_bytes().chunks(chunk_size).map(|c| String::from_utf8_lossy(c).into_owned()).collect();
    CachedManifest {
        manifest: ManifestDto {
            chunk_count: chunks.len() as u16,
            chunk_size: chunk_size as u16,
            checksum,
            metadata,
            payload: None,
        },
        chunks,
    }
}

/// The payload plus a fixed allowance for the QNAME, DNS header, and the
/// JSONMANIFEST record's own fixed-width fields (spec §4.7).
fn estimated_record_len(b64: &str) -> usize {
    b64.len() + 150
}

/// A KMCTRL lookup: per-key control metadata for pull-style discovery.
pub async fn kmctrl(pool: &SqlitePool, zone: &str, keytag: i64) -> Result<KmctrlDto, KdcError> {
    let keys = store::list_keys_for_zone(pool, zone).await?;
    let key = keys
        .into_iter()
        .find(|k| k.keytag == keytag)
        .ok_or_else(|| KdcError::NotFound(format!("no key with keytag {keytag} in zone '{zone}'")))?;
    Ok(KmctrlDto {
        zone: key.zone,
        key_id: key.id,
        distribution_id: key.distribution_id,
        state: key.state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control() -> ControlParams {
        ControlParams { jsonchunk_max_size: 16, distribution_ttl_secs: 300, retire_time_secs: 86400 }
    }

    #[test]
    fn small_payload_inlines() {
        let control = control();
        let cached = pack("clear_text", b"hi".to_vec(), "abcd", "node1.", 0, &control);
        assert_eq!(cached.manifest.chunk_count, 0);
        assert!(cached.manifest.payload.is_some());
    }

    #[test]
    fn oversized_payload_chunks() {
        let control = control();
        let payload = vec![b'x'; 1000];
        let cached = pack("clear_text", payload, "abcd", "node1.", 0, &control);
        assert!(cached.manifest.chunk_count > 0);
        assert!(cached.manifest.payload.is_none());
        assert_eq!(cached.chunks.len(), cached.manifest.chunk_count as usize);

        let expected_b64 = base64::engine::general_purpose::STANDARD.encode(vec![b'x'; 1000]);
        let reassembled: String = cached.chunks.concat();
        assert_eq!(reassembled, expected_b64);
    }
}
