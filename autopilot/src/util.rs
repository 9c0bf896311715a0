use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Splits a comma-separated id list, skipping blanks.
pub fn parse_id_csv(input: &str, flag: &str) -> Result<Vec<String>> {
    let ids: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(anyhow!("{flag} resolved to empty list"));
    }
    Ok(ids)
}

/// FNV-1a over the bytes, rendered with the input length.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hash = 0xCBF2_9CE4_8422_2325u64;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    format!("fnv1a:{hash:016x}:len:{}", bytes.len())
}

/// Maps an id onto a single path component: anything outside
/// `[A-Za-z0-9_-]` becomes `-`.
pub fn file_name_token(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }
    let encoded = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, encoded).with_context(|| format!("failed writing {}", path.display()))
}
