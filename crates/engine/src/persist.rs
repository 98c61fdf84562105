//! Table dump/load to disk.
//!
//! One file per table per role, named `<base>_<role>.ets`. The container is
//! a `bincode`-encoded entry list followed by a SHA-256 digest of that body;
//! the loader recomputes the digest and rejects the file on mismatch. Dump
//! and load are each other's inverse; the on-disk format is otherwise free
//! per the external interface contract.

use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};
use crate::ids::TableRole;
use crate::table::TableHandle;

const DIGEST_LEN: usize = 32;

fn file_path(base: &Path, role: TableRole) -> PathBuf {
    let base_str = base.to_string_lossy();
    PathBuf::from(format!("{}_{}.ets", base_str, role.as_str()))
}

/// Write a single table's snapshot to `<base>_<role>.ets`, creating the
/// parent directory if absent, with a synchronous flush.
fn dump_one(base: &Path, role: TableRole, handle: &TableHandle) -> EngineResult<PathBuf> {
    let path = file_path(base, role);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| EngineError::LoadIo {
            path: parent.to_string_lossy().into_owned(),
            source,
        })?;
    }

    let entries = handle.snapshot();
    let body = bincode::serialize(&entries)?;

    let mut digest = Sha256::new();
    digest.update(&body);
    let trailer = digest.finalize();

    let mut file_bytes = Vec::with_capacity(body.len() + DIGEST_LEN);
    file_bytes.extend_from_slice(&body);
    file_bytes.extend_from_slice(&trailer);

    use std::io::Write;
    let mut file = std::fs::File::create(&path).map_err(|source| EngineError::LoadIo {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;
    file.write_all(&file_bytes).map_err(|source| EngineError::LoadIo {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;
    file.sync_all().map_err(|source| EngineError::LoadIo {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;

    Ok(path)
}

/// Dump all seven tables to `<base>_<role>.ets`. Not atomic across files:
/// callers must only invoke this while the owning Engine is `suspend`ed, at
/// which point no stage mutates any table and the seven files taken
/// together represent one consistent point-in-time cut.
pub fn dump_all(base: &Path, tables: &[(TableRole, TableHandle); 7]) -> EngineResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(7);
    for (role, handle) in tables {
        written.push(dump_one(base, *role, handle)?);
    }
    Ok(written)
}

/// Load a single table's entries from `<base>_<role>.ets`, verifying the
/// trailing digest.
fn load_one(base: &Path, role: TableRole) -> EngineResult<Vec<(String, Value)>> {
    let path = file_path(base, role);
    let bytes = std::fs::read(&path).map_err(|source| EngineError::LoadIo {
        path: path.to_string_lossy().into_owned(),
        source,
    })?;

    if bytes.len() < DIGEST_LEN {
        return Err(EngineError::LoadIntegrity {
            path: path.to_string_lossy().into_owned(),
        });
    }

    let (body, trailer) = bytes.split_at(bytes.len() - DIGEST_LEN);

    let mut digest = Sha256::new();
    digest.update(body);
    let computed = digest.finalize();

    if computed.as_slice() != trailer {
        return Err(EngineError::LoadIntegrity {
            path: path.to_string_lossy().into_owned(),
        });
    }

    let entries: Vec<(String, Value)> = bincode::deserialize(body)?;
    Ok(entries)
}

/// Load all seven tables from `<base>_<role>.ets`, creating fresh
/// `TableHandle`s populated with the restored entries. A failure on any
/// single file aborts the whole load, identifying the offending file.
pub fn load_all(base: &Path) -> EngineResult<[(TableRole, TableHandle); 7]> {
    let roles = TableRole::ALL;
    let mut out: Vec<(TableRole, TableHandle)> = Vec::with_capacity(7);
    for role in roles {
        let entries = load_one(base, role)?;
        let handle = TableHandle::new(role);
        handle.restore(entries);
        out.push((role, handle));
    }
    out.try_into()
        .map_err(|_| EngineError::LoadIntegrity { path: base.to_string_lossy().into_owned() })
}

/// Default base path when the caller omits one: `./data/<spider>_<unix_seconds>`.
pub fn default_base(spider: &str, unix_seconds: i64) -> PathBuf {
    PathBuf::from(format!("./data/{}_{}", spider, unix_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableHandle;

    fn all_tables() -> [(TableRole, TableHandle); 7] {
        let mut out = Vec::with_capacity(7);
        for role in TableRole::ALL {
            out.push((role, TableHandle::new(role)));
        }
        out.try_into().unwrap()
    }

    #[test]
    fn dump_then_load_round_trips_entries() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("s1");

        let tables = all_tables();
        for (role, handle) in &tables {
            if *role == TableRole::Spider {
                handle.insert("a", serde_json::json!(1));
                handle.insert("b", serde_json::json!("two"));
            }
        }

        dump_all(&base, &tables).unwrap();
        let loaded = load_all(&base).unwrap();

        let spider_loaded = loaded
            .iter()
            .find(|(r, _)| *r == TableRole::Spider)
            .map(|(_, h)| h)
            .unwrap();
        assert_eq!(spider_loaded.get("a"), Some(serde_json::json!(1)));
        assert_eq!(spider_loaded.get("b"), Some(serde_json::json!("two")));
    }

    #[test]
    fn zero_element_tables_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("empty");

        let tables = all_tables();
        dump_all(&base, &tables).unwrap();
        let loaded = load_all(&base).unwrap();
        for (_, handle) in &loaded {
            assert!(handle.is_empty());
        }
    }

    #[test]
    fn corrupted_trailer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("s2");

        let tables = all_tables();
        let paths = dump_all(&base, &tables).unwrap();

        // Flip a byte in one file's trailer.
        let victim = &paths[0];
        let mut bytes = std::fs::read(victim).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(victim, bytes).unwrap();

        let result = load_all(&base);
        assert!(matches!(result, Err(EngineError::LoadIntegrity { .. })));
    }
}
