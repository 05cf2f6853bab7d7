//! Agent configuration fingerprint
//!
//! The fingerprint is the SHA-256 hex digest of a canonical JSON document:
//! keys sorted at every depth, `", "` / `": "` separators, and non-ASCII
//! characters escaped as `\uXXXX`. That is byte-for-byte the form Python's
//! `json.dumps(sort_keys=True)` emits, so tokens written by earlier
//! deployments still compare equal.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::constants;

/// Compute the fingerprint over the four inputs that define an agent.
///
/// A missing tools structure hashes the same as an empty mapping.
pub fn compute_fingerprint(
    agent_name: &str,
    model_name: &str,
    instructions: &str,
    tools: Option<&Value>,
) -> String {
    let tools = match tools {
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(value) => value.clone(),
    };

    let document = serde_json::json!({
        "agent_name": agent_name,
        "model_name": model_name,
        "instructions": instructions,
        "tools": tools,
    });

    let canonical = canonical_json(&document);
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}

/// Serialize with sorted keys and the separator and escaping rules above.
pub fn canonical_json(value: &Value) -> String {
    let sorted = sort_keys(value);
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter);
    // Writing into a Vec cannot fail
    if sorted.serialize(&mut serializer).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

/// Rebuild objects with keys inserted in sorted order, independent of
/// whether the map type preserves insertion order.
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

struct CanonicalFormatter;

impl serde_json::ser::Formatter for CanonicalFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        for ch in fragment.chars() {
            if ch.is_ascii() && ch != '\x7f' {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Single persisted fingerprint token.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
}

impl FingerprintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located in `dir` under the standard file name.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(constants::deploy::CONFIG_HASH_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previously stored token, if any. Unreadable files count as absent.
    pub fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!("Could not read {}: {}", self.path.display(), e);
                }
                None
            }
        }
    }

    /// Persist a token. Failures are logged, never returned.
    pub fn store(&self, token: &str) {
        if let Err(e) = std::fs::write(&self.path, token) {
            warn!("Could not store config hash at {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_python_json_dumps_digest() {
        assert_eq!(
            compute_fingerprint("my-agent", "gpt-4o", "You are helpful", None),
            "bedafd41c2fa41bbc9f5eeba95068916833459106edc24960b30f53192820de6"
        );
    }

    #[test]
    fn escapes_non_ascii_like_python() {
        let tools = json!({
            "file_search": {"vector_store_name": null, "enabled": true, "top_k": 5},
            "code_interpreter": {"enabled": true},
            "azure_ai_search": {"index_name": "idx", "enabled": false, "connection_name": "c"}
        });
        let instructions = "Bonjour, caf\u{e9} \u{2713} \u{1f50d}";

        let canonical = canonical_json(&json!({
            "agent_name": "safety-agent",
            "model_name": "gpt-4o-mini",
            "instructions": instructions,
            "tools": tools.clone(),
        }));
        assert!(canonical.contains(r#""instructions": "Bonjour, caf\u00e9 \u2713 \ud83d\udd0d""#));
        assert!(canonical.contains(
            r#""file_search": {"enabled": true, "top_k": 5, "vector_store_name": null}"#
        ));

        assert_eq!(
            compute_fingerprint("safety-agent", "gpt-4o-mini", instructions, Some(&tools)),
            "25782d2823a1bfabf9b9fe0c630760752ec703339b6e5a681c1ba1cac62002bd"
        );
    }

    #[test]
    fn stable_and_sensitive_to_each_input() {
        let tools = json!({"code_interpreter": {"enabled": true}});
        let base = compute_fingerprint("a", "m", "i", Some(&tools));
        assert_eq!(base, compute_fingerprint("a", "m", "i", Some(&tools)));

        assert_ne!(base, compute_fingerprint("b", "m", "i", Some(&tools)));
        assert_ne!(base, compute_fingerprint("a", "n", "i", Some(&tools)));
        assert_ne!(base, compute_fingerprint("a", "m", "j", Some(&tools)));
        assert_ne!(
            base,
            compute_fingerprint("a", "m", "i", Some(&json!({"code_interpreter": {"enabled": false}})))
        );
    }

    #[test]
    fn independent_of_key_order() {
        let first: Value =
            serde_json::from_str(r#"{"b": {"y": 1, "x": [ {"q": 1, "p": 2} ]}, "a": true}"#).unwrap();
        let second: Value =
            serde_json::from_str(r#"{"a": true, "b": {"x": [ {"p": 2, "q": 1} ], "y": 1}}"#).unwrap();
        assert_eq!(
            compute_fingerprint("a", "m", "i", Some(&first)),
            compute_fingerprint("a", "m", "i", Some(&second))
        );
    }

    #[test]
    fn absent_tools_equal_empty_mapping() {
        assert_eq!(
            compute_fingerprint("a", "m", "i", None),
            compute_fingerprint("a", "m", "i", Some(&json!({})))
        );
        assert_eq!(
            compute_fingerprint("a", "m", "i", Some(&Value::Null)),
            compute_fingerprint("a", "m", "i", None)
        );
    }

    #[test]
    fn store_round_trips_and_trims() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::in_dir(dir.path());
        assert_eq!(store.load(), None);

        store.store("abc123");
        assert_eq!(store.load().as_deref(), Some("abc123"));

        std::fs::write(store.path(), "  def456\n").unwrap();
        assert_eq!(store.load().as_deref(), Some("def456"));
    }

    #[test]
    fn store_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::new(dir.path().join("missing").join("hash"));
        store.store("abc");
        assert_eq!(store.load(), None);
    }
}
