use crate::error::Result;
use crate::writers::write_atomic;
use serde::Serialize;
use std::path::Path;

/// Pretty-printed JSON, replaced atomically
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_json() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("run_summary.json");
        write_json(&path, &json!({"stages": ["convert", "buffers"]}))?;

        let text = fs::read_to_string(&path)?;
        assert!(text.ends_with('\n'));
        let value: Value = serde_json::from_str(&text)?;
        assert_eq!(value["stages"][1], "buffers");
        Ok(())
    }
}
