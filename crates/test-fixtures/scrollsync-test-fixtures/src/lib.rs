//! Named JSON fixtures shared by the scrollsync test suites.
//!
//! `fixtures/manifest.json` maps fixture names to paths under `fixtures/`.
//! View definitions and document layouts are returned as raw JSON or
//! deserialized into any caller type, so this crate stays independent of
//! the core.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    views: BTreeMap<String, String>,
    #[serde(default)]
    layouts: BTreeMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// View definitions: a shared part plus per-breakpoint variants.
pub mod views {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.views.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.views, "view", name)?)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        load_json(lookup(&MANIFEST.views, "view", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.views, "view", name)?))
    }
}

/// Static document layouts: a viewport and node rectangles.
pub mod layouts {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.layouts.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.layouts, "layout", name)?)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        load_json(lookup(&MANIFEST.layouts, "layout", name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_manifest_entry_resolves() {
        for key in views::keys() {
            let v: serde_json::Value = views::load(&key).unwrap();
            assert_eq!(v["name"], key.as_str());
        }
        for key in layouts::keys() {
            let v: serde_json::Value = layouts::load(&key).unwrap();
            assert!(v["nodes"].is_array());
        }
    }

    #[test]
    fn unknown_names_error() {
        assert!(views::json("nope").is_err());
        assert!(layouts::load::<serde_json::Value>("nope").is_err());
    }
}
