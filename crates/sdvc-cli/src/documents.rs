//! Loads `--documents` files into a resolver.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sdvc_core::StaticResolver;

use crate::read_json;

/// Build a resolver holding the bundled contexts plus every document map in
/// `paths`. Later files override earlier ones.
pub fn load_resolver(paths: &[PathBuf]) -> Result<StaticResolver> {
    let mut resolver =
        StaticResolver::with_builtin_contexts().context("bundled contexts are unreadable")?;
    for path in paths {
        let map = read_json(path)?;
        resolver
            .extend_from_map(&map)
            .with_context(|| format!("invalid document map in {}", path.display()))?;
        tracing::debug!(path = %path.display(), documents = resolver.len(), "loaded documents");
    }
    Ok(resolver)
}
