//! # JSON-LD Expansion
//!
//! Rewrites a compacted document into expanded form: every property is an
//! absolute IRI, every value is an array of value objects or node objects,
//! and `@type` is an array of IRIs. Keys that do not expand to an IRI are
//! dropped, matching JSON-LD's treatment of unmapped terms. [`expand_strict`]
//! rejects them instead.
//!
//! Framing keywords (`@explicit`, `@embed`, `@requireAll`, `@omitDefault`,
//! `@default`) are carried through unchanged so reveal patterns can be
//! expanded with the same code.

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::{ActiveContext, Container, TermDefinition};
use crate::error::CanonicalizationError;
use crate::resolver::DocumentResolver;

const FRAMING_KEYWORDS: &[&str] = &["@default", "@embed", "@explicit", "@omitDefault", "@requireAll"];

/// Expand a document into a list of top-level node objects.
///
/// A top-level object holding only `@context` and `@graph` expands to the
/// members of its graph.
///
/// # Errors
///
/// Returns a [`CanonicalizationError`] for invalid shapes, unresolvable
/// contexts, or unsupported constructs such as `@list`.
pub fn expand(
    document: &Value,
    resolver: &dyn DocumentResolver,
) -> Result<Vec<Value>, CanonicalizationError> {
    Expander { resolver, strict: false }.document(document)
}

/// Expand like [`expand`], but fail on any key that does not expand to an
/// absolute IRI.
///
/// # Errors
///
/// Everything [`expand`] returns, plus
/// [`CanonicalizationError::UnmappedTerm`] naming the first unmapped key.
pub fn expand_strict(
    document: &Value,
    resolver: &dyn DocumentResolver,
) -> Result<Vec<Value>, CanonicalizationError> {
    Expander { resolver, strict: true }.document(document)
}

impl Expander<'_> {
    fn document(&self, document: &Value) -> Result<Vec<Value>, CanonicalizationError> {
        let root = ActiveContext::new();
        let mut nodes = Vec::new();
        for item in as_items(document) {
            let Value::Object(obj) = item else {
                return Err(CanonicalizationError::InvalidDocument(format!(
                    "top-level item is not an object: {item}"
                )));
            };
            let expanded = self.node(&root, obj)?;
            match unwrap_default_graph(expanded) {
                Ok(members) => nodes.extend(members),
                Err(node) => nodes.push(node),
            }
        }
        Ok(nodes)
    }
}

/// A top-level node with nothing but `@graph` contributes its members.
fn unwrap_default_graph(node: Map<String, Value>) -> Result<Vec<Value>, Value> {
    let only_graph = node.len() == 1 && node.contains_key("@graph");
    if !only_graph {
        return Err(Value::Object(node));
    }
    match node.get("@graph") {
        Some(Value::Array(members)) => Ok(members.clone()),
        _ => Err(Value::Object(node)),
    }
}

fn as_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

struct Expander<'a> {
    resolver: &'a dyn DocumentResolver,
    strict: bool,
}

impl Expander<'_> {
    fn node(
        &self,
        active: &ActiveContext,
        obj: &Map<String, Value>,
    ) -> Result<Map<String, Value>, CanonicalizationError> {
        let active = match obj.get("@context") {
            Some(local) => active.process(local, self.resolver)?,
            None => active.clone(),
        };

        let mut type_terms = Vec::new();
        for (key, value) in obj {
            if active.keyword_of(key) == Some("@type") {
                for ty in as_items(value) {
                    let ty = ty.as_str().ok_or_else(|| {
                        CanonicalizationError::InvalidDocument(format!("@type value is not a string: {ty}"))
                    })?;
                    type_terms.push(ty.to_string());
                }
            }
        }
        let node_ctx = active.with_type_scopes(&type_terms, self.resolver)?;

        let mut out = Map::new();
        if !type_terms.is_empty() {
            let mut types = Vec::with_capacity(type_terms.len());
            for ty in &type_terms {
                let iri = active.expand_iri(ty, true).ok_or_else(|| {
                    CanonicalizationError::InvalidDocument(format!("type {ty} does not expand to an IRI"))
                })?;
                types.push(Value::String(iri));
            }
            out.insert("@type".to_string(), Value::Array(types));
        }

        let mut keys: Vec<&String> = obj.keys().collect();
        keys.sort();
        for key in keys {
            let value = &obj[key.as_str()];
            if key == "@context" {
                continue;
            }
            if let Some(keyword) = node_ctx.keyword_of(key) {
                self.keyword_entry(&node_ctx, keyword, value, &mut out)?;
                continue;
            }
            let property = match node_ctx.expand_iri(key, true) {
                Some(iri) if iri.contains(':') && !iri.starts_with("_:") => iri,
                _ if self.strict => return Err(CanonicalizationError::UnmappedTerm(key.clone())),
                _ => {
                    debug!(term = %key, "dropping term with no absolute IRI mapping");
                    continue;
                }
            };
            let def = node_ctx.term(key);
            let mut values = Vec::new();
            for item in as_items(value) {
                self.property_value(&node_ctx, def, item, &mut values)?;
            }
            if values.is_empty() && !value.is_array() {
                continue;
            }
            let entry = out
                .entry(property)
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(existing) = entry {
                existing.extend(values);
            }
        }
        Ok(out)
    }

    fn keyword_entry(
        &self,
        node_ctx: &ActiveContext,
        keyword: &str,
        value: &Value,
        out: &mut Map<String, Value>,
    ) -> Result<(), CanonicalizationError> {
        match keyword {
            "@id" => {
                let id = value.as_str().ok_or_else(|| {
                    CanonicalizationError::InvalidDocument(format!("@id is not a string: {value}"))
                })?;
                let iri = node_ctx.expand_iri(id, false).unwrap_or_else(|| id.to_string());
                out.insert("@id".to_string(), Value::String(iri));
            }
            // Already handled before the key loop.
            "@type" => {}
            "@graph" => {
                let child_ctx = node_ctx.revert();
                let mut members = Vec::new();
                for item in as_items(value) {
                    let Value::Object(member) = item else {
                        return Err(CanonicalizationError::InvalidDocument(format!(
                            "@graph member is not an object: {item}"
                        )));
                    };
                    members.push(Value::Object(self.node(&child_ctx, member)?));
                }
                out.insert("@graph".to_string(), Value::Array(members));
            }
            "@list" | "@reverse" | "@nest" | "@included" | "@index" => {
                return Err(CanonicalizationError::Unsupported(keyword.to_string()));
            }
            "@value" | "@language" => {
                return Err(CanonicalizationError::InvalidDocument(format!(
                    "{keyword} is only valid inside a value object"
                )));
            }
            k if FRAMING_KEYWORDS.contains(&k) => {
                out.insert(k.to_string(), value.clone());
            }
            other => debug!(keyword = %other, "ignoring keyword"),
        }
        Ok(())
    }

    fn property_value(
        &self,
        node_ctx: &ActiveContext,
        def: Option<&TermDefinition>,
        item: &Value,
        out: &mut Vec<Value>,
    ) -> Result<(), CanonicalizationError> {
        if let Some(Container::Other) = def.and_then(|d| d.container) {
            return Err(CanonicalizationError::Unsupported(format!(
                "container mapping on {}",
                def.map(|d| d.iri.as_str()).unwrap_or_default()
            )));
        }
        let graph_container = matches!(def.and_then(|d| d.container), Some(Container::Graph));
        let expanded = match item {
            Value::Null => return Ok(()),
            Value::Array(nested) => {
                for inner in nested {
                    self.property_value(node_ctx, def, inner, out)?;
                }
                return Ok(());
            }
            Value::Object(obj) => self.object_value(node_ctx, def, obj, out)?,
            scalar => Some(self.scalar_value(node_ctx, def, scalar)?),
        };
        let Some(expanded) = expanded else {
            return Ok(());
        };
        if graph_container && !is_value_object(&expanded) {
            let mut wrapper = Map::new();
            wrapper.insert("@graph".to_string(), Value::Array(vec![expanded]));
            out.push(Value::Object(wrapper));
        } else {
            out.push(expanded);
        }
        Ok(())
    }

    /// Expands an object value. `@set` objects push their members directly
    /// and yield `None`.
    fn object_value(
        &self,
        node_ctx: &ActiveContext,
        def: Option<&TermDefinition>,
        obj: &Map<String, Value>,
        out: &mut Vec<Value>,
    ) -> Result<Option<Value>, CanonicalizationError> {
        let keyword_keys: Vec<(&str, &Value)> = obj
            .iter()
            .filter_map(|(k, v)| node_ctx.keyword_of(k).map(|kw| (kw, v)))
            .collect();
        if keyword_keys.iter().any(|(kw, _)| *kw == "@list") {
            return Err(CanonicalizationError::Unsupported("@list".to_string()));
        }
        if let Some((_, members)) = keyword_keys.iter().find(|(kw, _)| *kw == "@set") {
            for member in as_items(members) {
                self.property_value(node_ctx, def, member, out)?;
            }
            return Ok(None);
        }
        if keyword_keys.iter().any(|(kw, _)| *kw == "@value") {
            return self.value_object(node_ctx, &keyword_keys).map(Some);
        }

        let mut child_ctx = node_ctx.revert();
        if let Some(def) = def {
            if def.scoped_context.is_some() {
                child_ctx = child_ctx.with_property_scope(def, self.resolver)?;
            }
        }
        Ok(Some(Value::Object(self.node(&child_ctx, obj)?)))
    }

    fn value_object(
        &self,
        node_ctx: &ActiveContext,
        entries: &[(&str, &Value)],
    ) -> Result<Value, CanonicalizationError> {
        let mut out = Map::new();
        for (keyword, value) in entries {
            match *keyword {
                "@value" => {
                    out.insert("@value".to_string(), (*value).clone());
                }
                "@type" => {
                    let ty = value.as_str().ok_or_else(|| {
                        CanonicalizationError::InvalidDocument(format!(
                            "value object @type is not a string: {value}"
                        ))
                    })?;
                    let iri = node_ctx.expand_iri(ty, true).unwrap_or_else(|| ty.to_string());
                    out.insert("@type".to_string(), Value::String(iri));
                }
                "@language" => {
                    out.insert("@language".to_string(), (*value).clone());
                }
                other => {
                    return Err(CanonicalizationError::InvalidDocument(format!(
                        "unexpected {other} in value object"
                    )))
                }
            }
        }
        Ok(Value::Object(out))
    }

    fn scalar_value(
        &self,
        node_ctx: &ActiveContext,
        def: Option<&TermDefinition>,
        scalar: &Value,
    ) -> Result<Value, CanonicalizationError> {
        let mut out = Map::new();
        let type_mapping = def.and_then(|d| d.type_mapping.as_deref());
        match (type_mapping, scalar) {
            (Some("@id"), Value::String(s)) => {
                let iri = node_ctx.expand_iri(s, false).unwrap_or_else(|| s.clone());
                out.insert("@id".to_string(), Value::String(iri));
            }
            (Some("@vocab"), Value::String(s)) => {
                let value_ctx = match def {
                    Some(def) => node_ctx.with_property_scope(def, self.resolver)?,
                    None => node_ctx.clone(),
                };
                let iri = value_ctx.expand_iri(s, true).unwrap_or_else(|| s.clone());
                out.insert("@id".to_string(), Value::String(iri));
            }
            (Some(datatype), _) if !datatype.starts_with('@') => {
                out.insert("@value".to_string(), scalar.clone());
                out.insert("@type".to_string(), Value::String(datatype.to_string()));
            }
            _ => {
                out.insert("@value".to_string(), scalar.clone());
            }
        }
        Ok(Value::Object(out))
    }
}

/// Returns true if `value` is an expanded value object.
pub fn is_value_object(value: &Value) -> bool {
    value.get("@value").is_some()
}
