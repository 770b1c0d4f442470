//! # JSON-LD Context Processing
//!
//! Builds the [`ActiveContext`] used to expand document keys and values into
//! absolute IRIs. The supported subset is what credentials and BBS+ proofs
//! need:
//!
//! - contexts given inline, by IRI (through a [`DocumentResolver`]), or as
//!   arrays mixing both;
//! - term definitions with `@id`, `@type` coercion (`@id`, `@vocab`, or a
//!   datatype IRI), `@container: @graph`, and scoped `@context`;
//! - `@vocab`, compact IRIs (`prefix:suffix`), and keyword aliases such as
//!   `"id": "@id"`;
//! - type-scoped contexts, which do not propagate into embedded nodes, and
//!   property-scoped contexts, which do.
//!
//! `@version`, `@protected`, `@propagate` and `@base` are accepted and
//! ignored. Anything that would change expansion in ways this module does not
//! model (`@import`, `@reverse` terms) is rejected with
//! [`CanonicalizationError::Unsupported`].

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CanonicalizationError;
use crate::resolver::DocumentResolver;

/// Maximum nesting of remote context references.
pub const MAX_CONTEXT_DEPTH: usize = 8;

const KEYWORDS: &[&str] = &[
    "@base",
    "@container",
    "@context",
    "@default",
    "@embed",
    "@explicit",
    "@graph",
    "@id",
    "@included",
    "@index",
    "@json",
    "@language",
    "@list",
    "@nest",
    "@none",
    "@omitDefault",
    "@prefix",
    "@preserve",
    "@protected",
    "@requireAll",
    "@reverse",
    "@set",
    "@type",
    "@value",
    "@version",
    "@vocab",
];

/// Returns true if `s` is a JSON-LD keyword.
pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Container mapping of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// `@set`: values are always arrays. Has no effect on RDF output.
    Set,
    /// `@graph`: each value is a node in its own named graph.
    Graph,
    /// `@list`, `@language`, `@index` and other containers.
    Other,
}

/// A processed term definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TermDefinition {
    /// Absolute IRI, blank node identifier, or keyword the term maps to.
    pub iri: String,
    /// `@id`, `@vocab`, or a datatype IRI.
    pub type_mapping: Option<String>,
    /// Container mapping.
    pub container: Option<Container>,
    /// Unprocessed scoped context, applied lazily.
    pub scoped_context: Option<Value>,
}

impl TermDefinition {
    fn simple(iri: String) -> Self {
        Self {
            iri,
            type_mapping: None,
            container: None,
            scoped_context: None,
        }
    }

    /// Returns true if this term aliases a keyword.
    pub fn is_keyword_alias(&self) -> bool {
        is_keyword(&self.iri)
    }
}

/// The active context at some point during expansion.
///
/// A `None` entry in the term map records a term explicitly mapped to
/// `null`; such a term is not expanded even if `@vocab` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveContext {
    terms: BTreeMap<String, Option<TermDefinition>>,
    vocab: Option<String>,
    previous: Option<Box<ActiveContext>>,
}

impl ActiveContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a local context and return the resulting context.
    ///
    /// # Errors
    ///
    /// Fails on unresolvable remote contexts, invalid term definitions,
    /// unsupported constructs, or remote context nesting past
    /// [`MAX_CONTEXT_DEPTH`].
    pub fn process(
        &self,
        local: &Value,
        resolver: &dyn DocumentResolver,
    ) -> Result<Self, CanonicalizationError> {
        let mut result = self.clone();
        result.apply(local, resolver, 0)?;
        Ok(result)
    }

    /// Apply the scoped contexts of the given type terms, in lexicographic
    /// order. The result remembers `self` so embedded nodes can revert.
    pub fn with_type_scopes(
        &self,
        types: &[String],
        resolver: &dyn DocumentResolver,
    ) -> Result<Self, CanonicalizationError> {
        let mut sorted: Vec<&String> = types.iter().collect();
        sorted.sort();
        let mut result: Option<Self> = None;
        for ty in sorted {
            let Some(Some(def)) = self.terms.get(ty.as_str()) else {
                continue;
            };
            let Some(scoped) = &def.scoped_context else {
                continue;
            };
            let ctx = result.get_or_insert_with(|| {
                let mut ctx = self.clone();
                ctx.previous = Some(Box::new(self.revert()));
                ctx
            });
            ctx.apply(scoped, resolver, 0)?;
        }
        Ok(result.unwrap_or_else(|| self.clone()))
    }

    /// Apply a property-scoped context. Property scopes propagate.
    pub fn with_property_scope(
        &self,
        def: &TermDefinition,
        resolver: &dyn DocumentResolver,
    ) -> Result<Self, CanonicalizationError> {
        match &def.scoped_context {
            Some(scoped) => self.process(scoped, resolver),
            None => Ok(self.clone()),
        }
    }

    /// The context an embedded node object starts from: the one in effect
    /// before any non-propagating type scope was applied.
    pub fn revert(&self) -> Self {
        match &self.previous {
            Some(prev) => (**prev).clone(),
            None => self.clone(),
        }
    }

    /// Look up a term definition. Returns `None` for undefined terms and
    /// for terms explicitly mapped to `null`.
    pub fn term(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term).and_then(Option::as_ref)
    }

    /// The `@vocab` mapping, if any.
    pub fn vocab(&self) -> Option<&str> {
        self.vocab.as_deref()
    }

    /// Expand a key or value to an absolute IRI, blank node identifier, or
    /// keyword.
    ///
    /// With `vocab` set, terms and `@vocab` apply (property names, types,
    /// `@vocab`-coerced values). Without it, the value is treated as a
    /// document IRI and only compact IRIs are expanded.
    pub fn expand_iri(&self, value: &str, vocab: bool) -> Option<String> {
        if is_keyword(value) {
            return Some(value.to_string());
        }
        if vocab {
            if let Some(entry) = self.terms.get(value) {
                return entry.as_ref().map(|def| def.iri.clone());
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Some(value.to_string());
            }
            if let Some(Some(def)) = self.terms.get(prefix) {
                if !def.is_keyword_alias() {
                    return Some(format!("{}{}", def.iri, suffix));
                }
            }
            return Some(value.to_string());
        }
        if vocab {
            return self.vocab.as_ref().map(|v| format!("{v}{value}"));
        }
        Some(value.to_string())
    }

    /// Returns the keyword a key expands to, honouring aliases.
    pub fn keyword_of(&self, key: &str) -> Option<&str> {
        if is_keyword(key) {
            return KEYWORDS.iter().copied().find(|k| *k == key);
        }
        self.term(key)
            .filter(|def| def.is_keyword_alias())
            .and_then(|def| KEYWORDS.iter().copied().find(|k| *k == def.iri))
    }

    fn apply(
        &mut self,
        local: &Value,
        resolver: &dyn DocumentResolver,
        depth: usize,
    ) -> Result<(), CanonicalizationError> {
        if depth > MAX_CONTEXT_DEPTH {
            return Err(CanonicalizationError::ContextDepthExceeded(MAX_CONTEXT_DEPTH));
        }
        match local {
            Value::Array(items) => {
                for item in items {
                    self.apply(item, resolver, depth)?;
                }
                Ok(())
            }
            Value::Null => {
                self.terms.clear();
                self.vocab = None;
                Ok(())
            }
            Value::String(iri) => {
                let doc = resolver.resolve(iri)?;
                let ctx = doc.get("@context").ok_or_else(|| {
                    CanonicalizationError::InvalidDocument(format!(
                        "remote context {iri} has no @context"
                    ))
                })?;
                debug!(iri = %iri, depth, "applying remote context");
                self.apply(ctx, resolver, depth + 1)
            }
            Value::Object(map) => self.apply_object(map),
            other => Err(CanonicalizationError::InvalidDocument(format!(
                "invalid local context: {other}"
            ))),
        }
    }

    fn apply_object(&mut self, map: &Map<String, Value>) -> Result<(), CanonicalizationError> {
        if map.contains_key("@import") {
            return Err(CanonicalizationError::Unsupported("@import".to_string()));
        }
        if let Some(vocab) = map.get("@vocab") {
            self.vocab = match vocab {
                Value::Null => None,
                Value::String(v) => Some(self.expand_iri(v, true).unwrap_or_else(|| v.clone())),
                other => {
                    return Err(CanonicalizationError::InvalidDocument(format!(
                        "@vocab must be a string or null: {other}"
                    )))
                }
            };
        }
        let mut builder = TermBuilder {
            local: map,
            defined: HashMap::new(),
        };
        for key in map.keys() {
            if key.starts_with('@') {
                continue;
            }
            builder.define(self, key)?;
        }
        Ok(())
    }
}

/// Creates term definitions from one local context object, defining
/// referenced prefixes first.
struct TermBuilder<'a> {
    local: &'a Map<String, Value>,
    defined: HashMap<String, bool>,
}

impl TermBuilder<'_> {
    fn define(&mut self, ctx: &mut ActiveContext, term: &str) -> Result<(), CanonicalizationError> {
        match self.defined.get(term) {
            Some(true) => return Ok(()),
            Some(false) => {
                return Err(CanonicalizationError::InvalidDocument(format!(
                    "cyclic IRI mapping for term {term}"
                )))
            }
            None => {}
        }
        self.defined.insert(term.to_string(), false);
        let Some(value) = self.local.get(term) else {
            self.defined.insert(term.to_string(), true);
            return Ok(());
        };

        let definition = match value {
            Value::Null => None,
            Value::String(id) => {
                let iri = self.expand(ctx, id)?;
                Some(TermDefinition::simple(iri))
            }
            Value::Object(obj) => Some(self.define_expanded(ctx, term, obj)?),
            other => {
                return Err(CanonicalizationError::InvalidDocument(format!(
                    "invalid term definition for {term}: {other}"
                )))
            }
        };
        ctx.terms.insert(term.to_string(), definition);
        self.defined.insert(term.to_string(), true);
        Ok(())
    }

    fn define_expanded(
        &mut self,
        ctx: &mut ActiveContext,
        term: &str,
        obj: &Map<String, Value>,
    ) -> Result<TermDefinition, CanonicalizationError> {
        if obj.contains_key("@reverse") {
            return Err(CanonicalizationError::Unsupported(format!(
                "@reverse term definition ({term})"
            )));
        }
        let iri = match obj.get("@id") {
            Some(Value::String(id)) => self.expand(ctx, id)?,
            Some(Value::Null) => {
                return Err(CanonicalizationError::Unsupported(format!(
                    "null @id in expanded term definition ({term})"
                )))
            }
            Some(other) => {
                return Err(CanonicalizationError::InvalidDocument(format!(
                    "@id of term {term} must be a string: {other}"
                )))
            }
            None => self.expand(ctx, term)?,
        };
        let type_mapping = match obj.get("@type") {
            Some(Value::String(t)) if is_keyword(t) => Some(t.clone()),
            Some(Value::String(t)) => Some(self.expand(ctx, t)?),
            Some(other) => {
                return Err(CanonicalizationError::InvalidDocument(format!(
                    "@type of term {term} must be a string: {other}"
                )))
            }
            None => None,
        };
        let container = obj.get("@container").map(parse_container);
        Ok(TermDefinition {
            iri,
            type_mapping,
            container,
            scoped_context: obj.get("@context").cloned(),
        })
    }

    /// Expand an IRI inside a context, defining any referenced local term
    /// or prefix first.
    fn expand(&mut self, ctx: &mut ActiveContext, value: &str) -> Result<String, CanonicalizationError> {
        if self.pending(value) {
            self.define(ctx, value)?;
        }
        if let Some((prefix, _)) = value.split_once(':') {
            if self.pending(prefix) {
                self.define(ctx, prefix)?;
            }
        }
        match ctx.expand_iri(value, true) {
            Some(iri) if is_keyword(&iri) || iri.contains(':') => Ok(iri),
            _ => Err(CanonicalizationError::InvalidDocument(format!(
                "term {value} does not expand to an absolute IRI"
            ))),
        }
    }

    /// A local term that has not been defined and is not being defined.
    fn pending(&self, term: &str) -> bool {
        !term.starts_with('@') && self.local.contains_key(term) && !self.defined.contains_key(term)
    }
}

fn parse_container(value: &Value) -> Container {
    let entries: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    if entries.contains(&"@graph") {
        Container::Graph
    } else if entries.iter().all(|e| *e == "@set") {
        Container::Set
    } else {
        Container::Other
    }
}
