//! JSON Reference resolution for in-document `"$ref"` aliases.
//!
//! Every object carrying a string `"$ref"` that starts with `#` is an alias
//! for the value its URI fragment points to. Resolution computes, once, the
//! canonical position of every alias so that the graph builder can treat an
//! alias and its target as the same node. Remote references (anything not
//! starting with `#`) are left untouched and the object is compiled as a
//! plain schema whose `"$ref"` member is ignored.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{SchemaError, SchemaResult};
use crate::pointer::Pointer;

const REF: &str = "$ref";

/// A schema document together with its resolved alias table.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    document: Value,
    aliases: BTreeMap<Pointer, Pointer>,
}

impl ResolvedDocument {
    /// Resolve every in-document alias of `document`.
    ///
    /// Fails on self references, alias cycles, unresolvable targets, and
    /// targets that lie inside the additional members of another reference
    /// object.
    pub fn resolve(document: Value) -> SchemaResult<Self> {
        let mut requested = BTreeMap::new();
        collect_aliases(&document, &Pointer::root(), &mut requested)?;

        let mut resolver = Resolver {
            document: &document,
            requested: &requested,
            resolved: BTreeMap::new(),
            visiting: BTreeSet::new(),
        };
        for source in requested.keys() {
            resolver.resolve_alias(source)?;
        }
        let aliases = resolver.resolved;

        debug!(aliases = aliases.len(), "resolved JSON references");
        Ok(Self { document, aliases })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Alias position to canonical target position.
    pub fn aliases(&self) -> &BTreeMap<Pointer, Pointer> {
        &self.aliases
    }

    /// Follow aliases from `position` to the position that owns the value.
    pub fn canonical(&self, position: &Pointer) -> Pointer {
        self.aliases
            .get(position)
            .cloned()
            .unwrap_or_else(|| position.clone())
    }

    /// The value stored at the canonical form of `position`.
    pub fn get(&self, position: &Pointer) -> Option<&Value> {
        self.document.pointer(self.canonical(position).as_str())
    }
}

fn collect_aliases(
    value: &Value,
    position: &Pointer,
    requested: &mut BTreeMap<Pointer, Pointer>,
) -> SchemaResult<()> {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_aliases(item, &position.index(index), requested)?;
            }
        }
        Value::Object(members) => {
            for (key, member) in members {
                collect_aliases(member, &position.child(key), requested)?;
            }
            if let Some(Value::String(reference)) = members.get(REF) {
                if reference.starts_with('#') {
                    let target = Pointer::from_uri_fragment(reference)
                        .map_err(|reason| SchemaError::reference(position, reason))?;
                    requested.insert(position.clone(), target);
                } else {
                    trace!(%position, reference = %reference, "ignoring remote reference");
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn is_reference_object(value: &Value) -> bool {
    matches!(value.get(REF), Some(Value::String(_)))
}

struct Resolver<'a> {
    document: &'a Value,
    requested: &'a BTreeMap<Pointer, Pointer>,
    resolved: BTreeMap<Pointer, Pointer>,
    visiting: BTreeSet<Pointer>,
}

impl Resolver<'_> {
    fn resolve_alias(&mut self, source: &Pointer) -> SchemaResult<Pointer> {
        if let Some(done) = self.resolved.get(source) {
            return Ok(done.clone());
        }
        if !self.visiting.insert(source.clone()) {
            return Err(SchemaError::reference(source, "circular reference chain"));
        }
        let Some(requested) = self.requested.get(source) else {
            return Ok(source.clone());
        };

        let literal = self.walk(source, requested)?;
        if &literal == source {
            return Err(SchemaError::reference(source, "invalid self reference"));
        }
        let canonical = if self.requested.contains_key(&literal) {
            self.resolve_alias(&literal)?
        } else {
            literal
        };
        if &canonical == source {
            return Err(SchemaError::reference(source, "invalid self reference"));
        }

        trace!(%source, target = %canonical, "resolved alias");
        self.visiting.remove(source);
        self.resolved.insert(source.clone(), canonical.clone());
        Ok(canonical)
    }

    /// Walk `target` token by token from the document root, stepping through
    /// every local alias met on the way to the value it stands for.
    fn walk(&mut self, source: &Pointer, target: &Pointer) -> SchemaResult<Pointer> {
        let document = self.document;
        let mut position = Pointer::root();
        let mut current = document;
        for token in target.tokens() {
            if self.requested.contains_key(&position) {
                // an alias still being resolved can only be entered through its own members
                if self.visiting.contains(&position) {
                    return Err(SchemaError::reference(
                        source,
                        "referencing additional data members is invalid",
                    ));
                }
                let alias = current;
                position = self.resolve_alias(&position)?;
                current = document.pointer(position.as_str()).ok_or_else(|| {
                    SchemaError::reference(source, format!("unresolvable reference '{}'", target))
                })?;
                if current.get(token.as_str()).is_none() && alias.get(token.as_str()).is_some() {
                    return Err(SchemaError::reference(
                        source,
                        "referencing additional data members is invalid",
                    ));
                }
            }
            current = match current {
                Value::Object(members) => {
                    if is_reference_object(current) {
                        return Err(SchemaError::reference(
                            source,
                            "referencing additional data members is invalid",
                        ));
                    }
                    members.get(&token).ok_or_else(|| {
                        SchemaError::reference(
                            source,
                            format!("unresolvable reference '{}'", target),
                        )
                    })?
                }
                Value::Array(items) => token
                    .parse::<usize>()
                    .ok()
                    .filter(|_| token == "0" || !token.starts_with('0'))
                    .and_then(|index| items.get(index))
                    .ok_or_else(|| {
                        SchemaError::reference(
                            source,
                            format!("invalid array index '{}' in '{}'", token, target),
                        )
                    })?,
                _ => {
                    return Err(SchemaError::reference(
                        source,
                        format!("'{}' steps into a scalar at '{}'", target, position),
                    ));
                }
            };
            position = position.child(&token);
        }
        Ok(position)
    }
}
