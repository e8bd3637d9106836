//! Compiled form of one sub-schema.
//!
//! Every keyword is checked and converted once, at graph build time. The
//! validator then dispatches on plain data: `Option` fields, the [`TypeSet`]
//! bitmask and the tagged numeric limits.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::BitOr;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::format::Format;
use crate::graph::Positions;
use crate::numeric::{Bound, MultipleOf, Numeric};
use crate::pointer::Pointer;

/// Index of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Set of primitive JSON types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeSet(u8);

impl TypeSet {
    pub const NULL: TypeSet = TypeSet(1);
    pub const BOOLEAN: TypeSet = TypeSet(1 << 1);
    pub const INTEGER: TypeSet = TypeSet(1 << 2);
    pub const NUMBER: TypeSet = TypeSet(1 << 3);
    pub const STRING: TypeSet = TypeSet(1 << 4);
    pub const ARRAY: TypeSet = TypeSet(1 << 5);
    pub const OBJECT: TypeSet = TypeSet(1 << 6);

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Self::NULL),
            "boolean" => Some(Self::BOOLEAN),
            "integer" => Some(Self::INTEGER),
            "number" => Some(Self::NUMBER),
            "string" => Some(Self::STRING),
            "array" => Some(Self::ARRAY),
            "object" => Some(Self::OBJECT),
            _ => None,
        }
    }

    pub fn intersects(self, other: TypeSet) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for TypeSet {
    type Output = TypeSet;

    fn bitor(self, rhs: TypeSet) -> TypeSet {
        TypeSet(self.0 | rhs.0)
    }
}

/// The `items` keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Items {
    /// One schema for every element.
    Uniform(NodeId),
    /// One schema per position; later positions fall to `additionalItems`.
    Tuple(Vec<NodeId>),
}

/// `additionalItems` / `additionalProperties`. `true` compiles to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Additional {
    Forbidden,
    Schema(NodeId),
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintNode {
    pub position: Pointer,

    pub types: Option<TypeSet>,
    pub enumeration: Option<Vec<Value>>,

    pub multiple_of: Option<MultipleOf>,
    pub maximum: Option<Bound>,
    pub minimum: Option<Bound>,

    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub format: Option<Format>,

    pub items: Option<Items>,
    pub additional_items: Option<Additional>,
    pub max_items: Option<usize>,
    pub min_items: Option<usize>,
    pub unique_items: bool,

    pub max_properties: Option<usize>,
    pub min_properties: Option<usize>,
    pub required: BTreeSet<String>,
    pub properties: BTreeMap<String, NodeId>,
    pub pattern_properties: Vec<(Regex, NodeId)>,
    pub additional_properties: Option<Additional>,
    pub property_dependencies: BTreeMap<String, BTreeSet<String>>,
    pub schema_dependencies: BTreeMap<String, NodeId>,

    pub all_of: Vec<NodeId>,
    pub any_of: Vec<NodeId>,
    pub one_of: Vec<NodeId>,
    pub not: Option<NodeId>,

    /// Every sub-schema this node reaches; drives graph closure.
    pub references: BTreeSet<NodeId>,
}

/// Keyword access for the schema object being compiled.
struct Keywords<'v> {
    position: &'v Pointer,
    members: &'v Map<String, Value>,
}

impl<'v> Keywords<'v> {
    fn get(&self, keyword: &str) -> Option<&'v Value> {
        self.members.get(keyword)
    }

    fn error(&self, keyword: &'static str, reason: impl Into<String>) -> SchemaError {
        SchemaError::keyword(self.position, keyword, reason)
    }

    fn pattern_error(&self, keyword: &'static str, error: regex::Error) -> SchemaError {
        SchemaError::InvalidPattern {
            position: self.position.clone(),
            keyword,
            details: error.to_string(),
        }
    }

    fn child(&self, keyword: &str) -> Pointer {
        self.position.child(keyword)
    }

    fn string(&self, keyword: &'static str) -> SchemaResult<Option<&'v str>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.error(keyword, "must be of type 'string'")),
        }
    }

    fn boolean(&self, keyword: &'static str) -> SchemaResult<Option<bool>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.error(keyword, "must be of type 'boolean'")),
        }
    }

    fn object(&self, keyword: &'static str) -> SchemaResult<Option<&'v Map<String, Value>>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::Object(members)) => Ok(Some(members)),
            Some(_) => Err(self.error(keyword, "must be of type 'object'")),
        }
    }

    fn number(&self, keyword: &'static str) -> SchemaResult<Option<Numeric>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::Number(n)) => Numeric::from_json(n)
                .map(Some)
                .ok_or_else(|| self.error(keyword, "must be a representable number")),
            Some(_) => Err(self.error(keyword, "must be of type 'number'")),
        }
    }

    /// A non-negative integer such as `maxLength` or `minItems`.
    fn count(&self, keyword: &'static str) -> SchemaResult<Option<usize>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::Number(n)) => match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => Ok(Some(usize::try_from(u).unwrap_or(usize::MAX))),
                (None, Some(_)) => {
                    Err(self.error(keyword, "must be greater than or equal to zero"))
                }
                (None, None) => Err(self.error(keyword, "must be of type 'integer'")),
            },
            Some(_) => Err(self.error(keyword, "must be of type 'integer'")),
        }
    }

    /// Non-empty array of distinct strings.
    fn key_set(&self, keyword: &'static str, value: &Value) -> SchemaResult<BTreeSet<String>> {
        let Value::Array(items) = value else {
            return Err(self.error(keyword, "must be of type 'array'"));
        };
        if items.is_empty() {
            return Err(self.error(keyword, "must have at least one element"));
        }
        let mut keys = BTreeSet::new();
        for item in items {
            let Value::String(key) = item else {
                return Err(self.error(keyword, "must contain elements of type 'string'"));
            };
            if !keys.insert(key.clone()) {
                return Err(self.error(keyword, format!("contains duplicate key '{}'", key)));
            }
        }
        Ok(keys)
    }
}

impl ConstraintNode {
    /// Compile the schema `value` found at canonical `position`.
    ///
    /// Sub-schema positions are interned through `positions`, which assigns
    /// the ids of nodes that will be compiled in a later closure round.
    pub(crate) fn compile(
        position: &Pointer,
        value: &Value,
        positions: &mut Positions<'_>,
    ) -> SchemaResult<Self> {
        let Value::Object(members) = value else {
            return Err(SchemaError::NotAnObject {
                position: position.clone(),
            });
        };
        let schema = Keywords { position, members };
        let mut node = ConstraintNode {
            position: position.clone(),
            ..Default::default()
        };

        schema.string("title")?;
        schema.string("description")?;

        node.compile_type(&schema)?;
        node.compile_enum(&schema)?;
        node.compile_composition(&schema, positions)?;
        node.compile_numeric(&schema)?;
        node.compile_string(&schema)?;
        node.compile_array(&schema, positions)?;
        node.compile_object(&schema, positions)?;

        if let Some(definitions) = schema.object("definitions")? {
            let base = schema.child("definitions");
            for name in definitions.keys() {
                node.reference(positions, &base.child(name));
            }
        }
        Ok(node)
    }

    /// Whether the session must remember which keys it has seen.
    pub fn tracks_keys(&self) -> bool {
        !self.required.is_empty()
            || !self.property_dependencies.is_empty()
            || !self.schema_dependencies.is_empty()
    }

    fn reference(&mut self, positions: &mut Positions<'_>, position: &Pointer) -> NodeId {
        let id = positions.intern(position);
        self.references.insert(id);
        id
    }

    fn compile_type(&mut self, schema: &Keywords<'_>) -> SchemaResult<()> {
        let names: Vec<&Value> = match schema.get("type") {
            None => return Ok(()),
            Some(name @ Value::String(_)) => vec![name],
            Some(Value::Array(names)) => names.iter().collect(),
            Some(_) => return Err(schema.error("type", "must be of type 'string' or 'array'")),
        };

        let mut types = TypeSet::default();
        for name in names {
            let Value::String(name) = name else {
                return Err(schema.error("type", "must contain elements of type 'string'"));
            };
            let Some(primitive) = TypeSet::from_name(name) else {
                return Err(schema.error("type", format!("invalid primitive type '{}'", name)));
            };
            if types.intersects(primitive) {
                return Err(schema.error("type", format!("duplicate primitive type '{}'", name)));
            }
            types = types | primitive;
        }
        self.types = Some(types);
        Ok(())
    }

    fn compile_enum(&mut self, schema: &Keywords<'_>) -> SchemaResult<()> {
        match schema.get("enum") {
            None => Ok(()),
            Some(Value::Array(values)) if values.is_empty() => {
                Err(schema.error("enum", "must have at least one element"))
            }
            Some(Value::Array(values)) => {
                self.enumeration = Some(values.clone());
                Ok(())
            }
            Some(_) => Err(schema.error("enum", "must be of type 'array'")),
        }
    }

    fn compile_composition(
        &mut self,
        schema: &Keywords<'_>,
        positions: &mut Positions<'_>,
    ) -> SchemaResult<()> {
        for keyword in ["allOf", "anyOf", "oneOf"] {
            let Some(value) = schema.get(keyword) else {
                continue;
            };
            let Value::Array(branches) = value else {
                return Err(schema.error(keyword, "must be of type 'array'"));
            };
            if branches.is_empty() {
                return Err(schema.error(keyword, "must have at least one element"));
            }
            let base = schema.child(keyword);
            let ids: Vec<NodeId> = (0..branches.len())
                .map(|index| self.reference(positions, &base.index(index)))
                .collect();
            match keyword {
                "allOf" => self.all_of = ids,
                "anyOf" => self.any_of = ids,
                _ => self.one_of = ids,
            }
        }
        if schema.get("not").is_some() {
            self.not = Some(self.reference(positions, &schema.child("not")));
        }
        Ok(())
    }

    fn compile_numeric(&mut self, schema: &Keywords<'_>) -> SchemaResult<()> {
        self.multiple_of = match schema.number("multipleOf")? {
            None => None,
            Some(Numeric::Unsigned(u)) if u > 0 => Some(MultipleOf::Unsigned(u)),
            Some(Numeric::Float(d)) if d > 0.0 => Some(MultipleOf::Float(d)),
            Some(_) => {
                return Err(schema.error("multipleOf", "must be strictly greater than zero"));
            }
        };

        self.maximum = schema.number("maximum")?.map(Bound::inclusive);
        if let Some(exclusive) = schema.boolean("exclusiveMaximum")? {
            let Some(maximum) = self.maximum.as_mut() else {
                return Err(schema.error("exclusiveMaximum", "requires presence of \"maximum\""));
            };
            maximum.exclusive = exclusive;
        }

        self.minimum = schema.number("minimum")?.map(Bound::inclusive);
        if let Some(exclusive) = schema.boolean("exclusiveMinimum")? {
            let Some(minimum) = self.minimum.as_mut() else {
                return Err(schema.error("exclusiveMinimum", "requires presence of \"minimum\""));
            };
            minimum.exclusive = exclusive;
        }
        Ok(())
    }

    fn compile_string(&mut self, schema: &Keywords<'_>) -> SchemaResult<()> {
        self.max_length = schema.count("maxLength")?;
        // a zero minimum admits every string
        self.min_length = schema.count("minLength")?.filter(|&min| min > 0);

        if let Some(pattern) = schema.string("pattern")? {
            let regex = Regex::new(pattern).map_err(|e| schema.pattern_error("pattern", e))?;
            self.pattern = Some(regex);
        }
        // unknown formats are accepted and ignored
        self.format = schema.string("format")?.and_then(Format::from_name);
        Ok(())
    }

    fn compile_array(
        &mut self,
        schema: &Keywords<'_>,
        positions: &mut Positions<'_>,
    ) -> SchemaResult<()> {
        self.items = match schema.get("items") {
            None => None,
            Some(Value::Object(_)) => Some(Items::Uniform(
                self.reference(positions, &schema.child("items")),
            )),
            Some(Value::Array(tuple)) => {
                let base = schema.child("items");
                Some(Items::Tuple(
                    (0..tuple.len())
                        .map(|index| self.reference(positions, &base.index(index)))
                        .collect(),
                ))
            }
            Some(_) => return Err(schema.error("items", "must be of type 'object' or 'array'")),
        };
        self.additional_items = self.additional(schema, "additionalItems", positions)?;

        self.max_items = schema.count("maxItems")?;
        self.min_items = schema.count("minItems")?;
        self.unique_items = schema.boolean("uniqueItems")?.unwrap_or(false);
        Ok(())
    }

    fn compile_object(
        &mut self,
        schema: &Keywords<'_>,
        positions: &mut Positions<'_>,
    ) -> SchemaResult<()> {
        self.max_properties = schema.count("maxProperties")?;
        self.min_properties = schema.count("minProperties")?;

        if let Some(required) = schema.get("required") {
            self.required = schema.key_set("required", required)?;
        }

        if let Some(properties) = schema.object("properties")? {
            let base = schema.child("properties");
            for name in properties.keys() {
                let id = self.reference(positions, &base.child(name));
                self.properties.insert(name.clone(), id);
            }
        }

        if let Some(patterns) = schema.object("patternProperties")? {
            let base = schema.child("patternProperties");
            for pattern in patterns.keys() {
                let regex = Regex::new(pattern)
                    .map_err(|e| schema.pattern_error("patternProperties", e))?;
                let id = self.reference(positions, &base.child(pattern));
                self.pattern_properties.push((regex, id));
            }
        }

        self.additional_properties = self.additional(schema, "additionalProperties", positions)?;

        if let Some(dependencies) = schema.object("dependencies")? {
            let base = schema.child("dependencies");
            for (name, dependency) in dependencies {
                match dependency {
                    Value::Object(_) => {
                        let id = self.reference(positions, &base.child(name));
                        self.schema_dependencies.insert(name.clone(), id);
                    }
                    Value::Array(_) => {
                        let keys = schema.key_set("dependencies", dependency)?;
                        self.property_dependencies.insert(name.clone(), keys);
                    }
                    _ => {
                        return Err(schema.error(
                            "dependencies",
                            "values must be of type 'object' or 'array'",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn additional(
        &mut self,
        schema: &Keywords<'_>,
        keyword: &'static str,
        positions: &mut Positions<'_>,
    ) -> SchemaResult<Option<Additional>> {
        match schema.get(keyword) {
            None | Some(Value::Bool(true)) => Ok(None),
            Some(Value::Bool(false)) => Ok(Some(Additional::Forbidden)),
            Some(Value::Object(_)) => Ok(Some(Additional::Schema(
                self.reference(positions, &schema.child(keyword)),
            ))),
            Some(_) => Err(schema.error(keyword, "must be of type 'boolean' or 'object'")),
        }
    }
}
