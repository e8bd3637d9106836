//! Streaming validation of one value against one node.
//!
//! A [`ValidationSession`] consumes the events of a single value and keeps
//! only the state needed to decide it: a match flag that never returns to
//! `true`, shrink-only candidate lists for `enum`, `anyOf` and `oneOf`, and
//! child sessions for the sub-schemas that apply to the current part of the
//! value. Children for `properties` and `items` are created when their
//! member or element begins and are finalized when it ends.

use std::collections::HashSet;
use std::mem;

use crate::compare::EventCompare;
use crate::events::{Consumer, Event};
use crate::format::unicode_len;
use crate::graph::ConstraintGraph;
use crate::hash::{EventHash, StructuralDigest};
use crate::node::{Additional, ConstraintNode, Items, NodeId, TypeSet};
use crate::numeric::{BoundKind, Numeric};

#[derive(Default)]
struct UniqueItems {
    current: EventHash,
    seen: HashSet<StructuralDigest>,
}

pub struct ValidationSession<'g> {
    graph: &'g ConstraintGraph,
    node: &'g ConstraintNode,
    matched: bool,
    /// Set by the first event; composition branches exist from then on.
    started: bool,
    /// One entry per open array or object, counting its entries so far.
    /// Empty while the session is at the level of its own value.
    counts: Vec<usize>,
    candidates: Vec<EventCompare<'g>>,
    item: Option<Box<ValidationSession<'g>>>,
    properties: Vec<ValidationSession<'g>>,
    all_of: Vec<ValidationSession<'g>>,
    any_of: Vec<ValidationSession<'g>>,
    one_of: Vec<ValidationSession<'g>>,
    not: Option<Box<ValidationSession<'g>>>,
    dependencies: Vec<(&'g str, ValidationSession<'g>)>,
    keys: HashSet<String>,
    unique: Option<UniqueItems>,
}

impl<'g> ValidationSession<'g> {
    pub(crate) fn new(graph: &'g ConstraintGraph, id: NodeId) -> Self {
        let node = graph.node(id);
        Self {
            graph,
            node,
            matched: true,
            started: false,
            counts: Vec::new(),
            candidates: node
                .enumeration
                .iter()
                .flatten()
                .map(EventCompare::new)
                .collect(),
            item: None,
            properties: Vec::new(),
            all_of: Vec::new(),
            any_of: Vec::new(),
            one_of: Vec::new(),
            not: None,
            dependencies: Vec::new(),
            keys: HashSet::new(),
            unique: None,
        }
    }

    /// False once the events seen so far can no longer match.
    pub fn is_match(&self) -> bool {
        self.matched
    }

    /// Decide the pending composition and dependency branches and return the
    /// verdict for the complete value.
    pub fn finalize(mut self) -> bool {
        self.start();

        if self.matched && !mem::take(&mut self.all_of).into_iter().all(Self::finalize) {
            self.matched = false;
        }
        if self.matched && !self.any_of.is_empty() {
            let survivors = mem::take(&mut self.any_of)
                .into_iter()
                .map(Self::finalize)
                .filter(|&verdict| verdict)
                .count();
            if survivors == 0 {
                self.matched = false;
            }
        }
        if self.matched && !self.one_of.is_empty() {
            let survivors = mem::take(&mut self.one_of)
                .into_iter()
                .map(Self::finalize)
                .filter(|&verdict| verdict)
                .count();
            if survivors != 1 {
                self.matched = false;
            }
        }
        if self.matched {
            if let Some(not) = self.not.take() {
                if not.finalize() {
                    self.matched = false;
                }
            }
        }
        if self.matched {
            let mut branches = mem::take(&mut self.dependencies);
            let observed = self
                .node
                .schema_dependencies
                .keys()
                .filter(|key| self.keys.contains(*key));
            for key in observed {
                // a branch that failed while streaming was already dropped
                let verdict = branches
                    .iter()
                    .position(|(name, _)| *name == key.as_str())
                    .is_some_and(|index| branches.swap_remove(index).1.finalize());
                if !verdict {
                    self.matched = false;
                    break;
                }
            }
        }
        self.matched
    }

    /// Feed one event.
    pub fn handle(&mut self, event: Event<'_>) {
        self.start();
        match event {
            Event::Null => self.scalar(event, TypeSet::NULL),
            Event::Boolean(_) => self.scalar(event, TypeSet::BOOLEAN),
            Event::Number(Numeric::Float(_)) => self.scalar(event, TypeSet::NUMBER),
            Event::Number(_) => self.scalar(event, TypeSet::INTEGER | TypeSet::NUMBER),
            Event::String(_) => self.scalar(event, TypeSet::STRING),
            // opaque payloads carry no constraints
            Event::Binary(_) => {}
            Event::BeginArray => self.begin_array(),
            Event::Element => self.element(),
            Event::EndArray => self.end_array(),
            Event::BeginObject => self.begin_object(),
            Event::Key(key) => self.key(key),
            Event::Member => self.member(),
            Event::EndObject => self.end_object(),
        }
    }

    fn spawn(&self, id: NodeId) -> ValidationSession<'g> {
        ValidationSession::new(self.graph, id)
    }

    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let node = self.node;
        self.all_of = node.all_of.iter().map(|&id| self.spawn(id)).collect();
        self.any_of = node.any_of.iter().map(|&id| self.spawn(id)).collect();
        self.one_of = node.one_of.iter().map(|&id| self.spawn(id)).collect();
        self.not = node.not.map(|id| Box::new(self.spawn(id)));
        self.dependencies = node
            .schema_dependencies
            .iter()
            .map(|(key, &id)| (key.as_str(), self.spawn(id)))
            .collect();
    }

    fn at_own_level(&self) -> bool {
        self.counts.is_empty()
    }

    fn in_own_aggregate(&self) -> bool {
        self.counts.len() == 1
    }

    fn check_type(&mut self, kind: TypeSet) {
        if !self.at_own_level() {
            return;
        }
        if let Some(types) = self.node.types {
            if !types.intersects(kind) {
                self.matched = false;
            }
        }
    }

    fn prune_enum(&mut self, event: Event<'_>) {
        if !self.matched || self.node.enumeration.is_none() {
            return;
        }
        self.candidates.retain_mut(|candidate| {
            event.replay(candidate);
            candidate.is_match()
        });
        if self.candidates.is_empty() {
            self.matched = false;
        }
    }

    /// Forward `event` to the active children, absorbing their failures
    /// according to each keyword.
    fn delegate(&mut self, event: Event<'_>) {
        if self.matched {
            if let Some(item) = self.item.as_mut() {
                item.handle(event);
                if !item.matched {
                    self.matched = false;
                }
            }
        }
        if self.matched && self.properties.iter_mut().any(|p| rejects(p, event)) {
            self.matched = false;
        }
        if self.matched && self.all_of.iter_mut().any(|b| rejects(b, event)) {
            self.matched = false;
        }
        if self.matched && !self.any_of.is_empty() {
            self.any_of.retain_mut(|b| !rejects(b, event));
            if self.any_of.is_empty() {
                self.matched = false;
            }
        }
        if self.matched && !self.one_of.is_empty() {
            self.one_of.retain_mut(|b| !rejects(b, event));
            if self.one_of.is_empty() {
                self.matched = false;
            }
        }
        if self.matched {
            if let Some(not) = self.not.as_mut() {
                if rejects(not, event) {
                    self.not = None;
                }
            }
        }
        if self.matched {
            self.dependencies.retain_mut(|(_, b)| !rejects(b, event));
        }
    }

    fn feed_unique(&mut self, event: Event<'_>) {
        if !self.matched {
            return;
        }
        if let Some(unique) = self.unique.as_mut() {
            event.replay(&mut unique.current);
        }
    }

    fn scalar(&mut self, event: Event<'_>, kind: TypeSet) {
        if self.matched {
            self.check_type(kind);
        }
        self.prune_enum(event);
        self.delegate(event);
        if self.matched && self.at_own_level() {
            match event {
                Event::Number(value) => self.check_number(value),
                Event::String(value) => self.check_string(value),
                _ => {}
            }
        }
        self.feed_unique(event);
    }

    fn check_number(&mut self, value: Numeric) {
        let node = self.node;
        if node.multiple_of.is_some_and(|divisor| !divisor.admits(value)) {
            self.matched = false;
        }
        if node
            .maximum
            .is_some_and(|max| !max.admits(BoundKind::Maximum, value))
        {
            self.matched = false;
        }
        if node
            .minimum
            .is_some_and(|min| !min.admits(BoundKind::Minimum, value))
        {
            self.matched = false;
        }
    }

    fn check_string(&mut self, value: &str) {
        let node = self.node;
        if node.max_length.is_some() || node.min_length.is_some() {
            let length = unicode_len(value);
            if node.max_length.is_some_and(|max| length > max)
                || node.min_length.is_some_and(|min| length < min)
            {
                self.matched = false;
            }
        }
        if self.matched && node.pattern.as_ref().is_some_and(|p| !p.is_match(value)) {
            self.matched = false;
        }
        if self.matched && node.format.is_some_and(|f| !f.is_valid(value)) {
            self.matched = false;
        }
    }

    /// Child session for array slot `index`, if any schema applies to it.
    fn select_item(&self, index: usize) -> Option<Box<ValidationSession<'g>>> {
        let id = match &self.node.items {
            Some(Items::Uniform(id)) => Some(*id),
            Some(Items::Tuple(tuple)) => tuple.get(index).copied().or(
                match self.node.additional_items {
                    Some(Additional::Schema(id)) => Some(id),
                    _ => None,
                },
            ),
            None => None,
        };
        id.map(|id| Box::new(self.spawn(id)))
    }

    /// Close the current array slot. A slot that never saw an event belongs
    /// to no element and is dropped.
    fn close_item(&mut self) {
        if let Some(item) = self.item.take() {
            if item.started && !item.finalize() {
                self.matched = false;
            }
        }
    }

    fn count(&self) -> usize {
        self.counts.last().copied().unwrap_or(0)
    }

    fn begin_array(&mut self) {
        if self.matched {
            self.check_type(TypeSet::ARRAY);
        }
        self.prune_enum(Event::BeginArray);
        self.delegate(Event::BeginArray);
        if self.matched {
            let fresh = self.at_own_level() && self.node.unique_items;
            match self.unique.as_mut() {
                Some(unique) => Event::BeginArray.replay(&mut unique.current),
                None if fresh => {
                    self.unique = Some(UniqueItems::default());
                }
                None => {}
            }
        }
        if self.matched && self.at_own_level() {
            self.item = self.select_item(0);
        }
        self.counts.push(0);
    }

    fn element(&mut self) {
        self.prune_enum(Event::Element);
        if self.matched && self.in_own_aggregate() {
            self.close_item();
        }
        self.delegate(Event::Element);
        if self.matched {
            let own = self.in_own_aggregate();
            if let Some(unique) = self.unique.as_mut() {
                if own {
                    let digest = unique.current.take();
                    if !unique.seen.insert(digest) {
                        self.matched = false;
                    }
                } else {
                    Event::Element.replay(&mut unique.current);
                }
            }
        }
        let Some(count) = self.counts.last_mut() else {
            return;
        };
        *count += 1;
        let next = *count;
        if self.matched && self.in_own_aggregate() {
            self.item = self.select_item(next);
        }
    }

    fn end_array(&mut self) {
        self.prune_enum(Event::EndArray);
        if self.matched && self.in_own_aggregate() {
            self.close_item();
            if let (Some(Items::Tuple(tuple)), Some(Additional::Forbidden)) =
                (&self.node.items, self.node.additional_items)
            {
                if self.count() > tuple.len() {
                    self.matched = false;
                }
            }
        }
        self.delegate(Event::EndArray);
        if !self.in_own_aggregate() {
            self.feed_unique(Event::EndArray);
        }
        if self.matched && self.in_own_aggregate() {
            let count = self.count();
            if self.node.max_items.is_some_and(|max| count > max)
                || self.node.min_items.is_some_and(|min| count < min)
            {
                self.matched = false;
            }
        }
        self.counts.pop();
    }

    fn begin_object(&mut self) {
        if self.matched {
            self.check_type(TypeSet::OBJECT);
        }
        self.prune_enum(Event::BeginObject);
        self.delegate(Event::BeginObject);
        self.feed_unique(Event::BeginObject);
        self.counts.push(0);
    }

    fn key(&mut self, key: &str) {
        self.prune_enum(Event::Key(key));
        self.delegate(Event::Key(key));
        self.feed_unique(Event::Key(key));
        if !self.matched || !self.in_own_aggregate() {
            return;
        }
        // a repeated key makes required/dependency bookkeeping meaningless
        if self.node.tracks_keys() && !self.keys.insert(key.to_owned()) {
            self.matched = false;
            return;
        }
        self.open_properties(key);
    }

    /// Children for the member named `key`: the exact property, every
    /// matching pattern, or else `additionalProperties`.
    fn open_properties(&mut self, key: &str) {
        let node = self.node;
        if let Some(&id) = node.properties.get(key) {
            let child = self.spawn(id);
            self.properties.push(child);
        }
        for (pattern, id) in &node.pattern_properties {
            if pattern.is_match(key) {
                let child = self.spawn(*id);
                self.properties.push(child);
            }
        }
        if self.properties.is_empty() {
            match node.additional_properties {
                Some(Additional::Forbidden) => self.matched = false,
                Some(Additional::Schema(id)) => {
                    let child = self.spawn(id);
                    self.properties.push(child);
                }
                None => {}
            }
        }
    }

    fn member(&mut self) {
        self.prune_enum(Event::Member);
        if self.matched && self.in_own_aggregate() {
            let properties = mem::take(&mut self.properties);
            if !properties.into_iter().all(Self::finalize) {
                self.matched = false;
            }
        }
        self.delegate(Event::Member);
        self.feed_unique(Event::Member);
        if let Some(count) = self.counts.last_mut() {
            *count += 1;
        }
    }

    fn end_object(&mut self) {
        self.prune_enum(Event::EndObject);
        self.delegate(Event::EndObject);
        self.feed_unique(Event::EndObject);
        if self.matched && self.in_own_aggregate() {
            self.check_members();
        }
        self.counts.pop();
    }

    fn check_members(&mut self) {
        let node = self.node;
        let count = self.count();
        if node.max_properties.is_some_and(|max| count > max)
            || node.min_properties.is_some_and(|min| count < min)
        {
            self.matched = false;
            return;
        }
        if !node.required.iter().all(|key| self.keys.contains(key)) {
            self.matched = false;
            return;
        }
        let unsatisfied = node.property_dependencies.iter().any(|(key, required)| {
            self.keys.contains(key) && !required.iter().all(|r| self.keys.contains(r))
        });
        if unsatisfied {
            self.matched = false;
        }
    }
}

/// Feed `event` to a child; true if the child has failed.
fn rejects(session: &mut ValidationSession<'_>, event: Event<'_>) -> bool {
    session.handle(event);
    !session.matched
}

impl Consumer for ValidationSession<'_> {
    fn null(&mut self) {
        self.handle(Event::Null);
    }

    fn boolean(&mut self, value: bool) {
        self.handle(Event::Boolean(value));
    }

    fn number_i64(&mut self, value: i64) {
        self.handle(Event::Number(Numeric::Signed(value)));
    }

    fn number_u64(&mut self, value: u64) {
        self.handle(Event::Number(Numeric::Unsigned(value)));
    }

    fn number_f64(&mut self, value: f64) {
        self.handle(Event::Number(Numeric::Float(value)));
    }

    fn string(&mut self, value: &str) {
        self.handle(Event::String(value));
    }

    fn binary(&mut self, value: &[u8]) {
        self.handle(Event::Binary(value));
    }

    fn begin_array(&mut self) {
        self.handle(Event::BeginArray);
    }

    fn element(&mut self) {
        self.handle(Event::Element);
    }

    fn end_array(&mut self) {
        self.handle(Event::EndArray);
    }

    fn begin_object(&mut self) {
        self.handle(Event::BeginObject);
    }

    fn key(&mut self, key: &str) {
        self.handle(Event::Key(key));
    }

    fn member(&mut self) {
        self.handle(Event::Member);
    }

    fn end_object(&mut self) {
        self.handle(Event::EndObject);
    }
}
