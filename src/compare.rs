//! Event-driven structural equality against a literal value.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::events::Consumer;
use crate::numeric::Numeric;

enum Frame<'a> {
    Array {
        items: &'a [Value],
        index: usize,
    },
    Object {
        members: &'a Map<String, Value>,
        seen: HashSet<&'a str>,
    },
}

/// Compares an event stream with one expected value, event by event.
///
/// Once a mismatch is seen the comparator stays mismatched and ignores the
/// rest of the stream. Numbers compare by value across representations, so
/// `1`, `1u64` and `1.0` are equal.
pub struct EventCompare<'a> {
    stack: Vec<Frame<'a>>,
    next: Option<&'a Value>,
    matched: bool,
}

impl<'a> EventCompare<'a> {
    pub fn new(expected: &'a Value) -> Self {
        Self {
            stack: Vec::new(),
            next: Some(expected),
            matched: true,
        }
    }

    /// True while every event so far agrees with the expected value.
    pub fn is_match(&self) -> bool {
        self.matched
    }

    fn expect(&mut self, check: impl FnOnce(&'a Value) -> bool) {
        if !self.matched {
            return;
        }
        match self.next.take() {
            Some(expected) if check(expected) => {}
            _ => self.matched = false,
        }
    }

    fn number(&mut self, actual: Numeric) {
        self.expect(|expected| match expected {
            Value::Number(number) => {
                Numeric::from_json(number).is_some_and(|n| n.numeric_eq(actual))
            }
            _ => false,
        });
    }
}

impl<'a> Consumer for EventCompare<'a> {
    fn null(&mut self) {
        self.expect(Value::is_null);
    }

    fn boolean(&mut self, value: bool) {
        self.expect(|expected| expected.as_bool() == Some(value));
    }

    fn number_i64(&mut self, value: i64) {
        self.number(Numeric::Signed(value));
    }

    fn number_u64(&mut self, value: u64) {
        self.number(Numeric::Unsigned(value));
    }

    fn number_f64(&mut self, value: f64) {
        self.number(Numeric::Float(value));
    }

    fn string(&mut self, value: &str) {
        self.expect(|expected| expected.as_str() == Some(value));
    }

    fn binary(&mut self, _value: &[u8]) {
        self.expect(|_| false);
    }

    fn begin_array(&mut self) {
        if !self.matched {
            return;
        }
        match self.next.take() {
            Some(Value::Array(items)) => {
                self.next = items.first();
                self.stack.push(Frame::Array { items, index: 0 });
            }
            _ => self.matched = false,
        }
    }

    fn element(&mut self) {
        if !self.matched {
            return;
        }
        match self.stack.last_mut() {
            Some(Frame::Array { items, index }) => {
                *index += 1;
                let items: &'a [Value] = *items;
                self.next = items.get(*index);
            }
            _ => self.matched = false,
        }
    }

    fn end_array(&mut self) {
        if !self.matched {
            return;
        }
        match self.stack.pop() {
            Some(Frame::Array { items, index }) if index == items.len() => self.next = None,
            _ => self.matched = false,
        }
    }

    fn begin_object(&mut self) {
        if !self.matched {
            return;
        }
        match self.next.take() {
            Some(Value::Object(members)) => self.stack.push(Frame::Object {
                members,
                seen: HashSet::new(),
            }),
            _ => self.matched = false,
        }
    }

    fn key(&mut self, key: &str) {
        if !self.matched {
            return;
        }
        let Some(Frame::Object { members, seen }) = self.stack.last_mut() else {
            self.matched = false;
            return;
        };
        let members: &'a Map<String, Value> = *members;
        match members.get_key_value(key) {
            Some((name, value)) if seen.insert(name.as_str()) => self.next = Some(value),
            _ => self.matched = false,
        }
    }

    fn member(&mut self) {
        self.next = None;
    }

    fn end_object(&mut self) {
        if !self.matched {
            return;
        }
        match self.stack.pop() {
            Some(Frame::Object { members, seen }) if seen.len() == members.len() => {
                self.next = None
            }
            _ => self.matched = false,
        }
    }
}
