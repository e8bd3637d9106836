//! The event contract between JSON producers and validators.
//!
//! A value is described depth first, members in the order the producer
//! meets them (sorted by key when walking a `serde_json::Value`):
//!
//! ```text
//! value := scalar
//!        | begin_array (value element)* end_array
//!        | begin_object (key value member)* end_object
//! ```
//!
//! Two producers are provided: [`from_value`] walks an in-memory
//! [`serde_json::Value`], while [`from_str`] and [`from_reader`] drive a
//! consumer straight from JSON text through `serde_json`'s deserializer
//! without ever materializing the value.

use std::fmt;
use std::io::Read;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

use crate::numeric::Numeric;

/// Receiver of a structured value as a sequence of events.
pub trait Consumer {
    fn null(&mut self);
    fn boolean(&mut self, value: bool);
    fn number_i64(&mut self, value: i64);
    fn number_u64(&mut self, value: u64);
    fn number_f64(&mut self, value: f64);
    fn string(&mut self, value: &str);
    /// Opaque payloads; JSON text never produces them.
    fn binary(&mut self, value: &[u8]);
    fn begin_array(&mut self);
    /// Closes one array entry.
    fn element(&mut self);
    fn end_array(&mut self);
    fn begin_object(&mut self);
    fn key(&mut self, key: &str);
    /// Closes one object member.
    fn member(&mut self);
    fn end_object(&mut self);
}

/// One event, borrowed from the producer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'e> {
    Null,
    Boolean(bool),
    Number(Numeric),
    String(&'e str),
    Binary(&'e [u8]),
    BeginArray,
    Element,
    EndArray,
    BeginObject,
    Key(&'e str),
    Member,
    EndObject,
}

impl Event<'_> {
    /// Deliver this event to `consumer`.
    pub fn replay<C: Consumer + ?Sized>(self, consumer: &mut C) {
        match self {
            Event::Null => consumer.null(),
            Event::Boolean(value) => consumer.boolean(value),
            Event::Number(Numeric::Signed(value)) => consumer.number_i64(value),
            Event::Number(Numeric::Unsigned(value)) => consumer.number_u64(value),
            Event::Number(Numeric::Float(value)) => consumer.number_f64(value),
            Event::String(value) => consumer.string(value),
            Event::Binary(value) => consumer.binary(value),
            Event::BeginArray => consumer.begin_array(),
            Event::Element => consumer.element(),
            Event::EndArray => consumer.end_array(),
            Event::BeginObject => consumer.begin_object(),
            Event::Key(key) => consumer.key(key),
            Event::Member => consumer.member(),
            Event::EndObject => consumer.end_object(),
        }
    }
}

/// Walk an in-memory value.
pub fn from_value<C: Consumer + ?Sized>(value: &Value, consumer: &mut C) {
    match value {
        Value::Null => consumer.null(),
        Value::Bool(b) => consumer.boolean(*b),
        Value::Number(number) => {
            if let Some(u) = number.as_u64() {
                consumer.number_u64(u);
            } else if let Some(i) = number.as_i64() {
                consumer.number_i64(i);
            } else if let Some(d) = number.as_f64() {
                consumer.number_f64(d);
            }
        }
        Value::String(s) => consumer.string(s),
        Value::Array(items) => {
            consumer.begin_array();
            for item in items {
                from_value(item, consumer);
                consumer.element();
            }
            consumer.end_array();
        }
        Value::Object(members) => {
            consumer.begin_object();
            for (key, member) in members {
                consumer.key(key);
                from_value(member, consumer);
                consumer.member();
            }
            consumer.end_object();
        }
    }
}

/// Parse one JSON text and stream it into `consumer`.
///
/// Events are delivered while parsing, so a syntax error may surface after
/// part of the value has already been consumed.
pub fn from_str<C: Consumer + ?Sized>(text: &str, consumer: &mut C) -> serde_json::Result<()> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    EventSeed { consumer }.deserialize(&mut deserializer)?;
    deserializer.end()
}

/// Like [`from_str`], reading from an I/O source.
pub fn from_reader<R: Read, C: Consumer + ?Sized>(
    reader: R,
    consumer: &mut C,
) -> serde_json::Result<()> {
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    EventSeed { consumer }.deserialize(&mut deserializer)?;
    deserializer.end()
}

struct EventSeed<'c, C: ?Sized> {
    consumer: &'c mut C,
}

impl<'de, C: Consumer + ?Sized> DeserializeSeed<'de> for EventSeed<'_, C> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(EventVisitor {
            consumer: self.consumer,
        })
    }
}

struct EventVisitor<'c, C: ?Sized> {
    consumer: &'c mut C,
}

impl<'de, C: Consumer + ?Sized> Visitor<'de> for EventVisitor<'_, C> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.consumer.null();
        Ok(())
    }

    fn visit_none<E: de::Error>(self) -> Result<(), E> {
        self.consumer.null();
        Ok(())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        EventSeed {
            consumer: self.consumer,
        }
        .deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<(), E> {
        self.consumer.boolean(value);
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<(), E> {
        // serde_json reports non-negative integers through visit_u64
        if value >= 0 {
            self.consumer.number_u64(value as u64);
        } else {
            self.consumer.number_i64(value);
        }
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<(), E> {
        self.consumer.number_u64(value);
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<(), E> {
        self.consumer.number_f64(value);
        Ok(())
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<(), E> {
        self.consumer.string(value);
        Ok(())
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<(), E> {
        self.consumer.binary(value);
        Ok(())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        self.consumer.begin_array();
        while seq
            .next_element_seed(EventSeed {
                consumer: &mut *self.consumer,
            })?
            .is_some()
        {
            self.consumer.element();
        }
        self.consumer.end_array();
        Ok(())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        self.consumer.begin_object();
        while map
            .next_key_seed(KeySeed {
                consumer: &mut *self.consumer,
            })?
            .is_some()
        {
            map.next_value_seed(EventSeed {
                consumer: &mut *self.consumer,
            })?;
            self.consumer.member();
        }
        self.consumer.end_object();
        Ok(())
    }
}

struct KeySeed<'c, C: ?Sized> {
    consumer: &'c mut C,
}

impl<'de, C: Consumer + ?Sized> DeserializeSeed<'de> for KeySeed<'_, C> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_str(self)
    }
}

impl<'de, C: Consumer + ?Sized> Visitor<'de> for KeySeed<'_, C> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object key")
    }

    fn visit_str<E: de::Error>(self, key: &str) -> Result<(), E> {
        self.consumer.key(key);
        Ok(())
    }
}
