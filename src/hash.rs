//! Order-independent structural digests for `uniqueItems`.
//!
//! Two values that compare equal structurally produce the same digest: object
//! members are digested individually and combined in sorted order, and numbers
//! are canonicalized so that `1` and `1.0` agree.

use sha2::{Digest, Sha256};

use crate::events::Consumer;
use crate::numeric::Numeric;

pub type StructuralDigest = [u8; 32];

#[derive(Default)]
struct ObjectFrame {
    members: Vec<StructuralDigest>,
    member: Sha256,
}

/// Accumulates the digest of one value from its events.
#[derive(Default)]
pub struct EventHash {
    root: Sha256,
    objects: Vec<ObjectFrame>,
}

impl EventHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of everything consumed so far; resets the hasher.
    pub fn take(&mut self) -> StructuralDigest {
        let hasher = std::mem::take(self);
        hasher.root.finalize().into()
    }

    fn sink(&mut self) -> &mut Sha256 {
        match self.objects.last_mut() {
            Some(frame) => &mut frame.member,
            None => &mut self.root,
        }
    }

    fn tagged(&mut self, tag: u8, payload: &[u8]) {
        let sink = self.sink();
        sink.update([tag]);
        sink.update((payload.len() as u64).to_le_bytes());
        sink.update(payload);
    }

    fn number(&mut self, value: Numeric) {
        match value.canonical() {
            Numeric::Signed(i) => self.tagged(b'i', &i.to_le_bytes()),
            Numeric::Unsigned(u) => self.tagged(b'u', &u.to_le_bytes()),
            Numeric::Float(d) => self.tagged(b'd', &d.to_bits().to_le_bytes()),
        }
    }
}

impl Consumer for EventHash {
    fn null(&mut self) {
        self.sink().update(b"n");
    }

    fn boolean(&mut self, value: bool) {
        self.sink().update(if value { b"t" } else { b"f" });
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
        self.tagged(b's', value.as_bytes());
    }

    fn binary(&mut self, value: &[u8]) {
        self.tagged(b'x', value);
    }

    fn begin_array(&mut self) {
        self.sink().update(b"[");
    }

    fn element(&mut self) {
        self.sink().update(b",");
    }

    fn end_array(&mut self) {
        self.sink().update(b"]");
    }

    fn begin_object(&mut self) {
        self.objects.push(ObjectFrame::default());
    }

    fn key(&mut self, key: &str) {
        self.tagged(b'k', key.as_bytes());
    }

    fn member(&mut self) {
        if let Some(frame) = self.objects.last_mut() {
            let member = std::mem::take(&mut frame.member);
            frame.members.push(member.finalize().into());
        }
    }

    fn end_object(&mut self) {
        let Some(mut frame) = self.objects.pop() else {
            return;
        };
        frame.members.sort_unstable();
        let sink = self.sink();
        sink.update(b"{");
        for member in &frame.members {
            sink.update(member);
        }
        sink.update(b"}");
    }
}
