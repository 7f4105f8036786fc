//! Builds the decoder's node tree on top of `serde_json_core`'s deserializer.
//!
//! The tree is stored in preorder. Containers record their child count and the
//! index one past their last descendant, so siblings can be skipped without
//! walking subtrees. Object children come in pairs: a `Key` node followed by
//! the value's subtree. Decoded strings are appended to a shared text buffer
//! and referenced by span.
//!
//! `serde_json_core` validates the syntax and drives the visitors, but it has
//! no `deserialize_any`. A [`Lookahead`] running over the same bytes tells the
//! value seed which typed `deserialize_*` call comes next.

use heapless::{String, Vec};
use serde::de::{self, DeserializeSeed, Deserializer as _, MapAccess, SeqAccess, Visitor};
use serde_json_core::de::Deserializer;
use serde_json_core::str::{EscapedStr, EscapedStringFragment};

use super::Error;

/// Deepest nesting of objects and arrays accepted.
pub const MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: u16,
    pub(crate) end: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Node {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(Span),
    Key(Span),
    Object { len: u16, end: u16 },
    Array { len: u16, end: u16 },
}

/// Writes one payload into the decoder's buffers.
pub(crate) struct Builder<'b, const N: usize, const M: usize> {
    src: &'b [u8],
    lookahead: Lookahead<'b>,
    text: &'b mut String<N>,
    nodes: &'b mut Vec<Node, M>,
    fault: Option<Error>,
}

impl<'b, const N: usize, const M: usize> Builder<'b, N, M> {
    pub(crate) fn new(src: &'b [u8], text: &'b mut String<N>, nodes: &'b mut Vec<Node, M>) -> Self {
        text.clear();
        nodes.clear();
        Self {
            src,
            lookahead: Lookahead::new(src),
            text,
            nodes,
            fault: None,
        }
    }

    /// Parses one root object followed only by whitespace.
    pub(crate) fn document(mut self) -> Result<(), Error> {
        match self.lookahead.next_value() {
            Kind::Object => {}
            Kind::End => return Err(Error::Empty),
            Kind::Invalid => return Err(Error::Malformed),
            _ => return Err(Error::NotAnObject),
        }

        let mut deserializer = Deserializer::new(self.src, None);
        let root = TreeVisitor {
            builder: &mut self,
            depth: 1,
        };
        if (&mut deserializer).deserialize_map(root).is_err() {
            return Err(self.fault.take().unwrap_or(Error::Malformed));
        }
        deserializer
            .end()
            .map(drop)
            .map_err(|_| Error::TrailingCharacters)
    }

    /// Records why the build stopped and hands serde an error to unwind with.
    fn fail<E: de::Error>(&mut self, err: Error) -> E {
        self.fault = Some(err);
        E::custom(format_args!("{:?}", err))
    }

    fn push<E: de::Error>(&mut self, node: Node) -> Result<usize, E> {
        let index = self.nodes.len();
        match self.nodes.push(node) {
            Ok(()) => Ok(index),
            Err(_) => Err(self.fail(Error::CapacityExceeded)),
        }
    }

    /// Patches the container at `index` once its children are in place.
    fn close<E: de::Error>(&mut self, index: usize, count: usize) -> Result<(), E> {
        let (Ok(count), Ok(after)) = (u16::try_from(count), u16::try_from(self.nodes.len())) else {
            return Err(self.fail(Error::CapacityExceeded));
        };
        if let Some(Node::Object { len, end } | Node::Array { len, end }) = self.nodes.get_mut(index)
        {
            *len = count;
            *end = after;
        }
        Ok(())
    }

    /// Unescapes a raw string body into the text buffer.
    fn text<E: de::Error>(&mut self, raw: &str) -> Result<Span, E> {
        if raw.bytes().any(|b| b < 0x20) {
            return Err(self.fail(Error::Malformed));
        }

        let start = self.text.len();
        for fragment in EscapedStr(raw).fragments() {
            let pushed = match fragment {
                Ok(EscapedStringFragment::NotEscaped(run)) => self.text.push_str(run),
                Ok(EscapedStringFragment::Escaped(ch)) => self.text.push(ch),
                Err(_) => return Err(self.fail(Error::Malformed)),
            };
            if pushed.is_err() {
                return Err(self.fail(Error::CapacityExceeded));
            }
        }

        match (u16::try_from(start), u16::try_from(self.text.len())) {
            (Ok(start), Ok(end)) => Ok(Span { start, end }),
            _ => Err(self.fail(Error::CapacityExceeded)),
        }
    }
}

/// Visits one value; `depth` is the nesting level of the container being
/// visited, the root object being 1.
struct TreeVisitor<'a, 'b, const N: usize, const M: usize> {
    builder: &'a mut Builder<'b, N, M>,
    depth: usize,
}

impl<'de, const N: usize, const M: usize> Visitor<'de> for TreeVisitor<'_, '_, N, M> {
    type Value = ();

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let index = self.builder.push::<A::Error>(Node::Object { len: 0, end: 0 })?;
        let mut count = 0;
        while map
            .next_key_seed(KeySeed {
                builder: &mut *self.builder,
            })?
            .is_some()
        {
            map.next_value_seed(ValueSeed {
                builder: &mut *self.builder,
                depth: self.depth,
            })?;
            count += 1;
        }
        self.builder.close(index, count)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let index = self.builder.push::<A::Error>(Node::Array { len: 0, end: 0 })?;
        let mut count = 0;
        while seq
            .next_element_seed(ValueSeed {
                builder: &mut *self.builder,
                depth: self.depth,
            })?
            .is_some()
        {
            count += 1;
        }
        self.builder.close(index, count)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<(), E> {
        let span = self.builder.text::<E>(v)?;
        self.builder.push(Node::Str(span)).map(drop)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<(), E> {
        self.builder.push(Node::Integer(v)).map(drop)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<(), E> {
        self.builder.push(Node::Float(v)).map(drop)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<(), E> {
        self.builder.push(Node::Bool(v)).map(drop)
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.builder.push(Node::Null).map(drop)
    }
}

/// Seed for a value inside a container at `depth`.
struct ValueSeed<'a, 'b, const N: usize, const M: usize> {
    builder: &'a mut Builder<'b, N, M>,
    depth: usize,
}

impl<'de, const N: usize, const M: usize> DeserializeSeed<'de> for ValueSeed<'_, '_, N, M> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        let kind = self.builder.lookahead.next_value();
        if matches!(kind, Kind::Object | Kind::Array) && self.depth >= MAX_DEPTH {
            return Err(self.builder.fail(Error::TooDeep));
        }

        let nested = self.depth + 1;
        let visitor = TreeVisitor {
            builder: self.builder,
            depth: nested,
        };
        match kind {
            Kind::Object => deserializer.deserialize_map(visitor),
            Kind::Array => deserializer.deserialize_seq(visitor),
            Kind::Str => deserializer.deserialize_str(visitor),
            Kind::Integer => deserializer.deserialize_i64(visitor),
            Kind::Float => deserializer.deserialize_f64(visitor),
            Kind::Bool => deserializer.deserialize_bool(visitor),
            Kind::Null => deserializer.deserialize_unit(visitor),
            Kind::Invalid | Kind::End => Err(visitor.builder.fail(Error::Malformed)),
        }
    }
}

/// Seed and visitor for an object key.
struct KeySeed<'a, 'b, const N: usize, const M: usize> {
    builder: &'a mut Builder<'b, N, M>,
}

impl<'de, const N: usize, const M: usize> DeserializeSeed<'de> for KeySeed<'_, '_, N, M> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_str(self)
    }
}

impl<'de, const N: usize, const M: usize> Visitor<'de> for KeySeed<'_, '_, N, M> {
    type Value = ();

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("an object key")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<(), E> {
        let span = self.builder.text::<E>(v)?;
        self.builder.push(Node::Key(span)).map(drop)
    }
}

/// Shape of the next value, as far as choosing a `deserialize_*` call needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Object,
    Array,
    Str,
    Integer,
    Float,
    Bool,
    Null,
    Invalid,
    End,
}

/// Walks the payload in step with the deserializer, one value at a time.
///
/// Only exact for well-formed input. On anything else its guess is checked by
/// the typed call, which then fails.
struct Lookahead<'b> {
    bytes: &'b [u8],
    pos: usize,
    /// One bit per open container, set for objects.
    objects: u64,
    depth: u32,
    expect_key: bool,
}

impl<'b> Lookahead<'b> {
    fn new(bytes: &'b [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            objects: 0,
            depth: 0,
            expect_key: false,
        }
    }

    /// Advances past the next value's first token, skipping keys.
    fn next_value(&mut self) -> Kind {
        while let Some(&byte) = self.bytes.get(self.pos) {
            let start = self.pos;
            self.pos += 1;
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | b':' => {}
                b',' => self.expect_key = self.in_object(),
                b'}' | b']' => self.depth = self.depth.saturating_sub(1),
                b'"' => {
                    self.skip_string();
                    if !core::mem::take(&mut self.expect_key) {
                        return Kind::Str;
                    }
                }
                b'{' => {
                    self.open(true);
                    return Kind::Object;
                }
                b'[' => {
                    self.open(false);
                    return Kind::Array;
                }
                b't' | b'f' => {
                    self.skip_while(|b| b.is_ascii_alphabetic());
                    return Kind::Bool;
                }
                b'n' => {
                    self.skip_while(|b| b.is_ascii_alphabetic());
                    return Kind::Null;
                }
                b'-' | b'0'..=b'9' => {
                    self.skip_while(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E'));
                    // Integers beyond i64 degrade to floats.
                    let fits = core::str::from_utf8(&self.bytes[start..self.pos])
                        .ok()
                        .and_then(|token| token.parse::<i64>().ok())
                        .is_some();
                    return if fits { Kind::Integer } else { Kind::Float };
                }
                _ => return Kind::Invalid,
            }
        }
        Kind::End
    }

    fn open(&mut self, object: bool) {
        if self.depth < u64::BITS {
            let bit = 1u64 << self.depth;
            if object {
                self.objects |= bit;
            } else {
                self.objects &= !bit;
            }
        }
        self.depth += 1;
        self.expect_key = object;
    }

    fn in_object(&self) -> bool {
        match self.depth.checked_sub(1) {
            Some(top) if top < u64::BITS => self.objects & (1u64 << top) != 0,
            _ => false,
        }
    }

    fn skip_string(&mut self) {
        while let Some(&byte) = self.bytes.get(self.pos) {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b'"' => return,
                _ => {}
            }
        }
    }

    fn skip_while(&mut self, accept: impl Fn(u8) -> bool) {
        while self.bytes.get(self.pos).is_some_and(|&b| accept(b)) {
            self.pos += 1;
        }
    }
}
