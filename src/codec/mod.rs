//! Structured message decoding for inbound payloads.
//!
//! Inbound payloads are JSON objects. The [`Decoder`] owns one fixed-capacity
//! buffer for decoded strings and one for tree nodes; parsing a payload
//! returns a [`DecodedMessage`] that borrows those buffers. Since parsing needs
//! `&mut Decoder`, at most one decoded message can be alive at a time and a
//! new parse invalidates the previous tree at compile time.
//!
//! Payloads are treated as NUL-terminated: anything after the first zero byte
//! is ignored.
//!
//! ```rust
//! use sensorbase::codec::{Decoder, Value};
//!
//! let mut decoder: Decoder = Decoder::new();
//! let message = decoder.parse(br#"{"debuglevel": 2, "name": "kitchen"}"#).unwrap();
//!
//! assert_eq!(message.get("debuglevel"), Some(Value::Integer(2)));
//! assert_eq!(message.get("name").and_then(|v| v.as_str()), Some("kitchen"));
//! assert!(!message.contains_key("missing"));
//! ```

#![deny(unsafe_code)]

use core::fmt;
use heapless::{String, Vec};

use crate::debug::{DebugLevel, Log};

mod error;
mod tree;


pub use error::Error;
pub use tree::MAX_DEPTH;

use tree::{Builder, Node, Span};

/// Default capacity, in bytes, of the decoded-string buffer.
pub const JSON_BUFFER_SIZE: usize = 300;

/// Default capacity of the node buffer.
///
/// Every node takes at least two bytes of payload (`0,` in an array), so a
/// payload no longer than [`JSON_BUFFER_SIZE`] always fits.
pub const MAX_NODES: usize = JSON_BUFFER_SIZE / 2 + 2;

/// A reusable, fixed-capacity JSON object decoder.
///
/// `N` bounds the total length of decoded keys and string values, `M` the
/// number of tree nodes (one per key, value and container).
pub struct Decoder<const N: usize = JSON_BUFFER_SIZE, const M: usize = MAX_NODES> {
    text: String<N>,
    nodes: Vec<Node, M>,
}

impl<const N: usize, const M: usize> Decoder<N, M> {
    /// Creates an empty decoder.
    pub const fn new() -> Self {
        Self {
            text: String::new(),
            nodes: Vec::new(),
        }
    }

    /// Parses `bytes` into a key/value tree.
    ///
    /// # Errors
    ///
    /// Any [`Error`]; the decoder stays usable.
    pub fn parse(&mut self, bytes: &[u8]) -> Result<DecodedMessage<'_>, Error> {
        let payload = until_terminator(bytes);
        core::str::from_utf8(payload).map_err(|_| Error::InvalidUtf8)?;

        if let Err(err) = Builder::new(payload, &mut self.text, &mut self.nodes).document() {
            self.text.clear();
            self.nodes.clear();
            return Err(err);
        }

        Ok(DecodedMessage {
            root: Object {
                tree: Tree {
                    text: &self.text,
                    nodes: &self.nodes,
                },
                index: 0,
            },
        })
    }

    /// Parses `bytes`, logging failures at [`DebugLevel::Information`].
    ///
    /// A payload that cannot be decoded is meant to be dropped; the log line
    /// carries the payload so the sender can see what was rejected.
    pub fn decode<L: Log + ?Sized>(
        &mut self,
        log: &mut L,
        bytes: &[u8],
    ) -> Option<DecodedMessage<'_>> {
        match self.parse(bytes) {
            Ok(message) => Some(message),
            Err(err) => {
                let payload = until_terminator(bytes);
                let text = core::str::from_utf8(payload).unwrap_or("<binary>");
                log.log_fmt(
                    DebugLevel::Information,
                    format_args!("Fail to process json ({:?}): \n {}", err, text),
                );
                None
            }
        }
    }
}

impl<const N: usize, const M: usize> Default for Decoder<N, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const M: usize> fmt::Debug for Decoder<N, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("text_capacity", &N)
            .field("node_capacity", &M)
            .finish()
    }
}

pub(crate) fn until_terminator(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

#[derive(Clone, Copy)]
struct Tree<'d> {
    text: &'d str,
    nodes: &'d [Node],
}

impl<'d> Tree<'d> {
    fn str(&self, span: Span) -> &'d str {
        self.text
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
    }

    fn value(&self, index: usize) -> Value<'d> {
        match self.nodes.get(index) {
            Some(Node::Bool(b)) => Value::Bool(*b),
            Some(Node::Integer(i)) => Value::Integer(*i),
            Some(Node::Float(f)) => Value::Float(*f),
            Some(Node::Str(span)) => Value::Str(self.str(*span)),
            Some(Node::Object { .. }) => Value::Object(Object { tree: *self, index }),
            Some(Node::Array { .. }) => Value::Array(Array { tree: *self, index }),
            Some(Node::Null) | Some(Node::Key(_)) | None => Value::Null,
        }
    }

    /// Index of the node following the subtree rooted at `index`.
    fn skip(&self, index: usize) -> usize {
        match self.nodes.get(index) {
            Some(Node::Object { end, .. }) | Some(Node::Array { end, .. }) => *end as usize,
            _ => index + 1,
        }
    }

    fn len(&self, index: usize) -> usize {
        match self.nodes.get(index) {
            Some(Node::Object { len, .. }) | Some(Node::Array { len, .. }) => *len as usize,
            _ => 0,
        }
    }
}

/// A decoded inbound message: the root object of the payload.
///
/// Borrowed from the [`Decoder`] that produced it.
#[derive(Clone, Copy, PartialEq)]
pub struct DecodedMessage<'d> {
    root: Object<'d>,
}

impl<'d> DecodedMessage<'d> {
    /// The root object.
    pub fn root(&self) -> Object<'d> {
        self.root
    }

    /// Looks up a top-level key.
    pub fn get(&self, key: &str) -> Option<Value<'d>> {
        self.root.get(key)
    }

    /// Whether a top-level key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Whether the root object is empty.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Iterates over top-level entries in payload order.
    pub fn iter(&self) -> Entries<'d> {
        self.root.iter()
    }
}

impl fmt::Debug for DecodedMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.root, f)
    }
}

/// A decoded value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'d> {
    /// JSON `null`.
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// A number without fraction or exponent that fits an `i64`.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// A string with escapes resolved.
    Str(&'d str),
    /// A nested object.
    Object(Object<'d>),
    /// An array.
    Array(Array<'d>),
}

impl<'d> Value<'d> {
    /// Integer view of the value.
    ///
    /// Floats are truncated, booleans map to 0 and 1, and strings holding a
    /// decimal integer are parsed. Anything else has no integer view.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            Value::Float(f) => Some(f as i64),
            Value::Bool(b) => Some(b as i64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floating-point view of numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Integer(i) => Some(i as f64),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    /// The string, if the value is one.
    pub fn as_str(&self) -> Option<&'d str> {
        match *self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if the value is one.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// The nested object, if the value is one.
    pub fn as_object(&self) -> Option<Object<'d>> {
        match *self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The array, if the value is one.
    pub fn as_array(&self) -> Option<Array<'d>> {
        match *self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Whether the value is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A decoded object.
#[derive(Clone, Copy)]
pub struct Object<'d> {
    tree: Tree<'d>,
    index: usize,
}

impl<'d> Object<'d> {
    /// Looks up a key. With duplicate keys the first one wins.
    pub fn get(&self, key: &str) -> Option<Value<'d>> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.iter().any(|(k, _)| k == key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.tree.len(self.index)
    }

    /// Whether the object has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over entries in payload order.
    pub fn iter(&self) -> Entries<'d> {
        Entries {
            tree: self.tree,
            next: self.index + 1,
            remaining: self.len(),
        }
    }
}

impl PartialEq for Object<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over the entries of an [`Object`].
#[derive(Clone)]
pub struct Entries<'d> {
    tree: Tree<'d>,
    next: usize,
    remaining: usize,
}

impl<'d> Iterator for Entries<'d> {
    type Item = (&'d str, Value<'d>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let key = match self.tree.nodes.get(self.next) {
            Some(Node::Key(span)) => self.tree.str(*span),
            _ => return None,
        };
        let value_index = self.next + 1;
        self.next = self.tree.skip(value_index);
        self.remaining -= 1;
        Some((key, self.tree.value(value_index)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl fmt::Debug for Entries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entries")
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// A decoded array.
#[derive(Clone, Copy)]
pub struct Array<'d> {
    tree: Tree<'d>,
    index: usize,
}

impl<'d> Array<'d> {
    /// The element at `position`.
    pub fn get(&self, position: usize) -> Option<Value<'d>> {
        self.iter().nth(position)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.tree.len(self.index)
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over elements in payload order.
    pub fn iter(&self) -> Elements<'d> {
        Elements {
            tree: self.tree,
            next: self.index + 1,
            remaining: self.len(),
        }
    }
}

impl PartialEq for Array<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for Array<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over the elements of an [`Array`].
#[derive(Clone)]
pub struct Elements<'d> {
    tree: Tree<'d>,
    next: usize,
    remaining: usize,
}

impl<'d> Iterator for Elements<'d> {
    type Item = Value<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.next;
        self.next = self.tree.skip(index);
        self.remaining -= 1;
        Some(self.tree.value(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl fmt::Debug for Elements<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Elements")
            .field("remaining", &self.remaining)
            .finish()
    }
}
