//! Decoder error type

/// Reasons an inbound payload could not be decoded.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// Nothing but whitespace before the terminator.
    Empty,
    /// The payload is not UTF-8.
    InvalidUtf8,
    /// The payload is not well-formed JSON.
    Malformed,
    /// The payload is valid JSON but its root is not an object.
    NotAnObject,
    /// Non-whitespace content follows the root object.
    TrailingCharacters,
    /// Objects or arrays are nested deeper than the decoder allows.
    TooDeep,
    /// The decoded tree does not fit into the decoder's buffers.
    CapacityExceeded,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Empty => defmt::write!(f, "Empty"),
            Error::InvalidUtf8 => defmt::write!(f, "InvalidUtf8"),
            Error::Malformed => defmt::write!(f, "Malformed"),
            Error::NotAnObject => defmt::write!(f, "NotAnObject"),
            Error::TrailingCharacters => defmt::write!(f, "TrailingCharacters"),
            Error::TooDeep => defmt::write!(f, "TooDeep"),
            Error::CapacityExceeded => defmt::write!(f, "CapacityExceeded"),
        }
    }
}
