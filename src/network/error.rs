//! Common error types for connectivity operations

/// A common error type for connectivity operations.
///
/// Transport implementations keep their own error types; the connectivity
/// manager and the node report failures through this enum. It is designed to
/// be simple and portable for `no_std` environments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation needed a live broker session.
    NotConnected,
    /// The broker did not accept a publish.
    PublishFailed,
    /// A bounded retry policy ran out of attempts.
    RetriesExhausted,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotConnected => defmt::write!(f, "NotConnected"),
            Error::PublishFailed => defmt::write!(f, "PublishFailed"),
            Error::RetriesExhausted => defmt::write!(f, "RetriesExhausted"),
        }
    }
}
