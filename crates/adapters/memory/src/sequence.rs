//! Identifier generation for newly persisted entities.

/// Identifier type that can be derived from a monotonic sequence number.
pub trait SequenceId: Sized {
    /// Build the identifier for the `value`-th persisted entity (starting at 1).
    fn from_sequence(value: u64) -> Self;
}

impl SequenceId for u64 {
    fn from_sequence(value: u64) -> Self {
        value
    }
}

impl SequenceId for i64 {
    fn from_sequence(value: u64) -> Self {
        value.cast_signed()
    }
}

/// Random identifiers; the sequence number is ignored.
impl SequenceId for uuid::Uuid {
    fn from_sequence(_value: u64) -> Self {
        uuid::Uuid::new_v4()
    }
}
