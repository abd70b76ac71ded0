//! Per-encode/decode configuration for ambiguous representations.

use crate::binary::UuidRepresentation;
use crate::spec::ElementType;

/// Options describing how ambiguous in-memory types map onto wire types.
///
/// A value encoded with a given option set decodes back exactly under the same
/// option set. Options are plain values passed explicitly wherever they apply;
/// there is no process-wide default registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct RepresentationOptions {
    /// The wire type used for [`Decimal128`](crate::Decimal128) values. Valid
    /// choices are [`ElementType::Array`] (four 32-bit words),
    /// [`ElementType::Double`], [`ElementType::Int32`],
    /// [`ElementType::Int64`] and [`ElementType::String`]; encoding with any
    /// other element type fails.
    pub decimal_representation: ElementType,

    /// The byte order and subtype used for UUID values.
    pub uuid_representation: UuidRepresentation,

    /// Whether narrowing a decimal to an integer representation may drop a
    /// fractional part. Range overflow always fails regardless.
    pub allow_truncation: bool,
}

impl Default for RepresentationOptions {
    fn default() -> Self {
        RepresentationOptions {
            decimal_representation: ElementType::String,
            uuid_representation: UuidRepresentation::Standard,
            allow_truncation: false,
        }
    }
}

impl RepresentationOptions {
    pub fn decimal_representation(mut self, representation: ElementType) -> Self {
        self.decimal_representation = representation;
        self
    }

    pub fn uuid_representation(mut self, representation: UuidRepresentation) -> Self {
        self.uuid_representation = representation;
        self
    }

    pub fn allow_truncation(mut self, allow: bool) -> Self {
        self.allow_truncation = allow;
        self
    }
}
