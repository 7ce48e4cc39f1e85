//! Typed codec
//!
//! Bridges a caller's declared return type and the model's free-text reply:
//!
//! ```text
//! TypeDescriptor ──describe_schema / example_for / describe_type──▶ prompt
//! model reply ─────────────decode / decode_as────────────────────▶ typed value
//! ```

pub mod decode;
pub mod describe;
pub mod descriptor;

pub use decode::{
    DecodeError, DecodeErrorKind, DecodedValue, decode, decode_as, strip_code_fences,
};
pub use describe::{MAX_DEPTH, describe_schema, describe_type, example_for};
pub use descriptor::{Described, FieldDescriptor, PrimitiveKind, RecordType, TypeDescriptor};
