//! Typed status frames.
//!
//! A [`StatusFrame`] is the unit handed to consumers that must not care
//! whether the values came from emulation or real hardware. Its shape is
//! described by a [`Schema`]; values come from the closed [`HalValue`] set.

pub mod frame;
pub mod schema;
pub mod value;

pub use frame::{SnapshotCell, StatusFrame, StatusFrameBuilder};
pub use schema::Schema;
pub use value::{
    AllianceStationId, EncoderEncodingType, FromHalValue, HalValue, HandleEnum, HandleRef,
    RuntimeType, ValueKind,
};
