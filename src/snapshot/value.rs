use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

/// Quadrature decoding mode of an encoder channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderEncodingType {
    K1X,
    K2X,
    K4X,
}

/// Which kind of controller the HAL believes it is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeType {
    Athena,
    Mock,
}

/// Resource class of a HAL handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleEnum {
    Undefined,
    Dio,
    Port,
    Notifier,
    Interrupt,
    AnalogOutput,
    AnalogInput,
    AnalogTrigger,
    Relay,
    Pwm,
    DigitalPwm,
    Counter,
    FpgaEncoder,
    Encoder,
    Compressor,
    Solenoid,
    AnalogGyro,
    Vendor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllianceStationId {
    Red1,
    Red2,
    Red3,
    Blue1,
    Blue2,
    Blue3,
}

/// Opaque reference to a HAL-owned resource (the emulated form of a raw
/// pointer or handle). Never dereferenced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleRef(pub u32);

/// Stable tag of each value kind. The numeric values are part of the
/// interception-layer contract and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueKind {
    Int32 = 0,
    UInt32 = 1,
    Handle = 2,
    UInt64 = 3,
    Double = 4,
    Text = 5,
    Bool = 6,
    EncoderEncoding = 7,
    Long = 8,
    Runtime = 9,
    HandleKind = 10,
    AllianceStation = 11,
}

assert_eq_size!(ValueKind, u8);

impl ValueKind {
    pub const ALL: [ValueKind; 12] = [
        ValueKind::Int32,
        ValueKind::UInt32,
        ValueKind::Handle,
        ValueKind::UInt64,
        ValueKind::Double,
        ValueKind::Text,
        ValueKind::Bool,
        ValueKind::EncoderEncoding,
        ValueKind::Long,
        ValueKind::Runtime,
        ValueKind::HandleKind,
        ValueKind::AllianceStation,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Int32 => "i32",
            ValueKind::UInt32 => "u32",
            ValueKind::Handle => "handle",
            ValueKind::UInt64 => "u64",
            ValueKind::Double => "f64",
            ValueKind::Text => "text",
            ValueKind::Bool => "bool",
            ValueKind::EncoderEncoding => "encoder_encoding",
            ValueKind::Long => "long",
            ValueKind::Runtime => "runtime",
            ValueKind::HandleKind => "handle_kind",
            ValueKind::AllianceStation => "alliance_station",
        }
    }
}

impl core::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// One hardware-visible value. The set of variants is closed: consumers
/// match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HalValue {
    Int32(i32),
    UInt32(u32),
    Handle(HandleRef),
    UInt64(u64),
    Double(f64),
    Text(String),
    Bool(bool),
    EncoderEncoding(EncoderEncodingType),
    Long(i64),
    Runtime(RuntimeType),
    HandleKind(HandleEnum),
    AllianceStation(AllianceStationId),
}

impl HalValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            HalValue::Int32(_) => ValueKind::Int32,
            HalValue::UInt32(_) => ValueKind::UInt32,
            HalValue::Handle(_) => ValueKind::Handle,
            HalValue::UInt64(_) => ValueKind::UInt64,
            HalValue::Double(_) => ValueKind::Double,
            HalValue::Text(_) => ValueKind::Text,
            HalValue::Bool(_) => ValueKind::Bool,
            HalValue::EncoderEncoding(_) => ValueKind::EncoderEncoding,
            HalValue::Long(_) => ValueKind::Long,
            HalValue::Runtime(_) => ValueKind::Runtime,
            HalValue::HandleKind(_) => ValueKind::HandleKind,
            HalValue::AllianceStation(_) => ValueKind::AllianceStation,
        }
    }
}

/// Typed extraction of a [`HalValue`] of one specific kind.
pub trait FromHalValue: Sized {
    const KIND: ValueKind;

    fn from_hal_value(value: &HalValue) -> Option<Self>;
}

macro_rules! hal_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HalValue {
                fn from(v: $ty) -> Self {
                    HalValue::$variant(v)
                }
            }

            impl FromHalValue for $ty {
                const KIND: ValueKind = ValueKind::$variant;

                fn from_hal_value(value: &HalValue) -> Option<Self> {
                    match value {
                        HalValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

hal_value_conversions! {
    i32 => Int32,
    u32 => UInt32,
    HandleRef => Handle,
    u64 => UInt64,
    f64 => Double,
    String => Text,
    bool => Bool,
    EncoderEncodingType => EncoderEncoding,
    i64 => Long,
    RuntimeType => Runtime,
    HandleEnum => HandleKind,
    AllianceStationId => AllianceStation,
}

impl From<&str> for HalValue {
    fn from(v: &str) -> Self {
        HalValue::Text(v.to_owned())
    }
}
