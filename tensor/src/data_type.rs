use half::{bf16, f16};
use serde::{
    de::{Unexpected, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum DataType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    BF16,
    F32,
    F64,
}

impl DataType {
    pub const ALL: [Self; 13] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F16,
        Self::BF16,
        Self::F32,
        Self::F64,
    ];

    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 => 4,
            Self::I64 => 8,
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
            Self::F16 => 2,
            Self::BF16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// pytorch dtype string.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F16 => "float16",
            Self::BF16 => "bfloat16",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dt| dt.name() == s)
            .ok_or_else(|| format!("unknown data type \"{s}\""))
    }
}

impl Serialize for DataType {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DataType {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(DataTypeVisitor)
    }
}

struct DataTypeVisitor;

impl<'de> Visitor<'de> for DataTypeVisitor {
    type Value = DataType;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "pytorch dtype string, such as \"float32\" or \"int64\"")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

/// 可以作为张量元素的定长类型。
pub trait Element: Copy + Send + Sync + 'static {
    const DATA_TYPE: DataType;
}

macro_rules! element {
    ($($ty:ty => $dt:ident;)+) => {
        $(
            impl Element for $ty {
                const DATA_TYPE: DataType = DataType::$dt;
            }
        )+
    };
}

element! {
    bool => Bool;
    i8   => I8;
    i16  => I16;
    i32  => I32;
    i64  => I64;
    u8   => U8;
    u16  => U16;
    u32  => U32;
    u64  => U64;
    f16  => F16;
    bf16 => BF16;
    f32  => F32;
    f64  => F64;
}

#[test]
fn test_size() {
    use std::mem::size_of;
    assert_eq!(<f16 as Element>::DATA_TYPE.size(), size_of::<f16>());
    assert_eq!(<bf16 as Element>::DATA_TYPE.size(), size_of::<bf16>());
    assert_eq!(<f64 as Element>::DATA_TYPE.size(), size_of::<f64>());
    assert_eq!(<bool as Element>::DATA_TYPE.size(), size_of::<bool>());
    assert_eq!(<u64 as Element>::DATA_TYPE.size(), size_of::<u64>());
}

#[test]
fn test_serde() {
    assert_eq!(serde_json::to_string(&DataType::BF16).unwrap(), "\"bfloat16\"");
    assert_eq!(
        serde_json::from_str::<DataType>("\"int64\"").unwrap(),
        DataType::I64
    );
    assert!(serde_json::from_str::<DataType>("\"float8\"").is_err());
    assert_eq!("uint16".parse::<DataType>(), Ok(DataType::U16));
}
