//! Runtime type descriptors
//!
//! A [`Shape`] is what the registry sees of a field type: its identity, one
//! variant of the closed [`Kind`] table, and the custom [`Hooks`] it opted
//! into. Typed access goes through plain function pointers monomorphized at
//! the declaration site, so a shape is `Copy` and free to share.

use crate::error::{BoxError, ConvertError};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::{self, Write as _};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// Capabilities
// ============================================================================

/// Custom decoding from the raw column bytes
pub trait UnmarshalCsv {
    fn unmarshal_csv(&mut self, data: &[u8]) -> Result<(), BoxError>;
}

/// Custom encoding into the raw column bytes
pub trait MarshalCsv {
    fn marshal_csv(&self) -> Result<Vec<u8>, BoxError>;
}

/// Type-erased decode hook
pub type DecodeHook = fn(&mut dyn Any, &str) -> Result<(), ConvertError>;

/// Type-erased encode hook
pub type EncodeHook = fn(&dyn Any) -> Result<String, ConvertError>;

/// Custom capabilities a field type opted into
#[derive(Clone, Copy, Default)]
pub struct Hooks {
    /// [`UnmarshalCsv`]
    pub decode_bytes: Option<DecodeHook>,
    /// [`FromStr`]
    pub decode_text: Option<DecodeHook>,
    /// [`MarshalCsv`]
    pub encode_bytes: Option<EncodeHook>,
    /// [`fmt::Display`], or the canonical form of a time value
    pub encode_text: Option<EncodeHook>,
}

// ============================================================================
// Kind Table
// ============================================================================

/// Load/store of a primitive through its widest representation
pub struct Access<V> {
    pub load: fn(&dyn Any) -> Result<V, ConvertError>,
    pub store: fn(&mut dyn Any, V) -> Result<(), ConvertError>,
}

impl<V> Clone for Access<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Access<V> {}

/// Nullable or boxed indirection to a pointee
#[derive(Clone, Copy)]
pub struct PointerAccess {
    pub pointee: fn() -> Shape,
    /// `None` when the pointer is unset
    pub deref: fn(&dyn Any) -> Result<Option<&dyn Any>, ConvertError>,
    /// Allocate the pointee if unset and return it
    pub materialize: fn(&mut dyn Any) -> Result<&mut dyn Any, ConvertError>,
}

/// Layout-driven parsing and formatting of a date/time value
#[derive(Clone, Copy)]
pub struct TimeAccess {
    pub parse: fn(&mut dyn Any, &str, Option<&str>) -> Result<(), ConvertError>,
    pub format: fn(&dyn Any, &str) -> Result<String, ConvertError>,
}

/// Closed set of field kinds the registry dispatches on
#[derive(Clone, Copy)]
pub enum Kind {
    Bool(Access<bool>),
    Int(Access<i64>),
    Uint(Access<u64>),
    Float { access: Access<f64>, bits: u32 },
    Text(Access<String>),
    Pointer(PointerAccess),
    Time(TimeAccess),
    /// No built-in conversion; only hooks apply
    Opaque,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Bool(_) => "bool",
            Kind::Int(_) => "int",
            Kind::Uint(_) => "uint",
            Kind::Float { .. } => "float",
            Kind::Text(_) => "text",
            Kind::Pointer(_) => "pointer",
            Kind::Time(_) => "time",
            Kind::Opaque => "opaque",
        }
    }
}

// ============================================================================
// Shape
// ============================================================================

/// Runtime descriptor of one field type
#[derive(Clone, Copy)]
pub struct Shape {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub kind: Kind,
    pub hooks: Hooks,
}

impl Shape {
    /// Shape of `T` with the given kind and no hooks
    pub fn of<T: Any>(kind: Kind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            kind,
            hooks: Hooks::default(),
        }
    }

    /// Start describing a type with no built-in conversion.
    ///
    /// Without any hook the type is unsupported at runtime.
    pub fn opaque<T: Any>() -> ShapeBuilder<T> {
        ShapeBuilder {
            shape: Self::of::<T>(Kind::Opaque),
            _type: PhantomData,
        }
    }

    /// Shape of a date/time value.
    ///
    /// Encoding without a format hint falls back to [`TimeValue::canonical`].
    pub fn time<T: TimeValue>() -> Self {
        let mut shape = Self::of::<T>(Kind::Time(TimeAccess {
            parse: parse_time::<T>,
            format: format_time::<T>,
        }));
        shape.hooks.encode_text = Some(canonical_time::<T>);
        shape
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, Kind::Text(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, Kind::Pointer(_))
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind.name())
            .field("decode_bytes", &self.hooks.decode_bytes.is_some())
            .field("decode_text", &self.hooks.decode_text.is_some())
            .field("encode_bytes", &self.hooks.encode_bytes.is_some())
            .field("encode_text", &self.hooks.encode_text.is_some())
            .finish()
    }
}

/// Builder attaching capability hooks to an opaque shape.
///
/// To use the type behind `Option<T>`, it must also implement [`Default`]:
/// decoding a value into an unset option starts from `T::default()`.
pub struct ShapeBuilder<T> {
    shape: Shape,
    _type: PhantomData<fn() -> T>,
}

impl<T: Any> ShapeBuilder<T> {
    /// Decode through [`UnmarshalCsv`]
    #[must_use]
    pub fn decode_csv(mut self) -> Self
    where
        T: UnmarshalCsv,
    {
        self.shape.hooks.decode_bytes = Some(unmarshal_hook::<T>);
        self
    }

    /// Encode through [`MarshalCsv`]
    #[must_use]
    pub fn encode_csv(mut self) -> Self
    where
        T: MarshalCsv,
    {
        self.shape.hooks.encode_bytes = Some(marshal_hook::<T>);
        self
    }

    /// Decode through [`FromStr`]
    #[must_use]
    pub fn decode_text(mut self) -> Self
    where
        T: FromStr,
        T::Err: Into<BoxError>,
    {
        self.shape.hooks.decode_text = Some(from_str_hook::<T>);
        self
    }

    /// Encode through [`fmt::Display`]
    #[must_use]
    pub fn encode_text(mut self) -> Self
    where
        T: fmt::Display,
    {
        self.shape.hooks.encode_text = Some(display_hook::<T>);
        self
    }

    pub fn build(self) -> Shape {
        self.shape
    }
}

impl<T> From<ShapeBuilder<T>> for Shape {
    fn from(builder: ShapeBuilder<T>) -> Self {
        builder.shape
    }
}

// ============================================================================
// FieldType
// ============================================================================

/// A type usable as a record field.
///
/// `Option<T>` is a field type only when `T: Default`, since a decoded value
/// is written into a freshly defaulted `T`. `Box<T>` and `Arc<T>` carry no
/// such bound.
pub trait FieldType: Any {
    fn shape() -> Shape;
}

pub(crate) fn downcast_ref<T: Any>(value: &dyn Any) -> Result<&T, ConvertError> {
    value.downcast_ref::<T>().ok_or(ConvertError::Unsupported {
        type_name: type_name::<T>(),
    })
}

pub(crate) fn downcast_mut<T: Any>(value: &mut dyn Any) -> Result<&mut T, ConvertError> {
    value.downcast_mut::<T>().ok_or(ConvertError::Unsupported {
        type_name: type_name::<T>(),
    })
}

fn load_copy<T: Any + Copy>(value: &dyn Any) -> Result<T, ConvertError> {
    downcast_ref::<T>(value).copied()
}

fn store_value<T: Any>(value: &mut dyn Any, new: T) -> Result<(), ConvertError> {
    *downcast_mut::<T>(value)? = new;
    Ok(())
}

fn load_string(value: &dyn Any) -> Result<String, ConvertError> {
    downcast_ref::<String>(value).cloned()
}

fn out_of_range<T>(value: impl fmt::Display) -> ConvertError {
    ConvertError::OutOfRange {
        value: value.to_string(),
        type_name: type_name::<T>(),
    }
}

fn load_signed<T>(value: &dyn Any) -> Result<i64, ConvertError>
where
    T: Any + Copy + TryInto<i64> + fmt::Display,
{
    let v = *downcast_ref::<T>(value)?;
    v.try_into().map_err(|_| out_of_range::<i64>(v))
}

fn store_signed<T: Any + TryFrom<i64>>(value: &mut dyn Any, new: i64) -> Result<(), ConvertError> {
    let narrowed = T::try_from(new).map_err(|_| out_of_range::<T>(new))?;
    store_value(value, narrowed)
}

fn load_unsigned<T>(value: &dyn Any) -> Result<u64, ConvertError>
where
    T: Any + Copy + TryInto<u64> + fmt::Display,
{
    let v = *downcast_ref::<T>(value)?;
    v.try_into().map_err(|_| out_of_range::<u64>(v))
}

fn store_unsigned<T: Any + TryFrom<u64>>(
    value: &mut dyn Any,
    new: u64,
) -> Result<(), ConvertError> {
    let narrowed = T::try_from(new).map_err(|_| out_of_range::<T>(new))?;
    store_value(value, narrowed)
}

macro_rules! signed_fields {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            fn shape() -> Shape {
                Shape::of::<$ty>(Kind::Int(Access {
                    load: load_signed::<$ty>,
                    store: store_signed::<$ty>,
                }))
            }
        }
    )*};
}

macro_rules! unsigned_fields {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            fn shape() -> Shape {
                Shape::of::<$ty>(Kind::Uint(Access {
                    load: load_unsigned::<$ty>,
                    store: store_unsigned::<$ty>,
                }))
            }
        }
    )*};
}

signed_fields!(i8, i16, i32, i64, isize);
unsigned_fields!(u8, u16, u32, u64, usize);

impl FieldType for bool {
    fn shape() -> Shape {
        Shape::of::<bool>(Kind::Bool(Access {
            load: load_copy::<bool>,
            store: store_value::<bool>,
        }))
    }
}

impl FieldType for f64 {
    fn shape() -> Shape {
        Shape::of::<f64>(Kind::Float {
            access: Access {
                load: load_copy::<f64>,
                store: store_value::<f64>,
            },
            bits: 64,
        })
    }
}

fn load_f32(value: &dyn Any) -> Result<f64, ConvertError> {
    Ok(f64::from(*downcast_ref::<f32>(value)?))
}

fn store_f32(value: &mut dyn Any, new: f64) -> Result<(), ConvertError> {
    store_value(value, new as f32)
}

impl FieldType for f32 {
    fn shape() -> Shape {
        Shape::of::<f32>(Kind::Float {
            access: Access {
                load: load_f32,
                store: store_f32,
            },
            bits: 32,
        })
    }
}

impl FieldType for String {
    fn shape() -> Shape {
        Shape::of::<String>(Kind::Text(Access {
            load: load_string,
            store: store_value::<String>,
        }))
    }
}

// ============================================================================
// Pointers
// ============================================================================

fn deref_option<T: Any>(value: &dyn Any) -> Result<Option<&dyn Any>, ConvertError> {
    let slot = downcast_ref::<Option<T>>(value)?;
    Ok(slot.as_ref().map(|inner| inner as &dyn Any))
}

fn materialize_option<T: Any + Default>(value: &mut dyn Any) -> Result<&mut dyn Any, ConvertError> {
    let slot = downcast_mut::<Option<T>>(value)?;
    let inner: &mut dyn Any = slot.get_or_insert_with(T::default);
    Ok(inner)
}

fn deref_box<T: Any>(value: &dyn Any) -> Result<Option<&dyn Any>, ConvertError> {
    let inner: &dyn Any = &**downcast_ref::<Box<T>>(value)?;
    Ok(Some(inner))
}

fn materialize_box<T: Any>(value: &mut dyn Any) -> Result<&mut dyn Any, ConvertError> {
    let inner: &mut dyn Any = &mut **downcast_mut::<Box<T>>(value)?;
    Ok(inner)
}

fn deref_arc<T: Any>(value: &dyn Any) -> Result<Option<&dyn Any>, ConvertError> {
    let inner: &dyn Any = &**downcast_ref::<Arc<T>>(value)?;
    Ok(Some(inner))
}

fn materialize_arc<T: Any>(value: &mut dyn Any) -> Result<&mut dyn Any, ConvertError> {
    let shared = downcast_mut::<Arc<T>>(value)?;
    let inner: &mut dyn Any =
        Arc::get_mut(shared).ok_or(ConvertError::CannotMaterialize {
            type_name: type_name::<Arc<T>>(),
        })?;
    Ok(inner)
}

/// Empty input leaves the option unset, except for text pointees
impl<T: FieldType + Default> FieldType for Option<T> {
    fn shape() -> Shape {
        Shape::of::<Self>(Kind::Pointer(PointerAccess {
            pointee: T::shape,
            deref: deref_option::<T>,
            materialize: materialize_option::<T>,
        }))
    }
}

impl<T: FieldType> FieldType for Box<T> {
    fn shape() -> Shape {
        Shape::of::<Self>(Kind::Pointer(PointerAccess {
            pointee: T::shape,
            deref: deref_box::<T>,
            materialize: materialize_box::<T>,
        }))
    }
}

impl<T: FieldType> FieldType for Arc<T> {
    fn shape() -> Shape {
        Shape::of::<Self>(Kind::Pointer(PointerAccess {
            pointee: T::shape,
            deref: deref_arc::<T>,
            materialize: materialize_arc::<T>,
        }))
    }
}

// ============================================================================
// Date/Time
// ============================================================================

/// Layout used for naive date-times without a format hint
const NAIVE_DATETIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Layout used for dates without a format hint
const NAIVE_DATE_LAYOUT: &str = "%Y-%m-%d";

/// A date/time value the time converter can drive
pub trait TimeValue: Any + Sized {
    /// Parse without a format hint
    fn parse_default(text: &str) -> Result<Self, chrono::ParseError>;

    /// Parse with a `strftime` layout
    fn parse_layout(text: &str, layout: &str) -> Result<Self, chrono::ParseError>;

    /// Format with a `strftime` layout
    fn write_layout(&self, layout: &str, out: &mut String) -> fmt::Result;

    /// Canonical text form used when no layout is given
    fn canonical(&self) -> String;
}

/// Parse a layout that may omit the time of day
fn parse_naive(text: &str, layout: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, layout).or_else(|err| {
        NaiveDate::parse_from_str(text, layout)
            .map(|date| date.and_time(NaiveTime::default()))
            .map_err(|_| err)
    })
}

impl TimeValue for DateTime<Utc> {
    fn parse_default(text: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&Utc))
    }

    fn parse_layout(text: &str, layout: &str) -> Result<Self, chrono::ParseError> {
        match DateTime::parse_from_str(text, layout) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            // layouts without an offset are read as UTC
            Err(_) => parse_naive(text, layout).map(|naive| naive.and_utc()),
        }
    }

    fn write_layout(&self, layout: &str, out: &mut String) -> fmt::Result {
        write!(out, "{}", self.format(layout))
    }

    fn canonical(&self) -> String {
        self.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl TimeValue for DateTime<FixedOffset> {
    fn parse_default(text: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(text)
    }

    fn parse_layout(text: &str, layout: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_str(text, layout)
            .or_else(|_| parse_naive(text, layout).map(|naive| naive.and_utc().fixed_offset()))
    }

    fn write_layout(&self, layout: &str, out: &mut String) -> fmt::Result {
        write!(out, "{}", self.format(layout))
    }

    fn canonical(&self) -> String {
        self.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl TimeValue for NaiveDateTime {
    fn parse_default(text: &str) -> Result<Self, chrono::ParseError> {
        NaiveDateTime::parse_from_str(text, NAIVE_DATETIME_LAYOUT)
    }

    fn parse_layout(text: &str, layout: &str) -> Result<Self, chrono::ParseError> {
        parse_naive(text, layout)
    }

    fn write_layout(&self, layout: &str, out: &mut String) -> fmt::Result {
        write!(out, "{}", self.format(layout))
    }

    fn canonical(&self) -> String {
        self.format(NAIVE_DATETIME_LAYOUT).to_string()
    }
}

impl TimeValue for NaiveDate {
    fn parse_default(text: &str) -> Result<Self, chrono::ParseError> {
        NaiveDate::parse_from_str(text, NAIVE_DATE_LAYOUT)
    }

    fn parse_layout(text: &str, layout: &str) -> Result<Self, chrono::ParseError> {
        NaiveDate::parse_from_str(text, layout)
    }

    fn write_layout(&self, layout: &str, out: &mut String) -> fmt::Result {
        write!(out, "{}", self.format(layout))
    }

    fn canonical(&self) -> String {
        self.format(NAIVE_DATE_LAYOUT).to_string()
    }
}

fn parse_time<T: TimeValue>(
    value: &mut dyn Any,
    text: &str,
    layout: Option<&str>,
) -> Result<(), ConvertError> {
    let parsed = match layout {
        Some(layout) => T::parse_layout(text, layout),
        None => T::parse_default(text),
    }
    .map_err(ConvertError::parse)?;
    store_value(value, parsed)
}

fn format_time<T: TimeValue>(value: &dyn Any, layout: &str) -> Result<String, ConvertError> {
    let mut out = String::new();
    downcast_ref::<T>(value)?
        .write_layout(layout, &mut out)
        .map_err(|_| ConvertError::Format {
            layout: layout.to_string(),
        })?;
    Ok(out)
}

fn canonical_time<T: TimeValue>(value: &dyn Any) -> Result<String, ConvertError> {
    Ok(downcast_ref::<T>(value)?.canonical())
}

impl FieldType for DateTime<Utc> {
    fn shape() -> Shape {
        Shape::time::<Self>()
    }
}

impl FieldType for DateTime<FixedOffset> {
    fn shape() -> Shape {
        Shape::time::<Self>()
    }
}

impl FieldType for NaiveDateTime {
    fn shape() -> Shape {
        Shape::time::<Self>()
    }
}

impl FieldType for NaiveDate {
    fn shape() -> Shape {
        Shape::time::<Self>()
    }
}

// ============================================================================
// Hooks
// ============================================================================

fn unmarshal_hook<T: UnmarshalCsv + Any>(value: &mut dyn Any, text: &str) -> Result<(), ConvertError> {
    downcast_mut::<T>(value)?
        .unmarshal_csv(text.as_bytes())
        .map_err(ConvertError::Custom)
}

fn marshal_hook<T: MarshalCsv + Any>(value: &dyn Any) -> Result<String, ConvertError> {
    let bytes = downcast_ref::<T>(value)?
        .marshal_csv()
        .map_err(ConvertError::Custom)?;
    String::from_utf8(bytes).map_err(ConvertError::custom)
}

fn from_str_hook<T>(value: &mut dyn Any, text: &str) -> Result<(), ConvertError>
where
    T: FromStr + Any,
    T::Err: Into<BoxError>,
{
    let parsed = text.parse::<T>().map_err(ConvertError::custom)?;
    store_value(value, parsed)
}

fn display_hook<T: fmt::Display + Any>(value: &dyn Any) -> Result<String, ConvertError> {
    Ok(downcast_ref::<T>(value)?.to_string())
}

// ============================================================================
// Collections
// ============================================================================

// Collections have no single-column form. They are describable so that a
// record holding one still compiles, and fail when converted.

impl<T: 'static> FieldType for Vec<T> {
    fn shape() -> Shape {
        Shape::opaque::<Self>().build()
    }
}

impl<T: 'static> FieldType for VecDeque<T> {
    fn shape() -> Shape {
        Shape::opaque::<Self>().build()
    }
}

impl<K: 'static, V: 'static, S: 'static> FieldType for HashMap<K, V, S> {
    fn shape() -> Shape {
        Shape::opaque::<Self>().build()
    }
}

impl<K: 'static, V: 'static> FieldType for BTreeMap<K, V> {
    fn shape() -> Shape {
        Shape::opaque::<Self>().build()
    }
}

impl<T: 'static, S: 'static> FieldType for HashSet<T, S> {
    fn shape() -> Shape {
        Shape::opaque::<Self>().build()
    }
}

impl<T: 'static> FieldType for BTreeSet<T> {
    fn shape() -> Shape {
        Shape::opaque::<Self>().build()
    }
}
