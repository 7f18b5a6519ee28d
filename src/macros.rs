//! Record declaration macro

/// Declare a struct whose fields map to CSV columns.
///
/// The tag follows the field type after `=>`:
///
/// ```rust
/// use chrono::{DateTime, Utc};
///
/// csvtag::csv_record! {
///     #[derive(Debug, Default)]
///     pub struct Order {
///         pub id: u64 => "id",
///         pub placed: DateTime<Utc> => "placed,format=%Y-%m-%d",
///         pub note: Option<String>,
///         pub internal: String => "-",
///         secret: String,
///     }
/// }
///
/// let schema = csvtag::schema_for::<Order>();
/// assert_eq!(schema.header(), vec!["id", "placed", "note"]);
/// ```
///
/// Only `pub` fields are mapped. The struct must implement [`Default`],
/// which is used to allocate fresh records while decoding.
#[macro_export]
macro_rules! csv_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn raw_fields() -> ::std::vec::Vec<$crate::RawField<Self>> {
                ::std::vec![
                    $(
                        $crate::RawField {
                            ident: ::std::stringify!($field),
                            tag: $crate::__csv_tag!($($tag)?),
                            exported: !::std::stringify!($fvis).is_empty(),
                            shape: <$ty as $crate::FieldType>::shape(),
                            get: {
                                fn get(record: &$name) -> &dyn ::std::any::Any {
                                    &record.$field
                                }
                                get
                            },
                            get_mut: {
                                fn get_mut(record: &mut $name) -> &mut dyn ::std::any::Any {
                                    &mut record.$field
                                }
                                get_mut
                            },
                        },
                    )*
                ]
            }
        }

        impl $crate::RecordSlot for $name {
            type Record = Self;

            fn vacant() -> Self {
                <Self as ::std::default::Default>::default()
            }

            fn resolve(&self) -> ::std::option::Option<&Self> {
                ::std::option::Option::Some(self)
            }

            fn materialize(&mut self) -> $crate::Result<&mut Self> {
                ::std::result::Result::Ok(self)
            }
        }

        impl $crate::DecodeTarget for $name {
            type Slot = Self;

            fn decode_from<Rd: ::std::io::Read>(
                &mut self,
                decoder: &mut $crate::Decoder<Rd>,
            ) -> $crate::Result<()> {
                decoder.read_record(self).map(|_| ())
            }
        }

        impl $crate::EncodeSource for $name {
            type Slot = Self;

            fn encode_into<W: ::std::io::Write>(
                &self,
                encoder: &mut $crate::Encoder<W>,
            ) -> $crate::Result<()> {
                encoder.write_row(self)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __csv_tag {
    () => {
        ::std::option::Option::None
    };
    ($tag:literal) => {
        ::std::option::Option::Some($tag)
    };
}
