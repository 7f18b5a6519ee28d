//! Converter registry
//!
//! Selects and memoizes one converter per (direction, field type).
//! Construction is pure, so a lookup race at worst builds the same converter
//! twice and the last insert wins.

use super::shape::{Kind, PointerAccess, Shape};
use crate::error::ConvertError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::trace;

/// Text to typed value; the last argument is the field's format hint
pub type DecodeFn =
    Arc<dyn Fn(&mut dyn Any, &str, Option<&str>) -> Result<(), ConvertError> + Send + Sync>;

/// Typed value to text; the last argument is the field's format hint
pub type EncodeFn = Arc<dyn Fn(&dyn Any, Option<&str>) -> Result<String, ConvertError> + Send + Sync>;

// ============================================================================
// Memo Tables
// ============================================================================

struct Memo<F> {
    table: RwLock<HashMap<TypeId, F>>,
}

impl<F: Clone> Memo<F> {
    fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, key: TypeId) -> Option<F> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn store(&self, key: TypeId, converter: F) -> F {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, converter.clone());
        converter
    }
}

static DECODERS: LazyLock<Memo<DecodeFn>> = LazyLock::new(Memo::new);
static ENCODERS: LazyLock<Memo<EncodeFn>> = LazyLock::new(Memo::new);

/// Decoder for a field type, built on first request
pub fn decoder_for(shape: &Shape) -> DecodeFn {
    if let Some(converter) = DECODERS.get(shape.type_id) {
        return converter;
    }
    // built outside the lock: pointer converters recurse into the registry
    let converter = new_decoder(shape);
    trace!(type_name = shape.type_name, kind = shape.kind.name(), "built decoder");
    DECODERS.store(shape.type_id, converter)
}

/// Encoder for a field type, built on first request
pub fn encoder_for(shape: &Shape) -> EncodeFn {
    if let Some(converter) = ENCODERS.get(shape.type_id) {
        return converter;
    }
    let converter = new_encoder(shape);
    trace!(type_name = shape.type_name, kind = shape.kind.name(), "built encoder");
    ENCODERS.store(shape.type_id, converter)
}

fn decoder(
    f: impl Fn(&mut dyn Any, &str, Option<&str>) -> Result<(), ConvertError> + Send + Sync + 'static,
) -> DecodeFn {
    Arc::new(f)
}

fn encoder(
    f: impl Fn(&dyn Any, Option<&str>) -> Result<String, ConvertError> + Send + Sync + 'static,
) -> EncodeFn {
    Arc::new(f)
}

// ============================================================================
// Decode
// ============================================================================

fn new_decoder(shape: &Shape) -> DecodeFn {
    if let Some(hook) = shape.hooks.decode_bytes {
        return decoder(move |value, text, _| hook(value, text));
    }

    match shape.kind {
        Kind::Bool(access) => {
            return decoder(move |value, text, _| (access.store)(value, parse_bool(text)));
        }
        Kind::Int(access) => {
            return decoder(move |value, text, _| {
                let parsed = text.parse::<i64>().map_err(ConvertError::parse)?;
                (access.store)(value, parsed)
            });
        }
        Kind::Uint(access) => {
            return decoder(move |value, text, _| {
                let parsed = text.parse::<u64>().map_err(ConvertError::parse)?;
                (access.store)(value, parsed)
            });
        }
        Kind::Float { access, .. } => {
            return decoder(move |value, text, _| {
                let parsed = text.parse::<f64>().map_err(ConvertError::parse)?;
                (access.store)(value, parsed)
            });
        }
        Kind::Text(access) => {
            return decoder(move |value, text, _| (access.store)(value, text.to_owned()));
        }
        Kind::Pointer(pointer) => return pointer_decoder(pointer),
        Kind::Time(time) => {
            return decoder(move |value, text, layout| {
                // empty keeps the zero value
                if text.is_empty() {
                    return Ok(());
                }
                (time.parse)(value, text, layout)
            });
        }
        Kind::Opaque => {}
    }

    if let Some(hook) = shape.hooks.decode_text {
        return decoder(move |value, text, _| hook(value, text));
    }

    let type_name = shape.type_name;
    decoder(move |_, _, _| Err(ConvertError::Unsupported { type_name }))
}

/// Lenient: anything but "true" or "1" is false, and never an error.
fn parse_bool(text: &str) -> bool {
    matches!(text, "true" | "1")
}

fn pointer_decoder(pointer: PointerAccess) -> DecodeFn {
    let pointee = (pointer.pointee)();
    let inner = decoder_for(&pointee);
    let accepts_empty = pointee.is_text();

    decoder(move |value, text, layout| {
        if text.is_empty() && !accepts_empty {
            return Ok(());
        }
        let target = (pointer.materialize)(value)?;
        inner(target, text, layout)
    })
}

// ============================================================================
// Encode
// ============================================================================

fn new_encoder(shape: &Shape) -> EncodeFn {
    if let Some(hook) = shape.hooks.encode_bytes {
        return encoder(move |value, _| hook(value));
    }

    match shape.kind {
        Kind::Bool(access) => {
            return encoder(move |value, _| Ok((access.load)(value)?.to_string()));
        }
        Kind::Int(access) => {
            return encoder(move |value, _| Ok((access.load)(value)?.to_string()));
        }
        Kind::Uint(access) => {
            return encoder(move |value, _| Ok((access.load)(value)?.to_string()));
        }
        Kind::Float { access, bits } => {
            return encoder(move |value, _| {
                let v = (access.load)(value)?;
                // Display is the shortest exact form, never exponent notation
                if bits == 32 {
                    Ok((v as f32).to_string())
                } else {
                    Ok(v.to_string())
                }
            });
        }
        Kind::Text(access) => return encoder(move |value, _| (access.load)(value)),
        Kind::Pointer(pointer) => return pointer_encoder(pointer),
        Kind::Time(time) => {
            let fallback = shape.hooks.encode_text;
            let type_name = shape.type_name;
            return encoder(move |value, layout| match (layout, fallback) {
                (Some(layout), _) => (time.format)(value, layout),
                (None, Some(hook)) => hook(value),
                (None, None) => Err(ConvertError::Unsupported { type_name }),
            });
        }
        Kind::Opaque => {}
    }

    if let Some(hook) = shape.hooks.encode_text {
        return encoder(move |value, _| hook(value));
    }

    let type_name = shape.type_name;
    encoder(move |_, _| Err(ConvertError::Unsupported { type_name }))
}

fn pointer_encoder(pointer: PointerAccess) -> EncodeFn {
    let inner = encoder_for(&(pointer.pointee)());

    encoder(move |value, layout| match (pointer.deref)(value)? {
        Some(target) => inner(target, layout),
        None => Ok(String::new()),
    })
}
