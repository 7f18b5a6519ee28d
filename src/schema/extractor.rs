//! Schema extraction from record declarations

use super::types::{FieldDescriptor, Record, Schema};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::{debug, warn};

/// Tag value that excludes a field
const SKIP_TAG: &str = "-";

/// Directive prefix carrying the format hint
const FORMAT_DIRECTIVE: &str = "format=";

type SchemaCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static SCHEMAS: LazyLock<SchemaCache> = LazyLock::new(|| RwLock::new(HashMap::new()));

// ============================================================================
// Tag Parsing
// ============================================================================

/// Column name and format hint parsed from a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTag {
    pub name: String,
    pub format: Option<String>,
}

/// Parse a field tag.
///
/// Returns `None` for the skip tag `-`. An empty name falls back to the
/// field identifier; the last `format=` directive wins.
pub fn parse_tag(ident: &str, tag: Option<&str>) -> Option<FieldTag> {
    let tag = tag.unwrap_or_default();
    if tag == SKIP_TAG {
        return None;
    }

    let mut parts = tag.split(',');
    let name = parts.next().map(str::trim).unwrap_or_default();
    let name = if name.is_empty() { ident } else { name };

    let mut format = None;
    for directive in parts.map(str::trim) {
        if let Some(layout) = directive.strip_prefix(FORMAT_DIRECTIVE) {
            format = Some(layout).filter(|layout| !layout.is_empty());
        } else if !directive.is_empty() {
            warn!(field = ident, directive, "ignoring unknown tag directive");
        }
    }

    Some(FieldTag {
        name: name.to_string(),
        format: format.map(str::to_string),
    })
}

// ============================================================================
// Extraction
// ============================================================================

fn extract<R: Record>() -> Schema<R> {
    let fields: Vec<_> = R::raw_fields()
        .into_iter()
        .enumerate()
        .filter(|(_, raw)| raw.exported)
        .filter_map(|(index, raw)| {
            let tag = parse_tag(raw.ident, raw.tag)?;
            Some(Arc::new(FieldDescriptor {
                index,
                name: tag.name,
                format: tag.format,
                shape: raw.shape,
                get: raw.get,
                get_mut: raw.get_mut,
            }))
        })
        .collect();

    let schema = Schema {
        type_name: type_name::<R>(),
        fields,
    };
    debug!(
        record = schema.type_name,
        columns = ?schema.header(),
        "extracted schema"
    );
    schema
}

/// Schema of `R`, extracted on first use and shared afterwards
pub fn schema_for<R: Record>() -> Arc<Schema<R>> {
    let key = TypeId::of::<R>();
    let cached = SCHEMAS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(schema) = cached.and_then(typed::<R>) {
        return schema;
    }

    let built: Arc<dyn Any + Send + Sync> = Arc::new(extract::<R>());
    // first insert wins so every caller shares one schema
    let stored = SCHEMAS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(built)
        .clone();
    typed::<R>(stored).unwrap_or_else(|| Arc::new(extract::<R>()))
}

fn typed<R: Record>(entry: Arc<dyn Any + Send + Sync>) -> Option<Arc<Schema<R>>> {
    entry.downcast::<Schema<R>>().ok()
}
