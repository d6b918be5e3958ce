//! Memoized schema construction keyed by record type and annotation grammar.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::record::Record;

use super::{Schema, SchemaBuilder};

type CacheKey = (TypeId, String);

/// Get-or-build store of schemas, one per record type and alias delimiter.
///
/// Inject one instance into several decoders/encoders to derive each record
/// type's schema only once. Codecs configured with different alias
/// delimiters read annotations differently and get separate entries.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: Mutex<HashMap<CacheKey, Arc<Schema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema of `T` under the default annotation grammar.
    pub fn get_or_build<T: Record + 'static>(&self) -> Result<Arc<Schema>> {
        self.get_or_build_with::<T>(&SchemaBuilder::new())
    }

    /// Schema of `T` as derived by `builder`, building and remembering it on
    /// first request.
    pub fn get_or_build_with<T: Record + 'static>(&self, builder: &SchemaBuilder) -> Result<Arc<Schema>> {
        let key = (TypeId::of::<T>(), builder.alias_delimiter().to_string());
        let mut schemas = self.schemas.lock();
        if let Some(schema) = schemas.get(&key) {
            return Ok(Arc::clone(schema));
        }
        let schema = Arc::new(builder.build_for::<T>()?);
        schemas.insert(key, Arc::clone(&schema));
        Ok(schema)
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.schemas.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.lock().is_empty()
    }
}

/// Schema of one decoder/encoder: explicit, or derived on first use and then
/// frozen.
#[derive(Debug, Default)]
pub(crate) struct SchemaSlot {
    schema: Option<Arc<Schema>>,
    cache: Option<Arc<SchemaCache>>,
}

impl SchemaSlot {
    pub(crate) fn set_schema(&mut self, schema: Arc<Schema>) {
        self.schema = Some(schema);
    }

    pub(crate) fn set_cache(&mut self, cache: Arc<SchemaCache>) {
        self.cache = Some(cache);
    }

    pub(crate) fn get(&self) -> Option<Arc<Schema>> {
        self.schema.clone()
    }

    pub(crate) fn resolve<T: Record + 'static>(&mut self, config: &CodecConfig) -> Result<Arc<Schema>> {
        if let Some(schema) = &self.schema {
            return Ok(Arc::clone(schema));
        }
        let builder = SchemaBuilder::from_config(config);
        let schema = match &self.cache {
            Some(cache) => cache.get_or_build_with::<T>(&builder)?,
            None => Arc::new(builder.build_for::<T>()?),
        };
        self.schema = Some(Arc::clone(&schema));
        Ok(schema)
    }
}
