//! Tool registration and lookup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::Schema;
use crate::types::{RegistryError, ToolDefinition};

use super::handler::ToolHandler;
use super::{
    calculate_crop_premium, generate_insurance_certificate, get_insurance_companies,
    recommend_insurance, ToolContext,
};

/// A registered tool: name, summary, input schema and handler.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    summary: String,
    schema: Schema,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        summary: impl Into<String>,
        schema: Schema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            schema,
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            summary: self.summary.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Catalog of tools, built once at startup and read-only afterwards.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the four insurance tools.
    pub fn with_builtin_tools(ctx: &ToolContext) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(calculate_crop_premium::descriptor(ctx))?;
        registry.register(get_insurance_companies::descriptor(ctx))?;
        registry.register(generate_insurance_certificate::descriptor(ctx))?;
        registry.register(recommend_insurance::descriptor(ctx))?;
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateTool(descriptor.name().to_string()));
        }
        self.index
            .insert(descriptor.name().to_string(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Case-sensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&idx| &self.descriptors[idx])
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.descriptors.iter().map(ToolDescriptor::definition).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(ToolDescriptor::name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
