//! Embedded form definition registry

use rust_embed::Embed;
use std::collections::BTreeMap;

use crate::schema::definition::FormDefinition;
use crate::schema::validator::SchemaError;

#[derive(Embed)]
#[folder = "forms/"]
#[include = "*.yaml"]
struct FormAssets;

/// Lookup of the shipped form definitions by name
pub struct FormRegistry {
    definitions: BTreeMap<String, FormDefinition>,
    sources: BTreeMap<String, String>,
}

impl FormRegistry {
    /// Load and parse every embedded definition
    pub fn load() -> Result<Self, SchemaError> {
        let mut definitions = BTreeMap::new();
        let mut sources = BTreeMap::new();

        for file in FormAssets::iter() {
            let Some(asset) = FormAssets::get(&file) else {
                continue;
            };
            let source = String::from_utf8_lossy(&asset.data).into_owned();
            let definition =
                FormDefinition::from_yaml(&source).map_err(|source| SchemaError::Parse {
                    name: file.to_string(),
                    source,
                })?;
            if definitions.contains_key(&definition.name) {
                return Err(SchemaError::DuplicateForm(definition.name));
            }
            sources.insert(definition.name.clone(), source);
            definitions.insert(definition.name.clone(), definition);
        }

        Ok(Self { definitions, sources })
    }

    /// Find a definition by its short name
    pub fn get(&self, name: &str) -> Option<&FormDefinition> {
        self.definitions.get(name)
    }

    /// Raw YAML source of a definition
    pub fn source(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    /// All form names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &FormDefinition> {
        self.definitions.values()
    }
}
