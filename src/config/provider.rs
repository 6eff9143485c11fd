use super::adapter::is_comment;
use super::{ConfigAdapter, ConfigError, ConfigProvider, ConfigStore, Result};
use crate::module::{LoadingStatus, ModuleDescriptor};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

const HEADER_KEY: &str = "#";

/// Section of the document listing the loading status of every optional module
struct StatusSection {
    key: String,
    ids: Vec<String>,
    descriptions: Vec<(String, String)>,
    header: String,
}

impl StatusSection {
    fn generate_default(&self) -> Value {
        let mut node = Map::new();
        node.insert(HEADER_KEY.to_string(), Value::from(self.header.clone()));
        for id in &self.ids {
            node.insert(id.clone(), Value::from(LoadingStatus::Enabled.to_string()));
        }
        for (id, description) in &self.descriptions {
            node.insert(format!("#{id}"), Value::from(description.clone()));
        }
        Value::Object(node)
    }
}

struct Attached {
    key: String,
    adapter: Arc<dyn ConfigAdapter>,
    header: Option<String>,
}

impl Attached {
    fn with_header(&self, node: Value) -> Value {
        match (node, &self.header) {
            (Value::Object(mut map), Some(header)) => {
                map.insert(HEADER_KEY.to_string(), Value::from(header.clone()));
                Value::Object(map)
            }
            (node, _) => node,
        }
    }
}

/// Config provider backed by a single JSON document
///
/// The document holds one top-level section per attached module, keyed by the
/// lower-cased module id, plus the status section. Keys starting with `#` are
/// comments and never reach an adapter.
///
/// ```json
/// {
///   "modules": {
///     "#": "ENABLED; DISABLED; FORCE_LOAD",
///     "#web": "Serves the HTTP API",
///     "web": "ENABLED"
///   },
///   "web": { "port": 8080 }
/// }
/// ```
pub struct SystemConfigProvider<S> {
    store: S,
    root: Map<String, Value>,
    status: Option<StatusSection>,
    adapters: Vec<Attached>,
}

impl<S: ConfigStore> SystemConfigProvider<S> {
    /// Create a provider and read the current document from `store`
    pub fn new(store: S) -> Result<Self> {
        let root = store.load()?;
        Ok(Self {
            store,
            root,
            status: None,
            adapters: Vec::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The in-memory document
    pub fn document(&self) -> &Map<String, Value> {
        &self.root
    }

    fn refresh_adapters(&self) -> Result<()> {
        for attached in &self.adapters {
            attached.adapter.load(self.root.get(&attached.key))?;
        }
        Ok(())
    }
}

impl<S: ConfigStore> ConfigProvider for SystemConfigProvider<S> {
    fn attach_status_config(
        &mut self,
        descriptors: &[&ModuleDescriptor],
        key: &str,
        header: &str,
    ) -> Result<()> {
        let section = StatusSection {
            key: key.to_lowercase(),
            ids: descriptors.iter().map(|d| d.id().to_string()).collect(),
            descriptions: descriptors
                .iter()
                .filter(|d| !d.description().is_empty())
                .map(|d| (d.id().to_string(), d.description().to_string()))
                .collect(),
            header: header.to_string(),
        };
        tracing::debug!(
            "Attached status config '{}' ({} modules)",
            section.key,
            section.ids.len()
        );
        self.status = Some(section);
        Ok(())
    }

    fn status_overrides(&self) -> Result<BTreeMap<String, LoadingStatus>> {
        let Some(section) = &self.status else {
            return Ok(BTreeMap::new());
        };
        let Some(node) = self.root.get(&section.key) else {
            return Ok(BTreeMap::new());
        };
        let Value::Object(entries) = node else {
            return Err(ConfigError::InvalidStatus {
                id: section.key.clone(),
                value: node.to_string(),
            });
        };

        let mut overrides = BTreeMap::new();
        for (id, value) in entries.iter().filter(|(k, _)| !is_comment(k)) {
            let status = value
                .as_str()
                .and_then(|s| LoadingStatus::from_str(s).ok())
                .ok_or_else(|| ConfigError::InvalidStatus {
                    id: id.clone(),
                    value: value.to_string(),
                })?;
            overrides.insert(id.clone(), status);
        }
        Ok(overrides)
    }

    fn attach_component_config(
        &mut self,
        id: &str,
        adapter: Arc<dyn ConfigAdapter>,
        header: Option<&str>,
    ) -> Result<()> {
        let key = id.to_lowercase();
        if self.status.as_ref().is_some_and(|s| s.key == key) {
            return Err(ConfigError::ReservedKey {
                id: id.to_string(),
                key,
            });
        }
        if self.adapters.iter().any(|a| a.key == key) {
            return Err(ConfigError::AlreadyAttached { id: id.to_string() });
        }

        adapter.load(self.root.get(&key))?;
        tracing::debug!("Attached config for module '{}'", key);
        self.adapters.push(Attached {
            key,
            adapter,
            header: header.map(str::to_string),
        });
        Ok(())
    }

    fn detach_component_config(&mut self, id: &str) {
        let key = id.to_lowercase();
        self.adapters.retain(|a| a.key != key);
    }

    fn component_config(&self, id: &str) -> Option<Arc<dyn ConfigAdapter>> {
        let key = id.to_lowercase();
        self.adapters
            .iter()
            .find(|a| a.key == key)
            .map(|a| Arc::clone(&a.adapter))
    }

    fn create_default_configs(&mut self) -> Result<()> {
        let mut defaults = Map::new();
        if let Some(section) = &self.status {
            defaults.insert(section.key.clone(), section.generate_default());
        }
        for attached in &self.adapters {
            let node = attached.with_header(attached.adapter.generate_default()?);
            defaults.insert(attached.key.clone(), node);
        }

        merge_missing(&mut self.root, defaults);
        self.refresh_adapters()?;
        self.save(false)
    }

    fn reload(&mut self) -> Result<()> {
        self.root = self.store.load()?;
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        self.reload()?;
        self.refresh_adapters()
    }

    fn save(&mut self, refresh: bool) -> Result<()> {
        for attached in &self.adapters {
            let node = attached.with_header(attached.adapter.snapshot()?);
            self.root.insert(attached.key.clone(), node);
        }
        self.store.save(&self.root)?;

        if refresh {
            self.refresh_adapters()?;
        }
        Ok(())
    }
}

/// Copy every key of `defaults` missing from `target`, descending into objects
fn merge_missing(target: &mut Map<String, Value>, defaults: Map<String, Value>) {
    for (key, value) in defaults {
        match (target.get_mut(&key), value) {
            (None, value) => {
                target.insert(key, value);
            }
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_missing(existing, nested);
            }
            _ => {}
        }
    }
}
