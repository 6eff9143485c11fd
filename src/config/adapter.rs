use super::{ConfigError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;
use std::sync::{PoisonError, RwLock};

/// Bridge between a module's config type and its node in the config document
///
/// The provider pushes nodes into the adapter when it is attached and whenever
/// the document is reloaded, and pulls snapshots back out when saving.
pub trait ConfigAdapter: Send + Sync {
    /// Node holding the default configuration
    fn generate_default(&self) -> Result<Value>;

    /// Replace the in-memory config from `node`; `None` when the document has
    /// no entry for this module
    fn load(&self, node: Option<&Value>) -> Result<()>;

    /// Node for the current in-memory config, or the default when none is loaded
    fn snapshot(&self) -> Result<Value>;
}

/// Config adapter for a serde-mapped config struct
///
/// # Example
/// ```
/// use modulus::config::TypedConfigAdapter;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// #[serde(default)]
/// struct WebConfig {
///     port: u16,
/// }
///
/// impl Default for WebConfig {
///     fn default() -> Self {
///         Self { port: 8080 }
///     }
/// }
///
/// let adapter = TypedConfigAdapter::<WebConfig>::default();
/// assert!(adapter.config().is_none());
/// assert_eq!(adapter.config_or_default().port, 8080);
/// ```
pub struct TypedConfigAdapter<C> {
    default: C,
    current: RwLock<Option<C>>,
}

impl<C> TypedConfigAdapter<C>
where
    C: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(default: C) -> Self {
        Self {
            default,
            current: RwLock::new(None),
        }
    }

    /// The loaded config, if the document had one
    pub fn config(&self) -> Option<C> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config_or_default(&self) -> C {
        self.config().unwrap_or_else(|| self.default.clone())
    }

    /// Replace the in-memory config; written out on the next save
    pub fn set_config(&self, config: C) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
    }

    fn mapping_error(source: serde_json::Error) -> ConfigError {
        ConfigError::Mapping {
            target: type_name::<C>().to_string(),
            source,
        }
    }
}

impl<C> Default for TypedConfigAdapter<C>
where
    C: Serialize + DeserializeOwned + Clone + Default + Send + Sync,
{
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C> ConfigAdapter for TypedConfigAdapter<C>
where
    C: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn generate_default(&self) -> Result<Value> {
        serde_json::to_value(&self.default).map_err(Self::mapping_error)
    }

    fn load(&self, node: Option<&Value>) -> Result<()> {
        let loaded = match node {
            Some(node) => Some(
                serde_json::from_value::<C>(strip_comments(node)).map_err(Self::mapping_error)?,
            ),
            None => None,
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = loaded;
        Ok(())
    }

    fn snapshot(&self) -> Result<Value> {
        serde_json::to_value(self.config_or_default()).map_err(Self::mapping_error)
    }
}

/// Whether a key in the config document is a comment
pub(crate) fn is_comment(key: &str) -> bool {
    key.starts_with('#')
}

fn strip_comments(node: &Value) -> Value {
    match node {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !is_comment(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
