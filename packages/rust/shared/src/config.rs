//! Application configuration for apidoc.
//!
//! User config lives at `~/.apidoc/apidoc.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ApiDocError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "apidoc.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".apidoc";

// ---------------------------------------------------------------------------
// Config structs (matching apidoc.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document parsing settings.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Where `{Type}` spans link to.
    #[serde(default)]
    pub type_links: TypeLinkConfig,
}

/// `[parser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Extension of source documents, without the dot.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Extension internal links are rewritten to, without the dot.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            source_extension: default_source_extension(),
            output_extension: default_output_extension(),
        }
    }
}

impl ParserConfig {
    /// Reject extensions that would make link rewriting ambiguous.
    pub fn validate(&self) -> Result<()> {
        for (field, ext) in [
            ("source_extension", &self.source_extension),
            ("output_extension", &self.output_extension),
        ] {
            if ext.is_empty() || ext.contains(['.', '/', '#', '?']) {
                return Err(ApiDocError::validation(format!(
                    "{field} must be a bare extension like \"md\", got {ext:?}"
                )));
            }
        }
        Ok(())
    }
}

fn default_source_extension() -> String {
    "md".into()
}
fn default_output_extension() -> String {
    "html".into()
}

/// `[type_links]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeLinkConfig {
    /// Base for primitive types; the link is `<base>#<name>_type`.
    #[serde(default = "default_primitive_base_url")]
    pub primitive_base_url: String,

    /// Base for JavaScript globals; the link is `<base><Name>`.
    #[serde(default = "default_global_base_url")]
    pub global_base_url: String,

    /// Names treated as JavaScript globals.
    #[serde(default = "default_globals")]
    pub globals: Vec<String>,

    /// Explicit name to URL mappings. These win over everything else.
    #[serde(default = "default_custom_types")]
    pub custom: BTreeMap<String, String>,
}

impl Default for TypeLinkConfig {
    fn default() -> Self {
        Self {
            primitive_base_url: default_primitive_base_url(),
            global_base_url: default_global_base_url(),
            globals: default_globals(),
            custom: default_custom_types(),
        }
    }
}

fn default_primitive_base_url() -> String {
    "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Data_structures".into()
}
fn default_global_base_url() -> String {
    "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/".into()
}
fn default_globals() -> Vec<String> {
    [
        "Array",
        "ArrayBuffer",
        "AsyncFunction",
        "BigInt64Array",
        "BigUint64Array",
        "DataView",
        "Date",
        "Error",
        "EvalError",
        "Float32Array",
        "Float64Array",
        "Function",
        "Generator",
        "Int8Array",
        "Int16Array",
        "Int32Array",
        "Map",
        "Object",
        "Promise",
        "Proxy",
        "RangeError",
        "ReferenceError",
        "RegExp",
        "Set",
        "SharedArrayBuffer",
        "SyntaxError",
        "TypeError",
        "TypedArray",
        "Uint8Array",
        "Uint8ClampedArray",
        "Uint16Array",
        "Uint32Array",
        "WeakMap",
        "WeakSet",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_custom_types() -> BTreeMap<String, String> {
    [
        ("AbortSignal", "globals.html#class-abortsignal"),
        ("Buffer", "buffer.html#class-buffer"),
        ("EventEmitter", "events.html#class-eventemitter"),
        ("Readable", "stream.html#class-streamreadable"),
        ("Stream", "stream.html#stream"),
        ("URL", "url.html#the-whatwg-url-api"),
        ("Writable", "stream.html#class-streamwritable"),
        (
            "any",
            "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Data_structures#data_types",
        ),
    ]
    .into_iter()
    .map(|(name, url)| (name.to_string(), url.to_string()))
    .collect()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.apidoc/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ApiDocError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.apidoc/apidoc.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ApiDocError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ApiDocError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.parser.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ApiDocError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ApiDocError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ApiDocError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
