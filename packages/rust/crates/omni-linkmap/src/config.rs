//! Layered `linkmap` settings.
//!
//! Resolution order: `<project_root>/packages/conf/linkmap.yaml`, then
//! `$PRJ_CONFIG_HOME/omni-dev-fusion/linkmap.yaml` (or an explicit override
//! file). Mappings merge recursively; scalars and lists replace.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{LinkMapError, Result};
use crate::scanner::DEFAULT_FILE_TYPES;

/// Top-level key holding the settings.
pub const SETTINGS_SECTION: &str = "linkmap";
/// Default `fileIdRegexp` (Zettelkasten timestamp ids).
pub const DEFAULT_FILE_ID_REGEXP: &str = r"\d{14}";

static PROJECT_ROOT_CACHE: OnceLock<PathBuf> = OnceLock::new();
static LINKMAP_CONFIG_FILE_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Editor view column a document is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewColumn {
    /// Currently active column.
    Active,
    /// Column beside the active one.
    Beside,
    /// Column 1.
    #[default]
    One,
    /// Column 2.
    Two,
    /// Column 3.
    Three,
    /// Column 4.
    Four,
    /// Column 5.
    Five,
    /// Column 6.
    Six,
    /// Column 7.
    Seven,
    /// Column 8.
    Eight,
    /// Column 9.
    Nine,
}

impl ViewColumn {
    /// Parse a setting value; unknown values fall back to [`ViewColumn::One`].
    #[must_use]
    pub fn from_alias(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "active" => Self::Active,
            "beside" => Self::Beside,
            "two" => Self::Two,
            "three" => Self::Three,
            "four" => Self::Four,
            "five" => Self::Five,
            "six" => Self::Six,
            "seven" => Self::Seven,
            "eight" => Self::Eight,
            "nine" => Self::Nine,
            _ => Self::One,
        }
    }

    /// Numeric value understood by the host.
    #[must_use]
    pub const fn host_value(self) -> i8 {
        match self {
            Self::Active => -1,
            Self::Beside => -2,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
        }
    }
}

/// Resolved `linkmap` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMapSettings {
    /// Open the graph automatically when a session host starts.
    pub auto_start: bool,
    /// Recognized note extensions (without dot).
    pub file_types: Vec<String>,
    /// Pattern used to detect file ids in link text.
    pub file_id_regexp: String,
    /// Column for documents opened from the graph.
    pub open_column: ViewColumn,
    /// Column for the graph panel itself.
    pub show_column: ViewColumn,
}

impl Default for LinkMapSettings {
    fn default() -> Self {
        Self {
            auto_start: false,
            file_types: DEFAULT_FILE_TYPES.iter().map(|ext| (*ext).to_string()).collect(),
            file_id_regexp: DEFAULT_FILE_ID_REGEXP.to_string(),
            open_column: ViewColumn::One,
            show_column: ViewColumn::Beside,
        }
    }
}

impl LinkMapSettings {
    /// Settings from the layered YAML files, defaults for missing keys.
    #[must_use]
    pub fn load() -> Self {
        Self::from_value(&merged_linkmap_settings())
    }

    /// Settings from an explicit system/user file pair.
    #[must_use]
    pub fn load_from(system_path: Option<&Path>, user_path: Option<&Path>) -> Self {
        let mut merged = Value::Mapping(Mapping::new());
        for path in [system_path, user_path].into_iter().flatten() {
            if let Some(layer) = read_yaml_file(path) {
                deep_merge(&mut merged, layer);
            }
        }
        Self::from_value(&merged)
    }

    /// Settings from a merged YAML document containing a `linkmap` section.
    ///
    /// Values that cannot be coerced are ignored in favour of defaults.
    #[must_use]
    pub fn from_value(settings: &Value) -> Self {
        let mut resolved = Self::default();
        let key = |name: &str| format!("{SETTINGS_SECTION}.{name}");

        if let Some(flag) = get_setting_bool(settings, &key("autoStart")) {
            resolved.auto_start = flag;
        }
        if let Some(types) = get_setting_string_list(settings, &key("fileTypes")) {
            let types: Vec<String> = types
                .into_iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect();
            if !types.is_empty() {
                resolved.file_types = types;
            }
        }
        if let Some(pattern) = get_setting_string(settings, &key("fileIdRegexp"))
            .filter(|pattern| !pattern.trim().is_empty())
        {
            resolved.file_id_regexp = pattern;
        }
        if let Some(column) = get_setting_string(settings, &key("openColumn")) {
            resolved.open_column = ViewColumn::from_alias(&column);
        }
        if let Some(column) = get_setting_string(settings, &key("showColumn")) {
            resolved.show_column = ViewColumn::from_alias(&column);
        }
        resolved
    }

    /// Compile `fileIdRegexp` with the user pattern as capture group 1.
    ///
    /// # Errors
    /// `Pattern` when the pattern does not compile.
    pub fn file_id_pattern(&self) -> Result<Regex> {
        Regex::new(&format!("(?m)({})", self.file_id_regexp)).map_err(|source| {
            LinkMapError::Pattern {
                pattern: self.file_id_regexp.clone(),
                source,
            }
        })
    }

    /// First file id in `text` that is not part of a wiki link.
    ///
    /// # Errors
    /// `Pattern` when `fileIdRegexp` does not compile.
    pub fn find_file_id(&self, text: &str) -> Result<Option<String>> {
        Ok(find_file_id(&self.file_id_pattern()?, text))
    }
}

/// First match of `pattern` in `text` not immediately preceded by `[[`.
#[must_use]
pub fn find_file_id(pattern: &Regex, text: &str) -> Option<String> {
    pattern.captures_iter(text).find_map(|caps| {
        let found = caps.get(1).or_else(|| caps.get(0))?;
        if text[..found.start()].ends_with("[[") {
            None
        } else {
            Some(found.as_str().to_string())
        }
    })
}

/// Override the user settings file (`linkmap --conf <file>`).
///
/// # Errors
/// `Config` when a different override was already installed.
pub fn set_linkmap_config_override(path: PathBuf) -> Result<()> {
    let normalized = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    if let Some(existing) = LINKMAP_CONFIG_FILE_OVERRIDE.get() {
        if existing == &normalized {
            return Ok(());
        }
        return Err(LinkMapError::Config(format!(
            "config override already set to '{}' (requested '{}')",
            existing.display(),
            normalized.display()
        )));
    }

    LINKMAP_CONFIG_FILE_OVERRIDE
        .set(normalized)
        .map_err(|_| LinkMapError::Config("failed to set config override".to_string()))
}

fn resolve_project_root_uncached() -> PathBuf {
    if let Ok(raw) = std::env::var("PRJ_ROOT") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            if path.is_absolute() {
                return path;
            }
            if let Ok(cwd) = std::env::current_dir() {
                return cwd.join(path);
            }
            return path;
        }
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut cursor = cwd.clone();
    loop {
        if cursor.join(".git").exists() {
            return cursor;
        }
        match cursor.parent() {
            Some(parent) => cursor = parent.to_path_buf(),
            None => return cwd,
        }
    }
}

fn resolve_project_root() -> PathBuf {
    PROJECT_ROOT_CACHE
        .get_or_init(resolve_project_root_uncached)
        .clone()
}

fn resolve_prj_config_home(project_root: &Path) -> PathBuf {
    if let Ok(raw) = std::env::var("PRJ_CONFIG_HOME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            return if path.is_absolute() {
                path
            } else {
                project_root.join(path)
            };
        }
    }
    project_root.join(".config")
}

fn read_yaml_file(path: &Path) -> Option<Value> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(
                event = "linkmap.config.invalid_yaml",
                path = %path.display(),
                error = %error,
                "ignoring unreadable settings file"
            );
            None
        }
    }
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    deep_merge(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn merged_linkmap_settings() -> Value {
    let root = resolve_project_root();
    let system_path = root.join("packages/conf/linkmap.yaml");
    let user_path = LINKMAP_CONFIG_FILE_OVERRIDE
        .get()
        .cloned()
        .unwrap_or_else(|| resolve_prj_config_home(&root).join("omni-dev-fusion/linkmap.yaml"));

    let mut merged = Value::Mapping(Mapping::new());
    if let Some(system) = read_yaml_file(&system_path) {
        deep_merge(&mut merged, system);
    }
    if let Some(user) = read_yaml_file(&user_path) {
        deep_merge(&mut merged, user);
    }
    merged
}

fn setting_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(value) => Some(value.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn setting_value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        Value::Number(number) => number.as_i64().map(|v| v != 0),
        _ => None,
    }
}

fn get_setting_value<'a>(settings: &'a Value, dotted_key: &str) -> Option<&'a Value> {
    let mut cursor = settings;
    for segment in dotted_key.split('.') {
        match cursor {
            Value::Mapping(map) => {
                let key = Value::String(segment.to_string());
                cursor = map.get(&key)?;
            }
            _ => return None,
        }
    }
    Some(cursor)
}

fn get_setting_string(settings: &Value, dotted_key: &str) -> Option<String> {
    get_setting_value(settings, dotted_key).and_then(setting_value_to_string)
}

fn get_setting_bool(settings: &Value, dotted_key: &str) -> Option<bool> {
    get_setting_value(settings, dotted_key).and_then(setting_value_to_bool)
}

fn get_setting_string_list(settings: &Value, dotted_key: &str) -> Option<Vec<String>> {
    match get_setting_value(settings, dotted_key)? {
        Value::Sequence(items) => Some(items.iter().filter_map(setting_value_to_string).collect()),
        Value::String(text) => Some(
            text.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(raw: &str) -> Value {
        serde_yaml::from_str(raw).unwrap_or(Value::Null)
    }

    #[test]
    fn deep_merge_replaces_scalars_and_lists() {
        let mut base = yaml("linkmap:\n  fileTypes: [md]\n  autoStart: false\n");
        deep_merge(&mut base, yaml("linkmap:\n  fileTypes: [markdown]\n"));
        let settings = LinkMapSettings::from_value(&base);
        assert_eq!(settings.file_types, vec!["markdown".to_string()]);
        assert!(!settings.auto_start);
    }

    #[test]
    fn lenient_coercions() {
        let settings = LinkMapSettings::from_value(&yaml(
            "linkmap:\n  autoStart: \"yes\"\n  fileTypes: \"md, .txt\"\n  openColumn: Beside\n",
        ));
        assert!(settings.auto_start);
        assert_eq!(settings.file_types, vec!["md".to_string(), "txt".to_string()]);
        assert_eq!(settings.open_column, ViewColumn::Beside);
    }

    #[test]
    fn file_id_skips_wiki_link_matches() {
        let settings = LinkMapSettings::default();
        assert_eq!(
            settings.find_file_id("see [[20200101120000]] then 20210101120000").ok().flatten(),
            Some("20210101120000".to_string())
        );
        assert_eq!(settings.find_file_id("no ids here").ok().flatten(), None);
    }
}
