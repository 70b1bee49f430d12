//! Keyboard layouts in keyboard-normalized coordinates.
//!
//! A layout is declared as rows of `{name, width}` keys sharing one key height,
//! all as fractions of the keyboard. Rows are stacked from `y = 0` and keys
//! placed left to right from `x = 0`, giving axis-aligned rectangles inside
//! the unit square.

use crate::{Error, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Built-in qwerty layout
const QWERTY_LAYOUT: &str = include_str!("layouts/qwerty.yaml");

/// Output characters for keys whose name is not the character itself
const KEY_MAPS: &[(&str, &str)] = &[
    ("backtick", "`"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("zero", "0"),
    ("minus", "-"),
    ("equal", "="),
    ("backspace", "\u{8}"),
    ("tab", "\t"),
    ("left_bracket", "["),
    ("right_bracket", "]"),
    ("backslash", "\\"),
    ("semicolon", ";"),
    ("quote", "'"),
    ("enter", "\n"),
    ("comma", ","),
    ("period", "."),
    ("slash", "/"),
    ("space", " "),
];

/// Keys that are recognized but never typed
const MODIFIER_KEYS: &[&str] = &[
    "left_shift",
    "right_shift",
    "left_ctrl",
    "right_ctrl",
    "left_alt",
    "right_alt",
    "left_win",
    "right_win",
    "menu",
    "caps_lock",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyDefinition {
    name: String,
    width: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayoutDefinition {
    key_height: f64,
    #[serde(default)]
    real_world_dimensions_mm: Option<(f64, f64)>,
    keys: BTreeMap<String, Vec<KeyDefinition>>,
}

/// One key rectangle in keyboard-normalized coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// Key name, e.g. `a` or `left_shift`
    pub name: String,
    /// Left edge
    pub x: f64,
    /// Lower edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Key {
    /// Whether the point lies inside the key, edges included
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x <= x && x <= self.x + self.width && self.y <= y && y <= self.y + self.height
    }

    /// Center of the key rectangle
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Flat list of key rectangles built from a layout definition
#[derive(Debug, Clone)]
pub struct KeyboardLayout {
    name: String,
    keys: Vec<Key>,
    real_world_dimensions: Option<(f64, f64)>,
}

impl KeyboardLayout {
    /// Load a built-in layout by name
    ///
    /// # Errors
    ///
    /// Returns an error if no built-in layout has this name
    pub fn by_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "qwerty" => Self::from_yaml_str("qwerty", QWERTY_LAYOUT),
            _ => Err(Error::InvalidLayout(format!("Unknown keyboard layout: {name}"))),
        }
    }

    /// Load a layout definition from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the layout is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("custom");
        Self::from_yaml_str(name, &contents)
    }

    /// Parse and validate a layout definition
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a key falls outside the
    /// unit square
    pub fn from_yaml_str(name: &str, yaml: &str) -> Result<Self> {
        let definition: LayoutDefinition = serde_yaml::from_str(yaml)?;
        let keys = Self::calculate_key_coordinates(&definition)?;
        info!("Loaded keyboard layout '{name}' with {} keys", keys.len());

        Ok(Self {
            name: name.to_string(),
            keys,
            real_world_dimensions: definition.real_world_dimensions_mm,
        })
    }

    fn calculate_key_coordinates(definition: &LayoutDefinition) -> Result<Vec<Key>> {
        let key_height = definition.key_height;
        if key_height.is_nan() || key_height <= 0.0 {
            return Err(Error::InvalidLayout(format!(
                "Key height must be positive, got {key_height}"
            )));
        }

        let mut rows = definition
            .keys
            .iter()
            .map(|(row, keys)| Ok((row_index(row)?, keys)))
            .collect::<Result<Vec<_>>>()?;
        rows.sort_by_key(|(index, _)| *index);

        let mut flat = Vec::new();
        for (row, keys) in rows {
            let y = f64::from(row) * key_height;
            let mut x = 0.0;
            for key in keys {
                if x >= 1.0 {
                    return Err(Error::InvalidLayout(format!(
                        "X position exceeds row width for {}",
                        key.name
                    )));
                }
                if y >= 1.0 {
                    return Err(Error::InvalidLayout(format!(
                        "Y position exceeds layout height for {}",
                        key.name
                    )));
                }
                if key.width.is_nan() || key.width <= 0.0 {
                    return Err(Error::InvalidLayout(format!(
                        "Key width must be positive for {}",
                        key.name
                    )));
                }

                flat.push(Key {
                    name: key.name.clone(),
                    x,
                    y,
                    width: key.width,
                    height: key_height,
                });
                x += key.width;
            }
        }

        Ok(flat)
    }

    /// Name of the key containing the point, or `""` if none does.
    ///
    /// Keys are tested in declaration order, so a point on a shared edge
    /// resolves to the earlier key.
    #[must_use]
    pub fn convert_coordinates_to_key(&self, x: f64, y: f64) -> &str {
        self.keys
            .iter()
            .find(|key| key.contains(x, y))
            .map_or("", |key| key.name.as_str())
    }

    /// Character typed by a key; unmapped names are typed as-is
    #[must_use]
    pub fn get_key_value<'a>(&self, key: &'a str) -> &'a str {
        KEY_MAPS
            .iter()
            .find(|(name, _)| *name == key)
            .map_or(key, |(_, value)| *value)
    }

    /// Whether the key is a modifier
    #[must_use]
    pub fn is_modifier_key(&self, key: &str) -> bool {
        MODIFIER_KEYS.contains(&key)
    }

    /// All key rectangles in declaration order
    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Look up a key rectangle by name
    #[must_use]
    pub fn key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|key| key.name == name)
    }

    /// Physical keyboard size in millimeters, if declared
    #[must_use]
    pub const fn real_world_dimensions(&self) -> Option<(f64, f64)> {
        self.real_world_dimensions
    }

    /// Layout name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Zero-based row index from a `row_<n>` name
fn row_index(row: &str) -> Result<u32> {
    row.rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse::<u32>().ok())
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| Error::InvalidLayout(format!("Invalid row name: {row}")))
}
