use regex::Regex;
use std::borrow::Cow;

fn hex_color_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid regex"))
}

/// Returns `true` for `#RRGGBB` literals.
pub fn is_hex_color(value: &str) -> bool {
    hex_color_regex().is_match(value)
}

/// Returns `true` for values shaped like a preset key (a single ASCII digit).
///
/// Only `"1"`..`"6"` are mapped by the default palette; other digits are accepted and passed
/// through literally.
pub fn is_preset_key(value: &str) -> bool {
    value.len() == 1 && value.as_bytes()[0].is_ascii_digit()
}

pub fn is_valid_color(value: &str) -> bool {
    is_hex_color(value) || is_preset_key(value)
}

/// Immutable preset-key to hex lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    presets: Vec<(String, String)>,
}

pub const DEFAULT_PRESETS: [(&str, &str); 6] = [
    ("1", "#e06c75"),
    ("2", "#d19a66"),
    ("3", "#e5c07b"),
    ("4", "#98c379"),
    ("5", "#61afef"),
    ("6", "#c678dd"),
];

impl Default for ColorPalette {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_PRESETS)
    }
}

impl ColorPalette {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            presets: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn preset(&self, key: &str) -> Option<&str> {
        self.presets
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Maps a raw color value to a CSS color.
    ///
    /// Known preset keys map to their hex value, any other string is returned unchanged, and an
    /// absent or empty value means "inherit the default".
    pub fn resolve<'a>(&'a self, raw: Option<&'a str>) -> Option<Cow<'a, str>> {
        let raw = raw?;
        if raw.is_empty() {
            return None;
        }
        match self.preset(raw) {
            Some(hex) => Some(Cow::Borrowed(hex)),
            None => Some(Cow::Borrowed(raw)),
        }
    }
}
