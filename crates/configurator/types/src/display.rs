//! Display modes and variant naming
//!
//! Each attribute line decides how its selection shows up in the name of
//! the configured variant: hidden, value only, or "Attribute: value".

use crate::{CustomValue, ProductTemplate, ValueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// How an attribute line contributes to the variant display name
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Hide,
    #[default]
    Value,
    Attribute,
}

/// Selection table for display modes: `(key, label)`, built once
static DISPLAY_SELECTION: LazyLock<Vec<(DisplayMode, &'static str, &'static str)>> =
    LazyLock::new(|| {
        vec![
            (DisplayMode::Hide, "hide", "Hide"),
            (DisplayMode::Value, "value", "Only Value"),
            (DisplayMode::Attribute, "attribute", "With Label"),
        ]
    });

impl DisplayMode {
    /// The `(key, label)` choices offered for mode fields
    pub fn selection() -> Vec<(&'static str, &'static str)> {
        DISPLAY_SELECTION
            .iter()
            .map(|(_, key, label)| (*key, *label))
            .collect()
    }

    pub fn key(&self) -> &'static str {
        DISPLAY_SELECTION
            .iter()
            .find(|(mode, _, _)| mode == self)
            .map(|(_, key, _)| *key)
            .unwrap_or("value")
    }

    pub fn label(&self) -> &'static str {
        DISPLAY_SELECTION
            .iter()
            .find(|(mode, _, _)| mode == self)
            .map(|(_, _, label)| *label)
            .unwrap_or("Only Value")
    }

    pub fn from_key(key: &str) -> Option<Self> {
        DISPLAY_SELECTION
            .iter()
            .find(|(_, k, _)| *k == key)
            .map(|(mode, _, _)| *mode)
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Build the display name of a configured variant.
///
/// Lines are visited in template order. Multi-valued selections are
/// joined with `" + "`, custom values use their raw text, and lines in
/// `hide` mode or without a selection are skipped.
pub fn variant_display_name<F>(
    template: &ProductTemplate,
    value_ids: &BTreeSet<ValueId>,
    custom_values: &[CustomValue],
    value_name: F,
) -> String
where
    F: Fn(ValueId) -> Option<String>,
{
    let mut fragments = Vec::new();

    for line in template.sorted_lines() {
        if line.display_mode == DisplayMode::Hide {
            continue;
        }

        let custom = custom_values
            .iter()
            .find(|c| c.attribute_id == line.attribute.id)
            .and_then(|c| c.value.clone());

        let shown = match custom {
            Some(raw) => raw,
            None => {
                let names: Vec<String> = line
                    .value_ids
                    .iter()
                    .filter(|v| value_ids.contains(v))
                    .filter_map(|v| value_name(*v))
                    .collect();
                if names.is_empty() {
                    continue;
                }
                names.join(" + ")
            }
        };

        match line.display_mode {
            DisplayMode::Attribute => {
                fragments.push(format!("{}: {}", line.attribute.name, shown))
            }
            _ => fragments.push(shown),
        }
    }

    if fragments.is_empty() {
        template.name.clone()
    } else {
        format!("{} ({})", template.name, fragments.join(", "))
    }
}
