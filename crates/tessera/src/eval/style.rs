//! Style preset resolution.

use indexmap::IndexMap;

use crate::program::StylePreset;

/// Class string for a preset under a variant selection.
///
/// Base classes come first, then one class string per declared variant (the
/// selection, else the preset default), then every compound variant whose
/// conditions all match the effective selection. Selections for variants the
/// preset does not declare are ignored.
pub fn resolve_classes(preset: &StylePreset, selection: &IndexMap<String, String>) -> String {
    let mut classes: Vec<&str> = Vec::new();
    if !preset.base.is_empty() {
        classes.push(&preset.base);
    }

    let mut effective: IndexMap<&str, &str> = IndexMap::new();
    for (variant, options) in &preset.variants {
        let chosen = selection
            .get(variant)
            .or_else(|| preset.default_variants.get(variant));
        let Some(chosen) = chosen else {
            continue;
        };
        effective.insert(variant, chosen);
        if let Some(class) = options.get(chosen) {
            if !class.is_empty() {
                classes.push(class);
            }
        }
    }

    for compound in &preset.compound_variants {
        let applies = compound
            .conditions
            .iter()
            .all(|(variant, option)| effective.get(variant.as_str()) == Some(&option.as_str()));
        if applies && !compound.class.is_empty() {
            classes.push(&compound.class);
        }
    }

    classes.join(" ")
}
