use std::collections::{HashMap, HashSet};

use crate::api::properties::Properties;

/// A key qualifies if one of `key_sets` contains it or it starts with one of
/// `allowed_prefixes`.
pub fn does_key_qualify(
    key: &str,
    key_sets: &[&HashSet<&'static str>],
    allowed_prefixes: &[&str],
) -> bool {
    key_sets.iter().any(|key_set| key_set.contains(key))
        || allowed_prefixes.iter().any(|prefix| key.starts_with(prefix))
}

/// Copy the qualifying entries of `source`. Entries that do not qualify are dropped
/// without error.
pub fn extract_configuration_map<'a, I>(
    source: I,
    key_sets: &[&HashSet<&'static str>],
    allowed_prefixes: &[&str],
) -> HashMap<String, String>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    source
        .into_iter()
        .filter(|(key, _)| {
            let qualify = does_key_qualify(key.as_str(), key_sets, allowed_prefixes);
            if !qualify {
                debug!("drop configuration key `{}`", key);
            }
            qualify
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Copy the entries of a static default table whose key belongs to `key_set`.
pub fn extract_defaults(
    defaults: &HashMap<&'static str, &'static str>,
    key_set: &HashSet<&'static str>,
) -> HashMap<String, String> {
    defaults
        .iter()
        .filter(|(key, _)| key_set.contains(*key))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Merge `source` into `dest`, skipping every key in `exclusions`.
pub fn merge_with_exclusions(
    dest: &mut Properties,
    source: &Properties,
    exclusions: &HashSet<&'static str>,
) {
    for (key, value) in source.iter() {
        if exclusions.contains(key.as_str()) {
            debug!("configuration key `{}` is reserved, skip merge", key);
            continue;
        }
        dest.set_str(key.as_str(), value.as_str());
    }
}
