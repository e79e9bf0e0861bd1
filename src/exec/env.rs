//! Subprocess environment construction

use std::collections::BTreeMap;

/// Overrides applied on top of the inherited environment.
///
/// No terminal or credential prompts, no pager or editor, and a fixed UTF-8
/// locale so messages stay in the form the error mapper expects.
pub const DETERMINISTIC_ENV: &[(&str, &str)] = &[
    ("GIT_TERMINAL_PROMPT", "0"),
    ("GCM_INTERACTIVE", "never"),
    ("GIT_EDITOR", "true"),
    ("GIT_PAGER", "cat"),
    ("LC_ALL", "C.UTF-8"),
    ("LANG", "C.UTF-8"),
];

/// Build the environment from an explicit inherited set.
///
/// Order of precedence, lowest first: `inherited`, [`DETERMINISTIC_ENV`],
/// `overrides`.
pub fn build_env_from<I, K, V>(inherited: I, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut env: BTreeMap<String, String> = inherited
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    for (key, value) in DETERMINISTIC_ENV {
        env.insert((*key).to_string(), (*value).to_string());
    }

    for (key, value) in overrides {
        env.insert(key.clone(), value.clone());
    }

    env
}

/// Build the environment from the current process environment.
///
/// The inherited set is needed so `PATH`, `HOME` and friends let git find its
/// helpers and configuration. Variables that are not valid UTF-8 are skipped.
pub fn build_env(overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let inherited = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
    build_env_from(inherited, overrides)
}
