use std::sync::Arc;

use parking_lot::{RwLock, const_rwlock};

/// Source of every user-facing string the VM produces.
///
/// `key` identifies the message, `fallback` is the English template and
/// `variables` are substituted into `{{name}}` placeholders.
pub trait Localizer: Send + Sync {
    fn get(&self, key: &str, fallback: &str, variables: &[(&str, &str)]) -> String;
}

/// Substitutes variables into the fallback template and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLocalizer;

impl Localizer for DefaultLocalizer {
    fn get(&self, key: &str, fallback: &str, variables: &[(&str, &str)]) -> String {
        let template = if fallback.is_empty() { key } else { fallback };
        substitute(template, variables)
    }
}

static LOCALIZER: RwLock<Option<Arc<dyn Localizer>>> = const_rwlock(None);

/// Replaces the process-wide localizer.
pub fn set_localizer(localizer: Arc<dyn Localizer>) {
    *LOCALIZER.write() = Some(localizer);
}

/// Restores the substitution-only localizer.
pub fn reset_localizer() {
    *LOCALIZER.write() = None;
}

/// Looks up a message through the installed localizer.
pub fn localize(key: &str, fallback: &str, variables: &[(&str, &str)]) -> String {
    let localizer = LOCALIZER.read().clone();
    match localizer {
        Some(localizer) => localizer.get(key, fallback, variables),
        None => DefaultLocalizer.get(key, fallback, variables),
    }
}

/// Replaces every `{{name}}` in `template` with the matching variable.
/// Unknown placeholders are left untouched.
pub fn substitute(template: &str, variables: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = &after[..end];
                match variables.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_variables() {
        let s = substitute(
            "{{operatorName}} requires a {{operandType}} as input.",
            &[("operatorName", "+"), ("operandType", "NumberBlock")],
        );
        assert_eq!(s, "+ requires a NumberBlock as input.");
    }

    #[test]
    fn test_substitute_keeps_unknown_placeholders() {
        assert_eq!(substitute("a {{b}} c", &[]), "a {{b}} c");
        assert_eq!(substitute("open {{ only", &[]), "open {{ only");
    }

    #[test]
    fn test_default_localizer_falls_back_to_key() {
        assert_eq!(DefaultLocalizer.get("NumberBlock.name", "", &[]), "NumberBlock.name");
        assert_eq!(DefaultLocalizer.get("x", "fallback", &[]), "fallback");
    }
}
