//! Immutable per-argument metadata shared by steps and help output.

use std::fmt;
use std::sync::Arc;

use fluent_args_metadata::ParameterInfo;

/// Marker for types that can be bound to an argument.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

/// Identity of a declared argument: its slot (declaration index, which is
/// also its position in the callback tuple) and a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgId {
    slot: usize,
    name: String,
}

impl ArgId {
    pub fn new(slot: usize, name: impl Into<String>) -> Self {
        Self {
            slot,
            name: name.into(),
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ArgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Alias collection accepted by the builder.
///
/// Accepts a single alias or several via array/slice/vec.
pub trait IntoAliases {
    fn into_aliases(self) -> Vec<String>;
}

impl IntoAliases for &str {
    fn into_aliases(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoAliases for String {
    fn into_aliases(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoAliases for &[&str] {
    fn into_aliases(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoAliases for [&str; N] {
    fn into_aliases(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl IntoAliases for Vec<&str> {
    fn into_aliases(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoAliases for Vec<String> {
    fn into_aliases(self) -> Vec<String> {
        self
    }
}

/// Display name for an aliased argument: the longest alias, so `--name`
/// wins over `-n`.
pub(crate) fn alias_display_name(aliases: &[String]) -> String {
    aliases
        .iter()
        .max_by_key(|a| a.len())
        .cloned()
        .unwrap_or_default()
}

/// A predicate over a converted value plus the message reported when it
/// rejects the value.
pub struct Validator<T> {
    check: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    message: String,
}

impl<T> Validator<T> {
    pub fn new<F>(check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
            message: message.into(),
        }
    }

    /// `Err(message)` when the value is rejected.
    pub fn validate(&self, value: &T) -> Result<(), &str> {
        if (self.check)(value) {
            Ok(())
        } else {
            Err(&self.message)
        }
    }
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self {
            check: Arc::clone(&self.check),
            message: self.message.clone(),
        }
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Runs every validator in order and returns the first rejection message.
pub(crate) fn first_rejection<'v, T>(validators: &'v [Validator<T>], value: &T) -> Option<&'v str> {
    validators.iter().find_map(|v| v.validate(value).err())
}

/// Everything a step knows about its argument apart from the typed parts
/// (converter, fallback value, validators).
#[derive(Debug, Clone)]
pub struct ArgDescriptor {
    pub id: ArgId,
    pub aliases: Vec<String>,
    pub info: ParameterInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_from_all_supported_shapes() {
        assert_eq!("--name".into_aliases(), vec!["--name"]);
        assert_eq!(["-n", "--name"].into_aliases(), vec!["-n", "--name"]);
        let slice: &[&str] = &["-a"];
        assert_eq!(slice.into_aliases(), vec!["-a"]);
        assert_eq!(vec!["-b".to_string()].into_aliases(), vec!["-b"]);
    }

    #[test]
    fn display_name_uses_longest_alias() {
        let aliases = vec!["-n".to_string(), "--name".to_string()];
        assert_eq!(alias_display_name(&aliases), "--name");
    }

    #[test]
    fn validators_report_first_rejection() {
        let validators = vec![
            Validator::new(|v: &i32| *v >= 0, "must not be negative"),
            Validator::new(|v: &i32| *v < 150, "must be below 150"),
        ];
        assert_eq!(first_rejection(&validators, &28), None);
        assert_eq!(first_rejection(&validators, &-1), Some("must not be negative"));
        assert_eq!(first_rejection(&validators, &200), Some("must be below 150"));
    }
}
