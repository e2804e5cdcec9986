//! String-to-value conversion keyed by target type.
//!
//! The registry maps a `TypeId` to a typed conversion function. Built-ins
//! cover integers, floats, `bool`, `String`, `char` and `PathBuf`; anything
//! else is added with [`ConverterRegistry::register`] or, for enumerations,
//! [`ConverterRegistry::register_enum`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// Why a single token could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ConversionError {
    reason: String,
}

impl ConversionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

type ConvertFn<T> = Arc<dyn Fn(&str) -> Result<T, ConversionError> + Send + Sync>;

/// Typed conversion handle resolved from the registry at build time.
pub struct Converter<T> {
    type_name: &'static str,
    possible_values: Vec<String>,
    func: ConvertFn<T>,
}

impl<T> Converter<T> {
    pub fn new<F>(type_name: &'static str, func: F) -> Self
    where
        F: Fn(&str) -> Result<T, ConversionError> + Send + Sync + 'static,
    {
        Self {
            type_name,
            possible_values: Vec::new(),
            func: Arc::new(func),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Valid members, for enumerations. Empty otherwise.
    pub fn possible_values(&self) -> &[String] {
        &self.possible_values
    }

    pub fn convert(&self, token: &str) -> Result<T, ConversionError> {
        (self.func)(token).map_err(|e| {
            ConversionError::new(format!(
                "cannot convert '{token}' to {}: {}",
                self.type_name,
                e.reason()
            ))
        })
    }
}

impl<T> Clone for Converter<T> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            possible_values: self.possible_values.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<T> fmt::Debug for Converter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("type_name", &self.type_name)
            .field("possible_values", &self.possible_values)
            .finish_non_exhaustive()
    }
}

/// A closed set of named members usable as an argument type.
///
/// Matching is case-sensitive against [`ArgEnum::name`].
pub trait ArgEnum: Sized + Clone + Send + Sync + 'static {
    fn variants() -> &'static [Self];
    fn name(&self) -> &'static str;
}

/// Last path segment of `std::any::type_name`, e.g. `String` for
/// `alloc::string::String`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}

#[derive(Clone)]
struct Entry {
    type_name: &'static str,
    possible_values: Vec<String>,
    // Holds a `ConvertFn<T>` for the entry's `TypeId`.
    func: Arc<dyn Any + Send + Sync>,
}

#[derive(Clone, Default)]
pub struct ConverterRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl ConverterRegistry {
    /// Create an empty registry (no built-ins).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in converters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_from_str::<i8>();
        registry.register_from_str::<i16>();
        registry.register_from_str::<i32>();
        registry.register_from_str::<i64>();
        registry.register_from_str::<i128>();
        registry.register_from_str::<isize>();
        registry.register_from_str::<u8>();
        registry.register_from_str::<u16>();
        registry.register_from_str::<u32>();
        registry.register_from_str::<u64>();
        registry.register_from_str::<u128>();
        registry.register_from_str::<usize>();
        registry.register_from_str::<f32>();
        registry.register_from_str::<f64>();
        registry.register::<bool, _>(parse_bool);
        registry.register::<String, _>(|s| Ok(s.to_string()));
        registry.register::<char, _>(parse_char);
        registry.register::<PathBuf, _>(|s| Ok(PathBuf::from(s)));
        registry
    }

    /// Add or replace the converter for `T`.
    pub fn register<T, F>(&mut self, func: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&str) -> Result<T, ConversionError> + Send + Sync + 'static,
    {
        self.insert::<T>(short_type_name::<T>(), Vec::new(), Arc::new(func));
        self
    }

    /// Register `T` through its `FromStr` implementation.
    pub fn register_from_str<T>(&mut self) -> &mut Self
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        self.register::<T, _>(|s| s.parse::<T>().map_err(|e| ConversionError::new(e.to_string())))
    }

    /// Register an enumeration. Tokens must match a member name exactly.
    pub fn register_enum<E: ArgEnum>(&mut self) -> &mut Self {
        let names: Vec<String> = E::variants().iter().map(|v| v.name().to_string()).collect();
        let listed = names.join(", ");
        let func: ConvertFn<E> = Arc::new(move |s: &str| {
            E::variants()
                .iter()
                .find(|v| v.name() == s)
                .cloned()
                .ok_or_else(|| ConversionError::new(format!("expected one of: {listed}")))
        });
        self.insert::<E>(short_type_name::<E>(), names, func);
        self
    }

    fn insert<T: 'static>(
        &mut self,
        type_name: &'static str,
        possible_values: Vec<String>,
        func: ConvertFn<T>,
    ) {
        self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                type_name,
                possible_values,
                func: Arc::new(func),
            },
        );
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn get<T: 'static>(&self) -> Option<Converter<T>> {
        let entry = self.entries.get(&TypeId::of::<T>())?;
        let func = entry.func.downcast_ref::<ConvertFn<T>>()?;
        Some(Converter {
            type_name: entry.type_name,
            possible_values: entry.possible_values.clone(),
            func: Arc::clone(func),
        })
    }

    /// Convert one token, for callers that hold the registry directly.
    pub fn convert<T: 'static>(&self, token: &str) -> Option<Result<T, ConversionError>> {
        self.get::<T>().map(|c| c.convert(token))
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("types", &names)
            .finish()
    }
}

fn parse_bool(s: &str) -> Result<bool, ConversionError> {
    match s {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConversionError::new("expected one of: true, false, 1, 0")),
    }
}

fn parse_char(s: &str) -> Result<char, ConversionError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConversionError::new("expected exactly one character")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Color {
        Red,
        Green,
    }

    impl ArgEnum for Color {
        fn variants() -> &'static [Self] {
            &[Color::Red, Color::Green]
        }

        fn name(&self) -> &'static str {
            match self {
                Color::Red => "Red",
                Color::Green => "Green",
            }
        }
    }

    #[test]
    fn builtins_convert_numbers_bools_and_strings() {
        let registry = ConverterRegistry::with_builtins();
        assert_eq!(registry.convert::<i32>("-28").unwrap(), Ok(-28));
        assert_eq!(registry.convert::<u8>("255").unwrap(), Ok(255));
        assert_eq!(registry.convert::<f64>("1.5").unwrap(), Ok(1.5));
        assert_eq!(registry.convert::<bool>("1").unwrap(), Ok(true));
        assert_eq!(registry.convert::<bool>("false").unwrap(), Ok(false));
        assert_eq!(registry.convert::<String>("beni").unwrap(), Ok("beni".to_string()));
        assert_eq!(registry.convert::<char>("x").unwrap(), Ok('x'));
    }

    #[test]
    fn failures_name_the_token_and_type() {
        let registry = ConverterRegistry::with_builtins();
        let err = registry.convert::<u8>("256").unwrap().unwrap_err();
        assert!(err.reason().starts_with("cannot convert '256' to u8"));
        let err = registry.convert::<bool>("yes").unwrap().unwrap_err();
        assert!(err.reason().contains("true, false, 1, 0"));
        assert!(registry.convert::<char>("xy").unwrap().is_err());
    }

    #[test]
    fn round_trips_through_display() {
        let registry = ConverterRegistry::with_builtins();
        for value in [i64::MIN, -1, 0, 1729, i64::MAX] {
            assert_eq!(registry.convert::<i64>(&value.to_string()).unwrap(), Ok(value));
        }
        for value in [0.0f64, -2.5, 1e300] {
            assert_eq!(registry.convert::<f64>(&value.to_string()).unwrap(), Ok(value));
        }
        for value in [true, false] {
            assert_eq!(registry.convert::<bool>(&value.to_string()).unwrap(), Ok(value));
        }
    }

    #[test]
    fn enums_match_case_sensitively_and_list_members() {
        let mut registry = ConverterRegistry::with_builtins();
        registry.register_enum::<Color>();

        assert_eq!(registry.convert::<Color>("Green").unwrap(), Ok(Color::Green));
        let err = registry.convert::<Color>("red").unwrap().unwrap_err();
        assert!(err.reason().contains("expected one of: Red, Green"));

        let converter = registry.get::<Color>().unwrap();
        assert_eq!(converter.possible_values(), ["Red", "Green"]);
        assert_eq!(converter.type_name(), "Color");
    }

    #[test]
    fn user_converters_override_builtins() {
        let mut registry = ConverterRegistry::with_builtins();
        registry.register::<i32, _>(|s| {
            s.strip_prefix("0x")
                .ok_or_else(|| ConversionError::new("expected a 0x prefix"))
                .and_then(|hex| {
                    i32::from_str_radix(hex, 16).map_err(|e| ConversionError::new(e.to_string()))
                })
        });
        assert_eq!(registry.convert::<i32>("0xff").unwrap(), Ok(255));
        assert!(registry.convert::<i32>("255").unwrap().is_err());
    }

    #[test]
    fn unknown_types_have_no_converter() {
        struct Opaque;
        let registry = ConverterRegistry::with_builtins();
        assert!(registry.get::<Opaque>().is_none());
        assert!(!registry.contains::<Opaque>());
        assert!(ConverterRegistry::new().get::<i32>().is_none());
    }

    #[test]
    fn short_type_names() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<i32>(), "i32");
        assert_eq!(short_type_name::<PathBuf>(), "PathBuf");
    }
}
