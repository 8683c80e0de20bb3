//! Literal value injection: placeholder expansion and type conversion.

use std::any::TypeId;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::registration::AnyArc;

/// Converts a raw literal to an instance of the target type.
///
/// The result is the raw instance (`Arc<T>` as `AnyArc`).
pub trait TypeConverter: Send + Sync {
    fn convert(&self, raw: &str, target: TypeKey) -> DiResult<AnyArc>;
}

/// Converter for strings, booleans, integer and float primitives, and `char`.
///
/// # Examples
///
/// ```
/// use autowire::{SimpleTypeConverter, TypeConverter, TypeKey};
///
/// let port = SimpleTypeConverter.convert("8080", TypeKey::of::<u16>()).unwrap();
/// assert_eq!(*port.downcast::<u16>().unwrap(), 8080);
///
/// assert!(SimpleTypeConverter.convert("eighty", TypeKey::of::<u16>()).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTypeConverter;

fn parse<T>(raw: &str, target: TypeKey) -> DiResult<AnyArc>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map(|v| Arc::new(v) as AnyArc)
        .map_err(|e| conversion_error(raw, target, e.to_string()))
}

fn conversion_error(raw: &str, target: TypeKey, reason: impl Into<String>) -> DiError {
    DiError::Conversion {
        value: raw.to_string(),
        target: target.display_name().to_string(),
        reason: reason.into(),
    }
}

macro_rules! parse_primitives {
    ($raw:expr, $target:expr, $($ty:ty),+) => {
        $(
            if $target.type_id() == TypeId::of::<$ty>() {
                return parse::<$ty>($raw, $target);
            }
        )+
    };
}

impl TypeConverter for SimpleTypeConverter {
    fn convert(&self, raw: &str, target: TypeKey) -> DiResult<AnyArc> {
        let id = target.type_id();
        if id == TypeId::of::<String>() {
            return Ok(Arc::new(raw.to_string()));
        }
        if id == TypeId::of::<bool>() {
            return match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(Arc::new(true)),
                "false" | "off" | "no" | "0" => Ok(Arc::new(false)),
                _ => Err(conversion_error(raw, target, "not a boolean")),
            };
        }
        if id == TypeId::of::<char>() {
            let mut chars = raw.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Arc::new(c)),
                _ => Err(conversion_error(raw, target, "expected exactly one character")),
            };
        }
        parse_primitives!(raw, target, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
        Err(conversion_error(raw, target, "no conversion available"))
    }
}

/// Expands `${key}` and `${key:default}` placeholders from `properties`.
///
/// Substituted text is not scanned again.
pub fn resolve_placeholders(raw: &str, properties: &HashMap<String, String>) -> DiResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let end = body.find('}').ok_or_else(|| DiError::Conversion {
            value: raw.to_string(),
            target: "placeholder".to_string(),
            reason: "unterminated '${'".to_string(),
        })?;
        let expr = &body[..end];
        let (key, default) = match expr.split_once(':') {
            Some((key, default)) => (key, Some(default)),
            None => (expr, None),
        };
        match properties.get(key).map(String::as_str).or(default) {
            Some(value) => out.push_str(value),
            None => {
                return Err(DiError::Conversion {
                    value: raw.to_string(),
                    target: "placeholder".to_string(),
                    reason: format!("could not resolve placeholder '{key}'"),
                })
            }
        }
        rest = &body[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_common_primitives() {
        let c = SimpleTypeConverter;
        assert_eq!(*c.convert("yes", TypeKey::of::<bool>()).unwrap().downcast::<bool>().unwrap(), true);
        assert_eq!(*c.convert(" -7 ", TypeKey::of::<i64>()).unwrap().downcast::<i64>().unwrap(), -7);
        assert_eq!(*c.convert("x", TypeKey::of::<char>()).unwrap().downcast::<char>().unwrap(), 'x');
        assert_eq!(
            *c.convert("1.5", TypeKey::of::<f64>()).unwrap().downcast::<f64>().unwrap(),
            1.5
        );
        assert!(c.convert("1", TypeKey::of::<Vec<u8>>()).is_err());
        assert!(c.convert("300", TypeKey::of::<u8>()).is_err());
    }

    #[test]
    fn placeholders_use_properties_then_defaults() {
        let mut props = HashMap::new();
        props.insert("host".to_string(), "localhost".to_string());

        assert_eq!(
            resolve_placeholders("${host}:${port:5432}", &props).unwrap(),
            "localhost:5432"
        );
        assert_eq!(resolve_placeholders("plain", &props).unwrap(), "plain");
        assert!(matches!(
            resolve_placeholders("${missing}", &props),
            Err(DiError::Conversion { .. })
        ));
        assert!(resolve_placeholders("${host", &props).is_err());
    }
}
