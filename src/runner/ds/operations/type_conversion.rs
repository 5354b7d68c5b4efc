//! Type conversions. Every operator lowered by the compiler goes through these
//! routines, so `+`, `==` and the relational operators agree on coercion.

use std::sync::Arc;

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::object::{object_create, JsObjectType};
use crate::runner::ds::operations::object::{call, get};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::symbol::SYMBOL_TO_PRIMITIVE;
use crate::runner::ds::value::{JsString, JsValue};

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_SYMBOL: &str = "symbol";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PreferredType {
    Default,
    Number,
    String,
}

/// `@@toPrimitive` first, then `valueOf`/`toString` in hint order.
pub fn to_primitive(realm: &Realm, v: &JsValue, preferred_type: PreferredType) -> JsResult<JsValue> {
    let o = match v {
        JsValue::Object(o) => o,
        other => return Ok(other.clone()),
    };
    let exotic = get(realm, o, PropertyKey::Sym(SYMBOL_TO_PRIMITIVE))?;
    if !exotic.is_nullish() {
        let hint = match preferred_type {
            PreferredType::Default => "default",
            PreferredType::Number => "number",
            PreferredType::String => "string",
        };
        let result = call(realm, &exotic, v.clone(), &[JsValue::from(hint)])?;
        if result.is_object() {
            return Err(JErrorType::TypeError(
                "Cannot convert object to primitive value".to_string(),
            ));
        }
        return Ok(result);
    }
    let order = if preferred_type == PreferredType::String {
        [well_known::TO_STRING, well_known::VALUE_OF]
    } else {
        [well_known::VALUE_OF, well_known::TO_STRING]
    };
    for name in order.iter() {
        let method = get(realm, o, PropertyKey::Str(*name))?;
        if method.is_callable() {
            let result = call(realm, &method, v.clone(), &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
    }
    Err(JErrorType::TypeError(
        "Cannot convert object to primitive value".to_string(),
    ))
}

pub fn to_boolean(v: &JsValue) -> bool {
    match v {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => !(*n == 0.0 || n.is_nan()),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Symbol(_) | JsValue::Object(_) => true,
    }
}

pub fn to_number(realm: &Realm, v: &JsValue) -> JsResult<f64> {
    Ok(match v {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        JsValue::Number(n) => *n,
        JsValue::String(s) => string_to_number(s),
        JsValue::Symbol(_) => {
            return Err(JErrorType::TypeError(
                "Cannot convert a Symbol value to a number".to_string(),
            ))
        }
        JsValue::Object(_) => {
            let primitive = to_primitive(realm, v, PreferredType::Number)?;
            return to_number(realm, &primitive);
        }
    })
}

/// Numeric string grammar: surrounding whitespace, signed decimals, `Infinity`,
/// and unsigned `0x`/`0o`/`0b` literals. Empty input is zero.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    let radix_literal = |prefix: &str, radix: u32| -> Option<f64> {
        let digits = t
            .strip_prefix(prefix)
            .or_else(|| t.strip_prefix(&prefix.to_uppercase()))?;
        if digits.is_empty() {
            return Some(f64::NAN);
        }
        let mut value = 0f64;
        for c in digits.chars() {
            match c.to_digit(radix) {
                Some(d) => value = value * radix as f64 + d as f64,
                None => return Some(f64::NAN),
            }
        }
        Some(value)
    };
    if let Some(v) = radix_literal("0x", 16) {
        return v;
    }
    if let Some(v) = radix_literal("0o", 8) {
        return v;
    }
    if let Some(v) = radix_literal("0b", 2) {
        return v;
    }
    let (sign, body) = match t.as_bytes()[0] {
        b'-' => (-1.0, &t[1..]),
        b'+' => (1.0, &t[1..]),
        _ => (1.0, t),
    };
    if body == "Infinity" {
        return sign * f64::INFINITY;
    }
    let valid = !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-')
        && body.chars().any(|c| c.is_ascii_digit());
    if !valid {
        return f64::NAN;
    }
    match body.parse::<f64>() {
        Ok(n) => sign * n,
        Err(_) => f64::NAN,
    }
}

pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.find('e') {
            Some(pos) if !formatted[pos + 1..].starts_with('-') => {
                format!("{}e+{}", &formatted[..pos], &formatted[pos + 1..])
            }
            _ => formatted,
        };
    }
    if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

pub fn to_string(realm: &Realm, v: &JsValue) -> JsResult<JsString> {
    Ok(match v {
        JsValue::String(s) => s.clone(),
        JsValue::Symbol(_) => {
            return Err(JErrorType::TypeError(
                "Cannot convert a Symbol value to a string".to_string(),
            ))
        }
        JsValue::Object(_) => {
            let primitive = to_primitive(realm, v, PreferredType::String)?;
            return to_string(realm, &primitive);
        }
        other => Arc::from(other.to_string()),
    })
}

pub fn to_int32(realm: &Realm, v: &JsValue) -> JsResult<i32> {
    Ok(to_uint32(realm, v)? as i32)
}

pub fn to_uint32(realm: &Realm, v: &JsValue) -> JsResult<u32> {
    let n = to_number(realm, v)?;
    Ok(number_to_uint32(n))
}

pub fn number_to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    let truncated = n.trunc();
    truncated.rem_euclid(4294967296.0) as u32
}

pub fn to_property_key(realm: &Realm, v: &JsValue) -> JsResult<PropertyKey> {
    Ok(match v {
        JsValue::Number(n) => PropertyKey::from_number(*n),
        JsValue::String(s) => PropertyKey::from_str(s),
        JsValue::Symbol(s) => PropertyKey::Sym(*s),
        JsValue::Object(_) => {
            let primitive = to_primitive(realm, v, PreferredType::String)?;
            return to_property_key(realm, &primitive);
        }
        other => PropertyKey::from_str(&other.to_string()),
    })
}

/// Primitives get a plain object inheriting from their type's prototype.
pub fn to_object(realm: &Realm, v: &JsValue) -> JsResult<JsObjectType> {
    let prototype = match v {
        JsValue::Object(o) => return Ok(o.clone()),
        JsValue::Undefined | JsValue::Null => {
            return Err(JErrorType::TypeError(format!(
                "Cannot convert {} to object",
                v
            )))
        }
        JsValue::Boolean(_) => WellKnownIntrinsics::BooleanPrototype,
        JsValue::Number(_) => WellKnownIntrinsics::NumberPrototype,
        JsValue::String(_) => WellKnownIntrinsics::StringPrototype,
        JsValue::Symbol(_) => WellKnownIntrinsics::SymbolPrototype,
    };
    let wrapper = object_create(Some(realm.intrinsic(prototype)));
    if let JsValue::String(s) = v {
        for (i, c) in s.chars().enumerate() {
            wrapper.define_own_property(
                PropertyKey::Int(i as u32),
                crate::runner::ds::object_property::PropertyDescriptor::Data {
                    value: JsValue::from(c.to_string()),
                    writable: false,
                    enumerable: true,
                    configurable: false,
                },
            );
        }
    }
    Ok(wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("-0x10").is_nan());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(number_to_string(4.0), "4");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(123456789012.0), "123456789012");
    }

    #[test]
    fn uint32_wraps() {
        assert_eq!(number_to_uint32(-1.0), u32::MAX);
        assert_eq!(number_to_uint32(4294967297.0), 1);
        assert_eq!(number_to_uint32(f64::NAN), 0);
    }
}
