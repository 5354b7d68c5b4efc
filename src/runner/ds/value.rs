use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::runner::ds::object::{ClassTag, JsObjectType};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::type_conversion::{
    number_to_string, TYPE_STR_BOOLEAN, TYPE_STR_FUNCTION, TYPE_STR_NULL, TYPE_STR_NUMBER,
    TYPE_STR_OBJECT, TYPE_STR_STRING, TYPE_STR_SYMBOL, TYPE_STR_UNDEFINED,
};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::symbol::SymbolData;

pub type JsString = Arc<str>;

/// A language value. Cloning is cheap: strings and objects are shared.
#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(SymbolData),
    Object(JsObjectType),
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn as_object(&self) -> Option<&JsObjectType> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(o) => o.is_callable(),
            _ => false,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => TYPE_STR_UNDEFINED,
            JsValue::Null => TYPE_STR_OBJECT,
            JsValue::Boolean(_) => TYPE_STR_BOOLEAN,
            JsValue::Number(_) => TYPE_STR_NUMBER,
            JsValue::String(_) => TYPE_STR_STRING,
            JsValue::Symbol(_) => TYPE_STR_SYMBOL,
            JsValue::Object(o) => {
                if o.is_callable() {
                    TYPE_STR_FUNCTION
                } else {
                    TYPE_STR_OBJECT
                }
            }
        }
    }

    /// Rendering used by diagnostics: never runs script code.
    pub fn inspect(&self) -> String {
        inspect_value(self, 0)
    }
}

fn inspect_value(value: &JsValue, depth: usize) -> String {
    match value {
        JsValue::String(s) if depth > 0 => format!("{:?}", s),
        JsValue::Object(o) => inspect_object(o, depth),
        other => other.to_string(),
    }
}

fn read_data_string(o: &JsObjectType, key: PropertyKey) -> Option<String> {
    match o.lookup_property(key) {
        Some(PropertyDescriptor::Data { value, .. }) => Some(match value {
            JsValue::String(s) => s.to_string(),
            other => other.to_string(),
        }),
        _ => None,
    }
}

fn inspect_object(o: &JsObjectType, depth: usize) -> String {
    let class = o.class_tag();
    match class {
        ClassTag::Function => {
            let name = read_data_string(o, PropertyKey::Str(well_known::NAME)).unwrap_or_default();
            if name.is_empty() {
                "[Function (anonymous)]".to_string()
            } else {
                format!("[Function: {}]", name)
            }
        }
        ClassTag::Error => {
            let name = read_data_string(o, PropertyKey::Str(well_known::NAME))
                .unwrap_or_else(|| "Error".to_string());
            let message =
                read_data_string(o, PropertyKey::Str(well_known::MESSAGE)).unwrap_or_default();
            if message.is_empty() {
                name
            } else {
                format!("{}: {}", name, message)
            }
        }
        ClassTag::Array if depth < 2 => {
            let length = o.array_length().unwrap_or(0);
            let items: Vec<String> = (0..length.min(100))
                .map(|i| match o.get_own_property(PropertyKey::Int(i)) {
                    Some(PropertyDescriptor::Data { value, .. }) => inspect_value(&value, depth + 1),
                    Some(_) => "[Getter/Setter]".to_string(),
                    None => "<empty>".to_string(),
                })
                .collect();
            format!("[{}]", items.join(", "))
        }
        ClassTag::Array => "[Array]".to_string(),
        _ if depth < 2 => {
            let mut parts = vec![];
            for key in o.own_keys() {
                if let Some(PropertyDescriptor::Data {
                    value, enumerable, ..
                }) = o.get_own_property(key)
                {
                    if enumerable {
                        parts.push(format!("{}: {}", key, inspect_value(&value, depth + 1)));
                    }
                }
            }
            if parts.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {} }}", parts.join(", "))
            }
        }
        _ => "[Object]".to_string(),
    }
}

impl Display for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "{}", TYPE_STR_UNDEFINED),
            JsValue::Null => write!(f, "{}", TYPE_STR_NULL),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            JsValue::String(s) => write!(f, "{}", s),
            JsValue::Symbol(s) => write!(f, "{}", s),
            JsValue::Object(o) => write!(f, "{}", inspect_object(o, 0)),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "JsValue::Undefined"),
            JsValue::Null => write!(f, "JsValue::Null"),
            JsValue::Boolean(b) => write!(f, "JsValue::Boolean({})", b),
            JsValue::String(s) => write!(f, "JsValue::String({:?})", s),
            JsValue::Symbol(s) => write!(f, "JsValue::Symbol({})", s),
            JsValue::Number(n) => write!(f, "JsValue::Number({:?})", n),
            JsValue::Object(o) => write!(f, "JsValue::Object({})", inspect_object(o, 1)),
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
            (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<u32> for JsValue {
    fn from(n: u32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(Arc::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(Arc::from(s))
    }
}

impl From<JsObjectType> for JsValue {
    fn from(o: JsObjectType) -> Self {
        JsValue::Object(o)
    }
}
