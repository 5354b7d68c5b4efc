//! Process-wide property key interning.
//!
//! Every string used as a property name is mapped to a stable `u32` handle the
//! first time it is seen. Handles are never retracted, so two independently
//! compiled scripts always agree on the identity of a key and key comparison
//! is an integer comparison.

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::runner::ds::operations::type_conversion::number_to_string;
use crate::runner::ds::symbol::SymbolData;
use crate::runner::ds::value::JsValue;

/// Largest integer that is still treated as an array index.
pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

/// Names interned at startup, in handle order. `well_known` mirrors this list.
const WELL_KNOWN_NAMES: [&str; 20] = [
    "length",
    "prototype",
    "constructor",
    "name",
    "message",
    "next",
    "value",
    "done",
    "return",
    "throw",
    "then",
    "raw",
    "toString",
    "valueOf",
    "get",
    "set",
    "callee",
    "stack",
    "default",
    "cause",
];

pub mod well_known {
    use super::KeyString;

    pub const LENGTH: KeyString = KeyString(0);
    pub const PROTOTYPE: KeyString = KeyString(1);
    pub const CONSTRUCTOR: KeyString = KeyString(2);
    pub const NAME: KeyString = KeyString(3);
    pub const MESSAGE: KeyString = KeyString(4);
    pub const NEXT: KeyString = KeyString(5);
    pub const VALUE: KeyString = KeyString(6);
    pub const DONE: KeyString = KeyString(7);
    pub const RETURN: KeyString = KeyString(8);
    pub const THROW: KeyString = KeyString(9);
    pub const THEN: KeyString = KeyString(10);
    pub const RAW: KeyString = KeyString(11);
    pub const TO_STRING: KeyString = KeyString(12);
    pub const VALUE_OF: KeyString = KeyString(13);
    pub const GET: KeyString = KeyString(14);
    pub const SET: KeyString = KeyString(15);
    pub const CALLEE: KeyString = KeyString(16);
    pub const STACK: KeyString = KeyString(17);
    pub const DEFAULT: KeyString = KeyString(18);
    pub const CAUSE: KeyString = KeyString(19);
}

struct KeyTable {
    names: Vec<Arc<str>>,
    lookup: FxHashMap<Arc<str>, u32>,
    symbols: Vec<Option<Arc<str>>>,
}

impl KeyTable {
    fn with_well_known() -> Self {
        let mut table = KeyTable {
            names: Vec::with_capacity(256),
            lookup: FxHashMap::default(),
            symbols: Vec::new(),
        };
        for name in WELL_KNOWN_NAMES.iter() {
            table.insert(name);
        }
        for description in SymbolData::WELL_KNOWN_DESCRIPTIONS.iter() {
            table.symbols.push(Some(Arc::from(*description)));
        }
        table
    }

    fn insert(&mut self, name: &str) -> u32 {
        let shared: Arc<str> = Arc::from(name);
        let handle = self.names.len() as u32;
        self.names.push(shared.clone());
        self.lookup.insert(shared, handle);
        handle
    }
}

lazy_static! {
    static ref KEY_TABLE: RwLock<KeyTable> = RwLock::new(KeyTable::with_well_known());
}

/// Interned string handle.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyString(pub(crate) u32);

impl KeyString {
    pub fn intern(name: &str) -> KeyString {
        if let Some(handle) = KEY_TABLE.read().lookup.get(name) {
            return KeyString(*handle);
        }
        let mut table = KEY_TABLE.write();
        // Another thread may have won the race between the two locks.
        if let Some(handle) = table.lookup.get(name) {
            return KeyString(*handle);
        }
        KeyString(table.insert(name))
    }

    pub fn handle(&self) -> u32 {
        self.0
    }

    pub fn as_str(&self) -> Arc<str> {
        KEY_TABLE.read().names[self.0 as usize].clone()
    }
}

impl fmt::Debug for KeyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyString({}:{})", self.0, self.as_str())
    }
}

impl fmt::Display for KeyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub(crate) fn new_symbol(description: Option<&str>) -> SymbolData {
    let mut table = KEY_TABLE.write();
    let id = table.symbols.len() as u32;
    table.symbols.push(description.map(Arc::from));
    SymbolData::from_handle(id)
}

pub(crate) fn symbol_description(symbol: SymbolData) -> Option<Arc<str>> {
    KEY_TABLE
        .read()
        .symbols
        .get(symbol.handle() as usize)
        .cloned()
        .flatten()
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum PropertyKey {
    Int(u32),
    Str(KeyString),
    Sym(SymbolData),
}

impl PropertyKey {
    /// Canonical numeric strings ("0", "17") become index keys.
    pub fn from_str(name: &str) -> PropertyKey {
        match parse_array_index(name) {
            Some(index) => PropertyKey::Int(index),
            None => PropertyKey::Str(KeyString::intern(name)),
        }
    }

    /// Negative, fractional and out-of-range numbers are stored as strings.
    pub fn from_number(n: f64) -> PropertyKey {
        if n >= 0.0 && n <= MAX_ARRAY_INDEX as f64 && n.fract() == 0.0 {
            PropertyKey::Int(n as u32)
        } else {
            PropertyKey::Str(KeyString::intern(&number_to_string(n)))
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Sym(_))
    }

    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn to_js_value(&self) -> JsValue {
        match self {
            PropertyKey::Int(i) => JsValue::from(i.to_string()),
            PropertyKey::Str(s) => JsValue::String(s.as_str()),
            PropertyKey::Sym(s) => JsValue::Symbol(*s),
        }
    }
}

impl From<KeyString> for PropertyKey {
    fn from(key: KeyString) -> Self {
        PropertyKey::Str(key)
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::from_str(name)
    }
}

impl From<SymbolData> for PropertyKey {
    fn from(symbol: SymbolData) -> Self {
        PropertyKey::Sym(symbol)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Int(i) => write!(f, "{}", i),
            PropertyKey::Str(s) => write!(f, "{}", s),
            PropertyKey::Sym(s) => write!(f, "{}", s),
        }
    }
}

fn parse_array_index(name: &str) -> Option<u32> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    if !bytes.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match name.parse::<u64>() {
        Ok(n) if n <= MAX_ARRAY_INDEX as u64 => Some(n as u32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let a = KeyString::intern("interning_is_stable_key");
        let b = KeyString::intern("interning_is_stable_key");
        assert_eq!(a, b);
        assert_eq!(&*a.as_str(), "interning_is_stable_key");
    }

    #[test]
    fn well_known_keys_are_preinterned() {
        assert_eq!(KeyString::intern("length"), well_known::LENGTH);
        assert_eq!(KeyString::intern("cause"), well_known::CAUSE);
        assert_eq!(KeyString::intern("prototype"), well_known::PROTOTYPE);
    }

    #[test]
    fn index_threshold() {
        assert_eq!(PropertyKey::from_number(0.0), PropertyKey::Int(0));
        assert_eq!(
            PropertyKey::from_number(4294967294.0),
            PropertyKey::Int(u32::MAX - 1)
        );
        assert!(matches!(
            PropertyKey::from_number(4294967295.0),
            PropertyKey::Str(_)
        ));
        assert!(matches!(PropertyKey::from_number(-1.0), PropertyKey::Str(_)));
        assert!(matches!(PropertyKey::from_number(1.5), PropertyKey::Str(_)));
        assert_eq!(PropertyKey::from_str("12"), PropertyKey::Int(12));
        assert!(matches!(PropertyKey::from_str("012"), PropertyKey::Str(_)));
    }

    #[test]
    fn concurrent_interning_agrees() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| KeyString::intern("shared_across_threads")))
            .collect();
        let keys: Vec<KeyString> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
    }
}
