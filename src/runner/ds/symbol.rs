use std::fmt;
use std::fmt::{Display, Formatter};

use crate::runner::ds::property_key::{new_symbol, symbol_description};

/// Handle to a unique symbol registered in the process-wide key table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct SymbolData(u32);

impl SymbolData {
    pub(crate) const WELL_KNOWN_DESCRIPTIONS: [&'static str; 5] = [
        "Symbol.iterator",
        "Symbol.asyncIterator",
        "Symbol.hasInstance",
        "Symbol.toPrimitive",
        "Symbol.toStringTag",
    ];

    pub fn new(description: String) -> Self {
        new_symbol(Some(&description))
    }

    pub fn new_empty() -> Self {
        new_symbol(None)
    }

    pub(crate) fn from_handle(handle: u32) -> Self {
        SymbolData(handle)
    }

    pub fn handle(&self) -> u32 {
        self.0
    }

    pub fn description(&self) -> Option<String> {
        symbol_description(*self).map(|d| d.to_string())
    }
}

impl Display for SymbolData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or_default())
    }
}

/* Well known symbols */
pub const SYMBOL_ITERATOR: SymbolData = SymbolData(0);
pub const SYMBOL_ASYNC_ITERATOR: SymbolData = SymbolData(1);
pub const SYMBOL_HAS_INSTANCE: SymbolData = SymbolData(2);
pub const SYMBOL_TO_PRIMITIVE: SymbolData = SymbolData(3);
pub const SYMBOL_TO_STRING_TAG: SymbolData = SymbolData(4);
