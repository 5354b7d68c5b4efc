//! Abstract operations shared by generated code and built-ins.

pub mod object;
pub mod operators;
pub mod test_and_comparison;
pub mod type_conversion;
