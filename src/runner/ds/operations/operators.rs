//! Operator semantics shared by every lowered operator.

use crate::runner::compiler::ir::{BinaryOp, UnaryOp};
use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::operations::object::{has_property_in, instance_of};
use crate::runner::ds::operations::test_and_comparison::{
    abstract_equality_comparison, abstract_relational_comparison, strict_equality_comparison,
};
use crate::runner::ds::operations::type_conversion::{
    to_boolean, to_int32, to_number, to_primitive, to_property_key, to_string, to_uint32,
    PreferredType,
};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

pub fn apply_unary(realm: &Realm, op: UnaryOp, v: &JsValue) -> JsResult<JsValue> {
    Ok(match op {
        UnaryOp::Minus => JsValue::Number(-to_number(realm, v)?),
        UnaryOp::Plus | UnaryOp::ToNumeric => JsValue::Number(to_number(realm, v)?),
        UnaryOp::Not => JsValue::Boolean(!to_boolean(v)),
        UnaryOp::BitNot => JsValue::Number(!to_int32(realm, v)? as f64),
        UnaryOp::TypeOf => JsValue::from(v.type_of()),
        UnaryOp::Void => JsValue::Undefined,
        UnaryOp::ToStr => JsValue::String(to_string(realm, v)?),
    })
}

/// `+`: string concatenation when either primitive is a string, numeric addition otherwise.
pub fn add(realm: &Realm, a: &JsValue, b: &JsValue) -> JsResult<JsValue> {
    if let (JsValue::Number(x), JsValue::Number(y)) = (a, b) {
        return Ok(JsValue::Number(x + y));
    }
    let pa = to_primitive(realm, a, PreferredType::Default)?;
    let pb = to_primitive(realm, b, PreferredType::Default)?;
    if matches!(pa, JsValue::String(_)) || matches!(pb, JsValue::String(_)) {
        let mut s = to_string(realm, &pa)?.to_string();
        s.push_str(&to_string(realm, &pb)?);
        return Ok(JsValue::from(s));
    }
    Ok(JsValue::Number(to_number(realm, &pa)? + to_number(realm, &pb)?))
}

fn numeric(realm: &Realm, a: &JsValue, b: &JsValue, f: fn(f64, f64) -> f64) -> JsResult<JsValue> {
    let x = to_number(realm, a)?;
    let y = to_number(realm, b)?;
    Ok(JsValue::Number(f(x, y)))
}

fn js_remainder(x: f64, y: f64) -> f64 {
    if y.is_infinite() && x.is_finite() {
        x
    } else {
        x % y
    }
}

fn js_pow(x: f64, y: f64) -> f64 {
    if y.is_nan() || ((x == 1.0 || x == -1.0) && y.is_infinite()) {
        f64::NAN
    } else {
        x.powf(y)
    }
}

pub fn apply_binary(realm: &Realm, op: BinaryOp, a: &JsValue, b: &JsValue) -> JsResult<JsValue> {
    Ok(match op {
        BinaryOp::Add => return add(realm, a, b),
        BinaryOp::Sub => return numeric(realm, a, b, |x, y| x - y),
        BinaryOp::Mul => return numeric(realm, a, b, |x, y| x * y),
        BinaryOp::Div => return numeric(realm, a, b, |x, y| x / y),
        BinaryOp::Mod => return numeric(realm, a, b, js_remainder),
        BinaryOp::Exp => return numeric(realm, a, b, js_pow),
        BinaryOp::Shl => {
            let x = to_int32(realm, a)?;
            let y = to_uint32(realm, b)? & 31;
            JsValue::Number(x.wrapping_shl(y) as f64)
        }
        BinaryOp::Shr => {
            let x = to_int32(realm, a)?;
            let y = to_uint32(realm, b)? & 31;
            JsValue::Number((x >> y) as f64)
        }
        BinaryOp::UShr => {
            let x = to_uint32(realm, a)?;
            let y = to_uint32(realm, b)? & 31;
            JsValue::Number((x >> y) as f64)
        }
        BinaryOp::BitAnd => JsValue::Number((to_int32(realm, a)? & to_int32(realm, b)?) as f64),
        BinaryOp::BitOr => JsValue::Number((to_int32(realm, a)? | to_int32(realm, b)?) as f64),
        BinaryOp::BitXor => JsValue::Number((to_int32(realm, a)? ^ to_int32(realm, b)?) as f64),
        BinaryOp::Eq => JsValue::Boolean(abstract_equality_comparison(realm, a, b)?),
        BinaryOp::NotEq => JsValue::Boolean(!abstract_equality_comparison(realm, a, b)?),
        BinaryOp::StrictEq => JsValue::Boolean(strict_equality_comparison(a, b)),
        BinaryOp::StrictNotEq => JsValue::Boolean(!strict_equality_comparison(a, b)),
        BinaryOp::Lt => {
            JsValue::Boolean(abstract_relational_comparison(realm, a, b, true)? == Some(true))
        }
        BinaryOp::Gt => {
            JsValue::Boolean(abstract_relational_comparison(realm, b, a, false)? == Some(true))
        }
        BinaryOp::LtEq => {
            JsValue::Boolean(abstract_relational_comparison(realm, b, a, false)? == Some(false))
        }
        BinaryOp::GtEq => {
            JsValue::Boolean(abstract_relational_comparison(realm, a, b, true)? == Some(false))
        }
        BinaryOp::In => {
            if !b.is_object() {
                return Err(JErrorType::TypeError(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    a,
                    b.inspect()
                )));
            }
            let key = to_property_key(realm, a)?;
            JsValue::Boolean(has_property_in(b, key)?)
        }
        BinaryOp::InstanceOf => JsValue::Boolean(instance_of(realm, a, b)?),
    })
}
