use crate::runner::ds::error::JsResult;
use crate::runner::ds::operations::type_conversion::{
    string_to_number, to_number, to_primitive, PreferredType,
};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

pub fn same_value(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(x), JsValue::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                true
            } else {
                x == y && x.is_sign_negative() == y.is_sign_negative()
            }
        }
        _ => strict_equality_comparison(a, b),
    }
}

pub fn same_value_zero(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(x), JsValue::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equality_comparison(a, b),
    }
}

pub fn strict_equality_comparison(a: &JsValue, b: &JsValue) -> bool {
    a == b
}

/// `==`.
pub fn abstract_equality_comparison(realm: &Realm, a: &JsValue, b: &JsValue) -> JsResult<bool> {
    Ok(match (a, b) {
        (JsValue::Undefined, JsValue::Undefined)
        | (JsValue::Null, JsValue::Null)
        | (JsValue::Undefined, JsValue::Null)
        | (JsValue::Null, JsValue::Undefined) => true,
        (JsValue::Undefined, _) | (JsValue::Null, _) | (_, JsValue::Undefined) | (_, JsValue::Null) => {
            false
        }
        (JsValue::Number(x), JsValue::String(s)) => *x == string_to_number(s),
        (JsValue::String(s), JsValue::Number(y)) => string_to_number(s) == *y,
        (JsValue::Boolean(x), _) => {
            let n = JsValue::Number(if *x { 1.0 } else { 0.0 });
            return abstract_equality_comparison(realm, &n, b);
        }
        (_, JsValue::Boolean(y)) => {
            let n = JsValue::Number(if *y { 1.0 } else { 0.0 });
            return abstract_equality_comparison(realm, a, &n);
        }
        (JsValue::Object(_), JsValue::Object(_)) => a == b,
        (JsValue::Object(_), _) => {
            let primitive = to_primitive(realm, a, PreferredType::Default)?;
            return abstract_equality_comparison(realm, &primitive, b);
        }
        (_, JsValue::Object(_)) => {
            let primitive = to_primitive(realm, b, PreferredType::Default)?;
            return abstract_equality_comparison(realm, a, &primitive);
        }
        _ => a == b,
    })
}

/// `a < b`; `None` when either side converts to NaN.
pub fn abstract_relational_comparison(
    realm: &Realm,
    a: &JsValue,
    b: &JsValue,
    left_first: bool,
) -> JsResult<Option<bool>> {
    let (pa, pb) = if left_first {
        let pa = to_primitive(realm, a, PreferredType::Number)?;
        let pb = to_primitive(realm, b, PreferredType::Number)?;
        (pa, pb)
    } else {
        let pb = to_primitive(realm, b, PreferredType::Number)?;
        let pa = to_primitive(realm, a, PreferredType::Number)?;
        (pa, pb)
    };
    if let (JsValue::String(x), JsValue::String(y)) = (&pa, &pb) {
        let xs: Vec<u16> = x.encode_utf16().collect();
        let ys: Vec<u16> = y.encode_utf16().collect();
        return Ok(Some(xs < ys));
    }
    let nx = to_number(realm, &pa)?;
    let ny = to_number(realm, &pb)?;
    if nx.is_nan() || ny.is_nan() {
        return Ok(None);
    }
    Ok(Some(nx < ny))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_distinguishes_zeroes_and_nan() {
        assert!(same_value(&JsValue::from(f64::NAN), &JsValue::from(f64::NAN)));
        assert!(!same_value(&JsValue::from(0.0), &JsValue::from(-0.0)));
        assert!(same_value_zero(&JsValue::from(0.0), &JsValue::from(-0.0)));
        assert!(!strict_equality_comparison(
            &JsValue::from(f64::NAN),
            &JsValue::from(f64::NAN)
        ));
    }
}
