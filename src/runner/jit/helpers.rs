//! Runtime entry points called from generated code.
//!
//! Every helper has the same native signature,
//! `extern "C" fn(*mut Activation, u32, u32, u32, u32) -> u32`; the four
//! immediates are slot, cell, constant or key indices chosen by the code
//! generator. Fallible helpers return `0` on success and `1` with the
//! activation's exception set; predicate helpers return `0` or `1`.
//! Helpers never unwind into generated code: a panic becomes an exception.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::runner::compiler::ir::{BinaryOp, UnaryOp};
use crate::runner::ds::enumerator::{
    for_in_keys, get_iterator, iterator_close, iterator_rest, iterator_step,
};
use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::function_object::make_script_function;
use crate::runner::ds::object::{JsObjectType, ObjectClass};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::{
    call, construct, copy_data_properties, create_data_property, delete_value, get,
    get_value, get_with_receiver, put_value, set,
};
use crate::runner::ds::operations::operators::{apply_binary, apply_unary};
use crate::runner::ds::operations::test_and_comparison::strict_equality_comparison;
use crate::runner::ds::operations::type_conversion::{to_boolean, to_property_key};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::symbol::SYMBOL_ITERATOR;
use crate::runner::ds::value::JsValue;
use crate::runner::jit::activation::{new_cell, Activation, ResumeMode, VarCell};

/// Marks an absent optional operand.
pub(crate) const NONE: u32 = u32::MAX;

const OK: u32 = 0;
const FAILED: u32 = 1;

pub(crate) type HelperFn = extern "C" fn(*mut Activation, u32, u32, u32, u32) -> u32;

fn guarded<F>(act: *mut Activation, body: F) -> u32
where
    F: FnOnce(&mut Activation) -> JsResult<()>,
{
    let act = unsafe { &mut *act };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *act)));
    match outcome {
        Ok(Ok(())) => OK,
        Ok(Err(e)) => {
            act.exception = Some(e);
            FAILED
        }
        Err(_) => {
            act.exception = Some(JErrorType::Error("internal error in runtime helper".to_string()));
            FAILED
        }
    }
}

macro_rules! helper {
    ($name:ident($act:ident, $a:pat, $b:pat, $c:pat, $d:pat) $body:block) => {
        pub(crate) extern "C" fn $name(act: *mut Activation, a: u32, b: u32, c: u32, d: u32) -> u32 {
            guarded(act, move |$act: &mut Activation| -> JsResult<()> {
                let ($a, $b, $c, $d) = (a, b, c, d);
                $body
            })
        }
    };
}

fn slot(act: &Activation, index: u32) -> JsValue {
    act.slots[index as usize].clone()
}

fn put(act: &mut Activation, index: u32, value: JsValue) {
    act.slots[index as usize] = value;
}

fn key(act: &Activation, index: u32) -> PropertyKey {
    act.template.keys[index as usize]
}

fn args_at(act: &Activation, base: u32, argc: u32) -> Vec<JsValue> {
    let start = base as usize + 2;
    act.slots[start..start + argc as usize].to_vec()
}

fn object_at(act: &Activation, index: u32) -> JsResult<JsObjectType> {
    match &act.slots[index as usize] {
        JsValue::Object(o) => Ok(o.clone()),
        other => Err(JErrorType::TypeError(format!("{} is not an object", other.inspect()))),
    }
}

/// Elements of a spread-argument array built by generated code.
fn array_values(realm: &Realm, value: &JsValue) -> JsResult<Vec<JsValue>> {
    let array = match value {
        JsValue::Object(o) => o,
        _ => return Ok(Vec::new()),
    };
    let length = array.array_length().unwrap_or(0);
    (0..length)
        .map(|i| get(realm, array, PropertyKey::Int(i)))
        .collect()
}

helper!(op_load_const(act, dst, index, _, _) {
    let value = act.template.constants[index as usize].clone();
    put(act, dst, value);
    Ok(())
});

helper!(op_load_undefined(act, dst, _, _, _) {
    put(act, dst, JsValue::Undefined);
    Ok(())
});

helper!(op_move(act, dst, src, _, _) {
    let value = slot(act, src);
    put(act, dst, value);
    Ok(())
});

helper!(op_load_cell(act, dst, cell, _, _) {
    let value = act.cells[cell as usize].read().clone();
    put(act, dst, value);
    Ok(())
});

helper!(op_store_cell(act, cell, src, _, _) {
    let value = slot(act, src);
    *act.cells[cell as usize].write() = value;
    Ok(())
});

helper!(op_new_cell(act, cell, _, _, _) {
    act.cells[cell as usize] = new_cell(JsValue::Undefined);
    Ok(())
});

helper!(op_renew_cell(act, cell, _, _, _) {
    let current = act.cells[cell as usize].read().clone();
    act.cells[cell as usize] = new_cell(current);
    Ok(())
});

helper!(op_get_global(act, dst, index, _, _) {
    let global = act.realm.global_object();
    let key = key(act, index);
    if !global.has_property(key) {
        return Err(JErrorType::ReferenceError(format!("{} is not defined", key)));
    }
    let value = get(&act.realm, &global, key)?;
    put(act, dst, value);
    Ok(())
});

helper!(op_typeof_global(act, dst, index, _, _) {
    let global = act.realm.global_object();
    let key = key(act, index);
    let type_name = if global.has_property(key) {
        get(&act.realm, &global, key)?.type_of()
    } else {
        "undefined"
    };
    put(act, dst, JsValue::from(type_name));
    Ok(())
});

helper!(op_set_global(act, index, src, _, _) {
    let global = act.realm.global_object();
    let value = slot(act, src);
    set(&act.realm, &global, key(act, index), value)?;
    Ok(())
});

/// Mode 0 hoists a `var` (defines `undefined` if absent); mode 1 binds a function declaration.
helper!(op_declare_global(act, index, src, mode, _) {
    let global = act.realm.global_object();
    let key = key(act, index);
    if mode == 0 {
        if !global.has_own_property(key) {
            global.define_own_property(key, PropertyDescriptor::new_data(JsValue::Undefined));
        }
        return Ok(());
    }
    let value = slot(act, src);
    if !global.define_own_property(key, PropertyDescriptor::new_data(value.clone())) {
        set(&act.realm, &global, key, value)?;
    }
    Ok(())
});

helper!(op_get_named(act, dst, object, index, _) {
    let target = slot(act, object);
    let value = get_value(&act.realm, &target, key(act, index))?;
    put(act, dst, value);
    Ok(())
});

helper!(op_get_member(act, dst, object, key_slot, _) {
    let target = slot(act, object);
    let key = to_property_key(&act.realm, &slot(act, key_slot))?;
    let value = get_value(&act.realm, &target, key)?;
    put(act, dst, value);
    Ok(())
});

helper!(op_set_named(act, object, index, src, _) {
    let target = slot(act, object);
    put_value(&act.realm, &target, key(act, index), slot(act, src))
});

helper!(op_set_member(act, object, key_slot, src, _) {
    let target = slot(act, object);
    let key = to_property_key(&act.realm, &slot(act, key_slot))?;
    put_value(&act.realm, &target, key, slot(act, src))
});

helper!(op_delete_member(act, dst, object, key_slot, _) {
    let target = slot(act, object);
    let key = to_property_key(&act.realm, &slot(act, key_slot))?;
    let deleted = delete_value(&target, key)?;
    put(act, dst, JsValue::Boolean(deleted));
    Ok(())
});

/// `super[key]` read from `home` with `this` as receiver.
helper!(op_get_super(act, dst, home, key_slot, this) {
    let key = to_property_key(&act.realm, &slot(act, key_slot))?;
    let value = match slot(act, home) {
        JsValue::Object(home) => get_with_receiver(&act.realm, &home, key, &slot(act, this))?,
        _ => JsValue::Undefined,
    };
    put(act, dst, value);
    Ok(())
});

helper!(op_call(act, base, argc, dst, _) {
    let realm = act.realm.clone();
    let callee = slot(act, base);
    let this = slot(act, base + 1);
    let args = args_at(act, base, argc);
    let result = call(&realm, &callee, this, &args)?;
    put(act, dst, result);
    Ok(())
});

helper!(op_call_spread(act, base, dst, _, _) {
    let realm = act.realm.clone();
    let callee = slot(act, base);
    let this = slot(act, base + 1);
    let args = array_values(&realm, &slot(act, base + 2))?;
    let result = call(&realm, &callee, this, &args)?;
    put(act, dst, result);
    Ok(())
});

helper!(op_new(act, base, argc, dst, _) {
    let realm = act.realm.clone();
    let callee = slot(act, base);
    let args = args_at(act, base, argc);
    let result = construct(&realm, &callee, &args, None)?;
    put(act, dst, result);
    Ok(())
});

helper!(op_new_spread(act, base, dst, _, _) {
    let realm = act.realm.clone();
    let callee = slot(act, base);
    let args = array_values(&realm, &slot(act, base + 2))?;
    let result = construct(&realm, &callee, &args, None)?;
    put(act, dst, result);
    Ok(())
});

fn super_construct(act: &mut Activation, base: u32, args: Vec<JsValue>, dst: u32) -> JsResult<()> {
    let realm = act.realm.clone();
    let constructor = slot(act, base);
    let new_target = slot(act, base + 1);
    if !constructor
        .as_object()
        .and_then(|o| o.function())
        .map(|f| f.is_constructor())
        .unwrap_or(false)
    {
        return Err(JErrorType::TypeError(format!(
            "Super constructor {} of anonymous class is not a constructor",
            constructor.inspect()
        )));
    }
    let result = construct(&realm, &constructor, &args, Some(&new_target))?;
    put(act, dst, result);
    Ok(())
}

helper!(op_super_call(act, base, argc, dst, _) {
    let args = args_at(act, base, argc);
    super_construct(act, base, args, dst)
});

helper!(op_super_call_spread(act, base, dst, _, _) {
    let args = array_values(&act.realm, &slot(act, base + 2))?;
    super_construct(act, base, args, dst)
});

helper!(op_unary(act, dst, src, op, _) {
    let value = apply_unary(&act.realm, UnaryOp::ALL[op as usize], &slot(act, src))?;
    put(act, dst, value);
    Ok(())
});

helper!(op_binary(act, dst, left, right, op) {
    let value = apply_binary(
        &act.realm,
        BinaryOp::ALL[op as usize],
        &slot(act, left),
        &slot(act, right),
    )?;
    put(act, dst, value);
    Ok(())
});

pub(crate) extern "C" fn op_truthy(act: *mut Activation, src: u32, _: u32, _: u32, _: u32) -> u32 {
    let act = unsafe { &*act };
    to_boolean(&act.slots[src as usize]) as u32
}

pub(crate) extern "C" fn op_is_nullish(act: *mut Activation, src: u32, _: u32, _: u32, _: u32) -> u32 {
    let act = unsafe { &*act };
    act.slots[src as usize].is_nullish() as u32
}

pub(crate) extern "C" fn op_strict_equals(act: *mut Activation, a: u32, b: u32, _: u32, _: u32) -> u32 {
    let act = unsafe { &*act };
    strict_equality_comparison(&act.slots[a as usize], &act.slots[b as usize]) as u32
}

helper!(op_throw_value(act, src, _, _, _) {
    Err(JErrorType::Thrown(slot(act, src)))
});

helper!(op_throw_error(act, kind, message, _, _) {
    let message = act.template.constants[message as usize].to_string();
    Err(match kind {
        0 => JErrorType::TypeError(message),
        1 => JErrorType::ReferenceError(message),
        _ => JErrorType::SyntaxError(message),
    })
});

/// Moves the pending exception into `dst` as a language-level value.
helper!(op_catch(act, dst, _, _, _) {
    let error = act.take_exception();
    let value = act.realm.throw_to_value(error);
    put(act, dst, value);
    Ok(())
});

helper!(op_return(act, src, _, _, _) {
    act.ret = slot(act, src);
    Ok(())
});

helper!(op_make_closure(act, dst, child, _, _) {
    let template = act.template.children[child as usize].clone();
    let env: Arc<[VarCell]> = template
        .captures
        .iter()
        .map(|&cell| act.cells[cell as usize].clone())
        .collect();
    let function = make_script_function(&act.realm, template, env);
    put(act, dst, JsValue::Object(function));
    Ok(())
});

helper!(op_new_object(act, dst, _, _, _) {
    let object = act.realm.new_object();
    put(act, dst, JsValue::Object(object));
    Ok(())
});

helper!(op_new_array(act, dst, _, _, _) {
    let array = act.realm.new_array(Vec::new());
    put(act, dst, JsValue::Object(array));
    Ok(())
});

helper!(op_array_push(act, array, src, _, _) {
    object_at(act, array)?.push_element(slot(act, src));
    Ok(())
});

helper!(op_array_hole(act, array, _, _, _) {
    object_at(act, array)?.push_hole();
    Ok(())
});

helper!(op_array_spread(act, array, src, _, _) {
    let target = object_at(act, array)?;
    let realm = act.realm.clone();
    let iterator = JsValue::Object(get_iterator(&realm, &slot(act, src))?);
    while let Some(value) = iterator_step(&realm, &iterator)? {
        target.push_element(value);
    }
    Ok(())
});

helper!(op_define_data(act, object, key_slot, src, _) {
    let target = object_at(act, object)?;
    let key = to_property_key(&act.realm, &slot(act, key_slot))?;
    create_data_property(&target, key, slot(act, src));
    Ok(())
});

/// `kind`: 0 method, 1 getter, 2 setter; bit 2 makes the property enumerable.
helper!(op_define_method(act, object, key_slot, function, kind) {
    let target = object_at(act, object)?;
    let key = to_property_key(&act.realm, &slot(act, key_slot))?;
    let method = object_at(act, function)?;
    let enumerable = kind & 4 != 0;
    let prefix = match kind & 3 {
        1 => "get ",
        2 => "set ",
        _ => "",
    };
    name_anonymous_function(&method, key, prefix);
    let existing = target.get_own_property(key);
    let desc = match kind & 3 {
        0 => PropertyDescriptor::Data {
            value: JsValue::Object(method),
            writable: true,
            enumerable,
            configurable: true,
        },
        1 => PropertyDescriptor::Accessor {
            get: Some(method),
            set: match existing {
                Some(PropertyDescriptor::Accessor { set, .. }) => set,
                _ => None,
            },
            enumerable,
            configurable: true,
        },
        _ => PropertyDescriptor::Accessor {
            get: match existing {
                Some(PropertyDescriptor::Accessor { get, .. }) => get,
                _ => None,
            },
            set: Some(method),
            enumerable,
            configurable: true,
        },
    };
    target.define_own_property(key, desc);
    Ok(())
});

fn name_anonymous_function(function: &JsObjectType, key: PropertyKey, prefix: &str) {
    let unnamed = match function.get_own_property(PropertyKey::Str(well_known::NAME)) {
        Some(PropertyDescriptor::Data { value, .. }) => value.as_str().map(|s| s.is_empty()).unwrap_or(true),
        _ => true,
    };
    if !unnamed {
        return;
    }
    let base = match key {
        PropertyKey::Sym(symbol) => format!("[{}]", symbol.description().unwrap_or_default()),
        other => other.to_string(),
    };
    function.define_own_property(
        PropertyKey::Str(well_known::NAME),
        PropertyDescriptor::Data {
            value: JsValue::from(format!("{}{}", prefix, base)),
            writable: false,
            enumerable: false,
            configurable: true,
        },
    );
}

helper!(op_copy_data_properties(act, target, source, excluded, _) {
    let target = object_at(act, target)?;
    let realm = act.realm.clone();
    let mut keys = Vec::new();
    if excluded != NONE {
        for value in array_values(&realm, &slot(act, excluded))? {
            keys.push(to_property_key(&realm, &value)?);
        }
    }
    copy_data_properties(&realm, &target, &slot(act, source), &keys)
});

/// The frozen strings array of a tagged template, one per call site and realm.
helper!(op_template_object(act, dst, site, _, _) {
    let realm = act.realm.clone();
    let site = &act.template.template_sites[site as usize];
    let cached = site
        .cache
        .lock()
        .as_ref()
        .filter(|(id, _)| *id == realm.id())
        .map(|(_, o)| o.clone());
    let strings = match cached {
        Some(strings) => strings,
        None => {
            let cooked = realm.new_array(
                site.cooked
                    .iter()
                    .map(|s| s.as_ref().map(|s| JsValue::String(s.clone())).unwrap_or(JsValue::Undefined))
                    .collect(),
            );
            let raw = realm.new_array(site.raw.iter().map(|s| JsValue::String(s.clone())).collect());
            freeze_elements(&raw);
            cooked.define_own_property(
                PropertyKey::Str(well_known::RAW),
                PropertyDescriptor::new_frozen(JsValue::Object(raw)),
            );
            freeze_elements(&cooked);
            *site.cache.lock() = Some((realm.id(), cooked.clone()));
            cooked
        }
    };
    put(act, dst, JsValue::Object(strings));
    Ok(())
});

fn freeze_elements(array: &JsObjectType) {
    for key in array.own_keys() {
        if let Some(PropertyDescriptor::Data { value, .. }) = array.get_own_property(key) {
            if key.as_index().is_some() {
                array.define_own_property(key, PropertyDescriptor::Data {
                    value,
                    writable: false,
                    enumerable: true,
                    configurable: false,
                });
            }
        }
    }
    array.prevent_extensions();
}

helper!(op_get_iterator(act, dst, src, _, _) {
    let iterator = get_iterator(&act.realm, &slot(act, src))?;
    put(act, dst, JsValue::Object(iterator));
    Ok(())
});

helper!(op_iterator_step(act, dst, iterator, value_dst, _) {
    let next = iterator_step(&act.realm, &slot(act, iterator))?;
    let has_value = next.is_some();
    put(act, value_dst, next.unwrap_or(JsValue::Undefined));
    put(act, dst, JsValue::Boolean(has_value));
    Ok(())
});

helper!(op_iterator_value(act, dst, iterator, _, _) {
    let next = iterator_step(&act.realm, &slot(act, iterator))?;
    put(act, dst, next.unwrap_or(JsValue::Undefined));
    Ok(())
});

helper!(op_iterator_rest(act, dst, iterator, _, _) {
    let rest = iterator_rest(&act.realm, &slot(act, iterator))?;
    put(act, dst, JsValue::Object(rest));
    Ok(())
});

helper!(op_iterator_close(act, iterator, _, _, _) {
    iterator_close(&act.realm, &slot(act, iterator))
});

helper!(op_for_in_keys(act, dst, src, _, _) {
    let keys = for_in_keys(&act.realm, &slot(act, src))?;
    put(act, dst, JsValue::Object(keys));
    Ok(())
});

helper!(op_argument(act, dst, index, _, _) {
    let value = act.args.get(index as usize).cloned().unwrap_or(JsValue::Undefined);
    put(act, dst, value);
    Ok(())
});

helper!(op_rest_args(act, dst, from, _, _) {
    let rest = act.args.iter().skip(from as usize).cloned().collect();
    let array = act.realm.new_array(rest);
    put(act, dst, JsValue::Object(array));
    Ok(())
});

helper!(op_arguments(act, dst, _, _, _) {
    let realm = act.realm.clone();
    let arguments = JsObjectType::new(
        Some(realm.intrinsic(WellKnownIntrinsics::ObjectPrototype)),
        ObjectClass::Arguments,
    );
    for (i, value) in act.args.iter().enumerate() {
        create_data_property(&arguments, PropertyKey::Int(i as u32), value.clone());
    }
    arguments.define_own_property(
        PropertyKey::Str(well_known::LENGTH),
        PropertyDescriptor::new_hidden(JsValue::from(act.args.len() as u32)),
    );
    let array_prototype = realm.intrinsic(WellKnownIntrinsics::ArrayPrototype);
    if let Some(PropertyDescriptor::Data { value, .. }) =
        array_prototype.get_own_property(PropertyKey::Sym(SYMBOL_ITERATOR))
    {
        arguments.define_own_property(
            PropertyKey::Sym(SYMBOL_ITERATOR),
            PropertyDescriptor::new_hidden(value),
        );
    }
    put(act, dst, JsValue::Object(arguments));
    Ok(())
});

helper!(op_this(act, dst, _, _, _) {
    let this = act.this.clone();
    put(act, dst, this);
    Ok(())
});

helper!(op_new_target(act, dst, _, _, _) {
    let new_target = act.new_target.clone();
    put(act, dst, new_target);
    Ok(())
});

/// Whether `src` holds the running function itself.
pub(crate) extern "C" fn op_is_self(act: *mut Activation, src: u32, _: u32, _: u32, _: u32) -> u32 {
    let act = unsafe { &*act };
    match (&act.callee, &act.slots[src as usize]) {
        (Some(callee), JsValue::Object(target)) => callee.ptr_eq(target) as u32,
        _ => 0,
    }
}

helper!(op_reset_frame(act, base, argc, _, _) {
    let args = args_at(act, base, argc);
    act.reset_frame(args);
    Ok(())
});

/// Links a class constructor to its parent (`NONE` when there is no `extends`).
helper!(op_create_class(act, dst, constructor, parent, _) {
    let realm = act.realm.clone();
    let constructor_object = object_at(act, constructor)?;
    let prototype = match get(&realm, &constructor_object, PropertyKey::Str(well_known::PROTOTYPE))? {
        JsValue::Object(p) => p,
        _ => return Err(JErrorType::TypeError("class constructor has no prototype".to_string())),
    };
    if parent != NONE {
        match slot(act, parent) {
            JsValue::Null => {
                prototype.set_prototype_of(None);
            }
            JsValue::Object(parent) if parent.function().map(|f| f.is_constructor()).unwrap_or(false) => {
                let parent_prototype = match get(&realm, &parent, PropertyKey::Str(well_known::PROTOTYPE))? {
                    JsValue::Object(p) => Some(p),
                    JsValue::Null => None,
                    other => {
                        return Err(JErrorType::TypeError(format!(
                            "Class extends value does not have valid prototype property {}",
                            other.inspect()
                        )))
                    }
                };
                constructor_object.set_prototype_of(Some(parent));
                prototype.set_prototype_of(parent_prototype);
            }
            other => {
                return Err(JErrorType::TypeError(format!(
                    "Class extends value {} is not a constructor or null",
                    other.inspect()
                )))
            }
        }
    }
    put(act, dst, JsValue::Object(constructor_object));
    Ok(())
});

helper!(op_derived_result(act, dst, value, this, _) {
    let result = match slot(act, value) {
        JsValue::Object(o) => JsValue::Object(o),
        JsValue::Undefined => match slot(act, this) {
            JsValue::Object(o) => JsValue::Object(o),
            _ => {
                return Err(JErrorType::ReferenceError(
                    "Must call super constructor in derived class before accessing 'this' or returning from derived constructor".to_string(),
                ))
            }
        },
        _ => {
            return Err(JErrorType::TypeError(
                "Derived constructors may only return object or undefined".to_string(),
            ))
        }
    };
    put(act, dst, result);
    Ok(())
});

/// Saves the suspension point and hands `status` back to generated code.
pub(crate) extern "C" fn op_suspend(act: *mut Activation, src: u32, point: u32, status: u32, _: u32) -> u32 {
    let act = unsafe { &mut *act };
    act.ret = act.slots[src as usize].clone();
    act.resume_point = point;
    status
}

/// `0` resumes with a value in `dst`, `1` throws it, `2` returns it.
pub(crate) extern "C" fn op_resume(act: *mut Activation, dst: u32, _: u32, _: u32, _: u32) -> u32 {
    let act = unsafe { &mut *act };
    let mode = mem::replace(&mut act.resume_mode, ResumeMode::Next);
    let value = mem::replace(&mut act.resume_value, JsValue::Undefined);
    match mode {
        ResumeMode::Next => {
            act.slots[dst as usize] = value;
            0
        }
        ResumeMode::Throw => {
            act.exception = Some(JErrorType::Thrown(value));
            1
        }
        ResumeMode::Return => {
            act.slots[dst as usize] = value;
            2
        }
    }
}

pub(crate) extern "C" fn op_resume_point(act: *mut Activation, _: u32, _: u32, _: u32, _: u32) -> u32 {
    let act = unsafe { &*act };
    act.resume_point
}

pub(crate) extern "C" fn op_set_int(act: *mut Activation, dst: u32, value: u32, _: u32, _: u32) -> u32 {
    let act = unsafe { &mut *act };
    act.slots[dst as usize] = JsValue::from(value);
    OK
}

pub(crate) extern "C" fn op_to_index(act: *mut Activation, src: u32, _: u32, _: u32, _: u32) -> u32 {
    let act = unsafe { &*act };
    act.slots[src as usize].as_number().map(|n| n as u32).unwrap_or(0)
}

macro_rules! helpers {
    ($($variant:ident => $func:ident,)*) => {
        /// Every runtime entry point generated code may call.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub(crate) enum Helper {
            $($variant,)*
        }

        impl Helper {
            pub(crate) const ALL: &'static [Helper] = &[$(Helper::$variant,)*];

            pub(crate) fn name(self) -> &'static str {
                match self {
                    $(Helper::$variant => concat!("kite_", stringify!($func)),)*
                }
            }

            pub(crate) fn address(self) -> *const u8 {
                let f: HelperFn = match self {
                    $(Helper::$variant => $func,)*
                };
                f as *const u8
            }
        }
    };
}

helpers! {
    LoadConst => op_load_const,
    LoadUndefined => op_load_undefined,
    Move => op_move,
    LoadCell => op_load_cell,
    StoreCell => op_store_cell,
    NewCell => op_new_cell,
    RenewCell => op_renew_cell,
    GetGlobal => op_get_global,
    TypeOfGlobal => op_typeof_global,
    SetGlobal => op_set_global,
    DeclareGlobal => op_declare_global,
    GetNamed => op_get_named,
    GetMember => op_get_member,
    SetNamed => op_set_named,
    SetMember => op_set_member,
    DeleteMember => op_delete_member,
    GetSuper => op_get_super,
    Call => op_call,
    CallSpread => op_call_spread,
    New => op_new,
    NewSpread => op_new_spread,
    SuperCall => op_super_call,
    SuperCallSpread => op_super_call_spread,
    Unary => op_unary,
    Binary => op_binary,
    Truthy => op_truthy,
    IsNullish => op_is_nullish,
    StrictEquals => op_strict_equals,
    ThrowValue => op_throw_value,
    ThrowError => op_throw_error,
    Catch => op_catch,
    Return => op_return,
    MakeClosure => op_make_closure,
    NewObject => op_new_object,
    NewArray => op_new_array,
    ArrayPush => op_array_push,
    ArrayHole => op_array_hole,
    ArraySpread => op_array_spread,
    DefineData => op_define_data,
    DefineMethod => op_define_method,
    CopyDataProperties => op_copy_data_properties,
    TemplateObject => op_template_object,
    GetIterator => op_get_iterator,
    IteratorStep => op_iterator_step,
    IteratorValue => op_iterator_value,
    IteratorRest => op_iterator_rest,
    IteratorClose => op_iterator_close,
    ForInKeys => op_for_in_keys,
    Argument => op_argument,
    RestArgs => op_rest_args,
    Arguments => op_arguments,
    This => op_this,
    NewTarget => op_new_target,
    IsSelf => op_is_self,
    ResetFrame => op_reset_frame,
    CreateClass => op_create_class,
    DerivedResult => op_derived_result,
    Suspend => op_suspend,
    Resume => op_resume,
    ResumePoint => op_resume_point,
    SetInt => op_set_int,
    ToIndex => op_to_index,
}
