use std::sync::Arc;

use crate::runner::compiler::ir::FunctionKind;
use crate::runner::ds::object::{object_create, JsObjectType, ObjectClass};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;
use crate::runner::jit::activation::VarCell;
use crate::runner::jit::FunctionTemplate;
use crate::runner::plugin::types::BuiltInFn;

pub enum FunctionObject {
    Script(ScriptFunction),
    Native(NativeFunction),
    Bound(BoundFunction),
}

/// A closure over compiled code: the shared template plus the captured cells.
pub struct ScriptFunction {
    pub template: Arc<FunctionTemplate>,
    pub env: Arc<[VarCell]>,
}

pub struct NativeFunction {
    pub name: String,
    pub body: BuiltInFn,
    pub constructor: bool,
}

pub struct BoundFunction {
    pub target: JsObjectType,
    pub this: JsValue,
    pub args: Vec<JsValue>,
}

impl FunctionObject {
    pub fn kind(&self) -> FunctionKind {
        match self {
            FunctionObject::Script(s) => s.template.kind,
            _ => FunctionKind::Normal,
        }
    }

    pub fn is_constructor(&self) -> bool {
        match self {
            FunctionObject::Script(s) => s.template.kind.is_constructor(),
            FunctionObject::Native(n) => n.constructor,
            FunctionObject::Bound(b) => b
                .target
                .function()
                .map(|f| f.is_constructor())
                .unwrap_or(false),
        }
    }
}

fn define_name_and_length(function: &JsObjectType, name: &str, arity: u32) {
    function.define_own_property(
        PropertyKey::Str(well_known::LENGTH),
        PropertyDescriptor::Data {
            value: JsValue::from(arity),
            writable: false,
            enumerable: false,
            configurable: true,
        },
    );
    function.define_own_property(
        PropertyKey::Str(well_known::NAME),
        PropertyDescriptor::Data {
            value: JsValue::from(name),
            writable: false,
            enumerable: false,
            configurable: true,
        },
    );
}

/// Instantiates a closure. Constructors and generators get their own `prototype` object.
pub fn make_script_function(
    realm: &Realm,
    template: Arc<FunctionTemplate>,
    env: Arc<[VarCell]>,
) -> JsObjectType {
    let kind = template.kind;
    let name = template.name.clone();
    let arity = template.arity;
    let function = JsObjectType::new(
        Some(realm.intrinsic(WellKnownIntrinsics::FunctionPrototype)),
        ObjectClass::Function(Arc::new(FunctionObject::Script(ScriptFunction {
            template,
            env,
        }))),
    );
    define_name_and_length(&function, &name, arity);
    if kind.is_generator() {
        let prototype = object_create(Some(
            realm.intrinsic(WellKnownIntrinsics::GeneratorPrototype),
        ));
        function.define_own_property(
            PropertyKey::Str(well_known::PROTOTYPE),
            PropertyDescriptor::Data {
                value: JsValue::Object(prototype),
                writable: true,
                enumerable: false,
                configurable: false,
            },
        );
    } else if kind.is_constructor() {
        let prototype = realm.new_object();
        prototype.define_own_property(
            PropertyKey::Str(well_known::CONSTRUCTOR),
            PropertyDescriptor::new_hidden(JsValue::Object(function.clone())),
        );
        function.define_own_property(
            PropertyKey::Str(well_known::PROTOTYPE),
            PropertyDescriptor::Data {
                value: JsValue::Object(prototype),
                writable: !kind.is_class_constructor(),
                enumerable: false,
                configurable: false,
            },
        );
    }
    function
}

pub fn make_native_function(
    realm: &Realm,
    name: &str,
    arity: u32,
    body: BuiltInFn,
    constructor: bool,
) -> JsObjectType {
    let function = JsObjectType::new(
        Some(realm.intrinsic(WellKnownIntrinsics::FunctionPrototype)),
        ObjectClass::Function(Arc::new(FunctionObject::Native(NativeFunction {
            name: name.to_string(),
            body,
            constructor,
        }))),
    );
    define_name_and_length(&function, name, arity);
    function
}

pub fn make_bound_function(
    realm: &Realm,
    target: JsObjectType,
    this: JsValue,
    args: Vec<JsValue>,
    name: &str,
    arity: u32,
) -> JsObjectType {
    let function = JsObjectType::new(
        Some(realm.intrinsic(WellKnownIntrinsics::FunctionPrototype)),
        ObjectClass::Function(Arc::new(FunctionObject::Bound(BoundFunction {
            target,
            this,
            args,
        }))),
    );
    define_name_and_length(&function, &format!("bound {}", name), arity);
    function
}
