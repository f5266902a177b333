//! Runtime object model: scalars, classes, instances, and the handles that
//! share them.
//!
//! Every guest value lives behind an [`ObjectHolder`]. Owning handles are
//! `Rc`-counted, so `b = a` aliases one object instead of copying it. An
//! instance refers to itself through its `self` field with a non-owning
//! handle, which keeps instances free of reference cycles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::syntax::ast::Stmt;

/// Named-binding store shared by the top-level scope, method activations,
/// and instance fields.
pub type Closure = HashMap<String, ObjectHolder>;

/// Name under which an instance sees itself.
pub const SELF: &str = "self";

// ─── Handles ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub enum ObjectHolder {
    /// The language's `None`.
    #[default]
    None,
    /// Shared owner of the object.
    Own(Rc<Object>),
    /// Alias of an object owned elsewhere; does not keep it alive.
    Share(Weak<Object>),
}

impl ObjectHolder {
    pub fn own(object: Object) -> Self {
        Self::Own(Rc::new(object))
    }

    pub fn none() -> Self {
        Self::None
    }

    pub fn number(n: i64) -> Self {
        Self::own(Object::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::own(Object::String(s.into()))
    }

    pub fn boolean(b: bool) -> Self {
        Self::own(Object::Bool(b))
    }

    /// Allocate a fresh instance of `class` with an empty field store apart
    /// from its own `self` binding. That binding is non-owning: a value read
    /// through `x.self` becomes `None` once the instance is dropped.
    pub fn new_instance(class: Rc<Class>) -> Self {
        Self::Own(Rc::new_cyclic(|me| {
            let mut fields = Closure::new();
            fields.insert(SELF.to_string(), Self::Share(me.clone()));
            Object::Instance(ClassInstance { class, fields: RefCell::new(fields) })
        }))
    }

    /// The referenced object, or `None` for an absent (or expired) handle.
    pub fn get(&self) -> Option<Rc<Object>> {
        match self {
            Self::None => None,
            Self::Own(rc) => Some(rc.clone()),
            Self::Share(weak) => weak.upgrade(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.get().is_none()
    }

    pub fn as_number(&self) -> Option<i64> {
        match self.get().as_deref() {
            Some(Object::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self.get().as_deref() {
            Some(Object::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// True when both handles reach the same allocation.
    pub fn same_object(&self, other: &ObjectHolder) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.get().map_or("None", |o| o.type_name())
    }
}

impl fmt::Debug for ObjectHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(obj) => write!(f, "{obj:?}"),
            None => f.write_str("None"),
        }
    }
}

/// Truthiness used by `if`, `and`, `or`, `not`.
pub fn is_true(holder: &ObjectHolder) -> bool {
    match holder.get().as_deref() {
        None => false,
        Some(Object::Bool(b)) => *b,
        Some(Object::Number(n)) => *n != 0,
        Some(Object::String(s)) => !s.is_empty(),
        Some(Object::Class(_) | Object::Instance(_)) => true,
    }
}

// ─── Objects ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Object {
    Number(i64),
    String(String),
    Bool(bool),
    Class(Rc<Class>),
    Instance(ClassInstance),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Number(_)   => "Number",
            Object::String(_)   => "String",
            Object::Bool(_)     => "Bool",
            Object::Class(_)    => "Class",
            Object::Instance(_) => "Instance",
        }
    }

    pub fn as_instance(&self) -> Option<&ClassInstance> {
        match self {
            Object::Instance(inst) => Some(inst),
            _ => None,
        }
    }
}

/// Default textual form, without `__str__` dispatch.
impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Number(n) => write!(f, "{n}"),
            Object::String(s) => f.write_str(s),
            Object::Bool(b)   => f.write_str(if *b { "True" } else { "False" }),
            Object::Class(c)  => write!(f, "<class '{}'>", c.name()),
            Object::Instance(inst) => {
                write!(f, "<{} object at {:p}>", inst.class().name(), inst as *const ClassInstance)
            }
        }
    }
}

// ─── Classes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

impl Method {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Vec<Stmt>) -> Self {
        Self { name: name.into(), params, body }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

pub struct Class {
    name: String,
    methods: HashMap<String, Method>,
    parent: Option<Rc<Class>>,
}

impl Class {
    /// A later method with the same name replaces an earlier one.
    pub fn new(name: impl Into<String>, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Self {
        let methods = methods.into_iter().map(|m| (m.name.clone(), m)).collect();
        Self { name: name.into(), methods, parent }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    /// First definition of `name` walking from this class up to the root.
    pub fn get_method(&self, name: &str) -> Option<&Method> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(method) = class.methods.get(name) {
                return Some(method);
            }
            current = class.parent.as_deref();
        }
        None
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .finish()
    }
}

// ─── Instances ────────────────────────────────────────────────────────────────

pub struct ClassInstance {
    class: Rc<Class>,
    fields: RefCell<Closure>,
}

impl ClassInstance {
    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    /// A method named `name` exists in the chain and takes exactly `arity` arguments.
    pub fn has_method(&self, name: &str, arity: usize) -> bool {
        self.class.get_method(name).is_some_and(|m| m.arity() == arity)
    }

    pub fn get_field(&self, name: &str) -> Option<ObjectHolder> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: impl Into<String>, value: ObjectHolder) {
        self.fields.borrow_mut().insert(name.into(), value);
    }
}

impl fmt::Debug for ClassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let borrowed = self.fields.borrow();
        let mut fields: Vec<&String> = borrowed.keys().filter(|k| k.as_str() != SELF).collect();
        fields.sort_unstable();
        f.debug_struct("ClassInstance")
            .field("class", &self.class.name())
            .field("fields", &fields)
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, params: &[&str]) -> Method {
        Method::new(name, params.iter().map(|p| p.to_string()).collect(), Vec::new())
    }

    fn shape_and_rect() -> (Rc<Class>, Rc<Class>) {
        let shape = Rc::new(Class::new("Shape", vec![method("__str__", &[]), method("area", &[])], None));
        let rect = Rc::new(Class::new(
            "Rect",
            vec![method("__init__", &["w", "h"]), method("area", &[])],
            Some(shape.clone()),
        ));
        (shape, rect)
    }

    #[test]
    fn method_lookup_walks_parent_chain() {
        let (shape, rect) = shape_and_rect();
        assert_eq!(rect.get_method("__init__").map(Method::arity), Some(2));
        assert!(rect.get_method("__str__").is_some());
        assert!(shape.get_method("__init__").is_none());
        assert!(rect.get_method("missing").is_none());
        assert_eq!(rect.parent().map(|p| p.name()), Some("Shape"));
    }

    #[test]
    fn child_overrides_parent() {
        let base = Rc::new(Class::new("Base", vec![method("f", &["a"])], None));
        let child = Rc::new(Class::new("Child", vec![method("f", &[])], Some(base)));
        assert_eq!(child.get_method("f").map(Method::arity), Some(0));
    }

    #[test]
    fn has_method_is_arity_gated() {
        let (_, rect) = shape_and_rect();
        let holder = ObjectHolder::new_instance(rect);
        let obj = holder.get().unwrap();
        let inst = obj.as_instance().unwrap();
        assert!(inst.has_method("__init__", 2));
        assert!(!inst.has_method("__init__", 1));
        assert!(inst.has_method("__str__", 0));
        assert!(!inst.has_method("__add__", 1));
    }

    #[test]
    fn new_instance_binds_self_without_owning_itself() {
        let (shape, _) = shape_and_rect();
        let holder = ObjectHolder::new_instance(shape);
        let obj = holder.get().unwrap();
        let me = obj.as_instance().unwrap().get_field(SELF).unwrap();
        assert!(me.same_object(&holder));
        assert!(matches!(me, ObjectHolder::Share(_)));
        drop(obj);
        // `holder` is the only strong reference.
        let ObjectHolder::Own(rc) = &holder else { panic!("expected owning handle") };
        assert_eq!(Rc::strong_count(rc), 1);
    }

    #[test]
    fn self_alias_expires_with_its_instance() {
        let (shape, _) = shape_and_rect();
        let holder = ObjectHolder::new_instance(shape);
        let alias = holder.get().and_then(|o| o.as_instance().and_then(|i| i.get_field(SELF))).unwrap();
        assert!(alias.same_object(&holder));
        drop(holder);
        assert!(alias.is_none());
        assert_eq!(alias.type_name(), "None");
    }

    #[test]
    fn assignment_aliases_instances() {
        let (shape, _) = shape_and_rect();
        let a = ObjectHolder::new_instance(shape);
        let b = a.clone();
        b.get().unwrap().as_instance().unwrap().set_field("x", ObjectHolder::number(7));
        let seen = a.get().unwrap().as_instance().unwrap().get_field("x");
        assert_eq!(seen.and_then(|h| h.as_number()), Some(7));
        assert!(a.same_object(&b));
    }

    #[test]
    fn truthiness_table() {
        let (shape, _) = shape_and_rect();
        assert!(!is_true(&ObjectHolder::none()));
        assert!(!is_true(&ObjectHolder::boolean(false)));
        assert!(!is_true(&ObjectHolder::number(0)));
        assert!(!is_true(&ObjectHolder::string("")));
        assert!(is_true(&ObjectHolder::boolean(true)));
        assert!(is_true(&ObjectHolder::number(1)));
        assert!(is_true(&ObjectHolder::number(-3)));
        assert!(is_true(&ObjectHolder::string("a")));
        assert!(is_true(&ObjectHolder::own(Object::Class(shape.clone()))));
        assert!(is_true(&ObjectHolder::new_instance(shape)));
    }

    #[test]
    fn default_display() {
        assert_eq!(Object::Number(-8).to_string(), "-8");
        assert_eq!(Object::String("hi".into()).to_string(), "hi");
        assert_eq!(Object::Bool(true).to_string(), "True");
        assert_eq!(Object::Bool(false).to_string(), "False");
        let (shape, _) = shape_and_rect();
        assert_eq!(Object::Class(shape.clone()).to_string(), "<class 'Shape'>");
        let inst = ObjectHolder::new_instance(shape).get().unwrap().to_string();
        assert!(inst.starts_with("<Shape object at 0x"), "{inst}");
    }

    #[test]
    fn type_names() {
        assert_eq!(ObjectHolder::none().type_name(), "None");
        assert_eq!(ObjectHolder::number(1).type_name(), "Number");
        assert_eq!(ObjectHolder::string("").type_name(), "String");
    }
}
