//! Class definition and construction

use crate::ast::{ClassMemberKind, ClassNode, Expr, FunctionNode, PropertyKey};
use crate::interpreter::property::Key;
use crate::interpreter::{Frame, Interpreter, Scope};
use crate::value::{
    Class, ClassParent, Closure, ErrorData, ErrorKind, Function, FunctionKind, Object, RuntimeError,
    Value,
};
use crate::interpreter::EnvRef;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

fn method_closure(name: &str, node: &Rc<FunctionNode>, env: &EnvRef, source: &Rc<str>, home: &Weak<Class>) -> Value {
    Value::Function(Rc::new(Function::new(FunctionKind::Closure(Closure {
        name: Rc::from(name),
        node: node.clone(),
        env: env.clone(),
        source: source.clone(),
        home: Some(home.clone()),
    }))))
}

impl Interpreter {
    /// Evaluate a class declaration or expression to its constructor
    pub(crate) fn define_class(
        &mut self,
        node: &Rc<ClassNode>,
        name_hint: Option<&str>,
    ) -> Result<Value, RuntimeError> {
        let name: Rc<str> = Rc::from(
            node.name
                .as_ref()
                .map(|n| n.name.as_str())
                .or(name_hint)
                .unwrap_or(""),
        );
        let parent = match &node.superclass {
            Some(expr) => {
                let value = self.eval_expr(expr)?;
                Some(self.class_parent(&value)?)
            }
            None => None,
        };

        let scope = Scope::child(&self.env);
        let mut methods = Vec::new();
        let mut fields = Vec::new();
        let mut static_fields = Vec::new();
        self.in_scope(scope.clone(), |interp| {
            for (index, member) in node.members.iter().enumerate() {
                let key = match &member.key {
                    PropertyKey::Named(name) => name.clone(),
                    PropertyKey::Computed(expr) => {
                        let key = interp.eval_expr(expr)?;
                        interp.to_key(&key)?.to_string()
                    }
                };
                match &member.kind {
                    ClassMemberKind::Method(function) => {
                        methods.push((key, function.clone(), member.is_static))
                    }
                    ClassMemberKind::Field(_) if member.is_static => static_fields.push((index, key)),
                    ClassMemberKind::Field(_) => fields.push((index, key)),
                }
            }
            Ok(())
        })?;

        let source = self.source.clone();
        let class = Rc::new_cyclic(|home: &Weak<Class>| {
            let instance_methods: IndexMap<String, Value> = methods
                .iter()
                .filter(|(_, _, is_static)| !is_static)
                .map(|(key, function, _)| {
                    (key.clone(), method_closure(key, function, &scope, &source, home))
                })
                .collect();
            Class {
                name: name.clone(),
                node: node.clone(),
                parent,
                methods: RefCell::new(instance_methods),
                fields,
                env: scope.clone(),
                source: source.clone(),
            }
        });

        let constructor = Rc::new(Function::new(FunctionKind::Class(class.clone())));
        let home = Rc::downgrade(&class);
        for (key, function, _) in methods.iter().filter(|(_, _, is_static)| *is_static) {
            constructor
                .properties
                .borrow_mut()
                .insert(key.clone(), method_closure(key, function, &scope, &source, &home));
        }

        let value = Value::Function(constructor.clone());
        if let Some(own) = &node.name {
            Scope::declare(&scope, &own.name, value.clone(), false);
        }

        for (index, key) in static_fields {
            let init = match &node.members[index].kind {
                ClassMemberKind::Field(init) => init.as_ref(),
                ClassMemberKind::Method(_) => None,
            };
            let field_value = match init {
                Some(expr) => self.eval_in_frame(&class, &value, expr, &key)?,
                None => Value::Undefined,
            };
            constructor.properties.borrow_mut().insert(key, field_value);
        }

        Ok(value)
    }

    fn class_parent(&mut self, value: &Value) -> Result<ClassParent, RuntimeError> {
        if let Value::Function(function) = value {
            match &function.kind {
                FunctionKind::Class(_) => return Ok(ClassParent::Class(function.clone())),
                FunctionKind::Native(native) => {
                    if let Some(kind) = ErrorKind::ALL.iter().find(|k| k.name() == &*native.name) {
                        return Ok(ClassParent::Error(*kind));
                    }
                    return Err(RuntimeError::type_error(format!(
                        "Extending built-in {} is not supported in this sandbox",
                        native.name
                    )));
                }
                _ => {}
            }
        }
        Err(RuntimeError::type_error(format!(
            "Class extends value {} is not a constructor or null",
            value.to_display_string()
        )))
    }

    /// `new C(...)` for a user class
    pub(crate) fn instantiate(&mut self, class: &Rc<Class>, args: &[Value]) -> Result<Value, RuntimeError> {
        let error = class.error_root().map(|kind| ErrorData {
            kind,
            name: Rc::from(kind.name()),
            message: Rc::from(""),
        });
        let instance = Value::Object(Rc::new(RefCell::new(Object {
            class: Some(class.clone()),
            error,
            ..Object::default()
        })));

        let result = self.run_constructor(class, &instance, args)?;
        Ok(match result {
            Value::Object(_) | Value::Array(_) | Value::Function(_) => result,
            _ => instance,
        })
    }

    fn run_constructor(&mut self, class: &Rc<Class>, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        match &class.node.constructor {
            Some(constructor) => {
                // Derived classes initialise fields when `super(...)` returns
                if class.parent.is_none() {
                    self.init_fields(class, this)?;
                }
                self.invoke_closure(constructor, &class.env, Some(class.clone()), this.clone(), args)
            }
            None => {
                if let Some(parent) = &class.parent {
                    self.construct_parent(parent, this, args)?;
                }
                self.init_fields(class, this)?;
                Ok(Value::Undefined)
            }
        }
    }

    /// Run the parent constructor against an existing `this`
    pub(crate) fn construct_parent(
        &mut self,
        parent: &ClassParent,
        this: &Value,
        args: &[Value],
    ) -> Result<(), RuntimeError> {
        match parent {
            ClassParent::Class(function) => {
                if let FunctionKind::Class(class) = &function.kind {
                    self.run_constructor(class, this, args)?;
                }
                Ok(())
            }
            ClassParent::Error(_) => {
                let message = match args.first() {
                    None | Some(Value::Undefined) => return Ok(()),
                    Some(value) => self.to_string(value)?,
                };
                if let Value::Object(obj) = this {
                    if let Some(error) = obj.borrow_mut().error.as_mut() {
                        error.message = Rc::from(message);
                    }
                }
                Ok(())
            }
        }
    }

    /// Evaluate instance field initialisers onto `this`
    pub(crate) fn init_fields(&mut self, class: &Rc<Class>, this: &Value) -> Result<(), RuntimeError> {
        for (index, key) in &class.fields {
            let value = match &class.node.members[*index].kind {
                ClassMemberKind::Field(Some(init)) => self.eval_in_frame(class, this, init, key)?,
                _ => Value::Undefined,
            };
            self.set_property(this, Key::from_name(key), value)?;
        }
        Ok(())
    }

    fn eval_in_frame(
        &mut self,
        class: &Rc<Class>,
        this: &Value,
        expr: &Expr,
        name: &str,
    ) -> Result<Value, RuntimeError> {
        let scope = Scope::child(&class.env);
        scope.borrow_mut().frame = Some(Frame {
            this: this.clone(),
            home: Some(class.clone()),
        });
        self.in_scope(scope, |interp| interp.eval_named(expr, Some(name)))
    }

    /// `super.name` inside a method
    pub(crate) fn super_property(&mut self, name: &str) -> Result<Value, RuntimeError> {
        let home = self
            .current_home()
            .ok_or_else(|| RuntimeError::syntax_error("'super' keyword unexpected here"))?;
        let this = self.current_this();
        Ok(match &home.parent {
            Some(ClassParent::Class(parent)) => {
                if matches!(this, Value::Function(_)) {
                    self.function_property(parent, name)
                } else {
                    match &parent.kind {
                        FunctionKind::Class(class) => class
                            .find_method(name)
                            .unwrap_or_else(|| self.prototype_lookup(&self.prototypes.object, name)),
                        _ => Value::Undefined,
                    }
                }
            }
            _ => self.prototype_lookup(&self.prototypes.object, name),
        })
    }
}
