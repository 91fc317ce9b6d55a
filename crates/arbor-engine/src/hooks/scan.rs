//! Registration of receiver objects that describe their own hooks
//!
//! A receiver lists its hook methods as [`HookMethod`] entries: a scope path,
//! the parameters the callback expects and the callback itself. Every method
//! is checked against the tree's schema before any of them is registered.

use std::collections::HashSet;
use std::sync::Arc;

use arbor_core::errors::{ArborError, Result};
use arbor_core::model::Identifier;
use arbor_core::schema::TypeExpr;
use arbor_core::{BindingEnvironment, Path, Reference};

use super::HookContext;
use crate::tree::StateTree;

/// What a hook method expects to be handed
#[derive(Debug, Clone, PartialEq)]
pub enum HookParam {
    /// The bound scope reference, which must target `target`
    Reference { name: String, target: TypeExpr },
    /// Every binding of the scope's parameters
    Binding { name: String },
    /// The id bound to one parameter the scope declares
    Parameter { name: String },
    /// The invocation context
    Context { name: String },
}

impl HookParam {
    pub fn reference(name: impl Into<String>, target: TypeExpr) -> Self {
        HookParam::Reference {
            name: name.into(),
            target,
        }
    }

    pub fn binding(name: impl Into<String>) -> Self {
        HookParam::Binding { name: name.into() }
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        HookParam::Parameter { name: name.into() }
    }

    pub fn context(name: impl Into<String>) -> Self {
        HookParam::Context { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            HookParam::Reference { name, .. }
            | HookParam::Binding { name }
            | HookParam::Parameter { name }
            | HookParam::Context { name } => name,
        }
    }
}

pub type HookMethodFn = Arc<dyn Fn(&HookArgs<'_>) -> Result<()> + Send + Sync>;

pub struct HookMethod {
    name: String,
    public: bool,
    scope: String,
    params: Vec<HookParam>,
    call: HookMethodFn,
}

impl HookMethod {
    pub fn new<F>(name: impl Into<String>, scope: impl Into<String>, call: F) -> Self
    where
        F: Fn(&HookArgs<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            public: true,
            scope: scope.into(),
            params: Vec::new(),
            call: Arc::new(call),
        }
    }

    pub fn param(mut self, param: HookParam) -> Self {
        self.params.push(param);
        self
    }

    /// Mark the method as internal to its receiver; such methods are rejected
    pub fn internal(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn params(&self) -> &[HookParam] {
        &self.params
    }
}

impl std::fmt::Debug for HookMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookMethod")
            .field("name", &self.name)
            .field("public", &self.public)
            .field("scope", &self.scope)
            .field("params", &self.params)
            .finish()
    }
}

/// An object whose hook methods can be registered as a group
pub trait HookReceiver: Send + Sync + 'static {
    fn receiver_name(&self) -> &str;

    /// Hook methods, in the order they should be registered
    fn hook_methods(self: Arc<Self>) -> Vec<HookMethod>;
}

/// Arguments resolved for one call of a hook method
pub struct HookArgs<'a> {
    ctx: &'a HookContext<'a>,
    params: &'a [HookParam],
}

impl<'a> HookArgs<'a> {
    pub fn context(&self) -> &HookContext<'a> {
        self.ctx
    }

    pub fn reference(&self) -> &Reference {
        self.ctx.reference()
    }

    pub fn binding(&self) -> &BindingEnvironment {
        self.ctx.binding()
    }

    /// Id bound to a declared parameter
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `name` is not one of the method's declared
    /// parameters.
    pub fn parameter(&self, name: &str) -> Result<&Identifier> {
        let declared = self
            .params
            .iter()
            .any(|p| matches!(p, HookParam::Parameter { name: n } if n == name));
        declared
            .then(|| self.ctx.parameter(name))
            .flatten()
            .ok_or_else(|| {
                ArborError::invalid_argument(
                    self.ctx.reference().path(),
                    format!("\"{}\" is not a declared parameter", name),
                )
            })
    }

    pub fn declared(&self) -> &[HookParam] {
        self.params
    }
}

pub(crate) fn register_receiver<R>(tree: &StateTree, receiver: Arc<R>) -> Result<()>
where
    R: HookReceiver,
{
    let receiver_name = receiver.receiver_name().to_string();
    let methods = Arc::clone(&receiver).hook_methods();

    let mut validated = Vec::with_capacity(methods.len());
    for method in methods {
        let scope = validate(tree, &receiver_name, &method)?;
        validated.push((method, scope));
    }

    for (method, scope) in validated {
        let hook_name = format!("{}::{}", receiver_name, method.name);
        let HookMethod { params, call, .. } = method;
        tree.register_hook(hook_name, &scope, move |ctx| {
            call(&HookArgs {
                ctx,
                params: &params,
            })
        })?;
    }
    Ok(())
}

fn validate(tree: &StateTree, receiver: &str, method: &HookMethod) -> Result<Reference> {
    let invalid_method = |reason: String| ArborError::InvalidHookMethod {
        receiver: receiver.to_string(),
        method: method.name.clone(),
        reason,
    };

    if !method.public {
        return Err(invalid_method("hook methods must be public".to_string()));
    }
    let path = Path::parse(&method.scope)
        .map_err(|e| invalid_method(format!("invalid scope: {}", e)))?;
    let scope = tree
        .compiler()
        .structural_reference(path)
        .map_err(|e| invalid_method(format!("invalid scope: {}", e)))?;

    let declared = scope.path().parameter_names();
    let mut seen = HashSet::new();
    for param in &method.params {
        let invalid_param = |reason: String| ArborError::InvalidHookParameter {
            receiver: receiver.to_string(),
            method: method.name.clone(),
            parameter: param.name().to_string(),
            reason,
        };
        if !seen.insert(param.name()) {
            return Err(invalid_param("declared twice".to_string()));
        }
        match param {
            HookParam::Reference { target, .. } if target != scope.target_type() => {
                return Err(invalid_param(format!(
                    "expects a reference to {}, but scope {} refers to {}",
                    target,
                    scope.path(),
                    scope.target_type()
                )));
            }
            HookParam::Parameter { name } if !declared.contains(&name.as_str()) => {
                return Err(invalid_param(format!(
                    "scope {} declares no such parameter",
                    scope.path()
                )));
            }
            _ => {}
        }
    }
    Ok(scope)
}
