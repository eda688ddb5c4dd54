//! # Transform Passes
//!
//! The uniform pass contract and the built-in passes. A pass may hold a
//! [`PassHandle`] to another pass built earlier in the same chain so it can
//! read or extend that pass's live state.

mod auth;
mod default_value;
mod function;
mod http;
mod index;
mod maps_to;
mod model;
mod predictions;
mod primary_key;
mod relational;
mod searchable;

pub use auth::{AuthPass, AuthRule, AuthStrategy};
pub use default_value::DefaultValuePass;
pub use function::FunctionPass;
pub use http::HttpPass;
pub use index::{IndexPass, IndexRecord};
pub use maps_to::MapsToPass;
pub use model::{ModelPass, ModelRecord};
pub use predictions::PredictionsPass;
pub use primary_key::PrimaryKeyPass;
pub use relational::{BelongsToPass, HasManyPass, HasOnePass, ManyToManyPass, Relation};
pub use searchable::SearchablePass;

use crate::context::{resolver_id, Resource, ResourceKind, TransformContext};
use crate::error::{TransformError, TransformResult};
use std::cell::RefCell;
use std::rc::Rc;

/// Built-in pass names. Each matches the directive the pass handles.
pub mod names {
    pub const MODEL: &str = "model";
    pub const FUNCTION: &str = "function";
    pub const HTTP: &str = "http";
    pub const PREDICTIONS: &str = "predictions";
    pub const PRIMARY_KEY: &str = "primaryKey";
    pub const INDEX: &str = "index";
    pub const HAS_MANY: &str = "hasMany";
    pub const HAS_ONE: &str = "hasOne";
    pub const MANY_TO_MANY: &str = "manyToMany";
    pub const BELONGS_TO: &str = "belongsTo";
    pub const DEFAULT_VALUE: &str = "default";
    pub const AUTH: &str = "auth";
    pub const MAPS_TO: &str = "mapsTo";
    pub const SEARCHABLE: &str = "searchable";
}

/// One schema-to-resource transformation step.
pub trait TransformPass {
    /// Unique name within a chain.
    fn name(&self) -> &str;

    /// Passes that must be applied before this one.
    fn depends_on(&self) -> &[&'static str] {
        &[]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()>;
}

/// A pass instance as stored in a chain.
pub type SharedPass = Rc<RefCell<dyn TransformPass>>;

/// Wrap a pass for use in a chain (e.g. as a custom pass).
pub fn shared_pass<T: TransformPass + 'static>(pass: T) -> SharedPass {
    Rc::new(RefCell::new(pass))
}

/// Typed handle to a pass instance that also sits in the chain.
pub struct PassHandle<T> {
    name: String,
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for PassHandle<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: TransformPass + 'static> PassHandle<T> {
    pub fn new(pass: T) -> Self {
        Self {
            name: pass.name().to_string(),
            inner: Rc::new(RefCell::new(pass)),
        }
    }

    /// The same instance, as a chain entry.
    pub fn shared(&self) -> SharedPass {
        self.inner.clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> TransformResult<R> {
        let pass = self
            .inner
            .try_borrow()
            .map_err(|_| TransformError::PassBusy(self.name.clone()))?;
        Ok(f(&pass))
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> TransformResult<R> {
        let mut pass = self
            .inner
            .try_borrow_mut()
            .map_err(|_| TransformError::PassBusy(self.name.clone()))?;
        Ok(f(&mut pass))
    }

    /// True when `pass` is this very instance.
    pub fn is_same(&self, pass: &SharedPass) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.inner) as *const u8,
            Rc::as_ptr(pass) as *const u8,
        )
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn plural(s: &str) -> String {
    let ends_with_consonant_y = s.ends_with('y')
        && !s
            .chars()
            .rev()
            .nth(1)
            .map(|c| "aeiouAEIOU".contains(c))
            .unwrap_or(false);
    if ends_with_consonant_y {
        format!("{}ies", &s[..s.len() - 1])
    } else if s.ends_with('s') || s.ends_with('x') || s.ends_with("ch") || s.ends_with("sh") {
        format!("{}es", s)
    } else {
        format!("{}s", s)
    }
}

/// Register the resolver for `type_name.field_name`, carrying any user slots.
pub(crate) fn add_resolver<'c>(
    ctx: &'c mut TransformContext<'_>,
    type_name: &str,
    field_name: &str,
    datasource: &str,
    stack: Option<&str>,
) -> &'c mut Resource {
    let mut resolver = Resource::new(resolver_id(type_name, field_name), ResourceKind::Resolver)
        .with_property("typeName", type_name.into())
        .with_property("fieldName", field_name.into())
        .with_property("dataSource", datasource.into());
    if let Some(stack) = stack {
        resolver = resolver.in_stack(stack);
    }
    let slot_key = format!("{}.{}", type_name, field_name);
    if let Some(slots) = ctx.user_defined_slots.get(&slot_key) {
        let slot_names: Vec<serde_json::Value> =
            slots.iter().map(|s| s.slot_name.clone().into()).collect();
        resolver.set_property("slots", serde_json::Value::Array(slot_names));
    }
    ctx.resources.get_or_insert(resolver)
}

/// String argument of a directive, or an `InvalidDirective` error.
pub(crate) fn required_str_arg<'d>(
    pass: &str,
    directive: &'d crate::schema::Directive,
    arg: &str,
    location: &str,
) -> TransformResult<&'d str> {
    directive
        .argument(arg)
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            TransformError::directive(
                pass,
                format!("@{} on {} requires a string '{}' argument", directive.name, location, arg),
            )
        })
}
