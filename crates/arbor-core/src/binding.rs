use std::fmt;

use indexmap::IndexMap;

use crate::errors::{ArborError, Result};
use crate::model::Identifier;

/// Parameter name to identifier bindings, in binding order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingEnvironment(IndexMap<String, Identifier>);

impl BindingEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> BindingEnvironmentBuilder {
        BindingEnvironmentBuilder(Self::new())
    }

    /// Copy with `name` bound (or rebound) to `id`
    pub fn with_binding(&self, name: impl Into<String>, id: Identifier) -> Self {
        let mut map = self.0.clone();
        map.insert(name.into(), id);
        BindingEnvironment(map)
    }

    /// Bind `name`, failing if it is already bound to a different id
    ///
    /// # Errors
    ///
    /// `InvalidArgument` on a conflicting binding.
    pub fn bind(&mut self, name: impl Into<String>, id: Identifier) -> Result<()> {
        let name = name.into();
        match self.0.get(&name) {
            Some(existing) if *existing != id => Err(ArborError::invalid_argument(
                format!("-{}-", name),
                format!("already bound to {:?}, cannot rebind to {:?}", existing, id),
            )),
            Some(_) => Ok(()),
            None => {
                self.0.insert(name, id);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Identifier> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Identifier)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of two environments
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if they bind the same name to different ids.
    pub fn merged(&self, other: &BindingEnvironment) -> Result<Self> {
        let mut out = self.clone();
        for (name, id) in other.iter() {
            out.bind(name, id.clone())?;
        }
        Ok(out)
    }
}

impl fmt::Display for BindingEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, id)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, id)?;
        }
        f.write_str("}")
    }
}

pub struct BindingEnvironmentBuilder(BindingEnvironment);

impl BindingEnvironmentBuilder {
    pub fn bind(mut self, name: impl Into<String>, id: Identifier) -> Self {
        self.0 .0.insert(name.into(), id);
        self
    }

    pub fn build(self) -> BindingEnvironment {
        self.0
    }
}
