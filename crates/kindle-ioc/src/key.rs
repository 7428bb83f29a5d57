//! Binding keys and consumer scopes.
//!
//! A container binding is addressed by the two-level key
//! `(Scope, BindingKey)`. Global bindings live under [`Scope::Global`];
//! bindings meant for a single consumer live under [`Scope::Target`].

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key identifying a container binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingKey(Cow<'static, str>);

impl BindingKey {
    /// Builds a key from an arbitrary name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Builds the key conventionally used for values of type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(type_name::<T>()))
    }

    /// Returns the key as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&'static str> for BindingKey {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for BindingKey {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl From<&BindingKey> for BindingKey {
    fn from(value: &BindingKey) -> Self {
        value.clone()
    }
}

/// Identifier of the consumer a targeted binding is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerId(Cow<'static, str>);

impl ConsumerId {
    /// Builds a consumer identifier from an arbitrary name.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Builds the identifier conventionally used for consumers of type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(type_name::<T>()))
    }

    /// Returns the identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&'static str> for ConsumerId {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for ConsumerId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Scope a binding operation applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Bindings visible to every consumer.
    #[default]
    Global,
    /// Bindings visible only when resolving on behalf of one consumer.
    Target(ConsumerId),
}

impl Scope {
    /// Returns the consumer this scope targets, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&ConsumerId> {
        match self {
            Self::Global => None,
            Self::Target(target) => Some(target),
        }
    }
}

impl From<Option<ConsumerId>> for Scope {
    fn from(target: Option<ConsumerId>) -> Self {
        target.map_or(Self::Global, Self::Target)
    }
}

impl From<ConsumerId> for Scope {
    fn from(target: ConsumerId) -> Self {
        Self::Target(target)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => formatter.write_str("global"),
            Self::Target(target) => write!(formatter, "target '{target}'"),
        }
    }
}
