//! Type-erased value boxes
//!
//! An [`ErasedBox`] owns exactly one value whose concrete type is decided at
//! construction. Recovery always goes through [`Any`], so asking for the wrong
//! type yields `None` rather than a reinterpretation of memory.

use core::any::{Any, TypeId};
use core::fmt;

use crate::error::{ComponentError, Result};

/// Discriminator recorded for a boxed type
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// The Rust TypeId
    pub type_id: TypeId,
    /// Human-readable type name
    pub name: &'static str,
    /// Size in bytes
    pub size: usize,
    /// Alignment requirement
    pub align: usize,
}

impl TypeInfo {
    /// Create type info for a concrete type
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
            size: core::mem::size_of::<T>(),
            align: core::mem::align_of::<T>(),
        }
    }

    /// Check if this describes `T`
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

/// Values that can live in an [`ErasedBox`]
pub trait ErasedValue: Any + Send + Sync {
    /// Clone into a new boxed trait object
    fn clone_value(&self) -> Box<dyn ErasedValue>;

    /// Get as Any reference (for downcasting)
    fn as_any(&self) -> &dyn Any;

    /// Get as mutable Any reference (for downcasting)
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert into a boxed Any
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<T: Clone + Send + Sync + 'static> ErasedValue for T {
    fn clone_value(&self) -> Box<dyn ErasedValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// Non-copyable holder of exactly one concretely-typed value
pub struct ErasedBox {
    info: TypeInfo,
    value: Box<dyn ErasedValue>,
    description: String,
}

impl ErasedBox {
    /// Box a value
    pub fn new<T: Clone + Send + Sync + 'static>(value: T) -> Self {
        Self {
            info: TypeInfo::of::<T>(),
            value: Box::new(value),
            description: String::new(),
        }
    }

    /// Box a value with a description attached
    pub fn with_description<T: Clone + Send + Sync + 'static>(
        value: T,
        description: impl Into<String>,
    ) -> Self {
        let mut boxed = Self::new(value);
        boxed.description = description.into();
        boxed
    }

    /// Type discriminator of the held value
    #[inline]
    pub fn type_info(&self) -> &TypeInfo {
        &self.info
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.info.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.info.name
    }

    /// Check whether the held value is a `T`
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.info.is::<T>()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Downcast to a concrete type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref()
    }

    /// Downcast to a mutable concrete type
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.value.as_any_mut().downcast_mut()
    }

    /// Downcast, reporting a mismatch as an error
    pub fn expect_ref<T: 'static>(&self) -> Result<&T> {
        let found = self.info.name;
        self.downcast_ref()
            .ok_or_else(|| ComponentError::type_mismatch::<T>(found))
    }

    /// Mutable downcast, reporting a mismatch as an error
    pub fn expect_mut<T: 'static>(&mut self) -> Result<&mut T> {
        let found = self.info.name;
        self.downcast_mut()
            .ok_or_else(|| ComponentError::type_mismatch::<T>(found))
    }

    /// Move the value out, handing the box back on a type mismatch
    pub fn into_inner<T: 'static>(self) -> core::result::Result<T, Self> {
        if !self.value.as_any().is::<T>() {
            return Err(self);
        }
        match self.value.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => unreachable!("held value was checked to be a {}", self.info.name),
        }
    }

    /// Deep-clone the held value into a new, independent box
    pub fn duplicate(&self) -> Self {
        Self {
            info: self.info,
            value: self.value.clone_value(),
            description: self.description.clone(),
        }
    }
}

impl fmt::Debug for ErasedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedBox")
            .field("type", &self.info.name)
            .field("description", &self.description)
            .finish()
    }
}
