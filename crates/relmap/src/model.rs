use crate::Object;

use relmap_core::{ClassDescriptor, Result};

/// A typed entity that converts to and from an [`Object`].
pub trait Model: Sized {
    /// Name the class is registered under.
    const CLASS: &'static str;

    /// Properties and mapping metadata of the class.
    fn descriptor() -> ClassDescriptor;

    /// Load an instance of the model from a hydrated object.
    fn load(object: &Object) -> Result<Self>;

    /// Write the model's properties into `object`.
    fn store(&self, object: &mut Object);
}
