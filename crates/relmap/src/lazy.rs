use relmap_core::{Error, Result};

use once_cell::unsync::OnceCell;
use std::{fmt, rc::Rc};

type Loader<T> = Rc<dyn Fn() -> Result<T>>;

/// A value loaded on first access.
///
/// The loader runs at most once per successful load; a failed load is
/// retried on the next access. Clones made before the first access load
/// independently.
pub struct Lazy<T> {
    cell: OnceCell<T>,
    loader: Option<Loader<T>>,
}

impl<T> Lazy<T> {
    pub fn new(loader: impl Fn() -> Result<T> + 'static) -> Lazy<T> {
        Lazy {
            cell: OnceCell::new(),
            loader: Some(Rc::new(loader)),
        }
    }

    /// An already loaded value.
    pub fn loaded(value: T) -> Lazy<T> {
        Lazy {
            cell: OnceCell::with_value(value),
            loader: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The value, if it has been loaded.
    pub fn peek(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn get(&self) -> Result<&T> {
        self.cell.get_or_try_init(|| match &self.loader {
            Some(loader) => loader(),
            None => Err(Error::query("lazy value has no loader")),
        })
    }

    pub fn get_mut(&mut self) -> Result<&mut T> {
        self.get()?;
        self.cell
            .get_mut()
            .ok_or_else(|| Error::query("lazy value failed to load"))
    }

    /// Mutable access to the value, if it has been loaded.
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.cell.get_mut()
    }

    pub fn into_inner(self) -> Result<T> {
        self.get()?;
        self.cell
            .into_inner()
            .ok_or_else(|| Error::query("lazy value failed to load"))
    }
}

impl<T: Clone> Clone for Lazy<T> {
    fn clone(&self) -> Lazy<T> {
        Lazy {
            cell: self.cell.clone(),
            loader: self.loader.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Lazy").field(value).finish(),
            None => f.write_str("Lazy(<unloaded>)"),
        }
    }
}
