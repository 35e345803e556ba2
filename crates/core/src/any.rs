//! Type-safe recovery of concrete types behind the opaque pipeline values.

use std::any::Any;

/// Upcast to [`Any`], implemented for every `'static` type.
///
/// Call it through `&dyn AuthToken` / `&dyn AuthData` / `&dyn UserData`, never on
/// a `Box` of them: a `Box<dyn AuthToken>` is itself `'static`, so calling
/// `as_any` on the box yields the box rather than the value inside it. The
/// `downcast_*` helpers on each trait object take care of this.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Implements `is` / `downcast_ref` / `downcast_mut` / `downcast` on a trait
/// object whose trait has [`AsAny`] as a supertrait.
macro_rules! impl_downcast {
    ($tr:ident) => {
        impl dyn $tr {
            pub fn is<T: $tr>(&self) -> bool {
                $crate::any::AsAny::as_any(self).is::<T>()
            }

            pub fn downcast_ref<T: $tr>(&self) -> Option<&T> {
                $crate::any::AsAny::as_any(self).downcast_ref::<T>()
            }

            pub fn downcast_mut<T: $tr>(&mut self) -> Option<&mut T> {
                $crate::any::AsAny::as_any_mut(self).downcast_mut::<T>()
            }

            pub fn downcast<T: $tr>(self: Box<Self>) -> Result<Box<T>, Box<Self>> {
                if self.is::<T>() {
                    match $crate::any::AsAny::into_any(self).downcast::<T>() {
                        Ok(value) => Ok(value),
                        Err(_) => unreachable!("type checked above"),
                    }
                } else {
                    Err(self)
                }
            }
        }
    };
}

pub(crate) use impl_downcast;
