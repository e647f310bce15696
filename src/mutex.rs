/// Common interface for mutex implementations.
///
/// [`Shield`][crate::Shield] hands out [`Servo`][crate::Servo] and [`Port`][crate::Port] handles
/// which all talk to the same driver.  The driver is kept inside a mutex so only one handle can
/// use the bus at a time.  Implementations are provided for:
///
/// | Mutex | Feature Name | Notes |
/// | --- | --- | --- |
/// | [`core::cell::RefCell`] | _always available_ | For sharing within a single execution context. |
/// | [`std::sync::Mutex`][mutex-std] | `std` | For platforms where `std` is available. |
/// | [`critical_section::Mutex<RefCell<_>>`][mutex-cs] | `critical-section` | For sharing with interrupt handlers. |
///
/// [mutex-std]: https://doc.rust-lang.org/std/sync/struct.Mutex.html
/// [mutex-cs]: https://docs.rs/critical-section/latest/critical_section/struct.Mutex.html
///
/// For other mutex types, a custom implementation is needed.  Due to the orphan rule, it might be
/// necessary to wrap it in a newtype:
///
/// ```
/// struct MyMutex<T>(std::sync::Mutex<T>);
///
/// impl<T> uio_shield::ShieldMutex for MyMutex<T> {
///     type Driver = T;
///
///     fn create(v: T) -> Self {
///         Self(std::sync::Mutex::new(v))
///     }
///
///     fn lock<R, F: FnOnce(&mut Self::Driver) -> R>(&self, f: F) -> R {
///         let mut v = self.0.lock().unwrap();
///         f(&mut v)
///     }
///
///     fn into_inner(self) -> T {
///         self.0.into_inner().unwrap()
///     }
/// }
/// ```
pub trait ShieldMutex {
    /// The driver that is wrapped inside this mutex.
    type Driver;

    /// Create a new mutex of this type.
    fn create(v: Self::Driver) -> Self;

    /// Lock the mutex and give a closure access to the driver inside.
    fn lock<R, F: FnOnce(&mut Self::Driver) -> R>(&self, f: F) -> R;

    /// Consume the mutex and return the driver.
    fn into_inner(self) -> Self::Driver;
}

impl<T> ShieldMutex for core::cell::RefCell<T> {
    type Driver = T;

    fn create(v: Self::Driver) -> Self {
        core::cell::RefCell::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Driver) -> R>(&self, f: F) -> R {
        let mut v = self.borrow_mut();
        f(&mut v)
    }

    fn into_inner(self) -> Self::Driver {
        core::cell::RefCell::into_inner(self)
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> ShieldMutex for std::sync::Mutex<T> {
    type Driver = T;

    fn create(v: Self::Driver) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Driver) -> R>(&self, f: F) -> R {
        let mut v = self.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut v)
    }

    fn into_inner(self) -> Self::Driver {
        std::sync::Mutex::into_inner(self).unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(feature = "critical-section")]
impl<T> ShieldMutex for critical_section::Mutex<core::cell::RefCell<T>> {
    type Driver = T;

    fn create(v: Self::Driver) -> Self {
        critical_section::Mutex::new(core::cell::RefCell::new(v))
    }

    fn lock<R, F: FnOnce(&mut Self::Driver) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| {
            let mut v = self.borrow_ref_mut(cs);
            f(&mut v)
        })
    }

    fn into_inner(self) -> Self::Driver {
        critical_section::Mutex::into_inner(self).into_inner()
    }
}
