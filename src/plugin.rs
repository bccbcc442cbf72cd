//! Broker protocol and shared-module host.
//!
//! Every plug-in exports one unmangled factory symbol, [`BROKER_SYMBOL`],
//! taking no arguments and returning a raw [`BrokerHandle`]: an integer
//! kind tag plus a type-erased implementation behind a cast gate. A handle
//! wraps exactly one kind; hosts query it with
//! [`BrokerHandle::can_cast_to`] and borrow the typed implementation
//! through the matching accessor. [`PluginModule`] is the host half,
//! resolving the symbol from a shared module at runtime.

use std::ffi::OsStr;
use std::marker::PhantomData;

use libloading::Library;

use crate::descent::GradientDescent;
use crate::problem::{Problem, ShiftedParaboloid};
use crate::{Error, Solver};

/// Name of the factory symbol every plug-in module exports.
pub const BROKER_SYMBOL: &[u8] = b"getBrocker";

/// Signature of the factory symbol.
pub type BrokerFactory = unsafe extern "C" fn() -> *mut BrokerHandle;

/// Kinds of implementation a broker can produce.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    Problem = 0,
    Solver = 1,
}

enum Payload {
    Problem(Box<dyn Problem>),
    Solver(Box<dyn Solver>),
}

/// Opaque handle crossing the plug-in boundary.
pub struct BrokerHandle {
    payload: Payload,
}

impl BrokerHandle {
    pub fn for_problem(problem: Box<dyn Problem>) -> Self {
        Self {
            payload: Payload::Problem(problem),
        }
    }

    pub fn for_solver(solver: Box<dyn Solver>) -> Self {
        Self {
            payload: Payload::Solver(solver),
        }
    }

    pub fn kind(&self) -> BrokerKind {
        match self.payload {
            Payload::Problem(_) => BrokerKind::Problem,
            Payload::Solver(_) => BrokerKind::Solver,
        }
    }

    pub fn can_cast_to(&self, kind: BrokerKind) -> bool {
        self.kind() == kind
    }

    /// Borrow of the wrapped problem, or `None` for a solver broker.
    pub fn problem_mut(&mut self) -> Option<&mut (dyn Problem + 'static)> {
        match &mut self.payload {
            Payload::Problem(problem) => Some(problem.as_mut()),
            Payload::Solver(_) => None,
        }
    }

    /// Borrow of the wrapped solver, or `None` for a problem broker.
    pub fn solver_mut(&mut self) -> Option<&mut dyn Solver> {
        match &mut self.payload {
            Payload::Solver(solver) => Some(solver.as_mut()),
            Payload::Problem(_) => None,
        }
    }

    /// Tears down the broker and the wrapped implementation.
    pub fn release(self) {}
}

/// Broker over the bundled reference problem. Plug-in modules return this
/// from their factory symbol; tests use it to exercise the protocol
/// in-process.
pub fn problem_broker() -> BrokerHandle {
    BrokerHandle::for_problem(Box::new(ShiftedParaboloid::new()))
}

/// Broker over the bundled projected-gradient solver.
pub fn solver_broker() -> BrokerHandle {
    BrokerHandle::for_solver(Box::new(GradientDescent::new()))
}

/// A shared module exposing a broker factory.
#[derive(Debug)]
pub struct PluginModule {
    library: Library,
}

impl PluginModule {
    /// Loads the shared module at `path`. The loader's own diagnostic is
    /// logged before the failure surfaces.
    pub fn load(path: &OsStr) -> Result<Self, Error> {
        // SAFETY: loading a module runs its initializers; the caller vouches
        // for the module being a well-formed plug-in.
        let library = unsafe { Library::new(path) }.map_err(|err| {
            tracing::error!(%err, "failed to load plug-in module");
            Error::AnyOther
        })?;
        Ok(Self { library })
    }

    /// Resolves [`BROKER_SYMBOL`] and invokes it.
    pub fn broker(&self) -> Result<LoadedBroker<'_>, Error> {
        // SAFETY: the symbol type is the published plug-in ABI.
        let factory: libloading::Symbol<'_, BrokerFactory> =
            unsafe { self.library.get(BROKER_SYMBOL) }.map_err(|err| {
                tracing::error!(%err, "plug-in module exports no broker factory");
                Error::AnyOther
            })?;
        // SAFETY: the factory returns an owned handle pointer or null.
        let raw = unsafe { factory() };
        if raw.is_null() {
            tracing::error!("plug-in factory returned a null broker");
            return Err(Error::AnyOther);
        }
        Ok(LoadedBroker {
            raw,
            _library: PhantomData,
        })
    }
}

/// Broker obtained from a loaded module. Owns the handle; the borrow on the
/// module keeps the code it points into mapped.
pub struct LoadedBroker<'lib> {
    raw: *mut BrokerHandle,
    _library: PhantomData<&'lib Library>,
}

impl LoadedBroker<'_> {
    pub fn can_cast_to(&self, kind: BrokerKind) -> bool {
        // SAFETY: `raw` is owned by `self` and non-null by construction.
        unsafe { &*self.raw }.can_cast_to(kind)
    }

    pub fn problem_mut(&mut self) -> Option<&mut (dyn Problem + 'static)> {
        // SAFETY: as above, with exclusive access through `&mut self`.
        unsafe { &mut *self.raw }.problem_mut()
    }

    pub fn solver_mut(&mut self) -> Option<&mut dyn Solver> {
        // SAFETY: as above.
        unsafe { &mut *self.raw }.solver_mut()
    }
}

impl Drop for LoadedBroker<'_> {
    fn drop(&mut self) {
        // SAFETY: the factory transferred ownership of the handle.
        unsafe { drop(Box::from_raw(self.raw)) };
    }
}
