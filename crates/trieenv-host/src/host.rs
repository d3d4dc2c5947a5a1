//! The host runtime's side of the backing-store protocol.
//!
//! A host that wants to resolve an environment's names through an external
//! store implements [`HostValue`] for its value type and
//! [`HostEnvironment`] for its environment objects. The store it receives
//! implements [`BackingStore`].

use std::any::Any;

pub use trieenv_core::GcTrace;

use crate::error::HostResult;

/// A host value reference as seen by a backing store.
///
/// The store clones and returns these but never looks inside.
pub trait HostValue: Clone + 'static {
    /// The distinguished "no binding for this name" value.
    fn unbound() -> Self;

    /// True iff `self` is the unbound sentinel.
    fn is_unbound(&self) -> bool;
}

/// What the teardown hook did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Entries live when the table was released
    pub entries: usize,
    /// Approximate heap bytes released
    pub bytes: usize,
    /// The table had already been released by an earlier call
    pub already_torn_down: bool,
}

/// Capability set the host dispatches name resolution to.
///
/// The host also treats the installed store as a collector root: it calls
/// [`GcTrace::trace_roots`] during marking so bound values stay alive.
pub trait BackingStore<V: HostValue>: GcTrace<V> + Any {
    /// Whether `name` is bound. Always false while the store is inactive.
    fn exists(&self, name: &[u8]) -> bool;

    /// Value bound to `name`, or [`HostValue::unbound`].
    fn get(&self, name: &[u8]) -> V;

    /// Bind `name` to `value` and return the value.
    /// Returns [`HostValue::unbound`] without binding while inactive.
    fn assign(&mut self, name: &[u8], value: V) -> HostResult<V>;

    /// Unbind `name`. True iff a binding was deleted.
    fn remove(&mut self, name: &[u8]) -> HostResult<bool>;

    /// Every bound name in ascending byte order.
    fn enumerate(&self) -> HostResult<Vec<Vec<u8>>>;

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    /// The store as `Any`, for handing to its [`Finalizer`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Teardown hook registered alongside a store.
///
/// The host calls it with the installed store (via
/// [`BackingStore::as_any_mut`]) when the owning environment is collected.
pub type Finalizer = fn(&mut dyn Any) -> HostResult<TeardownReport>;

/// A host environment object that can take a backing store.
pub trait HostEnvironment<V: HostValue> {
    /// Route this environment's name resolution through `store`, and run
    /// `finalizer` on it when the environment is collected.
    fn install_backing_store(&mut self, store: Box<dyn BackingStore<V>>, finalizer: Finalizer);
}
