//! Root reporting for the host's tracing collector.

/// Trait for types that hold collector-managed values the collector cannot
/// see on its own.
///
/// The host calls this during its mark phase on every registered root
/// object; implementors push each value they keep alive into `roots`.
pub trait GcTrace<V> {
    /// Push all values held by `self` into `roots`.
    fn trace_roots(&self, roots: &mut Vec<V>);
}
