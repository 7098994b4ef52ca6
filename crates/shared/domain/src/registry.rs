//! Slice registry for feature crates.
//! A type-erased container for the state each feature initializes at boot.

use std::any::{Any, TypeId};
use std::fmt::Debug;

/// Feature state that can be shared across request handlers.
pub trait FeatureSlice: Any + Debug + Send + Sync {
    /// Name the slice is registered under, used in boot logs.
    fn name(&self) -> &'static str;

    /// Helper to allow downcasting from the trait object.
    fn as_any(&self) -> &dyn Any;
}

/// An initialized feature, keyed by the concrete type it was built from.
#[derive(Debug)]
pub struct InitializedSlice {
    pub id: TypeId,
    pub name: &'static str,
    pub state: Box<dyn FeatureSlice>,
}

impl InitializedSlice {
    pub fn new<T: FeatureSlice>(state: T) -> Self {
        Self { id: TypeId::of::<T>(), name: state.name(), state: Box::new(state) }
    }

    #[must_use]
    pub fn downcast<T: FeatureSlice>(&self) -> Option<&T> {
        self.state.as_any().downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Probe(u8);

    impl FeatureSlice for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn slice_downcasts_to_its_own_type_only() {
        let slice = InitializedSlice::new(Probe(7));
        assert_eq!(slice.name, "probe");
        assert_eq!(slice.id, TypeId::of::<Probe>());
        assert_eq!(slice.downcast::<Probe>().map(|p| p.0), Some(7));
    }
}
