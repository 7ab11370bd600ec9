use super::EntityMetadata;

/// Aggregate root: instance accessors plus static naming metadata
pub trait AggregateRoot {
    type Id;

    fn id(&self) -> Self::Id;

    fn code(&self) -> &str;

    fn description(&self) -> &str;

    fn metadata(&self) -> &EntityMetadata;

    fn metadata_mut(&mut self) -> &mut EntityMetadata;

    /// Index of the aggregate in the system, e.g. "a001"
    fn aggregate_index() -> &'static str;

    /// Collection name, e.g. "lead"
    fn collection_name() -> &'static str;

    /// Singular display name
    fn element_name() -> &'static str;

    /// Plural display name
    fn list_name() -> &'static str;

    /// Table name, e.g. "a001_lead"
    fn full_name() -> String {
        format!("{}_{}", Self::aggregate_index(), Self::collection_name())
    }
}

/// Implements [`AggregateRoot`] for a struct with a `base: BaseAggregate<Id>` field.
#[macro_export]
macro_rules! impl_aggregate_root {
    ($ty:ty, $id:ty, $index:literal, $collection:literal, $element:literal, $list:literal) => {
        impl $crate::domain::common::AggregateRoot for $ty {
            type Id = $id;

            fn id(&self) -> Self::Id {
                self.base.id
            }

            fn code(&self) -> &str {
                &self.base.code
            }

            fn description(&self) -> &str {
                &self.base.description
            }

            fn metadata(&self) -> &$crate::domain::common::EntityMetadata {
                &self.base.metadata
            }

            fn metadata_mut(&mut self) -> &mut $crate::domain::common::EntityMetadata {
                &mut self.base.metadata
            }

            fn aggregate_index() -> &'static str {
                $index
            }

            fn collection_name() -> &'static str {
                $collection
            }

            fn element_name() -> &'static str {
                $element
            }

            fn list_name() -> &'static str {
                $list
            }
        }
    };
}
