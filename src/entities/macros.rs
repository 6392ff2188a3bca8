//! Macros for reducing boilerplate when defining entities
//!
//! `impl_entity!` generates the struct, its `Entity` implementation and the
//! path-to-accessor table that query predicates and comparators read from.

/// Complete macro to create an entity with an automatic `Entity` implementation
///
/// Every field type must convert into [`FieldValue`](crate::core::field::FieldValue)
/// (strings, integers, floats, booleans, UUIDs, timestamps and `Option`s of those).
///
/// # Example
///
/// ```rust,ignore
/// use hazel_data::prelude::*;
///
/// impl_entity!(
///     Person,
///     "person",
///     key_space: "people",
///     id: String,
///     {
///         firstname: String,
///         lastname: String,
///         age: i64,
///     }
/// );
///
/// let person = Person::new("1".to_string(), "Dave".to_string(), "Matthews".to_string(), 47);
/// assert_eq!(person.field_value("age"), Some(FieldValue::Integer(47)));
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ident,
        $type_name:expr,
        id: $id_type:ty,
        {
            $( $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        $crate::impl_entity!(
            $type,
            $type_name,
            key_space: $type_name,
            id: $id_type,
            { $( $field : $field_type ),* }
        );
    };
    (
        $type:ident,
        $type_name:expr,
        key_space: $key_space:expr,
        id: $id_type:ty,
        {
            $( $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Identity key of this entity
            pub id: $id_type,
            $( pub $field : $field_type ),*
        }

        impl $crate::core::entity::Entity for $type {
            type Id = $id_type;

            fn entity_name() -> &'static str {
                $type_name
            }

            fn key_space() -> &'static str {
                $key_space
            }

            fn id_property() -> Option<&'static str> {
                Some("id")
            }

            fn properties() -> &'static [&'static str] {
                &["id", $( stringify!($field) ),*]
            }

            fn id(&self) -> $id_type {
                self.id.clone()
            }

            fn field_value(&self, path: &str) -> Option<$crate::core::field::FieldValue> {
                match path {
                    "id" => Some($crate::core::field::FieldValue::from(self.id.clone())),
                    $(
                        stringify!($field) => {
                            Some($crate::core::field::FieldValue::from(self.$field.clone()))
                        }
                    )*
                    _ => None,
                }
            }
        }

        impl $type {
            /// Create a new instance of this entity
            #[allow(clippy::too_many_arguments)]
            pub fn new(id: $id_type, $( $field : $field_type ),*) -> Self {
                Self { id, $( $field ),* }
            }
        }
    };
}
