// Catalog extractors. Each submodule owns one object kind: its record types,
// its catalog query and the row decoding for it.

pub mod filter;
pub mod language;
pub mod oid;
pub mod operator;
pub mod operator_class;
pub mod resolver;
pub mod schema;

pub use language::{get_procedural_languages, ProceduralLanguage};
pub use oid::Oid;
pub use operator::{get_operator_families, get_operators, Operator, OperatorFamily};
pub use operator_class::{get_operator_classes, OperatorClass, OperatorClassFunction, OperatorClassOperator};
pub use resolver::{function_oid, resolve_oid, ObjectKind, ObjectName};
pub use schema::{get_all_user_schemas, Schema};

/// Marker for "not applicable" in text fields: a missing operand, an unset
/// commutator/negator/selectivity function, or a storage type equal to the
/// indexed type.
pub const NONE_SENTINEL: &str = "-";
