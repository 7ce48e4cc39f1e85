//! Type descriptors for the typed codec.
//!
//! A [`TypeDescriptor`] is an explicit description of the shape a caller
//! expects back from the model. It drives both directions of the codec:
//! schema/example generation for the prompt, and structural decoding of the
//! model's reply.
//!
//! Record fields are produced lazily so that a record may refer to itself
//! (directly or through a collection) without building an infinite value.
//!
//! ```
//! use tooloop_domain::codec::{Described, FieldDescriptor, RecordType, TypeDescriptor};
//!
//! struct Weather;
//!
//! impl Described for Weather {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::Record(RecordType::new("Weather", || {
//!             vec![
//!                 FieldDescriptor::of::<String>("city"),
//!                 FieldDescriptor::of::<f64>("celsius").min(-90.0).max(60.0),
//!                 FieldDescriptor::of::<Option<String>>("note"),
//!             ]
//!         }))
//!     }
//! }
//!
//! let TypeDescriptor::Record(record) = Weather::descriptor() else { unreachable!() };
//! assert_eq!(record.fields().len(), 3);
//! assert!(!record.fields()[2].required);
//! ```

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Scalar kinds other than text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Integer,
    Float,
    Boolean,
}

impl PrimitiveKind {
    pub fn json_type(&self) -> &'static str {
        match self {
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Float => "number",
            PrimitiveKind::Boolean => "boolean",
        }
    }
}

/// Shape of a value the model is asked to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A string. As a top-level target, the reply is taken verbatim.
    Text,
    Primitive(PrimitiveKind),
    /// Ordered collection
    List(Box<TypeDescriptor>),
    /// String-keyed map
    Map(Box<TypeDescriptor>),
    Record(RecordType),
    /// Value that may be absent or null
    Optional(Box<TypeDescriptor>),
    /// Any of several substantive types, tried in order
    Union(Vec<TypeDescriptor>),
    /// Unconstrained JSON
    Any,
}

impl TypeDescriptor {
    pub fn integer() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Integer)
    }

    pub fn float() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Float)
    }

    pub fn boolean() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Boolean)
    }

    pub fn list(item: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(item))
    }

    pub fn map(value: TypeDescriptor) -> Self {
        TypeDescriptor::Map(Box::new(value))
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDescriptor::Optional(_))
    }

    /// Short name used in titles and stubs
    pub fn title(&self) -> String {
        match self {
            TypeDescriptor::Text => "string".to_string(),
            TypeDescriptor::Primitive(PrimitiveKind::Integer) => "integer".to_string(),
            TypeDescriptor::Primitive(PrimitiveKind::Float) => "float".to_string(),
            TypeDescriptor::Primitive(PrimitiveKind::Boolean) => "boolean".to_string(),
            TypeDescriptor::List(item) => format!("List[{}]", item.title()),
            TypeDescriptor::Map(value) => format!("Dict[string, {}]", value.title()),
            TypeDescriptor::Record(record) => record.name().to_string(),
            TypeDescriptor::Optional(inner) => format!("Optional[{}]", inner.title()),
            TypeDescriptor::Union(variants) => format!(
                "Union[{}]",
                variants
                    .iter()
                    .map(TypeDescriptor::title)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            TypeDescriptor::Any => "any".to_string(),
        }
    }
}

type FieldsFn = dyn Fn() -> Vec<FieldDescriptor> + Send + Sync;

/// A named record with lazily produced fields.
#[derive(Clone)]
pub struct RecordType {
    name: String,
    description: Option<String>,
    fields: Arc<FieldsFn>,
}

impl RecordType {
    pub fn new(
        name: impl Into<String>,
        fields: impl Fn() -> Vec<FieldDescriptor> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Arc::new(fields),
        }
    }

    /// Record with a fixed field list.
    pub fn with_fields(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self::new(name, move || fields.clone())
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fields(&self) -> Vec<FieldDescriptor> {
        (self.fields)()
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Records are identified by name.
impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// One field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    pub required: bool,
    pub description: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// Value used when the payload omits this field
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor, required: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            required,
            description: None,
            minimum: None,
            maximum: None,
            default: None,
        }
    }

    /// Field of type `T`, required unless `T` is optional.
    pub fn of<T: Described>(name: impl Into<String>) -> Self {
        let ty = T::descriptor();
        let required = !ty.is_optional();
        Self::new(name, ty, required)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn min(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn max(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Give the field a default; a defaulted field is never required.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }
}

/// Types that can describe their own shape.
pub trait Described {
    fn descriptor() -> TypeDescriptor;
}

impl Described for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Text
    }
}

macro_rules! described_primitive {
    ($kind:expr => $($ty:ty),+) => {
        $(
            impl Described for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::Primitive($kind)
                }
            }
        )+
    };
}

described_primitive!(PrimitiveKind::Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
described_primitive!(PrimitiveKind::Float => f32, f64);
described_primitive!(PrimitiveKind::Boolean => bool);

impl<T: Described> Described for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list(T::descriptor())
    }
}

impl<T: Described> Described for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(T::descriptor())
    }
}

impl<T: Described> Described for Box<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }
}

impl<T: Described, S> Described for HashMap<String, T, S> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(T::descriptor())
    }
}

impl<T: Described> Described for BTreeMap<String, T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(T::descriptor())
    }
}

impl Described for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node;

    impl Described for Node {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::Record(RecordType::new("Node", || {
                vec![
                    FieldDescriptor::of::<String>("label"),
                    FieldDescriptor::of::<Vec<Node>>("children"),
                ]
            }))
        }
    }

    #[test]
    fn std_types_map_to_descriptors() {
        assert_eq!(String::descriptor(), TypeDescriptor::Text);
        assert_eq!(u16::descriptor(), TypeDescriptor::integer());
        assert_eq!(f32::descriptor(), TypeDescriptor::float());
        assert_eq!(
            Vec::<Option<bool>>::descriptor(),
            TypeDescriptor::list(TypeDescriptor::optional(TypeDescriptor::boolean()))
        );
        assert_eq!(
            HashMap::<String, i64>::descriptor(),
            TypeDescriptor::map(TypeDescriptor::integer())
        );
    }

    #[test]
    fn self_referential_record_builds_lazily() {
        let TypeDescriptor::Record(node) = Node::descriptor() else {
            panic!("expected record");
        };
        let fields = node.fields();
        assert_eq!(fields[1].name, "children");
        assert_eq!(fields[1].ty, TypeDescriptor::list(Node::descriptor()));
    }

    #[test]
    fn field_builders() {
        let field = FieldDescriptor::of::<i64>("age")
            .describe("Age in years")
            .min(0.0)
            .default_value(18);
        assert!(!field.required);
        assert_eq!(field.minimum, Some(0.0));
        assert_eq!(field.default, Some(Value::from(18)));
        assert!(!FieldDescriptor::of::<Option<i64>>("x").required);
    }

    #[test]
    fn titles() {
        assert_eq!(Node::descriptor().title(), "Node");
        assert_eq!(
            Option::<Vec<Node>>::descriptor().title(),
            "Optional[List[Node]]"
        );
        assert_eq!(
            TypeDescriptor::Union(vec![TypeDescriptor::integer(), TypeDescriptor::Text]).title(),
            "Union[integer, string]"
        );
    }
}
