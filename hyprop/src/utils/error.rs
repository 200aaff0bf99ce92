use hyexpr::ExprError;
use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, Error, EnumIs)]
pub enum HybridError {
    /// The decorated function has no identifier to take the attribute name from.
    #[error(
        "Cannot infer a hybrid attribute name from `{type_name}`. Anonymous functions must be decorated with an explicit name."
    )]
    AnonymousFunction { type_name: String },

    /// A name referenced by a hybrid expression is not an attribute of the class.
    #[error(
        "Hybrid attribute `{hybrid}` of class `{class}` references `{name}`, which is neither a field nor a hybrid attribute of that class."
    )]
    UnresolvedReference {
        hybrid: String,
        name: String,
        class: String,
    },

    /// Building a hybrid attribute requires building itself.
    #[error(
        "Hybrid attributes of class `{class}` form a dependency cycle: {}",
        .chain.join(" -> ")
    )]
    CyclicDependency { class: String, chain: Vec<String> },

    /// The instance does not hold a value for a field read by a hybrid.
    #[error("Instance of class `{class}` has no value for field `{field}`.")]
    MissingField { class: String, field: String },

    #[error("Class `{class}` has no attribute `{name}`.")]
    UnknownAttribute { class: String, name: String },

    /// Class-level access to a plain field; only hybrids have a class-level value.
    #[error("`{name}` is a plain field of class `{class}`, not a hybrid attribute.")]
    NotAHybrid { class: String, name: String },

    #[error("Class `{class}` declares attribute `{name}` more than once.")]
    DuplicateAttribute { class: String, name: String },

    /// Native arithmetic failed while evaluating on an instance.
    #[error(transparent)]
    Expression(#[from] ExprError),

    /// Error raised by user code inside a hybrid function.
    #[error("Hybrid attribute evaluation failed: {0}")]
    Evaluation(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HybridError {
    /// Box a foreign error raised inside a hybrid function.
    pub fn evaluation(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HybridError::Evaluation(err.into())
    }
}

pub type HyResult<T> = Result<T, HybridError>;
