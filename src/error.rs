//! Error types for the resolution engine.

use thiserror::Error;

/// Dependency injection errors
///
/// Represents every failure the container can report while registering
/// definitions, selecting candidates, or constructing components.
///
/// Optional injection points never surface `NoMatchingComponent`: when
/// nothing matches they degrade to `None` or an empty collection. Several
/// candidates that no tie-break separates are still reported as ambiguity.
///
/// # Examples
///
/// ```rust
/// use autowire::DiError;
///
/// let circular = DiError::Circular(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
/// assert_eq!(circular.to_string(), "Circular dependency: a -> b -> a");
///
/// let missing = DiError::NotFound("repository".to_string());
/// assert_eq!(missing.to_string(), "No component named 'repository'");
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No definition or singleton registered under the name
    #[error("No component named '{0}'")]
    NotFound(String),

    /// A definition already exists and overriding is disallowed
    #[error("Cannot register definition '{name}': already bound to [{existing}] and overriding is disabled")]
    DuplicateDefinition { name: String, existing: String },

    /// The definition is structurally invalid (or abstract and used directly)
    #[error("Invalid definition '{name}': {reason}")]
    Validation { name: String, reason: String },

    /// Zero candidates for a required dependency
    #[error("No qualifying component of type '{type_name}': {reason}")]
    NoMatchingComponent { type_name: String, reason: String },

    /// More than one candidate and no tie-break applied
    #[error("Expected a single matching component of type '{type_name}' but found {}: {}", .candidates.len(), .candidates.join(", "))]
    NoUniqueCandidate { type_name: String, candidates: Vec<String> },

    /// More than one locally defined primary candidate
    #[error("More than one 'primary' component of type '{type_name}' among candidates: {}", .candidates.join(", "))]
    AmbiguousPrimary { type_name: String, candidates: Vec<String> },

    /// More than one candidate sharing the lowest priority value
    #[error("Multiple components of type '{type_name}' share priority {priority} among candidates: {}", .candidates.join(", "))]
    AmbiguousPriority { type_name: String, priority: i32, candidates: Vec<String> },

    /// Construction cycle detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),

    /// Candidate resolved but its instance is not of the required type
    #[error("Component '{name}' is expected to be of type '{expected}' but was actually of type '{actual}'")]
    TypeMismatch { name: String, expected: String, actual: String },

    /// Literal value conversion failed
    #[error("Cannot convert value '{value}' to '{target}': {reason}")]
    Conversion { value: String, target: String, reason: String },

    /// A constructor or factory failed while creating the named component
    #[error("Error creating component '{name}': {source}")]
    Creation {
        name: String,
        #[source]
        source: Box<DiError>,
    },

    /// Maximum recursion depth exceeded
    #[error("Max resolution depth {0} exceeded")]
    DepthExceeded(usize),
}

impl DiError {
    /// Wraps a constructor failure with the component being created.
    ///
    /// Cycles and depth overruns pass through untouched so the cycle path stays
    /// readable at the top of the chain.
    pub(crate) fn creating(name: &str, source: DiError) -> DiError {
        match source {
            DiError::Circular(_) | DiError::DepthExceeded(_) => source,
            DiError::Creation { .. } if source.component_name() == Some(name) => source,
            other => DiError::Creation {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error of a `Creation` chain.
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let DiError::Creation { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns the component this error is about, if any.
    pub fn component_name(&self) -> Option<&str> {
        match self {
            DiError::NotFound(name)
            | DiError::DuplicateDefinition { name, .. }
            | DiError::Validation { name, .. }
            | DiError::TypeMismatch { name, .. }
            | DiError::Creation { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// True for the absence/ambiguity family that optional injection points swallow.
    pub fn is_resolution_miss(&self) -> bool {
        matches!(
            self.root_cause(),
            DiError::NoMatchingComponent { .. }
                | DiError::NoUniqueCandidate { .. }
                | DiError::NotFound(_)
        )
    }

    pub(crate) fn validation(name: impl Into<String>, reason: impl Into<String>) -> DiError {
        DiError::Validation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_match(type_name: impl Into<String>, reason: impl Into<String>) -> DiError {
        DiError::NoMatchingComponent {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for DI operations
///
/// A convenience alias for `Result<T, DiError>` used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;
