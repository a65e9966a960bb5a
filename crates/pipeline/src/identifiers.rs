//! Newtype domain identifiers.
//!
//! Every named concept in a generator compilation is represented as a distinct
//! newtype wrapping a `String`. This prevents accidentally interchanging, for
//! example, a [`NodeName`] with a [`ResourceName`] even though both are plain
//! strings in the YAML input.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error produced when an identifier is constructed from an empty string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identifier must not be empty")]
pub struct EmptyIdentifier;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and a
// TryFrom<String> used by serde so empty values are rejected on load.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(EmptyIdentifier)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single compilation run (one invocation of the compiler).
///
/// Generated fresh for every CLI invocation and recorded on the root tracing
/// span so all activity from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilationRunId(Uuid);

impl CompilationRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CompilationRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (configuration names)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a node by its configured name within a workflow graph.
    ///
    /// Node names are unique per graph. Generator node names are also used as
    /// prefixes of emitted function names, so they must be code identifiers.
    NodeName
}

string_id! {
    /// Names a registered generator type (e.g. `"list_generator"`).
    ///
    /// Exactly one generator specification is registered per type name.
    GeneratorType
}

string_id! {
    /// Names the downstream builder function a generator node expands into.
    ///
    /// The emitted code calls `{target}_builder(...)` once per item or batch.
    TargetName
}

string_id! {
    /// Names a resource bound in an execution context (e.g. a cluster).
    ResourceName
}

string_id! {
    /// Names a capability (e.g. a property preprocessor) looked up through a
    /// [`crate::CapabilityLoader`].
    CapabilityName
}

/// Reserved words of the emitted language. Soft keywords (`match`, `case`,
/// `type`) remain valid names and are not listed.
const RESERVED_WORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Returns `true` if `value` can be used verbatim as a function, parameter,
/// or keyword-argument name in emitted code.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*`, minus reserved words.
pub fn is_code_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) && !RESERVED_WORDS.contains(&value)
}
