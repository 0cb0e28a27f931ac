use serde::{Serialize, Serializer};
use std::fmt;

/// Call graph node key: a function or method qualified by its package path.
///
/// `member` is `Name` for functions and `Receiver.Name` for methods, so the
/// display form is `example.com/app/internal/orders.Service.Place`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedFunction {
    pub package: String,
    pub member: String,
}

impl QualifiedFunction {
    pub fn new(package: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            member: member.into(),
        }
    }

    pub fn method(package: impl Into<String>, receiver: &str, name: &str) -> Self {
        Self::new(package, format!("{}.{}", receiver, name))
    }

    /// Simple name (last segment of the member).
    pub fn name(&self) -> &str {
        self.member.rsplit('.').next().unwrap_or(&self.member)
    }

    pub fn is_method(&self) -> bool {
        self.member.contains('.')
    }
}

impl fmt::Display for QualifiedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.member)
    }
}

impl Serialize for QualifiedFunction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
