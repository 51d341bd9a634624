use crate::claims::Claims;

/// Identity of the caller for the duration of one request.
///
/// Lives in request extensions only; nothing stores it globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityContext {
    subject: String,
}

impl SecurityContext {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl From<&Claims> for SecurityContext {
    fn from(claims: &Claims) -> Self {
        Self::new(claims.subject.clone())
    }
}
