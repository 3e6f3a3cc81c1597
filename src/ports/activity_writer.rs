//! Activity sink port.

use async_trait::async_trait;

use crate::domain::billing::Activity;
use crate::domain::foundation::DomainError;

/// Fire-and-forget from the reconciler's perspective: callers log failures
/// and move on.
#[async_trait]
pub trait ActivityWriter: Send + Sync {
    async fn write(&self, activity: Activity) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_writer_is_object_safe() {
        fn _accepts_dyn(_: &dyn ActivityWriter) {}
    }
}
