use thiserror::Error;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::types::EntityKind;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} with this name already exists")]
    DuplicateName { kind: EntityKind },

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("{kind} with ID {id} not found")]
    NotFound { kind: EntityKind, id: i32 },

    #[error("Some {} not found: {missing:?}", .kind.plural())]
    PartialReferenceFailure { kind: EntityKind, missing: Vec<i32> },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::MissingReferences { kind, missing } => {
                ServiceError::PartialReferenceFailure { kind, missing }
            }
            other => ServiceError::Database(other),
        }
    }
}

impl ServiceError {
    pub fn not_found(kind: EntityKind, id: i32) -> Self {
        ServiceError::NotFound { kind, id }
    }

    /// Translate a storage unique violation into the conflict for `kind`.
    pub(crate) fn from_write(kind: EntityKind, err: DatabaseError) -> Self {
        match (kind, err) {
            (EntityKind::User, DatabaseError::UniqueViolation(_)) => ServiceError::DuplicateEmail,
            (kind, DatabaseError::UniqueViolation(_)) => ServiceError::DuplicateName { kind },
            (_, other) => other.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_entity() {
        assert_eq!(
            ServiceError::not_found(EntityKind::Role, 9).to_string(),
            "Role with ID 9 not found"
        );
        assert_eq!(
            ServiceError::PartialReferenceFailure {
                kind: EntityKind::Permission,
                missing: vec![999],
            }
            .to_string(),
            "Some permissions not found: [999]"
        );
        assert_eq!(
            ServiceError::DuplicateName { kind: EntityKind::Role }.to_string(),
            "Role with this name already exists"
        );
    }

    #[test]
    fn missing_references_become_partial_failures() {
        let err: ServiceError = DatabaseError::MissingReferences {
            kind: EntityKind::Role,
            missing: vec![3],
        }
        .into();
        assert!(matches!(
            err,
            ServiceError::PartialReferenceFailure { kind: EntityKind::Role, .. }
        ));
    }

    #[test]
    fn unique_violations_map_per_kind() {
        let user = ServiceError::from_write(
            EntityKind::User,
            DatabaseError::UniqueViolation("users_email_active_key".into()),
        );
        assert!(matches!(user, ServiceError::DuplicateEmail));

        let role = ServiceError::from_write(
            EntityKind::Role,
            DatabaseError::UniqueViolation("roles_name_active_key".into()),
        );
        assert!(matches!(role, ServiceError::DuplicateName { kind: EntityKind::Role }));
    }
}
