//! Role-based authorization decisions
//!
//! Services ask a [`Policy`] before doing any work. The policy only looks at
//! the caller's identity, so it can be tested apart from storage.

use crate::{
    error::{AppError, AppResult},
    models::{Identity, Role},
};

/// Operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    BorrowBook,
    ReturnBook,
    ListBorrowedBooks,
    ListOwnBooks,
    CreateBook,
    ViewProfile,
}

impl Action {
    /// Role the caller must hold, `None` when any authenticated caller may act
    pub fn required_role(self) -> Option<Role> {
        match self {
            Action::BorrowBook
            | Action::ReturnBook
            | Action::ListBorrowedBooks
            | Action::CreateBook => Some(Role::Librarian),
            Action::ListOwnBooks => Some(Role::Student),
            Action::ViewProfile => None,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Action::BorrowBook => "borrow books",
            Action::ReturnBook => "return books",
            Action::ListBorrowedBooks => "list borrowed books",
            Action::ListOwnBooks => "list your books",
            Action::CreateBook => "add books to the catalog",
            Action::ViewProfile => "view your profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    Unauthenticated,
    WrongRole { required: Role, actual: Role },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

impl Decision {
    /// Turn a denial into the matching request error
    pub fn into_result(self, action: Action) -> AppResult<()> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(DenialReason::Unauthenticated) => Err(AppError::Unauthenticated(
                format!("You have to be logged in to {}", action.describe()),
            )),
            Decision::Denied(DenialReason::WrongRole { required, actual }) => {
                Err(AppError::Forbidden(format!(
                    "Only a {} can {} (you are a {})",
                    required,
                    action.describe(),
                    actual
                )))
            }
        }
    }
}

pub trait Policy: Send + Sync {
    fn authorize(&self, identity: Option<&Identity>, action: Action) -> Decision;
}

/// Authorize `action` and hand back the caller it was granted to
pub fn require<'a>(
    policy: &dyn Policy,
    identity: Option<&'a Identity>,
    action: Action,
) -> AppResult<&'a Identity> {
    policy.authorize(identity, action).into_result(action)?;
    identity.ok_or_else(|| {
        AppError::Unauthenticated(format!("You have to be logged in to {}", action.describe()))
    })
}

/// Exact role match against [`Action::required_role`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl Policy for RolePolicy {
    fn authorize(&self, identity: Option<&Identity>, action: Action) -> Decision {
        let Some(identity) = identity else {
            return Decision::Denied(DenialReason::Unauthenticated);
        };

        match action.required_role() {
            Some(required) if identity.role != required => {
                Decision::Denied(DenialReason::WrongRole {
                    required,
                    actual: identity.role,
                })
            }
            _ => Decision::Allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARIAN: Identity = Identity {
        user_id: 1,
        role: Role::Librarian,
    };
    const STUDENT: Identity = Identity {
        user_id: 2,
        role: Role::Student,
    };
    const STRANGER: Identity = Identity {
        user_id: 3,
        role: Role::Unknown,
    };

    #[test]
    fn test_mutations_require_librarian() {
        for action in [Action::BorrowBook, Action::ReturnBook, Action::CreateBook] {
            assert_eq!(RolePolicy.authorize(Some(&LIBRARIAN), action), Decision::Allowed);
            assert_eq!(
                RolePolicy.authorize(Some(&STUDENT), action),
                Decision::Denied(DenialReason::WrongRole {
                    required: Role::Librarian,
                    actual: Role::Student,
                })
            );
        }
    }

    #[test]
    fn test_own_books_require_student() {
        assert_eq!(RolePolicy.authorize(Some(&STUDENT), Action::ListOwnBooks), Decision::Allowed);
        assert!(matches!(
            RolePolicy.authorize(Some(&LIBRARIAN), Action::ListOwnBooks),
            Decision::Denied(DenialReason::WrongRole { .. })
        ));
    }

    #[test]
    fn test_unknown_role_only_views_profile() {
        assert_eq!(RolePolicy.authorize(Some(&STRANGER), Action::ViewProfile), Decision::Allowed);
        assert!(matches!(
            RolePolicy.authorize(Some(&STRANGER), Action::ListBorrowedBooks),
            Decision::Denied(_)
        ));
    }

    #[test]
    fn test_anonymous_is_unauthenticated() {
        let decision = RolePolicy.authorize(None, Action::ViewProfile);
        assert_eq!(decision, Decision::Denied(DenialReason::Unauthenticated));
        assert!(matches!(
            decision.into_result(Action::ViewProfile),
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_wrong_role_is_forbidden() {
        let result = RolePolicy
            .authorize(Some(&STUDENT), Action::BorrowBook)
            .into_result(Action::BorrowBook);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
