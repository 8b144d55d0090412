//! User identity service

use std::sync::Arc;

use super::authorization::{self, Action, Policy};
use crate::{
    error::AppResult,
    models::{Identity, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    policy: Arc<dyn Policy>,
}

impl UsersService {
    pub fn new(repository: Repository, policy: Arc<dyn Policy>) -> Self {
        Self { repository, policy }
    }

    /// User record of the caller
    pub async fn me(&self, identity: Option<&Identity>) -> AppResult<User> {
        let identity = authorization::require(self.policy.as_ref(), identity, Action::ViewProfile)?;
        self.repository.get_user(identity.user_id).await
    }
}
