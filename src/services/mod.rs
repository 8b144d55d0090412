//! Business logic services

pub mod authorization;
pub mod catalog;
pub mod circulation;
pub mod users;

use std::sync::Arc;

use crate::{config::CirculationConfig, repository::Repository};
use authorization::{Policy, RolePolicy};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, circulation_config: CirculationConfig) -> Self {
        let policy: Arc<dyn Policy> = Arc::new(RolePolicy);
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), policy.clone()),
            circulation: circulation::CirculationService::new(
                repository.clone(),
                policy.clone(),
                circulation_config,
            ),
            users: users::UsersService::new(repository, policy),
        }
    }
}
