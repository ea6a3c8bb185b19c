//! Backend-polymorphic repository.

use domain::{Entity, Tracked};

use super::base::{ReadRepository, WriteRepository};
use super::data_service::DataServiceRepository;
use super::object_context::ObjectContextRepository;
use crate::config::RepositoryConfig;
use crate::errors::RepoResult;
use crate::infra::backend::{DataServiceContext, ObjectContext};
use crate::query::QuerySpecification;

/// A repository over either supported backend kind.
///
/// Both variants honour the same contract; callers that only need
/// [`ReadRepository`]/[`WriteRepository`] never look at the variant.
pub enum RepositoryAdapter {
    ObjectContext(ObjectContextRepository),
    DataService(DataServiceRepository),
}

macro_rules! delegate {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            RepositoryAdapter::ObjectContext($repo) => $call,
            RepositoryAdapter::DataService($repo) => $call,
        }
    };
}

impl RepositoryAdapter {
    pub fn object_context(context: Box<dyn ObjectContext>, config: RepositoryConfig) -> Self {
        Self::ObjectContext(ObjectContextRepository::new(context, config))
    }

    pub fn data_service(context: Box<dyn DataServiceContext>, config: RepositoryConfig) -> Self {
        Self::DataService(DataServiceRepository::new(context, config))
    }

    pub fn config(&self) -> &RepositoryConfig {
        delegate!(self, repo => repo.config())
    }

    /// Independent adapter over a fresh session with the same configuration
    pub fn try_clone(&self) -> RepoResult<Self> {
        Ok(match self {
            Self::ObjectContext(repo) => Self::ObjectContext(repo.try_clone()?),
            Self::DataService(repo) => Self::DataService(repo.try_clone()?),
        })
    }

    pub fn is_closed(&self) -> bool {
        delegate!(self, repo => repo.is_closed())
    }

    pub fn close(&mut self) -> RepoResult<()> {
        delegate!(self, repo => repo.close())
    }
}

impl From<ObjectContextRepository> for RepositoryAdapter {
    fn from(repo: ObjectContextRepository) -> Self {
        Self::ObjectContext(repo)
    }
}

impl From<DataServiceRepository> for RepositoryAdapter {
    fn from(repo: DataServiceRepository) -> Self {
        Self::DataService(repo)
    }
}

impl ReadRepository for RepositoryAdapter {
    fn get<T: Entity>(&mut self, spec: &QuerySpecification<T>) -> RepoResult<Vec<T>> {
        delegate!(self, repo => repo.get(spec))
    }

    fn count<T: Entity>(&mut self, spec: &QuerySpecification<T>) -> RepoResult<u64> {
        delegate!(self, repo => repo.count(spec))
    }
}

impl WriteRepository for RepositoryAdapter {
    fn add<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        delegate!(self, repo => repo.add(entity))
    }

    fn remove<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        delegate!(self, repo => repo.remove(entity))
    }

    fn attach<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        delegate!(self, repo => repo.attach(entity))
    }

    fn detach<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        delegate!(self, repo => repo.detach(entity))
    }

    fn refresh<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        delegate!(self, repo => repo.refresh(entity))
    }

    fn save(&mut self) -> RepoResult<()> {
        delegate!(self, repo => repo.save())
    }

    fn create<T: Entity>(&mut self) -> RepoResult<T> {
        delegate!(self, repo => repo.create())
    }
}
