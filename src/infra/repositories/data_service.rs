//! Repository over a remote entity-collection service.
//!
//! Remote services address entity sets by the entity's own shape name, do not
//! support eager loading, and replace whole entities on update. Refresh is a
//! no-op: the service owns the values.

use domain::{Entity, Tracked};

use super::base::{ReadRepository, WriteRepository};
use crate::config::RepositoryConfig;
use crate::errors::{RepoError, RepoResult};
use crate::infra::backend::{AddEntryPoint, DataServiceContext, SaveOptions};
use crate::query::{QuerySpecification, ServiceQuery};

pub struct DataServiceRepository {
    context: Option<Box<dyn DataServiceContext>>,
    config: RepositoryConfig,
}

impl DataServiceRepository {
    pub fn new(context: Box<dyn DataServiceContext>, config: RepositoryConfig) -> Self {
        tracing::debug!(
            service = %context.service_root(),
            "data service repository created"
        );
        Self {
            context: Some(context),
            config,
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn try_clone(&self) -> RepoResult<Self> {
        let context = self.context.as_deref().ok_or(RepoError::Disposed)?;
        Ok(Self::new(context.reopen()?, self.config.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.context.is_none()
    }

    /// Release the service session, saving first when configured to
    pub fn close(&mut self) -> RepoResult<()> {
        if self.context.is_none() {
            return Ok(());
        }
        let saved = if self.config.auto_save_on_dispose {
            self.save()
        } else {
            Ok(())
        };
        if let Some(context) = self.context.take() {
            tracing::debug!(service = %context.service_root(), "data service released");
        }
        saved
    }
}

fn open(context: &mut Option<Box<dyn DataServiceContext>>) -> RepoResult<&mut dyn DataServiceContext> {
    match context {
        Some(context) => Ok(context.as_mut()),
        None => Err(RepoError::Disposed),
    }
}

fn query_for<T: Entity>(spec: &QuerySpecification<T>) -> RepoResult<ServiceQuery> {
    if !spec.preloaded_members().is_empty() {
        return Err(RepoError::operation(format!(
            "eager loading is not supported by data services ({})",
            T::shape().name()
        )));
    }
    Ok(ServiceQuery::from_spec(T::shape().name(), spec))
}

impl ReadRepository for DataServiceRepository {
    fn get<T: Entity>(&mut self, spec: &QuerySpecification<T>) -> RepoResult<Vec<T>> {
        let query = query_for(spec)?;
        let context = open(&mut self.context)?;
        tracing::debug!(entity_set = %query.entity_set, "querying data service");

        context
            .execute(&query)?
            .iter()
            .map(|record| T::from_record(record).map_err(RepoError::from))
            .collect()
    }

    fn count<T: Entity>(&mut self, spec: &QuerySpecification<T>) -> RepoResult<u64> {
        let query = query_for(spec)?.for_count();
        let context = open(&mut self.context)?;
        Ok(context.count(&query)?)
    }
}

impl WriteRepository for DataServiceRepository {
    fn add<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        if entity.read(T::is_empty) {
            return Err(RepoError::argument(format!(
                "cannot add an empty {}",
                T::shape().name()
            )));
        }

        let context = open(&mut self.context)?;
        let points = context.add_entry_points();
        let method = AddEntryPoint::typed_for(&points, T::shape().id()).ok_or_else(|| {
            RepoError::operation(format!(
                "{} offers no add method for {}",
                context.service_root(),
                T::shape().name()
            ))
        })?;

        context.add(method, entity.object())?;
        Ok(())
    }

    fn remove<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        let context = open(&mut self.context)?;
        context.delete_object(entity.object())?;
        Ok(())
    }

    fn attach<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        let context = open(&mut self.context)?;
        context.attach_to(T::shape().name(), entity.object())?;
        Ok(())
    }

    fn detach<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        let context = open(&mut self.context)?;
        context.detach(entity.object())?;
        Ok(())
    }

    fn refresh<T: Entity>(&mut self, _entity: &Tracked<T>) -> RepoResult<()> {
        open(&mut self.context)?;
        Ok(())
    }

    fn save(&mut self) -> RepoResult<()> {
        let context = open(&mut self.context)?;
        context.save_changes(SaveOptions {
            replace_on_update: true,
        })?;
        tracing::info!(service = %context.service_root(), "changes saved");
        Ok(())
    }

    fn create<T: Entity>(&mut self) -> RepoResult<T> {
        open(&mut self.context)?;
        Ok(T::default())
    }
}

impl Drop for DataServiceRepository {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("failed to save before releasing the data service: {}", e);
        }
    }
}
