//! Repository over an object-graph persistence context.

use domain::{Entity, Tracked};

use super::base::{ReadRepository, WriteRepository};
use crate::config::RepositoryConfig;
use crate::errors::{RepoError, RepoResult};
use crate::infra::backend::{AddCall, AddEntryPoint, BackendError, EntityState, ObjectContext};
use crate::infra::entity_set::{self, EntitySet};
use crate::query::{MergeOption, QueryPlan, QuerySpecification};
use crate::types::{RefreshMode, RefreshPolicy};

/// Repository driving an [`ObjectContext`].
///
/// Owns its context until [`close`](Self::close) (or drop) releases it,
/// optionally saving first. Any operation after that fails with
/// [`RepoError::Disposed`].
pub struct ObjectContextRepository {
    context: Option<Box<dyn ObjectContext>>,
    config: RepositoryConfig,
}

impl ObjectContextRepository {
    pub fn new(context: Box<dyn ObjectContext>, config: RepositoryConfig) -> Self {
        tracing::debug!(
            context = context.context_type(),
            tracking = %config.tracking,
            "object context repository created"
        );
        Self {
            context: Some(context),
            config,
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Change-tracking state of `entity`, if the context tracks it
    pub fn entry_state<T: Entity>(&self, entity: &Tracked<T>) -> RepoResult<Option<EntityState>> {
        let context = self.context.as_deref().ok_or(RepoError::Disposed)?;
        let object = entity.object();
        if let Some(state) = context.object_state(object.object_id()) {
            return Ok(Some(state));
        }
        let set = entity_set::resolve(context, T::shape())?;
        let key = context.entity_key(&set.name, object.as_ref())?;
        Ok(context.entry_state(&key))
    }

    /// Independent repository over a fresh session with the same connection
    /// and configuration
    pub fn try_clone(&self) -> RepoResult<Self> {
        let context = self.context.as_deref().ok_or(RepoError::Disposed)?;
        Ok(Self::new(context.reopen()?, self.config.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.context.is_none()
    }

    /// Release the context, saving first when configured to.
    ///
    /// The context is released exactly once; later calls do nothing. A failed
    /// auto-save still releases the context and is returned.
    pub fn close(&mut self) -> RepoResult<()> {
        if self.context.is_none() {
            return Ok(());
        }
        let saved = if self.config.auto_save_on_dispose {
            self.save()
        } else {
            Ok(())
        };
        if let Some(mut context) = self.context.take() {
            context.close();
            tracing::debug!(context = context.context_type(), "object context released");
        }
        saved
    }

    fn merge_option(&self) -> MergeOption {
        if self.config.tracking.is_no_tracking() {
            MergeOption::NoTracking
        } else {
            MergeOption::AppendOnly
        }
    }
}

fn open(context: &mut Option<Box<dyn ObjectContext>>) -> RepoResult<&mut dyn ObjectContext> {
    match context {
        Some(context) => Ok(context.as_mut()),
        None => Err(RepoError::Disposed),
    }
}

fn plan_for<T: Entity>(
    context: &dyn ObjectContext,
    spec: &QuerySpecification<T>,
    merge: MergeOption,
) -> RepoResult<QueryPlan> {
    let EntitySet { name, shape, .. } = entity_set::resolve(context, T::shape())?;
    Ok(QueryPlan::from_spec(name, shape, spec, merge))
}

impl ReadRepository for ObjectContextRepository {
    fn get<T: Entity>(&mut self, spec: &QuerySpecification<T>) -> RepoResult<Vec<T>> {
        let merge = self.merge_option();
        let context = open(&mut self.context)?;
        let plan = plan_for(context, spec, merge)?;
        tracing::debug!(
            entity_set = %plan.entity_set,
            of_type = plan.of_type.name(),
            includes = plan.includes.len(),
            filtered = plan.filter.is_some(),
            "executing query"
        );

        context
            .execute(&plan)?
            .iter()
            .map(|record| T::from_record(record).map_err(RepoError::from))
            .collect()
    }

    fn count<T: Entity>(&mut self, spec: &QuerySpecification<T>) -> RepoResult<u64> {
        let merge = self.merge_option();
        let context = open(&mut self.context)?;
        let plan = plan_for(context, spec, merge)?.for_count();
        Ok(context.count(&plan)?)
    }
}

impl WriteRepository for ObjectContextRepository {
    fn add<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        if entity.read(T::is_empty) {
            return Err(RepoError::argument(format!(
                "cannot add an empty {}",
                T::shape().name()
            )));
        }

        let context = open(&mut self.context)?;
        let set = entity_set::resolve(context, T::shape())?;
        let points = context.add_entry_points();
        let call = if let Some(method) = AddEntryPoint::typed_for(points, set.shape.id()) {
            AddCall::Typed {
                method: method.to_string(),
            }
        } else if let Some(method) = AddEntryPoint::named(points) {
            AddCall::Named {
                method: method.to_string(),
                entity_set: set.name.clone(),
            }
        } else {
            return Err(RepoError::operation(format!(
                "{} offers no add method for {}",
                context.context_type(),
                set.shape.name()
            )));
        };

        context.add(call, entity.object())?;
        Ok(())
    }

    fn remove<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        let context = open(&mut self.context)?;
        let object = entity.object();
        if context.object_state(object.object_id()).is_some() {
            context.delete_object(object.as_ref())?;
            return Ok(());
        }

        // a value read by a tracked query stands for the entry under its key
        let set = entity_set::resolve(context, T::shape())?;
        let key = context.entity_key(&set.name, object.as_ref())?;
        match context.entry_state(&key) {
            None | Some(EntityState::Detached) => {
                context.attach_to(&set.name, object.clone())?;
                context.delete_object(object.as_ref())?;
            }
            Some(_) => context.delete_entry(&key)?,
        }
        Ok(())
    }

    fn attach<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        let context = open(&mut self.context)?;
        let set = entity_set::resolve(context, T::shape())?;
        let object = entity.object();

        let key = context.entity_key(&set.name, object.as_ref())?;
        if matches!(context.entry_state(&key), None | Some(EntityState::Detached)) {
            context.attach_to(&set.name, object.clone())?;
        }

        match context.change_state(object.as_ref(), EntityState::Modified) {
            Ok(()) => Ok(()),
            Err(BackendError::NotTracked(_) | BackendError::InvalidStateTransition { .. }) => {
                tracing::debug!(%key, "entity already tracked, applying current values");
                context.apply_current_values(&set.name, object.as_ref())?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn detach<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        let context = open(&mut self.context)?;
        context.detach(entity.object().as_ref())?;
        Ok(())
    }

    fn refresh<T: Entity>(&mut self, entity: &Tracked<T>) -> RepoResult<()> {
        let policy = self.config.refresh_policy;
        let context = open(&mut self.context)?;
        match context.refresh(RefreshMode::StoreWins, entity.object().as_ref()) {
            Err(BackendError::NotTracked(reason)) if policy == RefreshPolicy::Lenient => {
                tracing::warn!(entity = T::shape().name(), "refresh skipped: {}", reason);
                Ok(())
            }
            result => Ok(result?),
        }
    }

    fn save(&mut self) -> RepoResult<()> {
        let tracking = self.config.tracking;
        let mode = self.config.refresh_mode;
        let context = open(&mut self.context)?;

        if !tracking.refreshes_after_save() {
            let summary = context.save_changes()?;
            tracing::info!(
                inserted = summary.inserted,
                updated = summary.updated,
                deleted = summary.deleted,
                "changes saved"
            );
            return Ok(());
        }

        let changed = context.pending(&[EntityState::Added, EntityState::Modified]);
        let summary = context.save_changes()?;
        tracing::info!(
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            refreshing = changed.len(),
            "changes saved"
        );
        for object in &changed {
            context.refresh(mode, object.as_ref())?;
        }
        Ok(())
    }

    fn create<T: Entity>(&mut self) -> RepoResult<T> {
        let context = open(&mut self.context)?;
        let record = context.create_object(T::shape())?;
        Ok(T::from_record(&record)?)
    }
}

impl Drop for ObjectContextRepository {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("failed to save before releasing the context: {}", e);
        }
    }
}
