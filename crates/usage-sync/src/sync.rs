//! sync: merge, estimate and write the usage file
//!
//! Resources are processed one after another. Each one gets a fresh tree from [merge_resource], then its
//! estimator (if any) runs over the resolved values. A failing estimator is recorded and logged, it never stops
//! the remaining resources or the final write.
use crate::merge::{merge_resource, resolve_items};
use crate::reference::{ReferenceSchema, SchemaError};
use crate::render;
use crate::resource::{EstimateUsage, EstimationContext, Project, Resource};
use crate::schema::ResourceUsage;
use crate::usage_data::{UsageData, UsageDataMap};
use crate::usage_file::{write_private, MAX_USAGE_FILE_VERSION};
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct SyncResult {
    pub resource_count: usize,
    /// resources with an estimator, successful or not
    pub estimation_count: usize,
    /// estimation failures by resource address
    pub estimation_errors: IndexMap<String, anyhow::Error>,
}

/// Sync all resources of `projects` into the usage file at `path` using the bundled reference schema
///
/// Does nothing and returns `None` when `path` is empty.
pub fn sync_usage_data(
    projects: &[Project],
    existing: &UsageDataMap,
    path: &Path,
) -> Result<Option<SyncResult>, SyncError> {
    if path.as_os_str().is_empty() {
        return Ok(None);
    }

    let reference = ReferenceSchema::bundled()?;
    Synchronizer::new(&reference)
        .sync_to_file(projects, existing, path)
        .map(Some)
}

#[derive(Debug, derive_new::new)]
pub struct Synchronizer<'r> {
    reference: &'r ReferenceSchema,
    #[new(default)]
    context: EstimationContext,
}

impl<'r> Synchronizer<'r> {
    /// Context handed to every estimator, keep a clone to cancel
    pub fn with_context(mut self, context: EstimationContext) -> Self {
        self.context = context;
        self
    }

    /// Merge and estimate, returns the resolved trees in resource order
    ///
    /// Addresses are unique in the result. A repeated address is counted but otherwise ignored.
    pub fn sync_resources<'a>(
        &self,
        resources: impl IntoIterator<Item = &'a Resource>,
        existing: &UsageDataMap,
    ) -> (SyncResult, Vec<ResourceUsage>) {
        let mut result = SyncResult::default();
        let mut usages = vec![];
        let mut seen = IndexSet::new();

        for resource in resources {
            result.resource_count += 1;

            if !seen.insert(resource.name.as_str()) {
                tracing::warn!(address = %resource.name, "duplicate resource address, keeping the first one");
                continue;
            }

            let mut usage = merge_resource(resource, self.reference, existing.get(&resource.name));

            if let Some(estimator) = &resource.estimator {
                result.estimation_count += 1;

                if let Err(err) = estimate(estimator.as_ref(), &mut usage, &self.context) {
                    tracing::warn!(
                        "Error estimating usage for resource {}: {err:#}",
                        resource.name
                    );
                    result.estimation_errors.insert(resource.name.clone(), err);
                }
            }

            tracing::debug!(address = %usage.key, has_usage = usage.has_usage(), "resource synced");
            usages.push(usage);
        }

        (result, usages)
    }

    /// Sync and write the usage file
    ///
    /// The document is rendered completely before `path` is opened.
    pub fn sync_to_file(
        &self,
        projects: &[Project],
        existing: &UsageDataMap,
        path: &Path,
    ) -> Result<SyncResult, SyncError> {
        let resources = projects.iter().flat_map(|project| project.resources.iter());
        let (result, usages) = self.sync_resources(resources, existing);

        let document = render::usage_document(MAX_USAGE_FILE_VERSION, &usages);
        write_private(path, document.as_bytes()).map_err(|source| SyncError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            resources = result.resource_count,
            estimations = result.estimation_count,
            errors = result.estimation_errors.len(),
            "usage file written"
        );
        Ok(result)
    }
}

/// Run an estimator over the resolved values of `usage`
///
/// On success the returned map is authoritative for every key it holds. On failure `usage` stays untouched.
#[tracing::instrument(level = "trace", skip_all, fields(address = %usage.key))]
fn estimate(
    estimator: &dyn EstimateUsage,
    usage: &mut ResourceUsage,
    context: &EstimationContext,
) -> anyhow::Result<()> {
    let mut attributes = usage.to_attribute_map();
    estimator.estimate_usage(context, &mut attributes)?;

    let estimated = UsageData::new(usage.key.clone(), attributes);
    usage.items = resolve_items(&usage.items, &estimated);
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Reference(#[from] SchemaError),
    #[error("Unable to write usage file {}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
