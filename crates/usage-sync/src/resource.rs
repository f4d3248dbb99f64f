//! resources as handed over by the plan parser
use crate::schema::UsageItem;
use crate::value::AttributeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, derive_new::new)]
pub struct Project {
    pub name: String,
    #[new(default)]
    pub resources: Vec<Resource>,
}

impl Project {
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }
}

pub struct Resource {
    /// resource address, for example `module.app.aws_instance.web[0]`
    pub name: String,
    /// usage attributes declared by the resource itself
    pub usage_schema: Option<Vec<UsageItem>>,
    pub estimator: Option<Box<dyn EstimateUsage>>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage_schema: None,
            estimator: None,
        }
    }

    pub fn with_usage_schema(mut self, usage_schema: Vec<UsageItem>) -> Self {
        self.usage_schema = Some(usage_schema);
        self
    }

    pub fn with_estimator(mut self, estimator: impl EstimateUsage + 'static) -> Self {
        self.estimator = Some(Box::new(estimator));
        self
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("usage_schema", &self.usage_schema)
            .field("estimator", &self.estimator.is_some())
            .finish()
    }
}

/// Fills in usage values for one resource
///
/// The map holds all values resolved so far. Implementations write their estimates into it; whatever the map
/// holds after a successful call replaces the resource's values.
pub trait EstimateUsage {
    fn estimate_usage(
        &self,
        context: &EstimationContext,
        usage: &mut AttributeMap,
    ) -> anyhow::Result<()>;
}

// blanket impl for Fn
impl<F> EstimateUsage for F
where
    F: Fn(&EstimationContext, &mut AttributeMap) -> anyhow::Result<()>,
{
    fn estimate_usage(
        &self,
        context: &EstimationContext,
        usage: &mut AttributeMap,
    ) -> anyhow::Result<()> {
        self(context, usage)
    }
}

/// Cancellation handle passed to every estimator
///
/// Clones share the same flag. The sync itself never cancels, estimators decide whether to honor it.
#[derive(Debug, Clone, Default)]
pub struct EstimationContext {
    cancelled: Arc<AtomicBool>,
}

impl EstimationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Handle an interrupt signal
    ///
    /// The first interrupt cancels the estimation, any further one asks for an immediate exit.
    pub fn interrupt(&self) -> InterruptAction {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            InterruptAction::Exit
        } else {
            InterruptAction::Cancel
        }
    }

    /// Error out if cancelled, for use with `?` inside estimators
    pub fn check(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.is_cancelled(), "estimation cancelled");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// estimation was cancelled, let the sync finish
    Cancel,
    /// already cancelled before, stop right away
    Exit,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value;

    #[test]
    fn closures_are_estimators() {
        let resource = Resource::new("aws_lambda_function.api").with_estimator(
            |_: &EstimationContext, usage: &mut AttributeMap| {
                usage.insert("monthly_requests".to_string(), Value::Int(5));
                Ok(())
            },
        );

        let mut usage = AttributeMap::new();
        let estimator = resource.estimator.as_ref().expect("estimator");
        estimator
            .estimate_usage(&EstimationContext::new(), &mut usage)
            .expect("estimates");
        assert_eq!(usage.get("monthly_requests"), Some(&Value::Int(5)));
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let context = EstimationContext::new();
        let handle = context.clone();
        assert!(context.check().is_ok());

        handle.cancel();
        assert!(context.is_cancelled());
        assert!(context.check().is_err());
    }

    #[test]
    fn second_interrupt_exits() {
        let context = EstimationContext::new();
        let handler = context.clone();

        assert_eq!(handler.interrupt(), InterruptAction::Cancel);
        assert!(context.is_cancelled());
        assert_eq!(handler.interrupt(), InterruptAction::Exit);
        assert_eq!(handler.interrupt(), InterruptAction::Exit);
    }
}
