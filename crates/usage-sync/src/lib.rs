//! # usage-sync - resource usage file synchronisation
//!
//! ## Introduction for developers
//!
//! Read this to understand how `usage-sync` works internally.
//!
//! ### Terms
//!
//! - a **usage file** is the yaml file users edit to tell the cost estimation about things a plan cannot know
//!   (requests per month, stored GB, ...)
//! - the **reference schema** is a usage file shipped with this crate. It lists the known attributes per
//!   resource type
//! - a **declared schema** is the list of attributes a resource's own estimation logic asks for
//! - an **unset** attribute only has a default, no concrete value
//!
//! A usage file looks like this:
//! ```yaml
//! version: "0.1"
//! resource_usage:
//!   aws_lambda_function.api:
//!     monthly_requests: 100000 # Monthly requests to the Lambda function.
//!     # request_duration_ms: 0 # Average duration of each request in milliseconds.
//! ```
//!
//! ### Loading
//!
//! see [usage_file::load_from_file] and [reference::ReferenceSchema::load]
//!
//! The usage file is parsed into one [usage_data::UsageData] per resource address. Values are reduced to
//! [value::Value] and are only interpreted later, when we know which type an attribute is supposed to have.
//!
//! The reference schema is parsed into [schema::UsageItem] trees. The yaml type of each example value decides
//! the attribute type, trailing comments become descriptions.
//!
//! ### Merging
//!
//! see [merge::merge_resource]
//!
//! For each resource we combine, in order of increasing precedence:
//!
//! | **source**          | **contributes**                          |
//! |---------------------|------------------------------------------|
//! | reference schema    | shape, default, description              |
//! | declared schema     | shape, default, description              |
//! | existing usage file | values                                   |
//! | estimator           | values                                   |
//!
//! The reference schema entry is found by the second to last segment of the resource address, so
//! `module.app.aws_instance.web` uses the `aws_instance` entry.
//!
//! ### Estimation
//!
//! see [sync::Synchronizer::sync_resources]
//!
//! Resources with an estimator get a plain [value::AttributeMap] of their resolved values. Whatever it holds
//! after a successful call is read back with the same typed getters as the usage file. Failures are collected
//! per resource address.
//!
//! ### Output
//!
//! see [render::usage_document]
//!
//! Every attribute is written, unset ones commented out with their default. Re-reading the output therefore
//! yields exactly the values that were set, and running the sync again produces the same file.
//!
mod comments;
pub mod merge;
pub mod reference;
pub mod render;
pub mod resource;
pub mod schema;
pub mod sync;
pub mod usage_data;
pub mod usage_file;
pub mod value;

pub use resource::{EstimateUsage, EstimationContext, InterruptAction, Project, Resource};
pub use sync::{sync_usage_data, SyncError, SyncResult, Synchronizer};
pub use usage_file::load_from_file;
