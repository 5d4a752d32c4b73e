//! Charts: the namespace-owning grouping entity.

use crate::naming::allocate_name;
use crate::types::{Namespace, ResourceName};
use crate::CoreError;
use canopy_tree::Scope;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Custom name-generation policy, fully replacing the default allocator.
/// Must be deterministic for a given node position and return a non-empty
/// string.
pub type NameStrategy = Box<dyn Fn(&Scope) -> String>;

pub struct ChartOptions {
    pub namespace: Namespace,
    /// Override hook for name generation. `None` uses the default
    /// path-plus-hash allocator.
    pub namer: Option<NameStrategy>,
    /// Reject a second identical generated name within this chart instead of
    /// accepting it silently. Explicit `metadata.name` values bypass the
    /// registry either way.
    pub strict_names: bool,
}

impl ChartOptions {
    pub fn new(namespace: impl Into<Namespace>) -> Self {
        ChartOptions {
            namespace: namespace.into(),
            namer: None,
            strict_names: false,
        }
    }
}

/// A chart owns a namespace string and the name-generation policy for every
/// resource registered below its scope.
///
/// Charts are attached to their scope node, so a resource anywhere in the
/// subtree finds its owner with [`Chart::of`]. The attachment is weak — the
/// chart holds its scope strongly, so a strong attachment would cycle and
/// keep the whole session tree alive. The `Rc` returned by the constructors
/// (and held by every resource in the chart) is what keeps the chart alive.
pub struct Chart {
    scope: Scope,
    namespace: Namespace,
    namer: Option<NameStrategy>,
    strict_names: bool,
    issued: RefCell<BTreeSet<String>>,
}

impl Chart {
    /// Register a chart under `scope` with the default naming policy.
    pub fn new(
        scope: &Scope,
        local_id: &str,
        namespace: impl Into<Namespace>,
    ) -> Result<Rc<Chart>, CoreError> {
        Chart::with_options(scope, local_id, ChartOptions::new(namespace))
    }

    /// Register a chart under `scope` with explicit options.
    pub fn with_options(
        scope: &Scope,
        local_id: &str,
        options: ChartOptions,
    ) -> Result<Rc<Chart>, CoreError> {
        let node = scope.child(local_id)?;
        let chart = Rc::new(Chart {
            scope: node.clone(),
            namespace: options.namespace,
            namer: options.namer,
            strict_names: options.strict_names,
            issued: RefCell::new(BTreeSet::new()),
        });
        node.attach(Rc::new(Rc::downgrade(&chart)));
        debug!(path = %node.path_string(), namespace = %chart.namespace, "registered chart");
        Ok(chart)
    }

    /// The nearest live chart owning `scope`, if any.
    pub fn of(scope: &Scope) -> Option<Rc<Chart>> {
        scope
            .find_ancestor::<Weak<Chart>>()
            .and_then(|weak| weak.upgrade())
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Generate and record a name for a node in this chart.
    ///
    /// Uses the custom namer when one is configured, otherwise the default
    /// allocator over the chart-relative path. In strict mode a repeat of an
    /// already issued name fails with [`CoreError::NameCollision`].
    pub(crate) fn issue_name(&self, node: &Scope) -> Result<ResourceName, CoreError> {
        let name = match &self.namer {
            Some(namer) => namer(node),
            None => {
                let segments = node
                    .path_segments_from(&self.scope)
                    .unwrap_or_else(|| node.path_segments());
                allocate_name(&segments).into_inner()
            }
        };
        if name.trim().is_empty() {
            return Err(CoreError::EmptyGeneratedName {
                path: node.path_string(),
            });
        }

        let fresh = self.issued.borrow_mut().insert(name.clone());
        if !fresh && self.strict_names {
            return Err(CoreError::NameCollision {
                namespace: self.namespace.as_str().to_owned(),
                name,
            });
        }
        Ok(ResourceName::new(name))
    }
}
