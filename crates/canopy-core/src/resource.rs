//! The resource façade: typed nodes rendered into canonical documents.

use crate::canonical::{canonical_json, canonicalize};
use crate::chart::Chart;
use crate::resolve::resolve;
use crate::types::ResourceName;
use crate::value::Value;
use crate::CoreError;
use canopy_tree::Scope;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// A typed resource node.
///
/// Construction registers the node in the tree and fixes its name: taken
/// verbatim from `metadata.name` when the caller supplies one (the allocator
/// and the chart's name registry are bypassed, so uniqueness becomes the
/// caller's problem), otherwise allocated deterministically from the node's
/// chart-relative path. Options are stored verbatim, deferred tokens
/// included, and never mutated afterwards.
pub struct Resource {
    scope: Scope,
    chart: Rc<Chart>,
    name: ResourceName,
    api_version: String,
    kind: String,
    options: BTreeMap<String, Value>,
}

impl Resource {
    /// Register a resource under `scope`.
    ///
    /// `options` must be a mapping with non-empty string `apiVersion` and
    /// `kind` fields, and must live below a [`Chart`]. `metadata`, when
    /// present, must itself be a mapping.
    pub fn new(scope: &Scope, local_id: &str, options: Value) -> Result<Resource, CoreError> {
        let node = scope.child(local_id)?;
        let path = node.path_string();

        let Value::Map(options) = options else {
            return Err(CoreError::OptionsNotMap { path });
        };
        let api_version = require_string(&options, "apiVersion", &path)?;
        let kind = require_string(&options, "kind", &path)?;
        let metadata = match options.get("metadata") {
            None => None,
            Some(Value::Map(entries)) => Some(entries),
            Some(_) => return Err(CoreError::MetadataNotMap { path }),
        };

        let chart = Chart::of(&node).ok_or(CoreError::NoChart { path })?;

        let explicit = metadata
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str);
        let name = match explicit {
            Some(given) => {
                if given.trim().is_empty() {
                    return Err(CoreError::EmptyExplicitName {
                        path: node.path_string(),
                    });
                }
                ResourceName::new(given)
            }
            None => chart.issue_name(&node)?,
        };

        debug!(
            name = %name,
            kind = %kind,
            path = %node.path_string(),
            "registered resource"
        );
        Ok(Resource {
            scope: node,
            chart,
            name,
            api_version,
            kind,
            options,
        })
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn node(&self) -> &Scope {
        &self.scope
    }

    pub fn chart(&self) -> &Rc<Chart> {
        &self.chart
    }

    /// Render the canonical document: merge metadata, resolve every deferred
    /// token, prune absence-like values, and emit with sorted keys.
    ///
    /// Produces a fresh document on every call and has no side effects
    /// beyond first-time token memoization; safe to call repeatedly.
    pub fn render(&self) -> Result<serde_json::Value, CoreError> {
        let merged = self.merged_view();
        let resolved = resolve(&merged)?;
        let doc = canonicalize(&resolved)?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        debug!(name = %self.name, kind = %self.kind, "rendered resource");
        Ok(doc)
    }

    /// Render and encode as a compact canonical JSON string.
    ///
    /// Byte-identical across repeated renders of an unchanged tree.
    pub fn render_json(&self) -> Result<String, CoreError> {
        let merged = self.merged_view();
        let resolved = resolve(&merged)?;
        Ok(canonical_json(&resolved)?)
    }

    /// The raw options merged with identity fields. Metadata is rebuilt as
    /// `{ namespace, ..caller metadata.., name }`: the caller may override
    /// the namespace, but the resolved name always wins over a caller-placed
    /// `metadata.name`.
    fn merged_view(&self) -> Value {
        let mut top = self.options.clone();
        top.insert(
            "apiVersion".to_owned(),
            Value::String(self.api_version.clone()),
        );
        top.insert("kind".to_owned(), Value::String(self.kind.clone()));

        let mut metadata: BTreeMap<String, Value> = BTreeMap::new();
        metadata.insert(
            "namespace".to_owned(),
            Value::String(self.chart.namespace().as_str().to_owned()),
        );
        if let Some(Value::Map(caller_meta)) = self.options.get("metadata") {
            for (key, value) in caller_meta {
                metadata.insert(key.clone(), value.clone());
            }
        }
        metadata.insert(
            "name".to_owned(),
            Value::String(self.name.as_str().to_owned()),
        );
        top.insert("metadata".to_owned(), Value::Map(metadata));

        Value::Map(top)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("path", &self.scope.path_string())
            .finish()
    }
}

fn require_string(
    options: &BTreeMap<String, Value>,
    field: &'static str,
    path: &str,
) -> Result<String, CoreError> {
    match options.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_owned()),
        _ => Err(CoreError::MissingField {
            path: path.to_owned(),
            field,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart() -> (Scope, Rc<Chart>) {
        let root = Scope::root();
        let chart = Chart::new(&root, "app", "prod").unwrap();
        (root, chart)
    }

    #[test]
    fn rejects_missing_kind_and_api_version() {
        let (_root, chart) = chart();

        let err = Resource::new(
            chart.scope(),
            "a",
            Value::from(json!({"apiVersion": "v1"})),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingField { field: "kind", .. }));

        let err = Resource::new(
            chart.scope(),
            "b",
            Value::from(json!({"apiVersion": "  ", "kind": "ConfigMap"})),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingField {
                field: "apiVersion",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_map_options_and_metadata() {
        let (_root, chart) = chart();

        assert!(matches!(
            Resource::new(chart.scope(), "a", Value::from("nope")),
            Err(CoreError::OptionsNotMap { .. })
        ));
        assert!(matches!(
            Resource::new(
                chart.scope(),
                "b",
                Value::from(json!({"apiVersion": "v1", "kind": "K", "metadata": 3})),
            ),
            Err(CoreError::MetadataNotMap { .. })
        ));
    }

    #[test]
    fn requires_an_enclosing_chart() {
        let root = Scope::root();
        let err = Resource::new(
            &root,
            "orphan",
            Value::from(json!({"apiVersion": "v1", "kind": "K"})),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NoChart { .. }));
    }

    #[test]
    fn explicit_name_bypasses_allocation() {
        let (_root, chart) = chart();
        let res = Resource::new(
            chart.scope(),
            "cfg",
            Value::from(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": { "name": "given-name" },
            })),
        )
        .unwrap();

        assert_eq!(*res.name(), "given-name");
        let doc = res.render().unwrap();
        assert_eq!(doc["metadata"]["name"], json!("given-name"));
    }

    #[test]
    fn rejects_empty_explicit_name() {
        let (_root, chart) = chart();

        let err = Resource::new(
            chart.scope(),
            "cfg",
            Value::from(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": { "name": "" },
            })),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::EmptyExplicitName { .. }));

        let err = Resource::new(
            chart.scope(),
            "cfg2",
            Value::from(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": { "name": "   " },
            })),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::EmptyExplicitName { .. }));
    }

    #[test]
    fn debug_output_names_the_resource() {
        let (_root, chart) = chart();
        let res = Resource::new(
            chart.scope(),
            "cm",
            Value::from(json!({"apiVersion": "v1", "kind": "ConfigMap"})),
        )
        .unwrap();

        let rendered = format!("{res:?}");
        assert!(rendered.contains("Resource"));
        assert!(rendered.contains(res.name().as_str()));
        assert!(rendered.contains("/app/cm"));
    }

    #[test]
    fn sibling_resources_get_distinct_names() {
        let (_root, chart) = chart();
        let opts = json!({"apiVersion": "v1", "kind": "ConfigMap"});
        let a = Resource::new(chart.scope(), "a", Value::from(opts.clone())).unwrap();
        let b = Resource::new(chart.scope(), "b", Value::from(opts)).unwrap();
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn duplicate_local_ids_rejected_by_tree() {
        let (_root, chart) = chart();
        let opts = json!({"apiVersion": "v1", "kind": "ConfigMap"});
        Resource::new(chart.scope(), "dup", Value::from(opts.clone())).unwrap();
        assert!(matches!(
            Resource::new(chart.scope(), "dup", Value::from(opts)),
            Err(CoreError::Tree(_))
        ));
    }

    #[test]
    fn metadata_merge_injects_namespace_and_final_name() {
        let (_root, chart) = chart();
        let res = Resource::new(
            chart.scope(),
            "web",
            Value::from(json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": { "labels": { "tier": "front" } },
            })),
        )
        .unwrap();

        let doc = res.render().unwrap();
        assert_eq!(doc["metadata"]["namespace"], json!("prod"));
        assert_eq!(doc["metadata"]["labels"]["tier"], json!("front"));
        assert_eq!(doc["metadata"]["name"], json!(res.name().as_str()));
    }

    #[test]
    fn caller_metadata_name_loses_to_allocated_name() {
        // A name nested in metadata but NOT a string is not treated as
        // explicit; the allocator runs and its result wins in the output.
        let (_root, chart) = chart();
        let res = Resource::new(
            chart.scope(),
            "web",
            Value::from(json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": { "name": 42 },
            })),
        )
        .unwrap();

        let doc = res.render().unwrap();
        assert_eq!(doc["metadata"]["name"], json!(res.name().as_str()));
    }
}
