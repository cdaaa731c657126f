//! Pre-configured resources for client monitor tests.
//!
//! Provides:
//! - Typed core resources (`Pod`, `ConfigMap`, group `""`, version `v1`)
//! - A typed custom resource (`Widget`, `example.io/v1`)
//! - Dynamic builders for the same custom resource and its list

use common::{DynamicObject, Object, ObjectList, ObjectMeta, TypeMeta, TypedResource};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// API version of the custom `Widget` resource.
pub const WIDGET_API_VERSION: &str = "example.io/v1";

/// Test pod fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PodStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodStatus {
    pub phase: String,
}

impl Pod {
    /// Set a metadata label.
    #[must_use]
    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.metadata
            .labels
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl TypedResource for Pod {
    const GROUP: &'static str = "";
    const VERSION: &'static str = "v1";
    const KIND: &'static str = "Pod";
}

impl Object for Pod {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Test config map fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigMap {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl TypedResource for ConfigMap {
    const GROUP: &'static str = "";
    const VERSION: &'static str = "v1";
    const KIND: &'static str = "ConfigMap";
}

impl Object for ConfigMap {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Typed custom resource fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: WidgetSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WidgetStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSpec {
    pub size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetStatus {
    pub ready: bool,
}

impl TypedResource for Widget {
    const GROUP: &'static str = "example.io";
    const VERSION: &'static str = "v1";
    const KIND: &'static str = "Widget";
}

impl Object for Widget {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Pod with a single `app` container.
#[must_use]
pub fn pod(namespace: &str, name: &str) -> Pod {
    Pod {
        metadata: ObjectMeta::namespaced(namespace, name),
        spec: PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                image: "registry.local/app:1.0".to_string(),
            }],
        },
        status: None,
    }
}

#[must_use]
pub fn config_map(namespace: &str, name: &str, data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta::namespaced(namespace, name),
        data: data
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    }
}

#[must_use]
pub fn widget(namespace: &str, name: &str, size: u32) -> Widget {
    Widget {
        metadata: ObjectMeta::namespaced(namespace, name),
        spec: WidgetSpec { size },
        status: None,
    }
}

/// `Widget` in its dynamic representation.
#[must_use]
pub fn dynamic_widget(namespace: &str, name: &str, size: u32) -> DynamicObject {
    DynamicObject::new(WIDGET_API_VERSION, "Widget")
        .with_metadata(ObjectMeta::namespaced(namespace, name))
        .with_field("spec", json!({ "size": size }))
}

/// Empty dynamic list tagged as `WidgetList`.
#[must_use]
pub fn dynamic_widget_list() -> ObjectList<DynamicObject> {
    ObjectList::of_type(TypeMeta::new(WIDGET_API_VERSION, "WidgetList"))
}
