//! Type descriptors for stored resources.
//!
//! Every resource exposes its kind, group and version through the
//! [`Resource`] capability, so code that needs this metadata never has to
//! match on concrete types. Two representations exist:
//!
//! - statically-typed structs implementing [`TypedResource`] (descriptor
//!   known at compile time)
//! - [`DynamicObject`], a schema-less representation whose descriptor is
//!   read from the instance
//!
//! Missing or malformed metadata degrades to [`UNKNOWN`] instead of failing.

use crate::types::{ObjectMeta, TypeMeta};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Sentinel used when a kind or api version cannot be determined.
pub const UNKNOWN: &str = "unknown";

/// Suffix carried by list kinds (`PodList`, `WidgetList`).
const LIST_SUFFIX: &str = "List";

/// API group and version of a resource schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVersion<'a> {
    /// API group, empty for the core group.
    pub group: Cow<'a, str>,
    pub version: Cow<'a, str>,
}

impl<'a> GroupVersion<'a> {
    /// Split an `apiVersion` string on its first `/`.
    ///
    /// A value without `/` belongs to the core group.
    #[must_use]
    pub fn parse(api_version: &'a str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self {
                group: Cow::Borrowed(group),
                version: Cow::Borrowed(version),
            },
            None => Self {
                group: Cow::Borrowed(""),
                version: Cow::Borrowed(api_version),
            },
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.version.is_empty()
    }
}

impl fmt::Display for GroupVersion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

/// Kind, schema version and representation of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor<'a> {
    pub group_version: GroupVersion<'a>,
    pub kind: Cow<'a, str>,
    /// True for generic, schema-less representations.
    pub dynamic: bool,
}

impl<'a> TypeDescriptor<'a> {
    /// Descriptor of a statically-typed resource.
    #[must_use]
    pub const fn typed(
        group: &'static str,
        version: &'static str,
        kind: &'static str,
    ) -> TypeDescriptor<'static> {
        TypeDescriptor {
            group_version: GroupVersion {
                group: Cow::Borrowed(group),
                version: Cow::Borrowed(version),
            },
            kind: Cow::Borrowed(kind),
            dynamic: false,
        }
    }

    /// Descriptor read from wire type metadata.
    #[must_use]
    pub fn from_type_meta(meta: &'a TypeMeta, dynamic: bool) -> Self {
        Self {
            group_version: GroupVersion::parse(&meta.api_version),
            kind: Cow::Borrowed(&meta.kind),
            dynamic,
        }
    }

    /// Descriptor carrying no type information.
    #[must_use]
    pub const fn unknown(dynamic: bool) -> TypeDescriptor<'static> {
        TypeDescriptor {
            group_version: GroupVersion {
                group: Cow::Borrowed(""),
                version: Cow::Borrowed(""),
            },
            kind: Cow::Borrowed(""),
            dynamic,
        }
    }

    /// Strip a trailing `List` so a list descriptor names its element kind.
    #[must_use]
    pub fn trim_list_suffix(self) -> Self {
        let kind = match self.kind {
            Cow::Borrowed(kind) => Cow::Borrowed(strip_list_suffix(kind)),
            Cow::Owned(kind) => Cow::Owned(strip_list_suffix(&kind).to_string()),
        };
        Self { kind, ..self }
    }

    /// Kind label value, [`UNKNOWN`] when empty.
    #[must_use]
    pub fn kind_label(&self) -> &str {
        if self.kind.is_empty() {
            UNKNOWN
        } else {
            &self.kind
        }
    }

    /// `<group>/<version>` label value, [`UNKNOWN`] when empty.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group_version.is_empty() {
            UNKNOWN.to_string()
        } else {
            self.group_version.to_string()
        }
    }

    /// True when the kind or the version could not be determined.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.kind.is_empty() || self.group_version.is_empty()
    }
}

fn strip_list_suffix(kind: &str) -> &str {
    match kind.strip_suffix(LIST_SUFFIX) {
        Some(element) if !element.is_empty() => element,
        _ => kind,
    }
}

/// Queryable type metadata of a resource instance.
pub trait Resource: Send + Sync {
    /// Descriptor of this instance.
    fn type_descriptor(&self) -> TypeDescriptor<'_>;

    /// Descriptor known from the type alone, if any.
    fn static_descriptor() -> Option<TypeDescriptor<'static>>
    where
        Self: Sized,
    {
        None
    }
}

/// A compiled resource type with a fixed schema.
pub trait TypedResource: Send + Sync {
    /// API group, empty for the core group.
    const GROUP: &'static str;
    const VERSION: &'static str;
    const KIND: &'static str;
}

impl<T: TypedResource> Resource for T {
    fn type_descriptor(&self) -> TypeDescriptor<'_> {
        TypeDescriptor::typed(T::GROUP, T::VERSION, T::KIND)
    }

    fn static_descriptor() -> Option<TypeDescriptor<'static>> {
        Some(TypeDescriptor::typed(T::GROUP, T::VERSION, T::KIND))
    }
}

/// A resource that can be stored, addressed and (de)serialized.
pub trait Object: Resource + Serialize + DeserializeOwned + Clone + 'static {
    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;
}

/// Schema-less resource: type metadata plus arbitrary JSON fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicObject {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Every other top-level field (`spec`, `status`, ...).
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl DynamicObject {
    /// Empty object of the given type.
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: ObjectMeta) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set a top-level field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn type_meta(&self) -> TypeMeta {
        TypeMeta::new(self.api_version.clone(), self.kind.clone())
    }
}

impl Resource for DynamicObject {
    fn type_descriptor(&self) -> TypeDescriptor<'_> {
        TypeDescriptor {
            group_version: GroupVersion::parse(&self.api_version),
            kind: Cow::Borrowed(&self.kind),
            dynamic: true,
        }
    }
}

impl Object for DynamicObject {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// A list of resources of one element type.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectList<K> {
    /// List type metadata (`WidgetList`), used when elements are dynamic.
    pub types: Option<TypeMeta>,
    pub resource_version: Option<String>,
    pub items: Vec<K>,
}

impl<K> Default for ObjectList<K> {
    fn default() -> Self {
        Self {
            types: None,
            resource_version: None,
            items: Vec::new(),
        }
    }
}

impl<K> ObjectList<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty list tagged with its list type metadata.
    #[must_use]
    pub fn of_type(types: TypeMeta) -> Self {
        Self {
            types: Some(types),
            ..Self::default()
        }
    }
}

impl<K: Resource> Resource for ObjectList<K> {
    /// Descriptor of the element type, not of the list wrapper.
    fn type_descriptor(&self) -> TypeDescriptor<'_> {
        if let Some(descriptor) = K::static_descriptor() {
            return descriptor;
        }
        if let Some(types) = self.types.as_ref().filter(|types| !types.kind.is_empty()) {
            return TypeDescriptor::from_type_meta(types, true).trim_list_suffix();
        }
        match self.items.first() {
            Some(item) => item.type_descriptor(),
            None => TypeDescriptor::unknown(true),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct Deployment;

    impl TypedResource for Deployment {
        const GROUP: &'static str = "apps";
        const VERSION: &'static str = "v1";
        const KIND: &'static str = "Deployment";
    }

    struct Namespace;

    impl TypedResource for Namespace {
        const GROUP: &'static str = "";
        const VERSION: &'static str = "v1";
        const KIND: &'static str = "Namespace";
    }

    #[test]
    fn test_group_version_parse() {
        let gv = GroupVersion::parse("example.io/v1alpha1");
        assert_eq!(gv.group, "example.io");
        assert_eq!(gv.version, "v1alpha1");
        assert_eq!(gv.to_string(), "example.io/v1alpha1");

        let core = GroupVersion::parse("v1");
        assert_eq!(core.group, "");
        assert_eq!(core.to_string(), "v1");

        assert!(GroupVersion::parse("").is_empty());
    }

    #[test]
    fn test_typed_descriptor() {
        let descriptor = Deployment.type_descriptor();
        assert_eq!(descriptor.kind_label(), "Deployment");
        assert_eq!(descriptor.api_version(), "apps/v1");
        assert!(!descriptor.dynamic);

        assert_eq!(Namespace.type_descriptor().api_version(), "v1");
        assert_eq!(
            Deployment::static_descriptor(),
            Some(TypeDescriptor::typed("apps", "v1", "Deployment"))
        );
    }

    #[test]
    fn test_dynamic_descriptor() {
        let widget = DynamicObject::new("example.io/v1", "Widget");
        let descriptor = widget.type_descriptor();
        assert_eq!(descriptor.kind_label(), "Widget");
        assert_eq!(descriptor.api_version(), "example.io/v1");
        assert!(descriptor.dynamic);
        assert_eq!(DynamicObject::static_descriptor(), None);
    }

    #[test]
    fn test_missing_metadata_degrades_to_sentinel() {
        let object = DynamicObject::default();
        let descriptor = object.type_descriptor();
        assert_eq!(descriptor.kind_label(), UNKNOWN);
        assert_eq!(descriptor.api_version(), UNKNOWN);
        assert!(descriptor.is_unknown());
        assert!(descriptor.dynamic);
    }

    #[test]
    fn test_typed_list_uses_element_descriptor() {
        let list: ObjectList<Deployment> = ObjectList::new();
        let descriptor = list.type_descriptor();
        assert_eq!(descriptor.kind_label(), "Deployment");
        assert_eq!(descriptor.api_version(), "apps/v1");
        assert!(!descriptor.dynamic);
    }

    #[test]
    fn test_dynamic_list_trims_list_suffix() {
        let list: ObjectList<DynamicObject> =
            ObjectList::of_type(TypeMeta::new("example.io/v1", "WidgetList"));
        let descriptor = list.type_descriptor();
        assert_eq!(descriptor.kind_label(), "Widget");
        assert_eq!(descriptor.api_version(), "example.io/v1");
        assert!(descriptor.dynamic);
    }

    #[test]
    fn test_dynamic_list_falls_back_to_first_item() {
        let mut list: ObjectList<DynamicObject> = ObjectList::new();
        list.items.push(DynamicObject::new("batch/v1", "Job"));
        assert_eq!(list.type_descriptor().kind_label(), "Job");

        let empty: ObjectList<DynamicObject> = ObjectList::new();
        assert_eq!(empty.type_descriptor().kind_label(), UNKNOWN);
    }

    #[test]
    fn test_trim_list_suffix_keeps_bare_list_kind() {
        let descriptor = TypeDescriptor::typed("", "v1", "List").trim_list_suffix();
        assert_eq!(descriptor.kind_label(), "List");

        let owned = TypeDescriptor {
            kind: Cow::Owned("ConfigMapList".to_string()),
            ..TypeDescriptor::unknown(true)
        };
        assert_eq!(owned.trim_list_suffix().kind, "ConfigMap");
    }

    #[test]
    fn test_dynamic_object_serde_keeps_extra_fields() {
        let json = serde_json::json!({
            "apiVersion": "example.io/v1",
            "kind": "Widget",
            "metadata": { "name": "w1", "namespace": "default" },
            "spec": { "replicas": 3 }
        });

        let widget: DynamicObject = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(widget.kind, "Widget");
        assert_eq!(widget.metadata.name, "w1");
        assert_eq!(widget.data.len(), 1);
        assert!(widget.data.contains_key("spec"));

        assert_eq!(serde_json::to_value(&widget).unwrap(), json);
    }
}
