//! In-memory object store implementing the client capability traits.
//!
//! Objects are stored as JSON keyed by `(apiVersion, kind, namespace,
//! name)`, so a typed `Pod` written through the mock can be read back as
//! a `DynamicObject` and vice versa. The mock also keeps a call log and
//! supports injected failures and artificial latency.
//!
//! # Example
//!
//! ```rust,ignore
//! use monitor_test_utils::{fixtures, MockClient, StoreError};
//! use client_monitor::Verb;
//!
//! let client = MockClient::new()
//!     .with_object(&fixtures::pod("default", "web"))
//!     .with_failure(Verb::Delete, StoreError::Injected("etcd down".into()))
//!     .with_latency(Duration::from_millis(20));
//!
//! client.get(&key, &mut pod).await?;
//! assert_eq!(client.call_count(Verb::Get), 1);
//! ```

use async_trait::async_trait;
use client_monitor::client::{
    Client, CreateOptions, DeleteAllOfOptions, DeleteOptions, ListOptions, Patch, PatchOptions,
    Reader, StatusWriter, UpdateOptions,
};
use client_monitor::Verb;
use common::{Object, ObjectKey, ObjectList, Resource};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Error from mock store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Object already exists: {0}")]
    AlreadyExists(String),
    #[error("Conflict on {key}: stored version {stored}, got {provided}")]
    Conflict {
        key: String,
        stored: String,
        provided: String,
    },
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// One call received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub verb: Verb,
    pub api_version: String,
    pub kind: String,
    /// Addressed object, `None` for list and delete-all-of.
    pub key: Option<ObjectKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StoreKey {
    api_version: String,
    kind: String,
    namespace: Option<String>,
    name: String,
}

impl StoreKey {
    fn new(types: &(String, String), key: &ObjectKey) -> Self {
        Self {
            api_version: types.0.clone(),
            kind: types.1.clone(),
            namespace: key.namespace.clone(),
            name: key.name.clone(),
        }
    }

    fn is_type(&self, types: &(String, String)) -> bool {
        self.api_version == types.0 && self.kind == types.1
    }

    fn describe(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{} {namespace}/{}", self.kind, self.name),
            None => format!("{} {}", self.kind, self.name),
        }
    }
}

#[derive(Debug, Default)]
struct MockStore {
    objects: BTreeMap<StoreKey, Value>,
    calls: Vec<MockCall>,
    failures: HashMap<Verb, StoreError>,
    revision: u64,
}

impl MockStore {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }

    fn stored(&self, key: &StoreKey) -> Result<&Value, StoreError> {
        self.objects
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.describe()))
    }

    fn check_version(&self, key: &StoreKey, provided: Option<&str>) -> Result<(), StoreError> {
        let stored = resource_version(self.stored(key)?);
        match (provided, stored) {
            (Some(provided), Some(stored)) if provided != stored => Err(StoreError::Conflict {
                key: key.describe(),
                stored: stored.to_string(),
                provided: provided.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Stamp a new resource version on `value` and store it.
    fn commit(&mut self, key: StoreKey, mut value: Value) -> Value {
        let revision = self.next_revision();
        set_resource_version(&mut value, &revision);
        self.objects.insert(key, value.clone());
        value
    }
}

/// In-memory client and cache for tests.
///
/// Clones share the same store and call log.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    inner: Arc<Mutex<MockStore>>,
    latency: Option<Duration>,
}

impl MockClient {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with `obj`.
    #[must_use]
    pub fn with_object<K: Object>(self, obj: &K) -> Self {
        {
            let value = to_stored_value(obj).unwrap();
            let key = StoreKey::new(&type_of(obj), &obj.metadata().key());
            let mut store = self.lock();
            store.commit(key, value);
        }
        self
    }

    /// Fail every `verb` call with `error` until cleared.
    #[must_use]
    pub fn with_failure(self, verb: Verb, error: StoreError) -> Self {
        self.lock().failures.insert(verb, error);
        self
    }

    /// Delay every call by `latency` before it touches the store.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, verb: Verb) -> usize {
        self.lock().calls.iter().filter(|c| c.verb == verb).count()
    }

    /// Number of stored objects of every type.
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    /// Stored JSON of the object of `K`'s type at `key`.
    pub fn stored<K: Object>(&self, template: &K, key: &ObjectKey) -> Option<Value> {
        let key = StoreKey::new(&type_of(template), key);
        self.lock().objects.get(&key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockStore> {
        self.inner.lock().unwrap()
    }

    /// Log the call, wait out the latency, then apply injected failures.
    async fn enter(&self, call: MockCall) -> Result<(), StoreError> {
        let verb = call.verb;
        self.lock().calls.push(call);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self.lock().failures.get(&verb).cloned();
        failure.map_or(Ok(()), Err)
    }

    fn call_for(verb: Verb, obj: &dyn Resource, key: Option<ObjectKey>) -> MockCall {
        let (api_version, kind) = type_of(obj);
        MockCall {
            verb,
            api_version,
            kind,
            key,
        }
    }

    fn write<K: Object>(
        &self,
        obj: &mut K,
        apply: impl FnOnce(&Value, Value) -> Result<Value, StoreError>,
    ) -> Result<(), StoreError> {
        let key = StoreKey::new(&type_of(&*obj), &obj.metadata().key());
        let provided = obj.metadata().resource_version.clone();
        let incoming = to_stored_value(&*obj)?;

        let committed = {
            let mut store = self.lock();
            store.check_version(&key, provided.as_deref())?;
            let updated = apply(store.stored(&key)?, incoming)?;
            store.commit(key, updated)
        };

        *obj = serde_json::from_value(committed)?;
        Ok(())
    }

    fn patch_stored<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        status_only: bool,
    ) -> Result<(), StoreError> {
        let types = type_of(&*obj);
        let key = StoreKey::new(&types, &obj.metadata().key());

        let committed = {
            let mut store = self.lock();
            let mut value = store.stored(&key)?.clone();
            if status_only {
                let mut status = value.get("status").cloned().unwrap_or(Value::Null);
                apply_patch(&mut status, &status_patch(patch)?)?;
                set_field(&mut value, "status", status);
            } else {
                apply_patch(&mut value, patch)?;
            }
            stamp_type(&mut value, &types);
            store.commit(key, value)
        };

        *obj = serde_json::from_value(committed)?;
        Ok(())
    }
}

#[async_trait]
impl Reader for MockClient {
    type Error = StoreError;

    async fn get<K: Object>(&self, key: &ObjectKey, obj: &mut K) -> Result<(), Self::Error> {
        self.enter(Self::call_for(Verb::Get, &*obj, Some(key.clone())))
            .await?;

        let value = {
            let store = self.lock();
            store.stored(&StoreKey::new(&type_of(&*obj), key))?.clone()
        };
        *obj = serde_json::from_value(value)?;
        Ok(())
    }

    async fn list<K: Object>(
        &self,
        list: &mut ObjectList<K>,
        opts: &ListOptions,
    ) -> Result<(), Self::Error> {
        self.enter(Self::call_for(Verb::List, &*list, None)).await?;

        let types = type_of(&*list);
        let (values, revision) = {
            let store = self.lock();
            let values: Vec<Value> = store
                .objects
                .iter()
                .filter(|(key, value)| key.is_type(&types) && matches(key, value, opts))
                .map(|(_, value)| value.clone())
                .take(opts.limit.map_or(usize::MAX, |limit| limit as usize))
                .collect();
            (values, store.revision.to_string())
        };

        list.items = values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        list.resource_version = Some(revision);
        Ok(())
    }
}

#[async_trait]
impl Client for MockClient {
    type Status = MockStatusWriter;

    async fn create<K: Object>(
        &self,
        obj: &mut K,
        _opts: &CreateOptions,
    ) -> Result<(), Self::Error> {
        let object_key = obj.metadata().key();
        self.enter(Self::call_for(Verb::Create, &*obj, Some(object_key.clone())))
            .await?;

        let key = StoreKey::new(&type_of(&*obj), &object_key);
        let value = to_stored_value(&*obj)?;
        let committed = {
            let mut store = self.lock();
            if store.objects.contains_key(&key) {
                return Err(StoreError::AlreadyExists(key.describe()));
            }
            store.commit(key, value)
        };

        *obj = serde_json::from_value(committed)?;
        Ok(())
    }

    async fn update<K: Object>(
        &self,
        obj: &mut K,
        _opts: &UpdateOptions,
    ) -> Result<(), Self::Error> {
        self.enter(Self::call_for(Verb::Update, &*obj, Some(obj.metadata().key())))
            .await?;
        self.write(obj, |_, incoming| Ok(incoming))
    }

    async fn patch<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        _opts: &PatchOptions,
    ) -> Result<(), Self::Error> {
        self.enter(Self::call_for(Verb::Patch, &*obj, Some(obj.metadata().key())))
            .await?;
        self.patch_stored(obj, patch, false)
    }

    async fn delete<K: Object>(&self, obj: &K, _opts: &DeleteOptions) -> Result<(), Self::Error> {
        let object_key = obj.metadata().key();
        self.enter(Self::call_for(Verb::Delete, obj, Some(object_key.clone())))
            .await?;

        let key = StoreKey::new(&type_of(obj), &object_key);
        let mut store = self.lock();
        store
            .objects
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.describe()))
    }

    async fn delete_all_of<K: Object>(
        &self,
        obj: &K,
        opts: &DeleteAllOfOptions,
    ) -> Result<(), Self::Error> {
        self.enter(Self::call_for(Verb::DeleteAllOf, obj, None))
            .await?;

        let types = type_of(obj);
        let mut store = self.lock();
        store
            .objects
            .retain(|key, value| !(key.is_type(&types) && matches(key, value, &opts.list)));
        Ok(())
    }

    fn status(&self) -> Self::Status {
        MockStatusWriter {
            client: self.clone(),
        }
    }
}

/// Status sub-resource writer of a [`MockClient`].
///
/// Only the `status` field of the stored object changes.
#[derive(Debug, Clone)]
pub struct MockStatusWriter {
    client: MockClient,
}

#[async_trait]
impl StatusWriter for MockStatusWriter {
    type Error = StoreError;

    async fn update<K: Object>(
        &self,
        obj: &mut K,
        _opts: &UpdateOptions,
    ) -> Result<(), Self::Error> {
        self.client
            .enter(MockClient::call_for(
                Verb::StatusUpdate,
                &*obj,
                Some(obj.metadata().key()),
            ))
            .await?;
        self.client.write(obj, |stored, incoming| {
            let mut value = stored.clone();
            let status = incoming.get("status").cloned().unwrap_or(Value::Null);
            set_field(&mut value, "status", status);
            Ok(value)
        })
    }

    async fn patch<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        _opts: &PatchOptions,
    ) -> Result<(), Self::Error> {
        self.client
            .enter(MockClient::call_for(
                Verb::StatusPatch,
                &*obj,
                Some(obj.metadata().key()),
            ))
            .await?;
        self.client.patch_stored(obj, patch, true)
    }
}

fn type_of(obj: &dyn Resource) -> (String, String) {
    let descriptor = obj.type_descriptor();
    (descriptor.api_version(), descriptor.kind_label().to_string())
}

fn to_stored_value<K: Object>(obj: &K) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(obj)?;
    stamp_type(&mut value, &type_of(obj));
    Ok(value)
}

fn stamp_type(value: &mut Value, types: &(String, String)) {
    set_field(value, "apiVersion", Value::String(types.0.clone()));
    set_field(value, "kind", Value::String(types.1.clone()));
}

fn set_field(value: &mut Value, field: &str, field_value: Value) {
    if let Value::Object(map) = value {
        if field_value.is_null() {
            map.remove(field);
        } else {
            map.insert(field.to_string(), field_value);
        }
    }
}

fn resource_version(value: &Value) -> Option<&str> {
    value
        .get("metadata")
        .and_then(|m| m.get("resourceVersion"))
        .and_then(Value::as_str)
}

fn set_resource_version(value: &mut Value, revision: &str) {
    if let Some(Value::Object(metadata)) = value.get_mut("metadata") {
        metadata.insert(
            "resourceVersion".to_string(),
            Value::String(revision.to_string()),
        );
    }
}

fn matches(key: &StoreKey, value: &Value, opts: &ListOptions) -> bool {
    if opts.namespace.is_some() && key.namespace != opts.namespace {
        return false;
    }
    let labels = value.get("metadata").and_then(|m| m.get("labels"));
    opts.label_selector.iter().all(|(name, expected)| {
        labels
            .and_then(|l| l.get(name))
            .and_then(Value::as_str)
            .is_some_and(|actual| actual == expected)
    })
}

/// Restrict a patch to the `status` subtree.
fn status_patch(patch: &Patch) -> Result<Patch, StoreError> {
    let status = |data: &Value| data.get("status").cloned().unwrap_or(Value::Object(Map::new()));
    match patch {
        Patch::Merge(data) => Ok(Patch::Merge(status(data))),
        Patch::Strategic(data) => Ok(Patch::Strategic(status(data))),
        Patch::Apply(data) => Ok(Patch::Apply(status(data))),
        Patch::Json(_) => Err(StoreError::InvalidPatch(
            "json patch is not supported on the status sub-resource".to_string(),
        )),
    }
}

fn apply_patch(target: &mut Value, patch: &Patch) -> Result<(), StoreError> {
    match patch {
        Patch::Merge(data) | Patch::Strategic(data) | Patch::Apply(data) => {
            merge_patch(target, data);
            Ok(())
        }
        Patch::Json(_) => Err(StoreError::InvalidPatch(
            "json patch is not supported by the mock store".to_string(),
        )),
    }
}

/// RFC 7386: objects merge recursively, `null` removes, anything else replaces.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (field, value) in entries {
            if value.is_null() {
                map.remove(field);
            } else {
                merge_patch(map.entry(field.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Pod};
    use serde_json::json;

    #[test]
    fn test_merge_patch_semantics() {
        let mut target = json!({ "spec": { "replicas": 1, "paused": true }, "keep": 1 });
        merge_patch(
            &mut target,
            &json!({ "spec": { "replicas": 3, "paused": null } }),
        );
        assert_eq!(target, json!({ "spec": { "replicas": 3 }, "keep": 1 }));
    }

    #[test]
    fn test_json_patch_is_rejected() {
        let mut target = json!({ "spec": { "replicas": 1 } });
        let err = apply_patch(
            &mut target,
            &Patch::Json(json!([{ "op": "replace", "path": "/spec/replicas", "value": 4 }])),
        );
        assert!(matches!(err, Err(StoreError::InvalidPatch(_))));
        assert_eq!(target, json!({ "spec": { "replicas": 1 } }));
    }

    #[tokio::test]
    async fn test_create_then_get_typed_and_dynamic() {
        let client = MockClient::new();
        let mut pod = fixtures::pod("default", "web");
        client.create(&mut pod, &CreateOptions::default()).await.unwrap();
        assert_eq!(pod.metadata.resource_version.as_deref(), Some("1"));

        let key = ObjectKey::namespaced("default", "web");
        let mut typed = Pod::default();
        client.get(&key, &mut typed).await.unwrap();
        assert_eq!(typed, pod);

        let mut dynamic = common::DynamicObject::new("v1", "Pod");
        client.get(&key, &mut dynamic).await.unwrap();
        assert_eq!(dynamic.kind, "Pod");
        assert_eq!(dynamic.metadata.name, "web");
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let client = MockClient::new().with_object(&fixtures::pod("default", "web"));
        let mut stale = fixtures::pod("default", "web");
        stale.metadata.resource_version = Some("0".to_string());

        let err = Client::update(&client, &mut stale, &UpdateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_log() {
        let client = MockClient::new().with_failure(Verb::Get, StoreError::Injected("down".into()));
        let mut pod = Pod::default();

        let err = client
            .get(&ObjectKey::namespaced("default", "web"), &mut pod)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Injected("down".into()));
        assert_eq!(client.call_count(Verb::Get), 1);
        assert_eq!(client.calls()[0].kind, "Pod");

        client.clear_failures();
        let err = client
            .get(&ObjectKey::namespaced("default", "web"), &mut pod)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_namespace_and_labels() {
        let client = MockClient::new()
            .with_object(&fixtures::pod("default", "a").with_label("app", "web"))
            .with_object(&fixtures::pod("default", "b"))
            .with_object(&fixtures::pod("other", "c").with_label("app", "web"))
            .with_object(&fixtures::config_map("default", "a", &[]));

        let mut pods: ObjectList<Pod> = ObjectList::new();
        client
            .list(
                &mut pods,
                &ListOptions::in_namespace("default").with_label("app", "web"),
            )
            .await
            .unwrap();
        let names: Vec<&str> = pods.items.iter().map(|p| p.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);

        let mut all: ObjectList<Pod> = ObjectList::new();
        client.list(&mut all, &ListOptions::default()).await.unwrap();
        assert_eq!(all.items.len(), 3);
    }

    #[tokio::test]
    async fn test_status_update_only_touches_status() {
        let client = MockClient::new().with_object(&fixtures::pod("default", "web"));
        let mut pod = fixtures::pod("default", "web");
        pod.spec.containers.clear();
        pod.status = Some(fixtures::PodStatus {
            phase: "Running".to_string(),
        });

        client
            .status()
            .update(&mut pod, &UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(pod.status.as_ref().map(|s| s.phase.as_str()), Some("Running"));
        assert_eq!(pod.spec.containers.len(), 1);
    }
}
