//! Object-store client capabilities.
//!
//! These traits describe the operations the monitor decorates:
//!
//! - [`Reader`] - read-single and read-list, implemented by live clients
//!   and by read-through caches
//! - [`Client`] - the full read/write client, including the status
//!   sub-resource accessor
//! - [`StatusWriter`] - update/patch of the status sub-resource
//!
//! Reads fill caller-provided objects, so the caller decides the concrete
//! type (typed or [`common::DynamicObject`]) before the call is made.
//! Each implementation chooses its own error type; instrumented wrappers
//! return it unchanged.

use async_trait::async_trait;
use common::{Object, ObjectKey, ObjectList};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options for list and delete-all-of selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Restrict to one namespace, `None` lists across namespaces.
    pub namespace: Option<String>,
    /// Equality-based label selector, all entries must match.
    pub label_selector: BTreeMap<String, String>,
    pub limit: Option<u32>,
    pub continue_token: Option<String>,
}

impl ListOptions {
    #[must_use]
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.label_selector.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub dry_run: bool,
    pub field_manager: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub dry_run: bool,
    pub field_manager: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOptions {
    pub dry_run: bool,
    pub field_manager: Option<String>,
    /// Take ownership of conflicting fields (server-side apply).
    pub force: bool,
}

/// How dependents are handled when an owner is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationPolicy {
    Orphan,
    Background,
    Foreground,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub dry_run: bool,
    pub grace_period_seconds: Option<i64>,
    pub propagation_policy: Option<PropagationPolicy>,
}

/// Selection and deletion options for [`Client::delete_all_of`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteAllOfOptions {
    pub list: ListOptions,
    pub delete: DeleteOptions,
}

/// A patch document together with its patch strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// RFC 6902 JSON patch.
    Json(Value),
    /// RFC 7386 JSON merge patch.
    Merge(Value),
    Strategic(Value),
    /// Server-side apply.
    Apply(Value),
}

impl Patch {
    /// Content type the patch is sent with.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Patch::Json(_) => "application/json-patch+json",
            Patch::Merge(_) => "application/merge-patch+json",
            Patch::Strategic(_) => "application/strategic-merge-patch+json",
            Patch::Apply(_) => "application/apply-patch+yaml",
        }
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        match self {
            Patch::Json(data) | Patch::Merge(data) | Patch::Strategic(data) | Patch::Apply(data) => {
                data
            }
        }
    }
}

/// Read access to stored objects.
#[async_trait]
pub trait Reader: Send + Sync {
    type Error: Send;

    /// Read the object addressed by `key` into `obj`.
    async fn get<K: Object>(&self, key: &ObjectKey, obj: &mut K) -> Result<(), Self::Error>;

    /// Read all matching objects into `list`.
    async fn list<K: Object>(
        &self,
        list: &mut ObjectList<K>,
        opts: &ListOptions,
    ) -> Result<(), Self::Error>;
}

/// Update/patch of an object's status sub-resource.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    type Error: Send;

    async fn update<K: Object>(&self, obj: &mut K, opts: &UpdateOptions)
        -> Result<(), Self::Error>;

    async fn patch<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        opts: &PatchOptions,
    ) -> Result<(), Self::Error>;
}

/// Full read/write access to stored objects.
///
/// Write operations update `obj` in place with the stored state
/// (resource version, defaulted fields).
#[async_trait]
pub trait Client: Reader {
    type Status: StatusWriter<Error = Self::Error>;

    async fn create<K: Object>(&self, obj: &mut K, opts: &CreateOptions)
        -> Result<(), Self::Error>;

    async fn update<K: Object>(&self, obj: &mut K, opts: &UpdateOptions)
        -> Result<(), Self::Error>;

    async fn patch<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        opts: &PatchOptions,
    ) -> Result<(), Self::Error>;

    async fn delete<K: Object>(&self, obj: &K, opts: &DeleteOptions) -> Result<(), Self::Error>;

    /// Delete every object of `obj`'s type matching `opts`.
    async fn delete_all_of<K: Object>(
        &self,
        obj: &K,
        opts: &DeleteAllOfOptions,
    ) -> Result<(), Self::Error>;

    /// Writer for the status sub-resource.
    fn status(&self) -> Self::Status;
}

#[async_trait]
impl<T: Reader> Reader for Arc<T> {
    type Error = T::Error;

    async fn get<K: Object>(&self, key: &ObjectKey, obj: &mut K) -> Result<(), Self::Error> {
        (**self).get(key, obj).await
    }

    async fn list<K: Object>(
        &self,
        list: &mut ObjectList<K>,
        opts: &ListOptions,
    ) -> Result<(), Self::Error> {
        (**self).list(list, opts).await
    }
}

#[async_trait]
impl<T: StatusWriter> StatusWriter for Arc<T> {
    type Error = T::Error;

    async fn update<K: Object>(
        &self,
        obj: &mut K,
        opts: &UpdateOptions,
    ) -> Result<(), Self::Error> {
        (**self).update(obj, opts).await
    }

    async fn patch<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        opts: &PatchOptions,
    ) -> Result<(), Self::Error> {
        (**self).patch(obj, patch, opts).await
    }
}

#[async_trait]
impl<T: Client> Client for Arc<T> {
    type Status = T::Status;

    async fn create<K: Object>(
        &self,
        obj: &mut K,
        opts: &CreateOptions,
    ) -> Result<(), Self::Error> {
        (**self).create(obj, opts).await
    }

    async fn update<K: Object>(
        &self,
        obj: &mut K,
        opts: &UpdateOptions,
    ) -> Result<(), Self::Error> {
        Client::update(&**self, obj, opts).await
    }

    async fn patch<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        opts: &PatchOptions,
    ) -> Result<(), Self::Error> {
        Client::patch(&**self, obj, patch, opts).await
    }

    async fn delete<K: Object>(&self, obj: &K, opts: &DeleteOptions) -> Result<(), Self::Error> {
        (**self).delete(obj, opts).await
    }

    async fn delete_all_of<K: Object>(
        &self,
        obj: &K,
        opts: &DeleteAllOfOptions,
    ) -> Result<(), Self::Error> {
        (**self).delete_all_of(obj, opts).await
    }

    fn status(&self) -> Self::Status {
        (**self).status()
    }
}
