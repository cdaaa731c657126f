//! Label tuple for client request observations.
//!
//! # Cardinality
//!
//! Every label is drawn from a closed set:
//! - `controller`: registered controller ids plus the unknown sentinel
//! - `verb`: the 11 [`Verb`] variants
//! - `kind` / `apiVersion`: resource type descriptors, never object names
//! - `unstructured`: `"true"` / `"false"`

use common::Resource;
use std::fmt;
use tracing::debug;

/// Operation performed against the store or the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    List,
    Create,
    Update,
    Patch,
    Delete,
    DeleteAllOf,
    StatusUpdate,
    StatusPatch,
    GetCache,
    ListCache,
}

impl Verb {
    /// Every verb, in label order.
    pub const ALL: [Verb; 11] = [
        Verb::Get,
        Verb::List,
        Verb::Create,
        Verb::Update,
        Verb::Patch,
        Verb::Delete,
        Verb::DeleteAllOf,
        Verb::StatusUpdate,
        Verb::StatusPatch,
        Verb::GetCache,
        Verb::ListCache,
    ];

    /// Label value for this verb.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "Get",
            Verb::List => "List",
            Verb::Create => "Create",
            Verb::Update => "Update",
            Verb::Patch => "Patch",
            Verb::Delete => "Delete",
            Verb::DeleteAllOf => "DeleteAllOf",
            Verb::StatusUpdate => "StatusUpdate",
            Verb::StatusPatch => "StatusPatch",
            Verb::GetCache => "GetCache",
            Verb::ListCache => "ListCache",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved labels of one histogram series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestLabels {
    pub controller: String,
    pub verb: Verb,
    pub kind: String,
    pub api_version: String,
    /// Whether the object was accessed through a dynamic representation.
    pub unstructured: bool,
}

impl RequestLabels {
    /// Derive labels from the object (or list) a call operates on.
    ///
    /// Incomplete type metadata degrades to sentinel values.
    #[must_use]
    pub fn resolve(verb: Verb, obj: &dyn Resource, controller: String) -> Self {
        let descriptor = obj.type_descriptor();
        if descriptor.is_unknown() {
            debug!(
                target: "client_monitor.labels",
                verb = verb.as_str(),
                kind = %descriptor.kind,
                group_version = %descriptor.group_version,
                "Incomplete resource type metadata, using sentinel labels"
            );
        }

        Self {
            controller,
            verb,
            kind: descriptor.kind_label().to_string(),
            api_version: descriptor.api_version(),
            unstructured: descriptor.dynamic,
        }
    }

    /// `unstructured` label value.
    #[must_use]
    pub fn unstructured_label(&self) -> &'static str {
        if self.unstructured {
            "true"
        } else {
            "false"
        }
    }
}
