use crate::client::{
    Client, CreateOptions, DeleteAllOfOptions, DeleteOptions, ListOptions, Patch, PatchOptions,
    Reader, StatusWriter, UpdateOptions,
};
use crate::labels::Verb;
use crate::timer::Monitor;
use async_trait::async_trait;
use common::{Object, ObjectKey, ObjectList};

/// A [`Client`] whose calls are timed by a [`Monitor`].
#[derive(Debug, Clone)]
pub struct InstrumentedClient<C> {
    inner: C,
    monitor: Monitor,
}

impl<C: Client> InstrumentedClient<C> {
    pub fn new(inner: C, monitor: Monitor) -> Self {
        Self { inner, monitor }
    }

    /// The wrapped client. Calls made through it are not timed.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }
}

#[async_trait]
impl<C: Client> Reader for InstrumentedClient<C> {
    type Error = C::Error;

    async fn get<K: Object>(&self, key: &ObjectKey, obj: &mut K) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::Get, &*obj)
            .time(self.inner.get(key, obj))
            .await
    }

    async fn list<K: Object>(
        &self,
        list: &mut ObjectList<K>,
        opts: &ListOptions,
    ) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::List, &*list)
            .time(self.inner.list(list, opts))
            .await
    }
}

#[async_trait]
impl<C: Client> Client for InstrumentedClient<C> {
    type Status = InstrumentedStatusWriter<C::Status>;

    async fn create<K: Object>(
        &self,
        obj: &mut K,
        opts: &CreateOptions,
    ) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::Create, &*obj)
            .time(self.inner.create(obj, opts))
            .await
    }

    async fn update<K: Object>(
        &self,
        obj: &mut K,
        opts: &UpdateOptions,
    ) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::Update, &*obj)
            .time(Client::update(&self.inner, obj, opts))
            .await
    }

    async fn patch<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        opts: &PatchOptions,
    ) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::Patch, &*obj)
            .time(Client::patch(&self.inner, obj, patch, opts))
            .await
    }

    async fn delete<K: Object>(&self, obj: &K, opts: &DeleteOptions) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::Delete, obj)
            .time(self.inner.delete(obj, opts))
            .await
    }

    async fn delete_all_of<K: Object>(
        &self,
        obj: &K,
        opts: &DeleteAllOfOptions,
    ) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::DeleteAllOf, obj)
            .time(self.inner.delete_all_of(obj, opts))
            .await
    }

    /// Status writer sharing this client's monitor.
    ///
    /// Obtaining the writer is not timed; its `update` and `patch` are.
    fn status(&self) -> Self::Status {
        InstrumentedStatusWriter::new(self.inner.status(), self.monitor.clone())
    }
}

/// A [`StatusWriter`] whose calls are timed as `StatusUpdate` / `StatusPatch`.
#[derive(Debug, Clone)]
pub struct InstrumentedStatusWriter<S> {
    inner: S,
    monitor: Monitor,
}

impl<S: StatusWriter> InstrumentedStatusWriter<S> {
    pub fn new(inner: S, monitor: Monitor) -> Self {
        Self { inner, monitor }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: StatusWriter> StatusWriter for InstrumentedStatusWriter<S> {
    type Error = S::Error;

    async fn update<K: Object>(
        &self,
        obj: &mut K,
        opts: &UpdateOptions,
    ) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::StatusUpdate, &*obj)
            .time(self.inner.update(obj, opts))
            .await
    }

    async fn patch<K: Object>(
        &self,
        obj: &mut K,
        patch: &Patch,
        opts: &PatchOptions,
    ) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::StatusPatch, &*obj)
            .time(self.inner.patch(obj, patch, opts))
            .await
    }
}
