use crate::client::{ListOptions, Reader};
use crate::labels::Verb;
use crate::timer::Monitor;
use async_trait::async_trait;
use common::{Object, ObjectKey, ObjectList};

/// A read-through cache whose reads are timed as `GetCache` / `ListCache`.
///
/// Cached reads land in their own series, separate from live `Get` and
/// `List` calls made through an [`InstrumentedClient`](super::InstrumentedClient).
#[derive(Debug, Clone)]
pub struct InstrumentedCache<R> {
    inner: R,
    monitor: Monitor,
}

impl<R: Reader> InstrumentedCache<R> {
    pub fn new(inner: R, monitor: Monitor) -> Self {
        Self { inner, monitor }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: Reader> Reader for InstrumentedCache<R> {
    type Error = R::Error;

    async fn get<K: Object>(&self, key: &ObjectKey, obj: &mut K) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::GetCache, &*obj)
            .time(self.inner.get(key, obj))
            .await
    }

    async fn list<K: Object>(
        &self,
        list: &mut ObjectList<K>,
        opts: &ListOptions,
    ) -> Result<(), Self::Error> {
        self.monitor
            .start(Verb::ListCache, &*list)
            .time(self.inner.list(list, opts))
            .await
    }
}
