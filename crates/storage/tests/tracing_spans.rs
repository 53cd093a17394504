//! Integration test verifying that `#[instrument]` annotations produce the
//! expected spans on store operations.

#![allow(clippy::expect_used)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use templespace_storage::{
    Email, EphemeralStore, MagicLinkStore, MemoryUserStore, User, UserStore,
};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names and fields as they are created
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
    }
}

fn collector() -> (SpanCollector, Arc<Mutex<Vec<String>>>) {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    (collector, spans)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ephemeral_store_operations_create_spans() {
    let (collector, spans) = collector();
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = MagicLinkStore::new();
    store.save("t", Email::from("a@example.com"), Duration::from_secs(60)).await.expect("save");
    let _ = store.get("t").await.expect("get");
    let _ = store.take("t").await.expect("take");
    store.delete("t").await.expect("delete");

    let recorded = spans.lock().expect("lock poisoned");
    for name in ["save", "get", "take", "delete"] {
        assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
    }
}

#[tokio::test]
async fn user_store_operations_create_spans() {
    let (collector, spans) = collector();
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = MemoryUserStore::new();
    store.upsert(&User::new("u-1", "a@example.com", "user")).await.expect("upsert");
    let _ = store.find_by_email(&Email::from("a@example.com")).await.expect("find");

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == "upsert"), "expected an 'upsert' span, got: {recorded:?}");
    assert!(
        recorded.iter().any(|s| s == "find_by_email"),
        "expected a 'find_by_email' span, got: {recorded:?}"
    );
}
