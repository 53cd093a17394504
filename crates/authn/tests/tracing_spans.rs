//! Integration test verifying that the login flow emits the expected spans
//! and never records secrets in span fields.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use templespace_authn::{AuthService, testutil::hs256_codec};
use tracing::{
    Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names and every recorded field value
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
    values: Arc<Mutex<Vec<String>>>,
}

struct ValueVisitor<'a>(&'a mut Vec<String>);

impl Visit for ValueVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.push(format!("{}={value:?}", field.name()));
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
        attrs.record(&mut ValueVisitor(&mut self.values.lock().expect("lock poisoned")));
    }

    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        event.record(&mut ValueVisitor(&mut self.values.lock().expect("lock poisoned")));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_flow_creates_spans() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let service = AuthService::builder().codec(hs256_codec()).build().expect("service");
    let magic = service.start_login("a@example.com").await.expect("start login");
    let tokens = service.verify_magic_token(&magic).await.expect("redeem");
    service.verify_access_token(&tokens.access_token).expect("verify");

    let recorded = spans.lock().expect("lock poisoned");
    for name in ["start_login", "verify_magic_token", "take", "resolve", "sign", "verify"] {
        assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
    }
}

#[tokio::test]
async fn tokens_never_appear_in_traces() {
    let collector = SpanCollector::default();
    let values = Arc::clone(&collector.values);
    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let service = AuthService::builder().codec(hs256_codec()).build().expect("service");
    let magic = service.start_login("a@example.com").await.expect("start login");
    let tokens = service.verify_magic_token(&magic).await.expect("redeem");
    service.verify_access_token(&tokens.access_token).expect("verify");
    let _ = service.verify_magic_token(&magic).await;

    let recorded = values.lock().expect("lock poisoned");
    assert!(!recorded.is_empty(), "the flow should record some fields");
    for secret in [&magic, &tokens.access_token, &tokens.refresh_token] {
        assert!(
            recorded.iter().all(|v| !v.contains(secret.as_str())),
            "a token leaked into traces: {recorded:?}"
        );
    }
}
