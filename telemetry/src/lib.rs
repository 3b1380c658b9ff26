use aws_lambda_events::dynamodb::EventRecord;
use lambda_extension::{Error, NextEvent};
use opentelemetry::trace::{
    SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState, TracerProvider as _,
};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{SpanExporterBuilder, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Config, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tracing::subscriber::set_global_default;
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};
use anyhow::anyhow;

const LOCAL_COLLECTOR: &str = "http://localhost:4318";

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    pub otlp_endpoint: String,
    pub honeycomb_api_key: Secret<String>,
    pub dataset_name: String,
}

/// Compose multiple layers into a tracing subscriber.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
    config: &TelemetrySettings,
    trace_provider: &TracerProvider,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
        .with(
            tracing_opentelemetry::layer()
                .with_tracer(trace_provider.tracer(config.dataset_name.clone())),
        )
        .with(LevelFilter::DEBUG)
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    let _ = LogTracer::init();
    global::set_text_map_propagator(TraceContextPropagator::new());

    let _ = set_global_default(subscriber);
}

/// Build the OTLP/HTTP tracer provider. Anything other than a local collector
/// is assumed to be Honeycomb and gets the dataset/team headers.
pub fn init_tracer(trace_config: &TelemetrySettings) -> Result<TracerProvider, anyhow::Error> {
    let span_exporter = match trace_config.otlp_endpoint.as_str() {
        LOCAL_COLLECTOR => opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(trace_config.otlp_endpoint.clone())
            .with_http_client(reqwest::Client::default())
            .with_timeout(std::time::Duration::from_secs(2)),
        _ => opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(trace_config.otlp_endpoint.clone())
            .with_http_client(reqwest::Client::default())
            .with_headers(HashMap::from([
                (
                    "x-honeycomb-dataset".into(),
                    trace_config.dataset_name.clone(),
                ),
                (
                    "x-honeycomb-team".into(),
                    trace_config.honeycomb_api_key.expose_secret().into(),
                ),
            ]))
            .with_timeout(std::time::Duration::from_secs(2)),
    };

    let exporter = SpanExporterBuilder::Http(span_exporter)
        .build_span_exporter()
        .map_err(|e| anyhow!("Failed to build the OTLP span exporter: {}", e))?;

    Ok(TracerProvider::builder()
        .with_config(
            Config::default().with_resource(Resource::new(vec![KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME.to_string(),
                trace_config.dataset_name.clone(),
            )])),
        )
        .with_batch_exporter(exporter, runtime::Tokio)
        .build())
}

/// A provider with no exporter attached, for tests and local runs without a collector.
pub fn noop_tracer_provider() -> TracerProvider {
    TracerProvider::builder().build()
}

/// Extract the remote parent context the writer stamped onto the new item.
///
/// Writers that trace their requests store the W3C trace id and span id as
/// `TraceParent` / `ParentSpan` string attributes. Items without them (or with
/// malformed ids) have no remote parent.
pub fn parse_context_from(record: &EventRecord) -> Option<opentelemetry::Context> {
    let traced_item: TracedItem =
        serde_dynamo::from_item(record.change.new_image.clone()).ok()?;

    let trace_id = TraceId::from_hex(traced_item.trace_parent?.as_str()).ok()?;
    let span_id = SpanId::from_hex(traced_item.parent_span?.as_str()).ok()?;

    let span_context = SpanContext::new(
        trace_id,
        span_id,
        TraceFlags::SAMPLED,
        true,
        TraceState::NONE,
    );

    if !span_context.is_valid() {
        return None;
    }

    Some(opentelemetry::Context::new().with_remote_span_context(span_context))
}

#[derive(Deserialize)]
struct TracedItem {
    #[serde(rename = "TraceParent")]
    trace_parent: Option<String>,
    #[serde(rename = "ParentSpan")]
    parent_span: Option<String>,
}

/// Internal Lambda extension that flushes spans once the runtime finished an event.
pub struct TraceFlushExtension {
    pub request_done_receiver: Mutex<UnboundedReceiver<()>>,
}

impl TraceFlushExtension {
    pub fn new(request_done_receiver: UnboundedReceiver<()>) -> Self {
        Self {
            request_done_receiver: Mutex::new(request_done_receiver),
        }
    }

    pub async fn invoke(
        &self,
        event: lambda_extension::LambdaEvent,
        tracer_provider: Arc<TracerProvider>,
    ) -> Result<(), Error> {
        match event.next {
            // NB: Internal extensions only support the INVOKE event.
            NextEvent::Shutdown(shutdown) => {
                return Err(anyhow!("extension received unexpected SHUTDOWN event: {:?}", shutdown).into());
            }
            NextEvent::Invoke(_e) => {}
        }

        tracing::debug!("[extension] waiting for event to be processed");

        // Wait for runtime to finish processing event.
        self.request_done_receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| anyhow!("channel is closed"))?;

        tracing::debug!("[extension] flushing logs and telemetry");

        tracer_provider.force_flush();

        Ok(())
    }
}
