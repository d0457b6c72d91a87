use std::sync::Arc;

use actix_web::{App, HttpServer};
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use bookstore_service::app_config::{config_app, cors};
use bookstore_service::book_service::BookService;
use bookstore_service::books_repository::{
    BookRepository, InMemoryBookRepository, PostgresBooksRepository,
};
use bookstore_service::error_response::{json_config, path_config, query_config, unknown_route};
use bookstore_service::settings::{Settings, TelemetrySettings};

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry(settings: &TelemetrySettings) {
    let app_name = settings.service_name.clone();

    // Spans are exported to jaeger in batch only when enabled
    let telemetry = if settings.jaeger_enabled {
        global::set_text_map_propagator(TraceContextPropagator::new());
        #[allow(deprecated)]
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name(app_name.clone())
            .install_batch(TokioCurrentThread)
            .expect("Failed to install OpenTelemetry tracer.");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    // Create a `tracing` layer to emit spans as structured logs to stdout
    let formatting_layer = BunyanFormattingLayer::new(app_name, std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to install `tracing` subscriber.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let settings = Settings::load().expect("Failed to load configuration");
    init_telemetry(&settings.telemetry);
    tracing::info!(
        "starting HTTP server at http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    let books_repository: Arc<dyn BookRepository + Send + Sync> =
        if settings.database.use_in_memory {
            tracing::warn!("Using in memory book repository, books are lost on restart");
            Arc::new(InMemoryBookRepository::default())
        } else {
            Arc::new(
                PostgresBooksRepository::init(settings.database.postgres_config())
                    .await
                    .expect("Failed to init postgres"),
            )
        };
    let book_service = BookService::new(books_repository);

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(book_service.clone()))
            .app_data(json_config())
            .app_data(path_config())
            .app_data(query_config())
            .wrap(cors())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .default_service(actix_web::web::to(unknown_route))
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await
}
