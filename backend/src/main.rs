mod advisory;
mod diagnosis;
mod engine;
mod routes;
mod speech;

use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use advisory::action_plans::ActionPlanResolver;
use advisory::config::AdvisoryConfig;
use diagnosis::diagnosis_service::DiagnosisService;
use engine::model::{InferenceBackend, LocalModel};
use engine::remote::{DEFAULT_TIMEOUT_SECS, RemoteModelService};
use routes::configure_routes;
use speech::tts_service::BhashiniService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let advisory_config = AdvisoryConfig::load().map_err(|e| {
        log::error!("Failed to load action plan config: {:?}", e);
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Action plan config loading failed: {:?}", e),
        )
    })?;
    let resolver = ActionPlanResolver::from_config(&advisory_config);

    let backend_kind = env::var("INFERENCE_BACKEND").unwrap_or_else(|_| "local".to_string());
    let backend: Arc<dyn InferenceBackend> = match backend_kind.as_str() {
        "remote" => {
            let endpoint = env::var("REMOTE_INFERENCE_URL").map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "REMOTE_INFERENCE_URL must be set for the remote backend",
                )
            })?;
            let timeout_secs = env::var("REMOTE_INFERENCE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS);
            log::info!("Using remote inference backend at {}", endpoint);
            Arc::new(RemoteModelService::new(&endpoint, timeout_secs))
        }
        _ => {
            let model_path =
                env::var("MODEL_PATH").unwrap_or_else(|_| "models/crop_disease.onnx".to_string());
            let model = LocalModel::load(&model_path).map_err(|e| {
                log::error!("Failed to preload model at startup: {:?}", e);
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Model loading failed: {:?}", e),
                )
            })?;
            Arc::new(model)
        }
    };

    let tts_endpoint =
        env::var("BHASHINI_ENDPOINT").unwrap_or_else(|_| "https://api.bhashini.gov.in".to_string());
    let tts_api_key = env::var("BHASHINI_API_KEY").unwrap_or_default();
    if tts_api_key.is_empty() {
        log::warn!("BHASHINI_API_KEY is not set; TTS requests will likely be rejected.");
    }
    let synthesizer = Arc::new(BhashiniService::new(&tts_endpoint, &tts_api_key));

    let audio_required = env::var("TTS_REQUIRED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    let default_language = env::var("TTS_TARGET_LANGUAGE").unwrap_or_else(|_| "hi".to_string());

    let service = DiagnosisService::new(
        backend,
        resolver,
        synthesizer,
        audio_required,
        default_language,
    );

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(service.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
