use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Serialize;
use std::io::Write;

use shared::HealthResponse;

use crate::diagnosis::diagnosis_service::{DiagnosisError, DiagnosisService};
use crate::engine::model::InferenceError;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(health)))
        .service(web::resource("/predict").route(web::post().to(handle_predict)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        message: "Crop disease diagnosis backend is running".into(),
    })
}

async fn handle_predict(
    service: web::Data<DiagnosisService>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut image_data: Vec<u8> = Vec::new();
    let mut language: Option<String> = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        let field_name = field.name().unwrap_or("").to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(str::to_string));

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk?;
            data.write_all(&bytes)?;
        }

        match field_name.as_str() {
            "file" => {
                info!(
                    "Received file: {} ({} bytes)",
                    file_name.as_deref().unwrap_or("<unnamed>"),
                    data.len()
                );
                image_data = data;
            }
            "language" => {
                language = Some(String::from_utf8_lossy(&data).trim().to_string());
            }
            _ => {}
        }
    }

    if image_data.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "No image file provided".into(),
            code: "invalid_image",
        }));
    }

    match service.diagnose(&image_data, language.as_deref()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => {
            error!("Diagnosis failed: {}", e);
            let code = e.code();
            Ok(match &e {
                DiagnosisError::InvalidImage(_) => {
                    HttpResponse::BadRequest().json(ErrorResponse {
                        error: e.to_string(),
                        code,
                    })
                }
                DiagnosisError::Inference(
                    InferenceError::Remote(_) | InferenceError::RemoteTimeout(_),
                ) => HttpResponse::BadGateway().json(ErrorResponse {
                    error: "Remote inference service unavailable".into(),
                    code,
                }),
                DiagnosisError::Inference(_) => {
                    HttpResponse::InternalServerError().json(ErrorResponse {
                        error: "Model inference failed".into(),
                        code,
                    })
                }
                DiagnosisError::Speech(_) => HttpResponse::BadGateway().json(ErrorResponse {
                    error: "Speech synthesis failed".into(),
                    code,
                }),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use actix_web::{App, test};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, RgbImage};

    use crate::advisory::action_plans::ActionPlanResolver;
    use crate::advisory::config::{AdvisoryConfig, PlanSpec};
    use crate::engine::classes::{DiseaseClass, Prediction};
    use crate::engine::model::InferenceBackend;
    use crate::engine::preprocess::DecodedImage;
    use crate::speech::tts_service::{AudioArtifact, SpeechSynthesizer, TtsError};

    struct StubBackend;

    #[async_trait]
    impl InferenceBackend for StubBackend {
        async fn predict(&self, _image: &DecodedImage) -> Result<Prediction, InferenceError> {
            Ok(Prediction {
                class: DiseaseClass::LateBlight,
                confidence: 0.98,
                severity: DiseaseClass::LateBlight.severity(),
            })
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    struct NoAudioSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for NoAudioSynthesizer {
        async fn synthesize(
            &self,
            _text: &str,
            _language: &str,
        ) -> Result<AudioArtifact, TtsError> {
            Err(TtsError::RetriesExhausted {
                attempts: 3,
                last: "TTS request timed out".into(),
            })
        }
    }

    fn test_service() -> DiagnosisService {
        let mut plans = std::collections::HashMap::new();
        for class in DiseaseClass::ALL {
            plans.insert(
                class.label().to_string(),
                PlanSpec {
                    recommendation: format!("Treatment for {}", class.label()),
                },
            );
        }
        let config = AdvisoryConfig {
            version: 1.0,
            fallback: PlanSpec {
                recommendation: "Consult an expert".into(),
            },
            plans,
        };
        DiagnosisService::new(
            Arc::new(StubBackend),
            ActionPlanResolver::from_config(&config),
            Arc::new(NoAudioSynthesizer),
            false,
            "hi".into(),
        )
    }

    fn sample_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(32, 32, image::Rgb([40, 120, 60]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    const BOUNDARY: &str = "----diagnosis-test-boundary";

    fn multipart_body(file_bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"leaf.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file_bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn predict_request(file_bytes: &[u8]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/predict")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body(file_bytes))
    }

    #[actix_web::test]
    async fn health_endpoint_reports_running() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_service()))
                .configure(configure_routes),
        )
        .await;

        let response: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request())
                .await;
        assert_eq!(
            response["message"],
            "Crop disease diagnosis backend is running"
        );
    }

    #[actix_web::test]
    async fn garbage_upload_returns_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_service()))
                .configure(configure_routes),
        )
        .await;

        let response = test::call_service(
            &app,
            predict_request(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]).to_request(),
        )
        .await;
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["code"], "invalid_image");
    }

    #[actix_web::test]
    async fn missing_file_field_returns_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_service()))
                .configure(configure_routes),
        )
        .await;

        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"language\"\r\n\r\nhi\r\n--{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );
        let request = test::TestRequest::post()
            .uri("/predict")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
            .to_request();

        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn valid_upload_returns_diagnosis_with_degraded_audio() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_service()))
                .configure(configure_routes),
        )
        .await;

        let response = test::call_service(&app, predict_request(&sample_png()).to_request()).await;
        assert_eq!(response.status(), actix_web::http::StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["label"], "Late Blight");
        let confidence = body["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert_eq!(body["action_plan"], "Treatment for Late Blight");
        assert!(body["audio_url"].is_null());
    }
}
