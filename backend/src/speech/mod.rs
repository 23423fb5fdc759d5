pub mod tts_service;
