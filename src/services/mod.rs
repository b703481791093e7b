pub mod ai_service;
pub mod answer_extractor;
pub mod batch_service;
pub mod grading_service;
