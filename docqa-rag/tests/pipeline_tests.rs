//! End-to-end tests for ingestion and question answering.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docqa_rag::{
    DEFAULT_COLLECTION, GenerationModel, GenerationRequest, HashingEmbeddingProvider,
    MockGenerationModel, NO_SOURCE, REFUSAL_ANSWER, RagConfig, RagContext, RagError, Result,
    SessionState, SourceFile,
};

const EIFFEL: &str = "The Eiffel Tower is in Paris. It was completed in 1889.";

fn context_with(model: Arc<MockGenerationModel>, config: RagConfig) -> RagContext {
    RagContext::builder()
        .config(config)
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .generation_model(model)
        .build()
        .unwrap()
}

fn context(model: Arc<MockGenerationModel>) -> RagContext {
    context_with(model, RagConfig::default())
}

#[tokio::test]
async fn answers_from_documents_and_refuses_otherwise() {
    let model = Arc::new(MockGenerationModel::new().with_response("Paris."));
    let context = context(model.clone());
    let batch = context
        .ingest_batch(DEFAULT_COLLECTION, &[SourceFile::new("paris.txt", EIFFEL)])
        .await
        .unwrap();
    assert_eq!(batch.succeeded.len(), 1);
    assert_eq!(batch.chunk_count(), 1);
    assert!(batch.failed.is_empty() && batch.warnings.is_empty());

    let mut session = SessionState::new();
    session.set_documents(&batch);

    let answer =
        context.ask(DEFAULT_COLLECTION, "Where is the Eiffel Tower?", &mut session).await.unwrap();
    assert_eq!(answer.text, "Paris.");
    assert_eq!(answer.source, "paris.txt");

    let prompt = &model.requests()[0].prompt;
    assert!(prompt.contains("Document 1 (from paris.txt): The Eiffel Tower is in Paris."));
    assert!(prompt.contains("Question: Where is the Eiffel Tower?"));

    let refusal = context
        .ask(DEFAULT_COLLECTION, "What is the capital of Japan?", &mut session)
        .await
        .unwrap();
    assert_eq!(refusal.text, REFUSAL_ANSWER);
    assert_eq!(refusal.source, NO_SOURCE);
    assert_eq!(model.call_count(), 1, "the refusal must not reach the model");

    let questions: Vec<&str> = session.history().map(|e| e.question.as_str()).collect();
    assert_eq!(questions, ["What is the capital of Japan?", "Where is the Eiffel Tower?"]);
}

#[tokio::test]
async fn source_is_the_closest_document() {
    let model = Arc::new(MockGenerationModel::new().with_fallback("Rust."));
    let context = context(model.clone());
    let files = [
        SourceFile::new(
            "rust.txt",
            "Rust is a systems programming language focused on memory safety and speed.",
        ),
        SourceFile::new(
            "cooking.txt",
            "Pasta should be cooked in salted boiling water until al dente.",
        ),
    ];
    context.ingest_batch(DEFAULT_COLLECTION, &files).await.unwrap();
    let mut session = SessionState::new();

    let answer = context
        .ask(DEFAULT_COLLECTION, "What language focuses on memory safety?", &mut session)
        .await
        .unwrap();
    assert_eq!(answer.source, "rust.txt");

    let answer = context
        .ask(DEFAULT_COLLECTION, "How long should pasta be cooked?", &mut session)
        .await
        .unwrap();
    assert_eq!(answer.source, "cooking.txt");

    let answer = context
        .ask(DEFAULT_COLLECTION, "Who won the football world cup?", &mut session)
        .await
        .unwrap();
    assert!(answer.is_refusal());
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn question_before_any_upload_is_refused() {
    let model = Arc::new(MockGenerationModel::new());
    let context = context(model.clone());
    let mut session = SessionState::new();

    let answer = context.ask(DEFAULT_COLLECTION, "Anything?", &mut session).await.unwrap();
    assert!(answer.is_refusal());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn unreadable_and_empty_files_are_indexed_as_placeholders() {
    let context = context(Arc::new(MockGenerationModel::new()));
    let files = [
        SourceFile::new("paris.txt", EIFFEL),
        SourceFile::new("scan.pdf", b"%PDF-1.7 binary".to_vec()),
        SourceFile::new("blank.md", "  tiny \n"),
    ];

    let batch = context.ingest_batch(DEFAULT_COLLECTION, &files).await.unwrap();
    assert_eq!(batch.succeeded.len(), 3);
    assert!(batch.failed.is_empty());

    let placeholders: Vec<(&str, bool)> =
        batch.succeeded.iter().map(|d| (d.filename.as_str(), d.placeholder)).collect();
    assert_eq!(placeholders, [("paris.txt", false), ("scan.pdf", true), ("blank.md", true)]);

    assert_eq!(batch.warnings.len(), 2);
    assert!(matches!(batch.warnings[0], RagError::ConversionError { ref filename, .. } if filename == "scan.pdf"));
    assert!(matches!(
        batch.warnings[1],
        RagError::EmptyContentError { ref filename, chars: 4, min: 10 } if filename == "blank.md"
    ));

    let count = context.vector_store().count(DEFAULT_COLLECTION).await.unwrap();
    assert_eq!(count, batch.chunk_count());
}

#[tokio::test]
async fn oversized_and_duplicate_files_fail_without_stopping_the_batch() {
    let config = RagConfig::builder().max_file_bytes(100).build().unwrap();
    let context = context_with(Arc::new(MockGenerationModel::new()), config);
    let files = [
        SourceFile::new("huge.txt", "x".repeat(101)),
        SourceFile::new("paris.txt", EIFFEL),
        SourceFile::new("paris.txt", EIFFEL),
    ];

    let batch = context.ingest_batch(DEFAULT_COLLECTION, &files).await.unwrap();
    assert_eq!(batch.succeeded.len(), 1);
    assert_eq!(batch.failed.len(), 2);
    assert!(matches!(
        batch.failed[0].error,
        RagError::FileTooLarge { size: 101, limit: 100, .. }
    ));
    assert!(matches!(batch.failed[1].error, RagError::DuplicateIdError { .. }));
    assert_eq!(context.vector_store().count(DEFAULT_COLLECTION).await.unwrap(), 1);
}

#[tokio::test]
async fn new_batch_replaces_previous_documents() {
    let model = Arc::new(MockGenerationModel::new().with_fallback("Paris."));
    let context = context(model.clone());
    context
        .ingest_batch(DEFAULT_COLLECTION, &[SourceFile::new("paris.txt", EIFFEL)])
        .await
        .unwrap();
    context
        .ingest_batch(
            DEFAULT_COLLECTION,
            &[SourceFile::new("cooking.txt", "Pasta should be cooked in salted boiling water.")],
        )
        .await
        .unwrap();

    let mut session = SessionState::new();
    let answer =
        context.ask(DEFAULT_COLLECTION, "Where is the Eiffel Tower?", &mut session).await.unwrap();
    assert!(answer.is_refusal());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let context = context(Arc::new(MockGenerationModel::new()));
    let mut session = SessionState::new();
    let err = context.ask(DEFAULT_COLLECTION, "   \n", &mut session).await.unwrap_err();
    assert!(matches!(err, RagError::PipelineError(_)));
    assert_eq!(session.history_len(), 0);
}

#[tokio::test]
async fn generation_failure_is_not_recorded() {
    let model = Arc::new(MockGenerationModel::new().with_error("rate limited"));
    let context = context(model);
    context
        .ingest_batch(DEFAULT_COLLECTION, &[SourceFile::new("paris.txt", EIFFEL)])
        .await
        .unwrap();

    let mut session = SessionState::new();
    let err =
        context.ask(DEFAULT_COLLECTION, "Where is the Eiffel Tower?", &mut session).await.unwrap_err();
    assert!(matches!(err, RagError::GenerationError { .. }));
    assert_eq!(session.history_len(), 0);
}

struct SlowModel;

#[async_trait]
impl GenerationModel for SlowModel {
    fn name(&self) -> &str {
        "slow"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok("too late".to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn slow_generation_times_out() {
    let config = RagConfig::builder().generate_timeout(Some(Duration::from_secs(5))).build().unwrap();
    let context = RagContext::builder()
        .config(config)
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .generation_model(Arc::new(SlowModel))
        .build()
        .unwrap();
    context
        .ingest_batch(DEFAULT_COLLECTION, &[SourceFile::new("paris.txt", EIFFEL)])
        .await
        .unwrap();

    let mut session = SessionState::new();
    let err =
        context.ask(DEFAULT_COLLECTION, "Where is the Eiffel Tower?", &mut session).await.unwrap_err();
    assert!(matches!(err, RagError::TimeoutError { ref operation, .. } if operation == "generation"));
    assert_eq!(session.history_len(), 0);
}

#[tokio::test]
async fn health_check_reports_missing_content() {
    let context = context(Arc::new(MockGenerationModel::new()));
    let mut session = SessionState::new();
    assert!(context.health_check(DEFAULT_COLLECTION, &session).await.is_empty());

    let batch = context
        .ingest_batch(DEFAULT_COLLECTION, &[SourceFile::new("paris.txt", EIFFEL)])
        .await
        .unwrap();
    session.set_documents(&batch);
    assert!(context.health_check(DEFAULT_COLLECTION, &session).await.is_empty());

    context.reset(DEFAULT_COLLECTION).await.unwrap();
    let issues = context.health_check(DEFAULT_COLLECTION, &session).await;
    assert_eq!(issues.len(), 1);
    assert!(issues[0].contains("empty despite processed documents"));

    let issues = context.health_check("never_created", &session).await;
    assert!(issues[0].contains("unavailable"));
}

#[test]
fn builder_requires_backends() {
    let err = RagContext::builder()
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, RagError::ConfigError(_)));
}

#[tokio::test]
async fn symbol_only_document_never_counts_as_evidence() {
    let model = Arc::new(MockGenerationModel::new().with_fallback("Paris."));
    let context = context(model.clone());
    let files = [
        SourceFile::new("paris.txt", EIFFEL),
        SourceFile::new("divider.txt", "==========================="),
    ];
    let batch = context.ingest_batch(DEFAULT_COLLECTION, &files).await.unwrap();
    assert_eq!(batch.succeeded.len(), 2);

    let mut session = SessionState::new();
    let refusal = context
        .ask(DEFAULT_COLLECTION, "What is the capital of Japan?", &mut session)
        .await
        .unwrap();
    assert!(refusal.is_refusal());
    assert_eq!(model.call_count(), 0);

    let answer =
        context.ask(DEFAULT_COLLECTION, "Where is the Eiffel Tower?", &mut session).await.unwrap();
    assert_eq!(answer.source, "paris.txt");
    let prompt = &model.requests()[0].prompt;
    assert!(!prompt.contains("divider.txt"));
}

#[tokio::test]
async fn punctuation_only_question_is_refused() {
    let model = Arc::new(MockGenerationModel::new().with_fallback("Something."));
    let context = context(model.clone());
    context
        .ingest_batch(DEFAULT_COLLECTION, &[SourceFile::new("paris.txt", EIFFEL)])
        .await
        .unwrap();

    let mut session = SessionState::new();
    let answer = context.ask(DEFAULT_COLLECTION, "???", &mut session).await.unwrap();
    assert!(answer.is_refusal());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn unreadable_paths_do_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let paris = dir.path().join("paris.txt");
    std::fs::write(&paris, EIFFEL).unwrap();
    let missing = dir.path().join("missing.txt");

    let model = Arc::new(MockGenerationModel::new().with_fallback("Paris."));
    let context = context(model);
    let batch = context.ingest_paths(DEFAULT_COLLECTION, &[missing, paris]).await.unwrap();

    let indexed: Vec<(&str, bool)> =
        batch.succeeded.iter().map(|d| (d.filename.as_str(), d.placeholder)).collect();
    assert_eq!(indexed, [("missing.txt", true), ("paris.txt", false)]);
    assert!(batch.failed.is_empty());
    assert_eq!(batch.warnings.len(), 1);
    assert!(matches!(batch.warnings[0], RagError::ConversionError { ref filename, .. } if filename == "missing.txt"));

    let mut session = SessionState::new();
    let answer =
        context.ask(DEFAULT_COLLECTION, "Where is the Eiffel Tower?", &mut session).await.unwrap();
    assert_eq!(answer.source, "paris.txt");
}

#[tokio::test]
async fn oversized_paths_are_rejected_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let huge = dir.path().join("huge.txt");
    std::fs::write(&huge, "x".repeat(101)).unwrap();

    let err = SourceFile::from_path_with_limit(&huge, 100).unwrap_err();
    assert!(matches!(err, RagError::FileTooLarge { size: 101, limit: 100, .. }));
    assert_eq!(SourceFile::from_path_with_limit(&huge, 101).unwrap().bytes.len(), 101);

    let config = RagConfig::builder().max_file_bytes(100).build().unwrap();
    let context = context_with(Arc::new(MockGenerationModel::new()), config);
    let batch = context.ingest_paths(DEFAULT_COLLECTION, &[huge]).await.unwrap();
    assert!(batch.succeeded.is_empty());
    assert!(matches!(
        batch.failed[0].error,
        RagError::FileTooLarge { ref filename, size: 101, limit: 100 } if filename == "huge.txt"
    ));
}
