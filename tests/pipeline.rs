mod common;

use std::sync::Arc;

use common::{bag_of_words, init_tracing, seeded_store, service, FakeCompletion, FakeEmbedder};
use pretty_assertions::assert_eq;
use skillcoach::compose::render_context;
use skillcoach::{ChunkConfig, IngestionPipeline, MemoryStore, Retriever, VectorStore};

#[tokio::test]
async fn thousand_word_document_becomes_two_chunks() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let words: Vec<String> = (0..1000).map(|i| format!("w{i}")).collect();
    std::fs::write(dir.path().join("visualization.txt"), words.join(" ")).unwrap();

    let store = Arc::new(MemoryStore::new());
    let embedder = Arc::new(FakeEmbedder::default());
    let report = IngestionPipeline::new(embedder.clone(), store.clone(), ChunkConfig::default())
        .ingest(dir.path())
        .await
        .unwrap();

    assert_eq!(report.files, 1);
    assert_eq!(report.inserted, 2);
    assert!(report.failures.is_empty());
    assert_eq!(embedder.calls(), 2);

    let records = store.records().await;
    assert_eq!(records.len(), 2);
    let (first_id, first) = &records[0];
    let (second_id, second) = &records[1];
    assert!(first_id < second_id);
    assert_eq!(first.title, "visualization");
    assert_eq!(first.source, "visualization.txt");
    assert_eq!(first.chunk.split_whitespace().count(), 800);
    assert_eq!((first.sequence_index, second.sequence_index), (0, 1));
    assert!(second.chunk.starts_with("w700 "));
    assert!(second.chunk.ends_with(" w999"));
    assert_eq!(second.chunk.split_whitespace().count(), 300);
}

#[tokio::test]
async fn failed_file_embedding_keeps_other_files() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "breathe slowly").unwrap();
    std::fs::write(dir.path().join("b.txt"), "notice the thought").unwrap();

    let store = Arc::new(MemoryStore::new());
    let report = IngestionPipeline::new(
        Arc::new(FakeEmbedder::failing()),
        store.clone(),
        ChunkConfig::default(),
    )
    .ingest(dir.path())
    .await
    .unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.inserted, 0);
    let kinds: Vec<&str> = report.failures.iter().map(|f| f.kind()).collect();
    assert_eq!(kinds, vec!["ingestion_item_failure"; 2]);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn top_k_larger_than_store_returns_everything() {
    let store = seeded_store(&[
        ("sleep.txt", "keep a regular sleep schedule"),
        ("focus.txt", "single task with a timer"),
        ("stress.txt", "slow exhale lowers arousal"),
    ])
    .await;
    let completion = Arc::new(FakeCompletion::replying("Keep a schedule."));
    let answer = service(Arc::new(FakeEmbedder::default()), store, completion.clone(), 5)
        .answer("how do I sleep better")
        .await
        .unwrap();
    assert_eq!(answer.sources.len(), 3);
    assert_eq!(answer.answer, "Keep a schedule.");
    assert_eq!(completion.calls(), 1);
}

#[tokio::test]
async fn sources_are_the_retrieved_matches_in_order() {
    let store = seeded_store(&[
        ("a.txt", "alpha beta"),
        ("b.txt", "gamma delta epsilon"),
        ("c.txt", "alpha beta"),
        ("d.txt", "zeta"),
    ])
    .await;
    let embedder = Arc::new(FakeEmbedder::default());
    let retrieved = Retriever::new(embedder.clone(), store.clone())
        .retrieve("alpha beta", 3)
        .await
        .unwrap();
    assert_eq!(retrieved.len(), 3);
    assert!(retrieved
        .windows(2)
        .all(|pair| pair[0].similarity >= pair[1].similarity));
    // identical chunks tie; the earlier insert wins
    assert_eq!(retrieved[0].source, "a.txt");
    assert_eq!(retrieved[1].source, "c.txt");

    let answer = service(
        embedder,
        store,
        Arc::new(FakeCompletion::replying("")),
        3,
    )
    .answer("alpha beta")
    .await
    .unwrap();
    assert_eq!(answer.sources, retrieved);
    assert_eq!(answer.answer, "");
    assert!(render_context(&answer.sources).starts_with("Title: a\nSource: a.txt\nContent: alpha beta"));
}

#[tokio::test]
async fn embedding_failure_skips_completion() {
    let store = seeded_store(&[("a.txt", "alpha")]).await;
    let completion = Arc::new(FakeCompletion::replying("unused"));
    let err = service(
        Arc::new(FakeEmbedder::failing()),
        store,
        completion.clone(),
        5,
    )
    .answer("what is grounding?")
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "embedding_failure");
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn blank_question_makes_no_downstream_calls() {
    let store = seeded_store(&[("a.txt", "alpha")]).await;
    let embedder = Arc::new(FakeEmbedder::default());
    let completion = Arc::new(FakeCompletion::replying("unused"));
    let service = service(embedder.clone(), store, completion.clone(), 5);
    for question in ["", "   ", "\n\t"] {
        let err = service.answer(question).await.unwrap_err();
        assert_eq!(err.kind(), "validation_failure");
    }
    assert_eq!(embedder.calls(), 0);
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn query_dimension_must_match_stored_records() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert(&common::record("a.txt", "alpha", vec![1.0, 0.0]))
        .await
        .unwrap();
    assert_eq!(bag_of_words("alpha").len(), common::DIMS);
    let err = service(
        Arc::new(FakeEmbedder::default()),
        store,
        Arc::new(FakeCompletion::replying("unused")),
        5,
    )
    .answer("alpha")
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "configuration_failure");
}
