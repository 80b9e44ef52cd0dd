use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use intake_core::error::{Error, Result};
use intake_core::traits::Retriever;
use intake_core::types::{ReferenceChunk, RetrievalEntry, SourceChannel};
use intake_embed::HashEmbedder;
use intake_hybrid::Fusion;
use intake_text::{KeywordIndexer, KeywordSearch};
use intake_vector::{SemanticSearch, VectorIndexer};

enum Behaviour {
    Hits(Vec<(&'static str, &'static str)>),
    Fail,
    Hang,
}

struct FakeRetriever {
    channel: SourceChannel,
    behaviour: Behaviour,
}

#[async_trait]
impl Retriever for FakeRetriever {
    fn channel(&self) -> SourceChannel {
        self.channel
    }

    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<RetrievalEntry>> {
        match &self.behaviour {
            Behaviour::Hits(hits) => Ok(hits
                .iter()
                .take(top_k)
                .map(|(id, title)| RetrievalEntry {
                    chunk_id: (*id).to_string(),
                    title: (*title).to_string(),
                    text: format!("{} body from {}", title, self.channel),
                    score: 1.0,
                    source: self.channel,
                })
                .collect()),
            Behaviour::Fail => Err(Error::index_unavailable(self.channel, "connection refused")),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(vec![])
            }
        }
    }
}

fn fake(channel: SourceChannel, behaviour: Behaviour) -> Arc<dyn Retriever> {
    Arc::new(FakeRetriever { channel, behaviour })
}

#[tokio::test]
async fn fuse_prefers_semantic_and_respects_top_k() {
    let fusion = Fusion::new(
        fake(SourceChannel::Semantic, Behaviour::Hits(vec![("s1", "Make New Package"), ("s2", "Ignored By Top K"), ("s3", "x")])),
        fake(SourceChannel::Lexical, Behaviour::Hits(vec![("l1", "Make New Package"), ("l2", "Publish Artwork to Platform")])),
    )
    .with_top_k(1, 2);

    let bundle = fusion.fuse("new package").await;
    assert_eq!(bundle.total_chunk_count, 2);
    assert_eq!(bundle.combined_title, "Make New Package + Publish Artwork to Platform");
    assert!(bundle.combined_text.contains("Make New Package body from semantic"));
    assert!(!bundle.combined_text.contains("Make New Package body from lexical"));
    assert!(bundle.degraded.is_empty());
}

#[tokio::test]
async fn failed_channel_degrades_instead_of_erroring() {
    let fusion = Fusion::new(
        fake(SourceChannel::Semantic, Behaviour::Fail),
        fake(SourceChannel::Lexical, Behaviour::Hits(vec![("l1", "Add Missing Image Assets")])),
    );
    let bundle = fusion.fuse("missing images").await;
    assert_eq!(bundle.total_chunk_count, 1);
    assert_eq!(bundle.degraded, vec![SourceChannel::Semantic]);
}

#[tokio::test]
async fn zero_evidence_only_when_both_channels_are_empty() {
    let empty = Fusion::new(
        fake(SourceChannel::Semantic, Behaviour::Hits(vec![])),
        fake(SourceChannel::Lexical, Behaviour::Fail),
    );
    assert_eq!(empty.fuse("anything").await.total_chunk_count, 0);

    let one_side = Fusion::new(
        fake(SourceChannel::Semantic, Behaviour::Hits(vec![("s1", "Make New Package")])),
        fake(SourceChannel::Lexical, Behaviour::Hits(vec![])),
    );
    assert_eq!(one_side.fuse("anything").await.total_chunk_count, 1);
}

#[tokio::test]
async fn hung_channel_is_bounded_by_timeout() {
    let fusion = Fusion::new(
        fake(SourceChannel::Semantic, Behaviour::Hits(vec![("s1", "Make New Package")])),
        fake(SourceChannel::Lexical, Behaviour::Hang),
    )
    .with_timeout(Duration::from_millis(50));

    let started = std::time::Instant::now();
    let bundle = fusion.fuse("package").await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(bundle.total_chunk_count, 1);
    assert_eq!(bundle.degraded, vec![SourceChannel::Lexical]);
}

#[tokio::test]
async fn fuse_over_real_indexes() {
    let tmp = tempfile::tempdir().unwrap();
    let chunks = vec![
        ReferenceChunk { id: "publish-artwork".into(), title: "Publish Artwork to Platform".into(), text: "push approved artwork to the platform".into() },
        ReferenceChunk { id: "add-missing".into(), title: "Add Missing Image Assets".into(), text: "episodes missing images".into() },
    ];
    let keyword_dir = tmp.path().join("keyword");
    KeywordIndexer::new(keyword_dir.clone()).unwrap().index(&chunks).unwrap();
    let lancedb_dir = tmp.path().join("lancedb");
    VectorIndexer::new(lancedb_dir.clone(), "rag_chunks", Arc::new(HashEmbedder::new(32))).index(&chunks).await.unwrap();

    let semantic = SemanticSearch::new(&lancedb_dir.to_string_lossy(), "rag_chunks", Arc::new(HashEmbedder::new(32))).await.unwrap();
    let fusion = Fusion::new(Arc::new(semantic), Arc::new(KeywordSearch::new(keyword_dir)));

    let bundle = fusion.fuse("push artwork to platform").await;
    // semantic returns both chunks; the lexical hit repeats one of their titles
    assert_eq!(bundle.total_chunk_count, 2);
    assert!(bundle.combined_title.contains("Publish Artwork to Platform"));
    assert!(bundle.degraded.is_empty());
}
