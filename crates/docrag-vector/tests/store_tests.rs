use docrag_core::error::Error;
use docrag_core::traits::{Embedder, VectorStore};
use docrag_core::types::EmbeddingRecord;
use docrag_embed::FakeEmbedder;
use docrag_vector::LanceStore;
use tempfile::TempDir;

const DIM: usize = 8;

fn basis_record(i: usize) -> EmbeddingRecord {
    let mut vector = vec![0.05f32; DIM];
    vector[i % DIM] = 1.0;
    EmbeddingRecord { text: format!("record {i}"), vector, source: format!("doc{i}.txt"), chunk_index: i as u32 }
}

fn texts(store: &LanceStore, q: &[f32], k: usize) -> Vec<String> {
    store.search(q, k).expect("search").into_iter().map(|h| h.text).collect()
}

#[test]
fn inserted_vector_ranks_first() {
    let tmp = TempDir::new().unwrap();
    let store = LanceStore::open(tmp.path(), "records", DIM).expect("open");
    let records: Vec<_> = (0..DIM).map(basis_record).collect();
    store.insert(&records).expect("insert");

    for r in &records {
        let hits = store.search(&r.vector, 3).expect("search");
        assert_eq!(hits[0].text, r.text);
        assert_eq!(hits[0].source, r.source);
        assert!((hits[0].score - 1.0).abs() < 1e-4, "score={}", hits[0].score);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[test]
fn k_larger_than_store_returns_everything() {
    let tmp = TempDir::new().unwrap();
    let store = LanceStore::open(tmp.path(), "records", DIM).expect("open");
    store.insert(&[basis_record(0), basis_record(1)]).expect("insert");
    assert_eq!(store.search(&basis_record(0).vector, 10).expect("search").len(), 2);
}

#[test]
fn missing_and_empty_tables_have_no_hits() {
    let tmp = TempDir::new().unwrap();
    let store = LanceStore::open(tmp.path(), "records", DIM).expect("open");
    assert!(store.search(&basis_record(0).vector, 2).expect("missing").is_empty());
    assert_eq!(store.count().expect("count"), 0);

    store.rebuild(&[]).expect("empty rebuild");
    assert!(store.search(&basis_record(0).vector, 2).expect("empty").is_empty());
}

#[test]
fn rebuild_replaces_instead_of_appending() {
    let tmp = TempDir::new().unwrap();
    let store = LanceStore::open(tmp.path(), "records", DIM).expect("open");
    let records: Vec<_> = (0..4).map(basis_record).collect();
    store.rebuild(&records).expect("first");
    let first = texts(&store, &records[2].vector, 4);
    store.rebuild(&records).expect("second");
    assert_eq!(store.count().expect("count"), 4);
    assert_eq!(texts(&store, &records[2].vector, 4), first);

    store.rebuild(&records[..1]).expect("third");
    assert_eq!(store.count().expect("count"), 1);
}

#[test]
fn store_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let store = LanceStore::open(tmp.path(), "records", DIM).expect("open");
        store.rebuild(&[basis_record(3)]).expect("rebuild");
    }
    let reopened = LanceStore::open(tmp.path(), "records", DIM).expect("reopen");
    assert_eq!(texts(&reopened, &basis_record(3).vector, 1), vec!["record 3"]);
}

#[test]
fn dimension_mismatches_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = LanceStore::open(tmp.path(), "records", DIM).expect("open");
    let mut bad = basis_record(0);
    bad.vector.push(0.0);
    assert!(matches!(store.rebuild(&[bad]), Err(Error::DimensionMismatch { .. })));
    assert!(matches!(store.search(&[1.0, 0.0], 1), Err(Error::DimensionMismatch { .. })));

    store.rebuild(&[basis_record(0)]).expect("rebuild");
    let wider = LanceStore::open(tmp.path(), "records", DIM + 1).expect("open wider");
    assert!(matches!(wider.search(&vec![0.1; DIM + 1], 1), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn meta_values_upsert() {
    let tmp = TempDir::new().unwrap();
    let store = LanceStore::open(tmp.path(), "records", DIM).expect("open");
    assert_eq!(store.get_meta("fingerprint:records").expect("get"), None);
    store.set_meta("fingerprint:records", "abc").expect("set");
    store.set_meta("fingerprint:records", "def").expect("overwrite");
    assert_eq!(store.get_meta("fingerprint:records").expect("get").as_deref(), Some("def"));
}

#[test]
fn mammal_query_skips_rocks() {
    let tmp = TempDir::new().unwrap();
    let embedder = FakeEmbedder::new(1024);
    let store = LanceStore::open(tmp.path(), "rag_test", embedder.dim()).expect("open");
    let corpus = ["cats are mammals", "dogs are mammals", "rocks are not alive"];
    let vectors = embedder.embed_batch(&corpus.map(String::from)).expect("embed");
    let records: Vec<_> = corpus
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (t, v))| EmbeddingRecord { text: t.to_string(), vector: v, source: "zoo.txt".into(), chunk_index: i as u32 })
        .collect();
    store.rebuild(&records).expect("rebuild");

    let q = embedder.embed_one("what is a mammal").expect("embed query");
    let mut got = texts(&store, &q, 2);
    got.sort();
    assert_eq!(got, vec!["cats are mammals", "dogs are mammals"]);
}
