use std::fs;
use std::io::Write;
use tempfile::TempDir;

use docrag_core::chunker::{reconstruct, Chunker, ChunkingConfig};
use docrag_core::data_processor::{corpus_fingerprint, DataProcessor};

#[test]
fn load_dir_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut f = fs::File::create(dir.join("a.txt")).unwrap();
    writeln!(f, "Short text").unwrap();

    let outcome = DataProcessor::default().load_dir(dir).expect("load");

    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.documents[0].id, "a.txt");
    assert_eq!(outcome.documents[0].text.trim(), "Short text");
    assert!(outcome.failures.is_empty());
}

#[test]
fn load_dir_filters_extensions_and_nests_ids() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("notes/deep")).unwrap();
    fs::write(dir.join("notes/deep/b.md"), "bravo").unwrap();
    fs::write(dir.join("a.TXT"), "alpha").unwrap();
    fs::write(dir.join("image.png"), [0u8, 1, 2]).unwrap();

    let outcome = DataProcessor::new(&["txt", ".md"]).load_dir(dir).expect("load");

    let ids: Vec<&str> = outcome.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a.TXT", "notes/deep/b.md"]);
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.txt"), [b'o', b'k', 0xff, b'!']).unwrap();

    let outcome = DataProcessor::default().load_dir(tmp.path()).expect("load");

    assert_eq!(outcome.documents.len(), 1);
    assert!(outcome.documents[0].text.starts_with("ok"));
    assert!(outcome.documents[0].text.ends_with('!'));
}

#[cfg(unix)]
#[test]
fn unreadable_entry_is_reported_and_loading_continues() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("good.txt"), "still here").unwrap();
    std::os::unix::fs::symlink(tmp.path().join("gone.txt"), tmp.path().join("broken.txt")).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("good.txt"), tmp.path().join("linked.txt")).unwrap();

    let outcome = DataProcessor::default().load_dir(tmp.path()).expect("load");

    let ids: Vec<&str> = outcome.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["good.txt", "linked.txt"]);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].path.ends_with("broken.txt"));
    assert!(matches!(outcome.failures[0].error, docrag_core::error::Error::Io { .. }));
}

#[test]
fn missing_or_empty_directory_yields_no_documents() {
    let tmp = TempDir::new().unwrap();
    let empty = DataProcessor::default().load_dir(tmp.path()).expect("empty dir");
    assert!(empty.documents.is_empty());

    let missing = DataProcessor::default().load_dir(&tmp.path().join("nope")).expect("missing dir");
    assert!(missing.documents.is_empty());
}

#[test]
fn fingerprint_tracks_content_changes() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
    let processor = DataProcessor::default();
    let chunking = ChunkingConfig::default();
    let first = corpus_fingerprint(&processor.load_dir(tmp.path()).unwrap().documents, "fake:d8", chunking);
    let again = corpus_fingerprint(&processor.load_dir(tmp.path()).unwrap().documents, "fake:d8", chunking);
    assert_eq!(first, again);

    fs::write(tmp.path().join("a.txt"), "alpha!").unwrap();
    let changed = corpus_fingerprint(&processor.load_dir(tmp.path()).unwrap().documents, "fake:d8", chunking);
    assert_ne!(first, changed);
}

#[test]
fn fingerprint_covers_model_and_chunking() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
    let docs = DataProcessor::default().load_dir(tmp.path()).unwrap().documents;
    let chunking = ChunkingConfig::default();
    let base = corpus_fingerprint(&docs, "bert:all-MiniLM-L6-v2:d384", chunking);

    assert_ne!(base, corpus_fingerprint(&docs, "fake:trigram:d384", chunking));
    assert_ne!(base, corpus_fingerprint(&docs, "bert:all-MiniLM-L6-v2:d384", ChunkingConfig { chunk_size: 50, chunk_overlap: 5 }));
    assert_ne!(base, corpus_fingerprint(&docs, "bert:all-MiniLM-L6-v2:d384", ChunkingConfig { chunk_overlap: 0, ..chunking }));
}

#[test]
fn loaded_documents_chunk_and_reconstruct() {
    let tmp = TempDir::new().unwrap();
    let body = "Cats are mammals. They purr and sleep a lot.\n\n".repeat(20);
    fs::write(tmp.path().join("cats.txt"), &body).unwrap();

    let outcome = DataProcessor::default().load_dir(tmp.path()).unwrap();
    let chunker = Chunker::new(ChunkingConfig { chunk_size: 120, chunk_overlap: 15 }).unwrap();
    let chunks = chunker.chunk_document(&outcome.documents[0]);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.doc_id == "cats.txt"));
    assert!(chunks.iter().all(|c| c.text.chars().count() <= 120));
    assert_eq!(reconstruct(&chunks), body);
}
