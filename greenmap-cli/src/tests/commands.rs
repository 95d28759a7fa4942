//! Command execution against in-memory and on-disk stores.

use super::*;
use crate::commands::{Command, execute};
use camino::Utf8PathBuf;
use greenmap_core::test_support::{MemoryCache, StubRemoteStore};
use greenmap_core::{GreenKind, LocalCache, ObjectId, RemoteStore};
use rstest::{fixture, rstest};
use std::future::Future;
use tempfile::TempDir;

type TestStore = CatalogStore<MemoryCache, StubRemoteStore>;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build Tokio runtime")
        .block_on(future)
}

fn command(args: &[&str]) -> Command {
    Cli::try_parse_from(std::iter::once("greenmap").chain(args.iter().copied()))
        .expect("arguments should parse")
        .command
}

fn run<C: LocalCache, R: RemoteStore>(
    store: &mut CatalogStore<C, R>,
    args: &[&str],
) -> Result<String, CliError> {
    let mut out = Vec::new();
    block_on(execute(store, command(args), &mut out))?;
    Ok(String::from_utf8(out).expect("output is UTF-8"))
}

fn add(store: &mut TestStore, kind: &str, lat: &str, lon: &str, name: &str) -> String {
    run(
        store,
        &["add", "--type", kind, "--lat", lat, "--lon", lon, "--name", name],
    )
    .expect("add should succeed")
    .split('\t')
    .next()
    .expect("row starts with the id")
    .to_owned()
}

fn local_store() -> TestStore {
    let mut store = CatalogStore::new(MemoryCache::default(), StubRemoteStore::unconfigured());
    block_on(store.init());
    store
}

#[fixture]
fn store() -> TestStore {
    local_store()
}

#[rstest]
fn add_prints_row_and_list_shows_rows(mut store: TestStore) {
    let id = add(&mut store, "tree", "52.52", "85.21", "Old oak");
    add(&mut store, "lawn", "52.5", "85.2", "Central lawn");

    let listing = run(&mut store, &["list"]).expect("list");
    assert_eq!(
        listing,
        format!("{id}\ttree\t52.52,85.21\tOld oak\n")
            + &format!("{}\tlawn\t52.5,85.2\tCentral lawn\n", store.get_all_objects()[1].id)
    );

    let trees = run(&mut store, &["list", "--type", "tree"]).expect("filtered list");
    assert_eq!(trees.lines().count(), 1);
    assert!(trees.starts_with(&id));
}

#[rstest]
fn show_prints_json(mut store: TestStore) {
    let id = add(&mut store, "bush", "52.51", "85.22", "Lilac");
    let text = run(&mut store, &["show", &id]).expect("show");
    let value: serde_json::Value = serde_json::from_str(&text).expect("show prints JSON");
    assert_eq!(value["type"], "bush");
    assert_eq!(value["name"], "Lilac");
    assert_eq!(value["coords"], serde_json::json!([52.51, 85.22]));
}

#[rstest]
#[case(&["show", "missing"])]
#[case(&["delete", "missing"])]
#[case(&["update", "missing", "--name", "x"])]
fn unknown_ids_are_not_found(mut store: TestStore, #[case] args: &[&str]) {
    let err = run(&mut store, args).expect_err("unknown id");
    match err {
        CliError::NotFound { id } => assert_eq!(id, "missing"),
        other => panic!("expected NotFound, found {other:?}"),
    }
}

#[rstest]
fn update_changes_requested_fields(mut store: TestStore) {
    let id = add(&mut store, "tree", "52.52", "85.21", "Old oak");
    let row = run(
        &mut store,
        &["update", &id, "--type", "bush", "--lat", "52.6", "--lon", "85.3"],
    )
    .expect("update");
    assert_eq!(row, format!("{id}\tbush\t52.6,85.3\tOld oak\n"));

    let object = store
        .find_object(&ObjectId::new(id.as_str()))
        .expect("object kept");
    assert_eq!(object.kind, GreenKind::Bush);
}

#[rstest]
fn update_without_changes_is_rejected(mut store: TestStore) {
    let id = add(&mut store, "tree", "52.52", "85.21", "Old oak");
    let err = run(&mut store, &["update", &id]).expect_err("nothing to change");
    assert!(matches!(err, CliError::EmptyUpdate { .. }));
}

#[rstest]
fn delete_removes_object(mut store: TestStore) {
    let id = add(&mut store, "tree", "52.52", "85.21", "Old oak");
    let out = run(&mut store, &["delete", &id]).expect("delete");
    assert_eq!(out, format!("deleted {id}\n"));
    assert!(store.get_all_objects().is_empty());
}

#[rstest]
fn stats_prints_counts(mut store: TestStore) {
    add(&mut store, "tree", "52.52", "85.21", "Oak");
    add(&mut store, "tree", "52.53", "85.21", "Birch");
    add(&mut store, "flowerbed", "52.54", "85.21", "Roses");

    let out = run(&mut store, &["stats"]).expect("stats");
    assert_eq!(
        out,
        "total\t3\ntree\t2\nlawn\t0\nbush\t0\nlast update\tnever\n"
    );
}

#[rstest]
fn bbox_lists_objects_inside(mut store: TestStore) {
    let inside = add(&mut store, "tree", "52.52", "85.21", "Inside");
    add(&mut store, "tree", "53.0", "86.0", "Outside");

    let out = run(
        &mut store,
        &["bbox", "--south", "52.5", "--west", "85.2", "--north", "52.6", "--east", "85.3"],
    )
    .expect("bbox");
    assert_eq!(out.lines().count(), 1);
    assert!(out.starts_with(&inside));
}

#[rstest]
fn export_to_file_and_import_back(mut store: TestStore) {
    let tmp = TempDir::new().expect("tempdir");
    let path = Utf8PathBuf::from_path_buf(tmp.path().join("export.json")).expect("utf8 path");
    add(&mut store, "tree", "52.52", "85.21", "Oak");

    let out = run(&mut store, &["export", "--output", path.as_str()]).expect("export");
    assert!(out.is_empty());

    let mut fresh = local_store();
    let out = run(&mut fresh, &["import", path.as_str()]).expect("import");
    assert_eq!(out, "imported 1 objects\n");
    assert_eq!(fresh.get_all_objects()[0].name, "Oak");
}

#[rstest]
fn export_without_output_prints_json(mut store: TestStore) {
    add(&mut store, "lawn", "52.5", "85.2", "Lawn");
    let out = run(&mut store, &["export"]).expect("export");
    let value: serde_json::Value = serde_json::from_str(&out).expect("export prints JSON");
    assert_eq!(value["objects"].as_array().map(Vec::len), Some(1));
}

#[rstest]
fn import_of_missing_file_is_reported(mut store: TestStore) {
    let err = run(&mut store, &["import", "/definitely/not/here.json"]).expect_err("no file");
    assert!(matches!(err, CliError::ReadImport { .. }));
}

#[rstest]
fn import_of_document_without_objects_fails(mut store: TestStore) {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("bad.json");
    std::fs::write(&path, r#"{"metadata": {}}"#).expect("write");
    let path = path.to_str().expect("utf8 path").to_owned();
    let err = run(&mut store, &["import", &path]).expect_err("missing objects");
    assert!(matches!(err, CliError::Store(_)));
}

#[rstest]
fn sync_is_skipped_without_token(mut store: TestStore) {
    let out = run(&mut store, &["sync"]).expect("sync");
    assert_eq!(out, "skipped: offline or no access token\n");
}

#[rstest]
fn sync_saves_to_configured_remote() {
    let mut store = CatalogStore::new(MemoryCache::default(), StubRemoteStore::configured());
    block_on(store.init());

    let out = run(&mut store, &["sync"]).expect("sync");
    assert_eq!(out, "saved\n");
    assert_eq!(store.remote().puts().len(), 1);
}

#[rstest]
fn changes_persist_across_runs() {
    let tmp = TempDir::new().expect("tempdir");
    let cache_dir = Utf8PathBuf::from_path_buf(tmp.path().join("cache")).expect("utf8 path");
    let config = CatalogConfig::try_from(ConnectionArgs {
        cache_dir: Some(cache_dir),
        offline: Some(true),
        ..ConnectionArgs::default()
    })
    .expect("config");

    let mut out = Vec::new();
    run_with(
        &config,
        command(&["add", "--type", "tree", "--lat", "52.52", "--lon", "85.21"]),
        &mut out,
    )
    .expect("add");
    let added = String::from_utf8(out).expect("utf8");

    let mut out = Vec::new();
    run_with(&config, command(&["list"]), &mut out).expect("list");
    let listing = String::from_utf8(out).expect("utf8");
    assert_eq!(listing, added);
    assert!(listing.contains("\ttree\t52.52,85.21\t"));
}
