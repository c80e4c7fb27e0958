//! File-backed stores
//!
//! Lets a migration run between two directories:
//! - legacy: `<root>/<bucket>/<scope>/<collection>.json`, each a JSON array of
//!   records; the catalog is the directory tree itself
//! - target: `<root>/<collection>.jsonl`, one document per line, plus
//!   `<root>/indexes.json` holding the ensured index definitions

use async_trait::async_trait;
use dualstore_document::Document;
use dualstore_migration::{IndexSpec, KeyspaceDescriptor, LegacyStatement, LegacyStore, StoreError, TargetStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// File holding ensured index definitions in the target directory
pub(crate) const INDEX_FILE: &str = "indexes.json";

const RECORD_EXTENSION: &str = "json";

/// Sorted entries of a directory, split by kind
async fn entries(dir: &Path) -> Result<(Vec<(String, PathBuf)>, Vec<(String, PathBuf)>), StoreError> {
    let mut read = tokio::fs::read_dir(dir).await.map_err(|e| StoreError::io(dir, e))?;
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    while let Some(entry) = read.next_entry().await.map_err(|e| StoreError::io(dir, e))? {
        let path = entry.path();
        let kind = entry.file_type().await.map_err(|e| StoreError::io(&path, e))?;
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if kind.is_dir() {
            dirs.push((name, path));
        } else if kind.is_file() {
            files.push((name, path));
        }
    }

    dirs.sort();
    files.sort();
    Ok((dirs, files))
}

/// Legacy store reading keyspaces from a directory tree
#[derive(Debug, Clone)]
pub(crate) struct FileLegacyStore {
    root: PathBuf,
}

impl FileLegacyStore {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn keyspace_path(&self, keyspace: &KeyspaceDescriptor) -> PathBuf {
        self.root
            .join(&keyspace.bucket)
            .join(&keyspace.scope)
            .join(format!("{}.{RECORD_EXTENSION}", keyspace.collection))
    }

    async fn catalog(&self) -> Result<Vec<Document>, StoreError> {
        let mut rows = Vec::new();
        let (buckets, _) = entries(&self.root).await?;
        for (bucket, bucket_path) in buckets {
            let (scopes, _) = entries(&bucket_path).await?;
            for (scope, scope_path) in scopes {
                let (_, files) = entries(&scope_path).await?;
                for (file, _) in files {
                    let Some(collection) = file
                        .strip_suffix(RECORD_EXTENSION)
                        .and_then(|stem| stem.strip_suffix('.'))
                        .filter(|stem| !stem.is_empty())
                    else {
                        continue;
                    };
                    rows.push(catalog_row(&bucket, &scope, collection));
                }
            }
        }
        debug!(root = %self.root.display(), keyspaces = rows.len(), "scanned legacy directory");
        Ok(rows)
    }

    async fn projection(&self, keyspace: &KeyspaceDescriptor) -> Result<Vec<Document>, StoreError> {
        let path = self.keyspace_path(keyspace);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        let location = path.display().to_string();

        let serde_json::Value::Array(records) =
            serde_json::from_str(&text).map_err(|e| StoreError::malformed(&location, e.to_string()))?
        else {
            return Err(StoreError::malformed(location, "expected a JSON array of records"));
        };

        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                Document::from_json(record)
                    .ok_or_else(|| StoreError::malformed(format!("{location}[{index}]"), "record is not an object"))
            })
            .collect()
    }
}

fn catalog_row(bucket: &str, scope: &str, collection: &str) -> Document {
    let mut entry = Document::new();
    entry.insert("bucket", bucket);
    entry.insert("scope", scope);
    entry.insert("id", collection);

    let mut row = Document::new();
    row.insert("keyspaces", entry);
    row
}

#[async_trait]
impl LegacyStore for FileLegacyStore {
    async fn query(&self, statement: &LegacyStatement) -> Result<Vec<Document>, StoreError> {
        match statement {
            LegacyStatement::Catalog => self.catalog().await,
            LegacyStatement::KeyspaceProjection(keyspace) => self.projection(keyspace).await,
        }
    }
}

/// Target store appending JSON lines per collection
#[derive(Debug)]
pub(crate) struct FileTargetStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTargetStore {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.jsonl"))
    }

    async fn ensure_root(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))
    }
}

#[async_trait]
impl TargetStore for FileTargetStore {
    async fn bulk_insert(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        let mut buffer = String::new();
        for document in &documents {
            let line = serde_json::to_string(&document.to_json())
                .map_err(|e| StoreError::write(collection, e.to_string()))?;
            buffer.push_str(&line);
            buffer.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        self.ensure_root().await?;
        let path = self.collection_path(collection);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        file.flush().await.map_err(|e| StoreError::io(&path, e))?;

        debug!(collection, documents = documents.len(), path = %path.display(), "appended documents");
        Ok(())
    }

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_root().await?;
        let path = self.root.join(INDEX_FILE);

        let mut indexes: BTreeMap<String, Vec<IndexSpec>> = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::malformed(path.display().to_string(), e.to_string()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(StoreError::io(&path, err)),
        };

        let name = index.effective_name();
        let specs = indexes.entry(collection.to_string()).or_default();
        specs.retain(|existing| existing.effective_name() != name);
        specs.push(index.clone());

        let text = serde_json::to_string_pretty(&indexes)
            .map_err(|e| StoreError::write(collection, e.to_string()))?;
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualstore_migration::KeyspaceEnumerator;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn write_keyspace(root: &Path, bucket: &str, scope: &str, collection: &str, body: &str) {
        let dir = root.join(bucket).join(scope);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{collection}.{RECORD_EXTENSION}")), body).unwrap();
    }

    #[tokio::test]
    async fn catalog_lists_collections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_keyspace(dir.path(), "travel-sample", "inventory", "route", "[]");
        write_keyspace(dir.path(), "travel-sample", "inventory", "airline", "[]");
        std::fs::write(dir.path().join("travel-sample/inventory/notes.txt"), "ignored").unwrap();

        let enumerator = KeyspaceEnumerator::new(Arc::new(FileLegacyStore::new(dir.path())));
        let keyspaces = enumerator.list_keyspaces().await.unwrap();

        let names: Vec<_> = keyspaces.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["travel-sample.inventory.airline", "travel-sample.inventory.route"]
        );
    }

    #[tokio::test]
    async fn catalog_only_lists_record_files() {
        let dir = tempfile::tempdir().unwrap();
        write_keyspace(dir.path(), "b", "s", "hotel", "[]");
        let scope = dir.path().join("b/s");
        std::fs::write(scope.join("route.jsonl"), "").unwrap();
        std::fs::write(scope.join("airportjson"), "[]").unwrap();
        std::fs::write(scope.join(".json"), "[]").unwrap();

        let store = Arc::new(FileLegacyStore::new(dir.path()));
        let keyspaces = KeyspaceEnumerator::new(Arc::clone(&store)).list_keyspaces().await.unwrap();

        let names: Vec<_> = keyspaces.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["b.s.hotel"]);
        let records = store
            .query(&LegacyStatement::KeyspaceProjection(keyspaces[0].clone()))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn projection_reads_records() {
        let dir = tempfile::tempdir().unwrap();
        write_keyspace(
            dir.path(),
            "travel-sample",
            "inventory",
            "route",
            r#"[{"_id": "route_1", "Source Airport": "SFO"}]"#,
        );
        let store = FileLegacyStore::new(dir.path());
        let keyspace = KeyspaceDescriptor::new("travel-sample", "inventory", "route");

        let records = store
            .query(&LegacyStatement::KeyspaceProjection(keyspace))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("Source Airport"), Some("SFO"));
    }

    #[tokio::test]
    async fn non_array_keyspace_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_keyspace(dir.path(), "b", "s", "c", r#"{"_id": "x"}"#);
        let store = FileLegacyStore::new(dir.path());

        let err = store
            .query(&LegacyStatement::KeyspaceProjection(KeyspaceDescriptor::new("b", "s", "c")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn inserts_append_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTargetStore::new(dir.path().join("out"));
        let doc = |id: &str| Document::from_json(serde_json::json!({"_id": id})).unwrap();

        store.bulk_insert("route", vec![doc("a"), doc("b")]).await.unwrap();
        store.bulk_insert("route", vec![doc("c")]).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("out/route.jsonl")).unwrap();
        let ids: Vec<String> = text
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["_id"].to_string())
            .collect();
        assert_eq!(ids, vec!["\"a\"", "\"b\"", "\"c\""]);
    }

    #[tokio::test]
    async fn ensuring_an_index_twice_keeps_one_definition() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTargetStore::new(dir.path());

        store.ensure_index("users", &IndexSpec::ascending("username")).await.unwrap();
        store
            .ensure_index("users", &IndexSpec::ascending("username").unique())
            .await
            .unwrap();

        let text = std::fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
        let indexes: BTreeMap<String, Vec<IndexSpec>> = serde_json::from_str(&text).unwrap();
        assert_eq!(indexes["users"].len(), 1);
        assert!(indexes["users"][0].unique);
    }
}
