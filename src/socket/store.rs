//! File-backed socket storage.
//!
//! Layout under the data root:
//! - `{id}.json`: the live document, namespace colons mapped to directories
//! - `{id}_{status}.json`: terminal marker, authoritative by existence alone

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;
use tracing::debug;

use super::document;
use super::model::SocketData;
use super::record::Socket;
use super::status::SocketStatus;
use crate::config::SocketConfig;
use crate::error::SocketError;
use crate::i18n::{Passthrough, Translator};

/// Substrings removed from ids before they touch the filesystem.
const STRIPPED: &[&str] = &["..", "\\", ";", "\"", "'"];

/// Strip path-traversal and shell-meta sequences from an id.
pub fn sanitize_id(id: &str) -> String {
    STRIPPED
        .iter()
        .fold(id.to_string(), |acc, bad| acc.replace(bad, ""))
}

/// Random alphanumeric string (62-character alphabet).
pub fn random_str(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Shared handle to the data root, clock and translator.
///
/// Cloning is cheap; every [`Socket`] carries one.
#[derive(Clone)]
pub struct SocketStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: SocketConfig,
    translator: Arc<dyn Translator>,
}

impl fmt::Debug for SocketStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketStore")
            .field("data_root", &self.inner.config.data_root)
            .finish_non_exhaustive()
    }
}

impl SocketStore {
    /// Store with English (untranslated) messages.
    pub fn new(config: SocketConfig) -> Self {
        Self::with_translator(config, Arc::new(Passthrough))
    }

    pub fn with_translator(config: SocketConfig, translator: Arc<dyn Translator>) -> Self {
        Self {
            inner: Arc::new(StoreInner { config, translator }),
        }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.inner.config
    }

    pub fn data_root(&self) -> &Path {
        &self.inner.config.data_root
    }

    /// Localized form of a message key.
    pub fn translate(&self, key: &str) -> String {
        self.inner.translator.translate(key)
    }

    /// Current time in the configured zone and format.
    pub fn timestamp(&self) -> String {
        self.inner.config.timestamp()
    }

    /// `{date}_{time}_{random}`, prefixed with `{prefix}:` when given.
    pub fn generate_id(&self, prefix: Option<&str>) -> String {
        let now = self.inner.config.time_zone.now();
        let id = format!(
            "{}_{}_{}",
            now.format("%Y-%m-%d"),
            now.format("%Hh%Mm%Ss"),
            random_str(self.inner.config.random_id_len)
        );
        with_prefix(prefix, id)
    }

    /// Path of the document for `id`, or of its marker when `suffix` is set.
    ///
    /// The id is sanitized and every `:` or `/` becomes one directory
    /// level below the data root, so the result never escapes it. Returns
    /// `None` when nothing usable is left of the id.
    pub fn file_name(&self, id: &str, suffix: Option<SocketStatus>) -> Option<PathBuf> {
        let id = sanitize_id(id);
        let segments: Vec<&str> = id
            .split([':', '/'])
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let (last, dirs) = segments.split_last()?;

        let mut path = self.data_root().to_path_buf();
        path.extend(dirs);
        let file = match suffix {
            Some(status) => format!("{last}_{status}.json"),
            None => format!("{last}.json"),
        };
        path.push(file);
        Some(path)
    }

    /// Whether a live document exists for `id`.
    pub fn exists(&self, id: &str) -> bool {
        self.file_name(id, None).is_some_and(|p| p.is_file())
    }

    /// Whether the terminal marker `status` exists for `id`.
    pub fn has_marker(&self, id: &str, status: SocketStatus) -> bool {
        self.file_name(id, Some(status))
            .is_some_and(|p| p.is_file())
    }

    /// New in-memory socket. Nothing is written.
    pub fn create(&self, prefix: Option<&str>, id: Option<&str>) -> Socket {
        Socket::new(self, prefix, id)
    }

    /// New socket seeded from `options`, force-saved before returning.
    ///
    /// `options.prefix` and `options.id` feed the constructor; every other
    /// schema leaf present in `options` overwrites the default.
    pub fn make(&self, options: &Value) -> Result<Socket, SocketError> {
        let prefix = option_str(options, "prefix");
        let id = option_str(options, "id");
        let mut socket = self.create(prefix.as_deref(), id.as_deref());

        for path in document::flatten(&socket.document()) {
            if let Some(value) = document::lookup(options, &path) {
                socket.set(&path, value.clone(), false)?;
            }
        }

        socket.save_to_file(true, None)?;
        Ok(socket)
    }

    /// Socket rebuilt from its persisted document, `None` if there is none.
    pub fn create_from_id(&self, id: &str) -> Result<Option<Socket>, SocketError> {
        match self.read_document(id)? {
            Some(data) => Ok(Some(Socket::from_persisted(self, data))),
            None => Ok(None),
        }
    }

    /// Parse the persisted document for `id` without building a socket.
    pub fn load_content(&self, id: &str) -> Result<Option<Value>, SocketError> {
        Ok(self.read_document(id)?.map(|data| data.to_document()))
    }

    pub(crate) fn read_document(&self, id: &str) -> Result<Option<SocketData>, SocketError> {
        let Some(path) = self.file_name(id, None) else {
            return Ok(None);
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SocketError::io(path, e)),
        };
        debug!(id, path = %path.display(), "Loaded socket document");
        serde_json::from_slice(&bytes).map_err(|source| SocketError::Json { path, source })
            .map(Some)
    }

    /// Replace `path` with `bytes` via a temp file in the same directory,
    /// so readers never see a partial document.
    pub(crate) fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), SocketError> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        ensure_dir(dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".socket-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| SocketError::io(dir, e))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| SocketError::io(tmp.path(), e))?;
        set_mode(tmp.path(), 0o664);
        tmp.persist(path)
            .map_err(|e| SocketError::io(path, e.error))?;
        inherit_group(path, dir);
        Ok(())
    }
}

fn with_prefix(prefix: Option<&str>, id: String) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{id}"),
        _ => id,
    }
}

/// String or number option, ignoring empty strings.
fn option_str(options: &Value, key: &str) -> Option<String> {
    match options.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Create `dir` (group-writable) if it does not exist yet.
fn ensure_dir(dir: &Path) -> Result<(), SocketError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| SocketError::io(dir, e))?;
    set_mode(dir, 0o775);
    if let Some(parent) = dir.parent() {
        inherit_group(dir, parent);
    }
    debug!(dir = %dir.display(), "Created socket directory");
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
        debug!(path = %path.display(), error = %e, "Could not set permissions");
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

/// Best-effort: give `path` the owning group of `from`. Fails silently
/// when the process is not a member of that group.
#[cfg(unix)]
fn inherit_group(path: &Path, from: &Path) {
    use std::os::unix::fs::MetadataExt;

    let Ok(meta) = std::fs::metadata(from) else {
        return;
    };
    if let Err(e) = std::os::unix::fs::chown(path, None, Some(meta.gid())) {
        debug!(path = %path.display(), error = %e, "Could not align group ownership");
    }
}

#[cfg(not(unix))]
fn inherit_group(_path: &Path, _from: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (SocketStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SocketStore::new(SocketConfig::with_data_root(dir.path()));
        (store, dir)
    }

    #[test]
    fn sanitize_strips_dangerous_sequences() {
        assert_eq!(sanitize_id("../../etc:passwd"), "//etc:passwd");
        assert_eq!(sanitize_id(r#"a\b;c"d'e"#), "abcde");
        assert_eq!(sanitize_id("plain_id"), "plain_id");
    }

    #[test]
    fn random_str_length_and_alphabet() {
        let s = random_str(32);
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(random_str(0), "");
    }

    #[test]
    fn generated_id_shape() {
        let (store, _dir) = test_store();
        let id = store.generate_id(None);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), "2026-10-19".len());
        assert!(parts[1].ends_with('s') && parts[1].contains('h') && parts[1].contains('m'));
        assert_eq!(parts[2].len(), 32);
        assert!(!id.contains(':'));

        let prefixed = store.generate_id(Some("import"));
        assert!(prefixed.starts_with("import:"));
    }

    #[test]
    fn random_id_length_is_configurable() {
        let dir = TempDir::new().unwrap();
        let store = SocketStore::new(SocketConfig {
            random_id_len: 8,
            ..SocketConfig::with_data_root(dir.path())
        });
        let id = store.generate_id(None);
        assert_eq!(id.rsplit('_').next().unwrap().len(), 8);
    }

    #[test]
    fn file_name_maps_namespace_to_directories() {
        let (store, dir) = test_store();
        assert_eq!(
            store.file_name("sub:job", None).unwrap(),
            dir.path().join("sub").join("job.json")
        );
        assert_eq!(
            store.file_name("sub:job", Some(SocketStatus::Successful)).unwrap(),
            dir.path().join("sub").join("job_successful.json")
        );
    }

    #[test]
    fn file_name_empty_id() {
        let (store, _dir) = test_store();
        assert!(store.file_name("", None).is_none());
        assert!(store.file_name("..", None).is_none());
        assert!(store.file_name(":/:", None).is_none());
    }

    #[test]
    fn file_name_never_escapes_data_root() {
        let (store, dir) = test_store();
        for id in ["../../etc:passwd", "/etc/passwd", "..\\..\\x", "a/./b", "...:x"] {
            let path = store.file_name(id, None).unwrap();
            assert!(path.starts_with(dir.path()), "{id} escaped to {}", path.display());
            assert!(
                path.components()
                    .all(|c| !matches!(c, std::path::Component::ParentDir)),
                "{id} kept a parent component"
            );
        }
        assert_eq!(
            store.file_name("../../etc:passwd", None).unwrap(),
            dir.path().join("etc").join("passwd.json")
        );
    }

    #[test]
    fn create_from_missing_id_is_none() {
        let (store, _dir) = test_store();
        assert!(store.create_from_id("nope").unwrap().is_none());
        assert!(store.create_from_id("").unwrap().is_none());
        assert!(store.load_content("nope").unwrap().is_none());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let (store, dir) = test_store();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        assert!(matches!(
            store.create_from_id("broken"),
            Err(SocketError::Json { .. })
        ));
    }

    #[test]
    fn make_applies_options_and_saves() {
        let (store, _dir) = test_store();
        let socket = store
            .make(&json!({
                "id": "sub:x",
                "status": "new",
                "title": "Made socket",
                "progress": {"enabled": true, "maximum": 10},
                "unknown": "ignored"
            }))
            .unwrap();

        assert_eq!(socket.get("id", Value::Null), json!("sub:x"));
        assert_eq!(socket.get("status", Value::Null), json!("new"));
        assert_eq!(socket.get("progress.enabled", Value::Null), json!(true));
        assert_eq!(socket.get("progress.maximum", Value::Null), json!(10));
        assert_eq!(socket.get("progress.position", Value::Null), json!(-1));
        assert_eq!(socket.get("unknown", json!("absent")), json!("absent"));
        assert!(store.exists("sub:x"));
    }

    #[test]
    fn make_with_prefix_and_generated_id() {
        let (store, _dir) = test_store();
        let socket = store.make(&json!({"prefix": "export"})).unwrap();
        assert!(socket.id().starts_with("export:"));
        assert!(store.exists(socket.id()));
    }

    #[test]
    fn make_rejects_ill_typed_option() {
        let (store, _dir) = test_store();
        let err = store
            .make(&json!({"id": "bad", "progress": {"maximum": "ten"}}))
            .unwrap_err();
        assert!(matches!(err, SocketError::InvalidValue { .. }));
        assert!(!store.exists("bad"));
    }

    #[test]
    fn round_trip_through_disk() {
        let (store, _dir) = test_store();
        let made = store
            .make(&json!({
                "id": "sub:made",
                "status": "new",
                "result": {"files": ["a.csv"], "data": {"rows": 3}}
            }))
            .unwrap();

        let loaded = store.create_from_id("sub:made").unwrap().unwrap();
        assert_eq!(loaded.data(), made.data());
        assert_eq!(loaded.saved_data(), Some(loaded.data()));
    }

    #[test]
    fn write_atomic_leaves_no_temp_files() {
        let (store, dir) = test_store();
        let path = dir.path().join("deep").join("doc.json");
        store.write_atomic(&path, b"{}").unwrap();
        store.write_atomic(&path, b"{\"a\": 1}").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\": 1}");
        let names: Vec<_> = std::fs::read_dir(dir.path().join("deep"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("doc.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn written_files_are_group_writable() {
        use std::os::unix::fs::PermissionsExt;

        let (store, dir) = test_store();
        let path = dir.path().join("ns").join("doc.json");
        store.write_atomic(&path, b"{}").unwrap();

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = std::fs::metadata(dir.path().join("ns"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(file_mode, 0o664);
        assert_eq!(dir_mode, 0o775);
    }
}
