//! Integration tests for config assembly and caching

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dragon_cfgcache::cache::MemoryBackend;
use dragon_cfgcache::config::{ConfigError, ConfigParser, FormatParser};
use dragon_cfgcache::discovery::{DiscoveryError, FileDiscovery};
use dragon_cfgcache::{ConfigAssembler, Error, Options};
use regex::Regex;
use tempfile::TempDir;
use toml::{Table, Value};

#[derive(Debug, Clone, Default)]
struct CountingParser {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl CountingParser {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConfigParser for CountingParser {
    fn parse(&self, path: &Path) -> Result<Table, ConfigError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        FormatParser.parse(path)
    }
}

#[derive(Debug, Clone)]
struct FixedDiscovery(Vec<PathBuf>);

impl FileDiscovery for FixedDiscovery {
    fn search(&self, _root: &Path, _pattern: &Regex) -> Result<Vec<PathBuf>, DiscoveryError> {
        Ok(self.0.clone())
    }
}

fn table(src: &str) -> Table {
    toml::from_str(src).unwrap()
}

fn touch_later(path: &Path) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();
}

fn cache_entries(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_end_to_end_ini_files() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(root.path().join("a.ini"), "[db]\nhost=localhost\n").unwrap();
    fs::write(root.path().join("b.ini"), "[db]\nport=5432\n").unwrap();

    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .cache_dir(cache_dir.path())
        .build()
        .unwrap();
    let config = assembler.get().unwrap();

    assert_eq!(
        config,
        table(
            r#"
            [db]
            host = "localhost"
            port = 5432
            "#
        )
    );
    assert_eq!(cache_entries(cache_dir.path()), vec!["dragon_cache---config"]);
}

#[test]
fn test_second_get_does_not_parse() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("a.ini"), "[db]\nhost = a\n").unwrap();
    fs::write(root.path().join("b.ini"), "[db]\nport = 1\n").unwrap();

    let parser = CountingParser::default();
    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .backend(MemoryBackend::new())
        .parser(parser.clone())
        .build()
        .unwrap();

    let first = assembler.get().unwrap();
    assert_eq!(parser.calls(), 2);
    let second = assembler.get().unwrap();
    assert_eq!(first, second);
    assert_eq!(parser.calls(), 2);
}

#[test]
fn test_later_file_wins_and_nested_keys_union() {
    let root = TempDir::new().unwrap();
    let a = root.path().join("a.toml");
    let b = root.path().join("b.toml");
    fs::write(&a, "[db]\nhost = \"a\"\n").unwrap();
    fs::write(&b, "[db]\nhost = \"b\"\nport = 5432\n").unwrap();

    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .backend(MemoryBackend::new())
        .build()
        .unwrap();
    assert_eq!(
        assembler.files(),
        &[a.canonicalize().unwrap(), b.canonicalize().unwrap()]
    );
    assert_eq!(
        assembler.get().unwrap(),
        table("[db]\nhost = \"b\"\nport = 5432\n")
    );
}

#[test]
fn test_discovery_order_decides_precedence() {
    let root = TempDir::new().unwrap();
    let a = root.path().join("a.ini");
    let b = root.path().join("b.ini");
    fs::write(&a, "[db]\nhost = a\n").unwrap();
    fs::write(&b, "[db]\nhost = b\n").unwrap();

    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .discovery(FixedDiscovery(vec![b, a]))
        .backend(MemoryBackend::new())
        .build()
        .unwrap();
    assert_eq!(assembler.get().unwrap()["db"]["host"].as_str(), Some("a"));
}

#[test]
fn test_modified_file_invalidates_cache() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let a = root.path().join("a.ini");
    let b = root.path().join("b.ini");
    fs::write(&a, "[db]\nhost = localhost\n").unwrap();
    fs::write(&b, "[db]\nport = 5432\n").unwrap();

    let parser = CountingParser::default();
    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .cache_dir(cache_dir.path())
        .parser(parser.clone())
        .build()
        .unwrap();
    assert_eq!(assembler.get().unwrap()["db"]["port"].as_integer(), Some(5432));

    fs::write(&b, "[db]\nport = 6543\n").unwrap();
    touch_later(&b);

    let config = assembler.get().unwrap();
    assert_eq!(config["db"]["port"].as_integer(), Some(6543));
    assert_eq!(config["db"]["host"].as_str(), Some("localhost"));
    assert_eq!(parser.calls(), 4);
}

#[test]
fn test_empty_directory_yields_empty_config() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("README.md"), "not config").unwrap();

    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .backend(MemoryBackend::new())
        .build()
        .unwrap();
    assert!(assembler.files().is_empty());
    assert!(assembler.get().unwrap().is_empty());
}

#[test]
fn test_missing_root_degrades_to_empty_config() {
    let assembler = ConfigAssembler::builder()
        .root_path("/nonexistent/config/root")
        .backend(MemoryBackend::new())
        .build()
        .unwrap();
    assert!(assembler.files().is_empty());
    assert!(assembler.get().unwrap().is_empty());
}

#[test]
fn test_missing_root_fails_when_required() {
    let result = ConfigAssembler::builder()
        .root_path("/nonexistent/config/root")
        .require_root(true)
        .backend(MemoryBackend::new())
        .build();
    assert!(matches!(
        result,
        Err(Error::Discovery(DiscoveryError::RootUnavailable { .. }))
    ));
}

#[test]
fn test_parse_failure_aborts_without_caching() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(root.path().join("a.ini"), "[db]\nhost = localhost\n").unwrap();
    fs::write(root.path().join("b.ini"), "[db\nport = 5432\n").unwrap();

    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .cache_dir(cache_dir.path())
        .build()
        .unwrap();

    let result = assembler.get();
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::IniSyntax { line: 1, .. }))
    ));
    assert!(cache_entries(cache_dir.path()).is_empty());
    assert!(assembler.cache().test("config").unwrap().is_none());
}

#[test]
fn test_properties_set_before_construction() {
    let root = TempDir::new().unwrap();
    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .backend(MemoryBackend::new())
        .property("deployment", "eu-west")
        .property("replicas", 3i64)
        .property("cache_key", "shadowed")
        .build()
        .unwrap();

    assert_eq!(
        assembler.property("deployment"),
        Some(&Value::String("eu-west".into()))
    );
    assert_eq!(assembler.property("replicas"), Some(&Value::Integer(3)));
    assert_eq!(assembler.options().cache_key, "config");
    assert!(assembler.property("missing").is_none());
}

#[test]
fn test_cache_survives_across_assemblers() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(root.path().join("app.ini"), "[app]\nname = demo\n").unwrap();

    let build = |parser: &CountingParser| {
        ConfigAssembler::builder()
            .root_path(root.path())
            .cache_dir(cache_dir.path())
            .cache_key("bootstrap")
            .parser(parser.clone())
            .build()
            .unwrap()
    };

    let first_parser = CountingParser::default();
    let first = build(&first_parser).get().unwrap();
    assert_eq!(first_parser.calls(), 1);

    let second_parser = CountingParser::default();
    let second = build(&second_parser).get().unwrap();
    assert_eq!(second_parser.calls(), 0);
    assert_eq!(first, second);
}

#[test]
fn test_options_document() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(root.path().join("a.ini"), "[db]\nhost = localhost\n").unwrap();
    fs::write(root.path().join("b.conf"), "[db]\nhost = ignored\n").unwrap();

    let document = format!(
        r#"
        root_path = '{}'
        file_pattern = '^.*\.ini$'
        cache_key = "from_document"
        owner = "infra"

        [cache_backend_options]
        cache_dir = '{}'
        "#,
        root.path().display(),
        cache_dir.path().display()
    );
    let assembler = ConfigAssembler::new(Options::from_toml_str(&document).unwrap()).unwrap();

    assert_eq!(assembler.files().len(), 1);
    assert_eq!(assembler.property("owner").and_then(Value::as_str), Some("infra"));
    assert_eq!(assembler.get().unwrap()["db"]["host"].as_str(), Some("localhost"));
    assert_eq!(
        cache_entries(cache_dir.path()),
        vec!["dragon_cache---from_document"]
    );
}

#[test]
fn test_concurrent_gets_rebuild_once() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("a.ini"), "x = 1\n").unwrap();
    fs::write(root.path().join("b.ini"), "y = 2\n").unwrap();

    let parser = CountingParser {
        delay: Some(Duration::from_millis(20)),
        ..Default::default()
    };
    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .backend(MemoryBackend::new())
        .parser(parser.clone())
        .build()
        .unwrap();

    let results: Vec<Table> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| assembler.get().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(parser.calls(), 2);
    assert!(results.iter().all(|r| r == &results[0]));
}

#[test]
fn test_infinite_float_served_from_cache() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(root.path().join("a.toml"), "limit = inf\n").unwrap();

    let parser = CountingParser::default();
    let assembler = ConfigAssembler::builder()
        .root_path(root.path())
        .cache_dir(cache_dir.path())
        .parser(parser.clone())
        .build()
        .unwrap();

    let first = assembler.get().unwrap();
    let second = assembler.get().unwrap();
    assert_eq!(first["limit"].as_float(), Some(f64::INFINITY));
    assert_eq!(first, second);
    assert_eq!(parser.calls(), 1);
}

#[test]
fn test_deleted_file_invalidates_cache_for_next_assembler() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let b = root.path().join("b.ini");
    fs::write(root.path().join("a.ini"), "[db]\nhost = a\n").unwrap();
    fs::write(&b, "[db]\npassword = old\n").unwrap();

    let build = || {
        ConfigAssembler::builder()
            .root_path(root.path())
            .cache_dir(cache_dir.path())
            .build()
            .unwrap()
    };

    let before = build().get().unwrap();
    assert_eq!(before["db"]["password"].as_str(), Some("old"));

    fs::remove_file(&b).unwrap();
    let assembler = build();
    assert_eq!(assembler.files().len(), 1);
    assert_eq!(assembler.get().unwrap(), table("[db]\nhost = \"a\"\n"));
}
