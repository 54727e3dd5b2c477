//! Integration tests for metadata resolution through the public API.
//!
//! Covers the observable guarantees of the resolver:
//! - repeated lookups return the identical instance
//! - ancestors are built base first and linked by identity
//! - transient classes never get metadata and never become parents
//! - a base shared by siblings is built once
//! - enumeration returns every mapped class once, in source order
//! - manual registration overrides the cache
//! - concurrent callers share one build and one artifact write

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier, Mutex,
    },
    thread,
    time::Duration,
};

use mapscope::metadata::classmeta::ConstructedMetadata;
use mapscope::prelude::*;

/// Reflection over a catalog that records bind order and slows every bind down.
struct RecordingReflection {
    catalog: ClassCatalog,
    delay: Duration,
    binds: Mutex<Vec<String>>,
    bind_count: AtomicUsize,
}

impl RecordingReflection {
    fn new(catalog: ClassCatalog, delay: Duration) -> Self {
        RecordingReflection {
            catalog,
            delay,
            binds: Mutex::new(Vec::new()),
            bind_count: AtomicUsize::new(0),
        }
    }

    fn binds(&self) -> Vec<String> {
        self.binds.lock().unwrap().clone()
    }
}

impl ReflectionService for RecordingReflection {
    fn ancestor_classes(&self, class: &str) -> Result<Vec<String>> {
        self.catalog.ancestor_classes(class)
    }

    fn bind_reflection(&self, metadata: &ConstructedMetadata) -> Result<ReflectionHandle> {
        thread::sleep(self.delay);
        self.bind_count.fetch_add(1, Ordering::SeqCst);
        self.binds.lock().unwrap().push(metadata.name().to_string());
        self.catalog.bind_reflection(metadata)
    }
}

/// Reflection over a catalog that refuses the first bind of one class.
struct FlakyReflection {
    catalog: ClassCatalog,
    failing: String,
    failed: AtomicUsize,
}

impl FlakyReflection {
    fn new(catalog: ClassCatalog, failing: &str) -> Self {
        FlakyReflection {
            catalog,
            failing: failing.to_string(),
            failed: AtomicUsize::new(0),
        }
    }
}

impl ReflectionService for FlakyReflection {
    fn ancestor_classes(&self, class: &str) -> Result<Vec<String>> {
        self.catalog.ancestor_classes(class)
    }

    fn bind_reflection(&self, metadata: &ConstructedMetadata) -> Result<ReflectionHandle> {
        if metadata.name() == self.failing && self.failed.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(Error::UnresolvableClass {
                class: metadata.name().to_string(),
                message: "class file could not be loaded".to_string(),
            });
        }
        self.catalog.bind_reflection(metadata)
    }
}

fn base_and_child() -> ClassCatalog {
    let mut catalog = ClassCatalog::new();
    catalog
        .declare("App\\Base", None, MappingFacts::mapped_superclass().id("id"))
        .declare("App\\Child", Some("App\\Base"), MappingFacts::entity("children"));
    catalog
}

fn bound(name: &str, facts: MappingFacts) -> ClassMetadataRc {
    Arc::new(
        ConstructedMetadata::new(name, facts, None)
            .bind(ReflectionHandle::new(name, Vec::new()))
            .unwrap(),
    )
}

fn library_catalog() -> ClassCatalog {
    let mut catalog = ClassCatalog::new();
    catalog
        .declare(
            "Library\\Model\\Record",
            None,
            MappingFacts::mapped_superclass()
                .id("id")
                .field("version", FieldFlags::VERSION),
        )
        .declare_transient("Library\\Model\\Auditable", Some("Library\\Model\\Record"))
        .declare(
            "Library\\Entity\\Publication",
            Some("Library\\Model\\Auditable"),
            MappingFacts::entity("publications").field("title", FieldFlags::empty()),
        )
        .declare(
            "Library\\Entity\\Book",
            Some("Library\\Entity\\Publication"),
            MappingFacts::entity("books").field("isbn", FieldFlags::UNIQUE),
        )
        .declare(
            "Library\\Entity\\Magazine",
            Some("Library\\Entity\\Publication"),
            MappingFacts::entity("magazines").field("issue", FieldFlags::empty()),
        )
        .declare(
            "Library\\Entity\\Loan",
            Some("Library\\Model\\Record"),
            MappingFacts::entity("loans")
                .association("book", "Library\\Entity\\Book", AssociationKind::ManyToOne),
        );
    catalog
}

fn resolver_with(
    reflection: Arc<RecordingReflection>,
    store: Arc<MemoryArtifactStore>,
) -> MetadataResolver {
    MetadataResolver::new(
        Arc::new(library_catalog()),
        reflection,
        Arc::new(ProxyNameNormalizer::default()),
        store,
        ResolverConfig::default(),
    )
}

#[test]
fn repeated_lookup_returns_same_instance() {
    let resolver = MetadataResolver::with_catalog(library_catalog(), ResolverConfig::default());

    let first = resolver.get_metadata_for("Library\\Entity\\Book").unwrap();
    let second = resolver.get_metadata_for("\\Library\\Entity\\Book").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn ancestors_are_built_base_first() {
    let reflection = Arc::new(RecordingReflection::new(library_catalog(), Duration::ZERO));
    let resolver = resolver_with(reflection.clone(), Arc::new(MemoryArtifactStore::new()));

    let book = resolver.get_metadata_for("Library\\Entity\\Book").unwrap();

    assert_eq!(
        reflection.binds(),
        vec![
            "Library\\Model\\Record".to_string(),
            "Library\\Entity\\Publication".to_string(),
            "Library\\Entity\\Book".to_string(),
        ]
    );

    let publication = resolver
        .get_metadata_for("Library\\Entity\\Publication")
        .unwrap();
    let record = resolver.get_metadata_for("Library\\Model\\Record").unwrap();
    assert!(Arc::ptr_eq(&book.parent().unwrap(), &publication));
    assert!(Arc::ptr_eq(&publication.parent().unwrap(), &record));
    assert!(record.is_root());

    assert_eq!(book.root_name(), "Library\\Model\\Record");
    assert_eq!(book.identifier(), vec!["id".to_string()]);
    let fields: Vec<String> = book.all_fields().into_iter().map(|field| field.name).collect();
    assert_eq!(fields, vec!["id", "version", "title", "isbn"]);
}

#[test]
fn transient_classes_are_skipped() {
    let resolver = MetadataResolver::with_catalog(library_catalog(), ResolverConfig::default());

    let publication = resolver
        .get_metadata_for("Library\\Entity\\Publication")
        .unwrap();

    assert_eq!(publication.parent_name(), Some("Library\\Model\\Record"));
    assert!(resolver.is_transient("Library\\Model\\Auditable"));
    assert!(!resolver.has_metadata_for("Library\\Model\\Auditable"));
    assert!(resolver.definition_for("Library\\Model\\Auditable").is_none());
    assert_eq!(resolver.loaded_metadata().len(), 2);
}

#[test]
fn shared_base_is_reused_by_siblings() {
    let reflection = Arc::new(RecordingReflection::new(library_catalog(), Duration::ZERO));
    let store = Arc::new(MemoryArtifactStore::new());
    let resolver = resolver_with(reflection.clone(), store.clone());

    let book = resolver.get_metadata_for("Library\\Entity\\Book").unwrap();
    let magazine = resolver.get_metadata_for("Library\\Entity\\Magazine").unwrap();

    assert!(Arc::ptr_eq(
        &book.parent().unwrap(),
        &magazine.parent().unwrap()
    ));
    assert_eq!(reflection.bind_count.load(Ordering::SeqCst), 4);
    assert_eq!(store.writes(), 4);

    let base_definition = resolver
        .definition_for("Library\\Entity\\Publication")
        .unwrap();
    assert_eq!(base_definition.kind(), MetadataKind::Entity);
    assert_eq!(base_definition.parent_name(), Some("Library\\Model\\Record"));
}

#[test]
fn all_metadata_is_complete_and_ordered() {
    let catalog = library_catalog();
    let expected = catalog.all_class_names();
    let resolver = MetadataResolver::with_catalog(catalog, ResolverConfig::default());

    let all = resolver.get_all_metadata().unwrap();
    let names: Vec<&str> = all.iter().map(|metadata| metadata.name()).collect();

    assert_eq!(names, expected);
    assert!(!names.contains(&"Library\\Model\\Auditable"));
}

#[test]
fn manual_registration_overrides() {
    let resolver = MetadataResolver::with_catalog(library_catalog(), ResolverConfig::default());
    assert!(!resolver.has_metadata_for("Library\\Entity\\Pamphlet"));

    let pamphlet = Arc::new(
        ConstructedMetadata::new(
            "Library\\Entity\\Pamphlet",
            MappingFacts::entity("pamphlets"),
            None,
        )
        .bind(ReflectionHandle::new("Library\\Entity\\Pamphlet", Vec::new()))
        .unwrap(),
    );
    resolver.set_metadata_for("Library\\Entity\\Pamphlet", pamphlet.clone());

    assert!(resolver.has_metadata_for("Library\\Entity\\Pamphlet"));
    let fetched = resolver.get_metadata_for("Library\\Entity\\Pamphlet").unwrap();
    assert!(Arc::ptr_eq(&fetched, &pamphlet));
}

#[test]
fn manually_registered_parent_is_used() {
    let resolver = MetadataResolver::with_catalog(library_catalog(), ResolverConfig::default());

    let record = Arc::new(
        ConstructedMetadata::new(
            "Library\\Model\\Record",
            MappingFacts::mapped_superclass().id("uuid"),
            None,
        )
        .bind(ReflectionHandle::new("Library\\Model\\Record", Vec::new()))
        .unwrap(),
    );
    resolver.set_metadata_for("Library\\Model\\Record", record.clone());

    let loan = resolver.get_metadata_for("Library\\Entity\\Loan").unwrap();
    assert!(Arc::ptr_eq(&loan.parent().unwrap(), &record));
    assert_eq!(loan.identifier(), vec!["uuid".to_string()]);
}

#[test]
fn concurrent_callers_share_one_build() {
    const CALLERS: usize = 8;

    let reflection = Arc::new(RecordingReflection::new(
        library_catalog(),
        Duration::from_millis(10),
    ));
    let store = Arc::new(MemoryArtifactStore::new());
    let resolver = Arc::new(resolver_with(reflection.clone(), store.clone()));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                resolver.get_metadata_for("Library\\Entity\\Book").unwrap()
            })
        })
        .collect();

    let results: Vec<ClassMetadataRc> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    for result in &results {
        assert!(Arc::ptr_eq(result, &results[0]));
    }
    assert_eq!(reflection.bind_count.load(Ordering::SeqCst), 3);
    assert_eq!(store.writes(), 3);
}

#[test]
fn parallel_warm_up_builds_each_class_once() {
    let reflection = Arc::new(RecordingReflection::new(
        library_catalog(),
        Duration::from_millis(2),
    ));
    let store = Arc::new(MemoryArtifactStore::new());
    let resolver = resolver_with(reflection.clone(), store.clone());

    let resolved = resolver.warm_up().unwrap();

    assert_eq!(resolved, 5);
    assert_eq!(resolver.loaded_metadata().len(), 5);
    assert_eq!(reflection.bind_count.load(Ordering::SeqCst), 5);
    assert_eq!(store.writes(), 5);
}

#[test]
fn invalid_hierarchy_reports_every_issue() {
    let mut catalog = library_catalog();
    catalog
        .declare(
            "Library\\Entity\\Broken",
            Some("Library\\Entity\\Book"),
            MappingFacts::entity("broken")
                .field("isbn", FieldFlags::empty())
                .field("title", FieldFlags::empty())
                .association("shelf", "Library\\Entity\\Shelf", AssociationKind::ManyToOne),
        );
    let resolver = MetadataResolver::with_catalog(catalog, ResolverConfig::default());

    let error = resolver
        .get_metadata_for("Library\\Entity\\Broken")
        .unwrap_err();
    match &error {
        Error::HierarchyValidation { class, issues } => {
            assert_eq!(class, "Library\\Entity\\Broken");
            assert_eq!(issues.len(), 3, "{issues:?}");
        }
        other => panic!("unexpected {other}"),
    }
    assert!(error.to_string().contains("3 issue(s)"));

    // Partial progress is retained
    assert!(resolver.has_metadata_for("Library\\Entity\\Book"));
}

#[test]
fn inconsistent_mapping_fails_before_instantiation() {
    let mut catalog = library_catalog();
    catalog.declare(
        "Library\\Entity\\Duplicate",
        None,
        MappingFacts::entity("duplicates")
            .id("id")
            .column("a", "same", FieldFlags::empty())
            .column("b", "same", FieldFlags::empty()),
    );
    let resolver = MetadataResolver::with_catalog(catalog, ResolverConfig::default());

    assert!(matches!(
        resolver.get_metadata_for("Library\\Entity\\Duplicate"),
        Err(Error::MappingInconsistency { .. })
    ));
    assert!(!resolver.has_metadata_for("Library\\Entity\\Duplicate"));
    assert!(resolver.definition_for("Library\\Entity\\Duplicate").is_none());
}

#[test]
fn retry_links_to_replaced_parent() {
    let reflection = Arc::new(FlakyReflection::new(base_and_child(), "App\\Child"));
    let resolver = MetadataResolver::new(
        Arc::new(base_and_child()),
        reflection,
        Arc::new(ProxyNameNormalizer::default()),
        Arc::new(MemoryArtifactStore::new()),
        ResolverConfig::default(),
    );

    assert!(matches!(
        resolver.get_metadata_for("App\\Child"),
        Err(Error::UnresolvableClass { .. })
    ));
    assert!(resolver.has_metadata_for("App\\Base"));
    assert!(!resolver.has_metadata_for("App\\Child"));
    assert!(resolver.definition_for("App\\Child").is_some());

    // Drops the base the cached definition was built against
    let replacement = bound("App\\Base", MappingFacts::mapped_superclass().id("uuid"));
    resolver.set_metadata_for("App\\Base", replacement.clone());

    let child = resolver.get_metadata_for("App\\Child").unwrap();
    assert!(Arc::ptr_eq(&child.parent().unwrap(), &replacement));
    assert_eq!(child.parent_name(), Some("App\\Base"));
    assert_eq!(child.identifier(), vec!["uuid".to_string()]);
}

#[test]
fn all_metadata_has_one_entry_per_class_name() {
    let resolver = MetadataResolver::with_catalog(base_and_child(), ResolverConfig::default());

    let registered = bound("App\\Child", MappingFacts::entity("children").id("id"));
    resolver.set_metadata_for("App\\Base", registered.clone());

    let all = resolver.get_all_metadata().unwrap();
    assert_eq!(all.len(), 2);
    assert!(Arc::ptr_eq(&all[0], &registered));
    assert_eq!(all[1].name(), "App\\Child");
    assert!(!Arc::ptr_eq(&all[1], &registered));
}
