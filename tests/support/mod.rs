#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use tcm_webui::{
    application::{
        collaborators::{
            CardRenderer, CollaboratorError, FontValidator, Preferences, SearchClient,
            SearchClientFactory, SeriesMatch, TitleValidation,
        },
        context::RuntimeContext,
        merge::ConfigMerger,
        preview::PreviewService,
        search::SearchService,
        store::SeriesStore,
    },
    domain::{card::TitleCard, series::FontSpec},
    infra::{
        assets::AssetRoots,
        datafile::DatafileServicesFactory,
        document_file::YamlDocumentFile,
        fonts::{FontLibrary, FontdueValidator},
        http::HttpState,
        render::ImageCardRenderer,
    },
};

pub const SHOW: &str = "Show A (2020)";

pub struct StubPreferences {
    pub source: PathBuf,
    pub series_files: Vec<PathBuf>,
    pub plex: bool,
}

impl StubPreferences {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            series_files: Vec::new(),
            plex: false,
        }
    }
}

impl Preferences for StubPreferences {
    fn is_valid(&self) -> bool {
        true
    }

    fn series_files(&self) -> &[PathBuf] {
        &self.series_files
    }

    fn use_plex(&self) -> bool {
        self.plex
    }

    fn default_media_server(&self) -> &str {
        "plex"
    }

    fn source_directory(&self) -> &Path {
        &self.source
    }
}

pub struct StubSearch {
    pub matches: Vec<SeriesMatch>,
}

#[async_trait]
impl SearchClient for StubSearch {
    async fn search_series(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SeriesMatch>, CollaboratorError> {
        Ok(self
            .matches
            .iter()
            .filter(|found| found.title.to_lowercase().contains(&query.to_lowercase()))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Counts constructions; every construction yields a fresh client.
#[derive(Default)]
pub struct CountingSearchFactory {
    pub constructed: AtomicUsize,
    pub matches: Vec<SeriesMatch>,
}

impl CountingSearchFactory {
    pub fn constructions(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

impl SearchClientFactory for CountingSearchFactory {
    fn connect(&self) -> Result<Arc<dyn SearchClient>, CollaboratorError> {
        self.constructed.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(20));
        Ok(Arc::new(StubSearch {
            matches: self.matches.clone(),
        }))
    }
}

/// Fails the first `failures` constructions, then hands out clients whose
/// searches fail when `searches_fail` is set.
#[derive(Default)]
pub struct FlakySearchFactory {
    pub attempts: AtomicUsize,
    pub failures: usize,
    pub searches_fail: bool,
}

impl FlakySearchFactory {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SearchClientFactory for FlakySearchFactory {
    fn connect(&self) -> Result<Arc<dyn SearchClient>, CollaboratorError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(CollaboratorError::Unavailable(
                "plex server refused the connection".into(),
            ));
        }
        if self.searches_fail {
            return Ok(Arc::new(FailingSearch));
        }
        Ok(Arc::new(StubSearch {
            matches: Vec::new(),
        }))
    }
}

pub struct FailingSearch;

#[async_trait]
impl SearchClient for FailingSearch {
    async fn search_series(
        &self,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<SeriesMatch>, CollaboratorError> {
        Err(CollaboratorError::Unavailable("plex search timed out".into()))
    }
}

/// Reports every non-ASCII character as missing.
pub struct AsciiOnlyFont;

impl FontValidator for AsciiOnlyFont {
    fn validate_title(
        &self,
        _font: &FontSpec,
        title: &str,
    ) -> Result<TitleValidation, CollaboratorError> {
        let mut missing: Vec<char> = title.chars().filter(|ch| !ch.is_ascii()).collect();
        missing.dedup();
        Ok(TitleValidation {
            title: title.to_string(),
            missing,
        })
    }
}

/// Writes fixed bytes and remembers every destination it was handed.
#[derive(Default)]
pub struct RecordingRenderer {
    pub calls: AtomicUsize,
    pub destinations: std::sync::Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl CardRenderer for RecordingRenderer {
    async fn render(&self, card: &TitleCard) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.destinations
            .lock()
            .expect("destinations lock")
            .push(card.destination.clone());
        tokio::fs::write(&card.destination, b"card-bytes")
            .await
            .map_err(|err| CollaboratorError::Render(err.to_string()))
    }
}

/// Source tree with one synced series: a datafile and optionally the first episode image.
pub fn write_source_fixture(source: &Path, titles: &[&str], with_image: bool) {
    let series_dir = source.join(SHOW);
    std::fs::create_dir_all(&series_dir).expect("series dir");

    let mut datafile = String::from("data:\n  Season 1:\n");
    for (index, title) in titles.iter().enumerate() {
        datafile.push_str(&format!("    {}:\n      title: \"{title}\"\n", index + 1));
    }
    std::fs::write(series_dir.join("data.yml"), datafile).expect("datafile");

    if with_image {
        RgbImage::from_pixel(32, 18, Rgb([40, 80, 160]))
            .save(series_dir.join("s1e1.jpg"))
            .expect("source image");
    }
}

pub fn context_with(preferences: StubPreferences, root: &Path) -> Arc<RuntimeContext> {
    context_with_search(preferences, root, Arc::new(CountingSearchFactory::default()))
}

pub fn context_with_search(
    preferences: StubPreferences,
    root: &Path,
    search_factory: Arc<dyn SearchClientFactory>,
) -> Arc<RuntimeContext> {
    Arc::new(
        RuntimeContext::new(
            Arc::new(preferences),
            root.join("preferences.yml"),
            root.join("container"),
            false,
            search_factory,
        )
        .expect("valid context"),
    )
}

pub fn store_at(path: &Path) -> Arc<SeriesStore> {
    Arc::new(SeriesStore::new(Arc::new(YamlDocumentFile::new(path))))
}

pub fn preview_service(
    context: Arc<RuntimeContext>,
    store: Arc<SeriesStore>,
    fonts: Arc<dyn FontValidator>,
    renderer: Arc<dyn CardRenderer>,
    scratch_root: &Path,
) -> PreviewService {
    let merger = Arc::new(ConfigMerger::new(
        store,
        Arc::clone(context.preferences()),
    ));
    PreviewService::new(
        context,
        merger,
        Arc::new(DatafileServicesFactory),
        fonts,
        renderer,
        scratch_root.to_path_buf(),
    )
}

/// A complete gateway over a temporary directory tree.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub state: HttpState,
}

impl Harness {
    pub fn new(search_factory: Arc<dyn SearchClientFactory>, plex: bool) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        for sub in ["source", "scratch", "static", "templates", "fonts/Sub"] {
            std::fs::create_dir_all(root.join(sub)).expect("fixture dir");
        }
        std::fs::write(root.join("static/app.js"), "console.log('ok');").expect("app.js");
        std::fs::write(root.join("templates/index.html"), "<!doctype html>").expect("index");
        std::fs::write(root.join("fonts/Title.ttf"), b"font").expect("font");
        std::fs::write(root.join("secret.txt"), "top secret").expect("secret");

        let mut preferences = StubPreferences::new(root.join("source"));
        preferences.plex = plex;
        let context = Arc::new(
            RuntimeContext::new(
                Arc::new(preferences),
                root.join("preferences.yml"),
                root.join("container"),
                false,
                search_factory,
            )
            .expect("valid context"),
        );

        let store = store_at(&root.join("tv.yml"));
        let library = Arc::new(FontLibrary::default());
        let preview = Arc::new(preview_service(
            Arc::clone(&context),
            Arc::clone(&store),
            Arc::new(FontdueValidator::new(Arc::clone(&library))),
            Arc::new(ImageCardRenderer::new(library, 80)),
            &root.join("scratch"),
        ));
        let search = Arc::new(SearchService::new(
            context,
            std::num::NonZeroU32::new(2).expect("non-zero"),
        ));

        let state = HttpState {
            store,
            preview,
            search,
            assets: Arc::new(AssetRoots::new(root.join("static"), root.join("templates"))),
            font_directory: root.join("fonts"),
        };
        Self { dir, state }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

pub fn scratch_entries(scratch: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(scratch)
        .expect("scratch root readable")
        .map(|entry| entry.expect("entry").path())
        .collect()
}
