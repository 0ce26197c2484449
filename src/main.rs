use std::{process, sync::Arc};

use tcm_webui::{
    application::{
        collaborators::{Preferences, SearchClientFactory},
        context::{DocumentLocations, RuntimeContext, resolve_document_path},
        error::AppError,
        merge::ConfigMerger,
        preview::PreviewService,
        search::SearchService,
        store::SeriesStore,
    },
    config,
    infra::{
        assets::AssetRoots,
        datafile::DatafileServicesFactory,
        document_file::YamlDocumentFile,
        error::InfraError,
        fonts::{FontLibrary, FontdueValidator},
        http::{self, HttpState},
        plex::PlexClientFactory,
        preferences::YamlPreferences,
        render::ImageCardRenderer,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::configuration(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let context = build_context(&settings)?;
    match command {
        config::Command::Serve(_) => run_serve(settings, context).await,
        config::Command::Files => {
            for path in context.tv_files() {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

fn build_context(settings: &config::Settings) -> Result<Arc<RuntimeContext>, AppError> {
    let document_path = resolve_document_path(&DocumentLocations {
        override_path: settings.paths.preferences_override.clone(),
        container_root: settings.paths.container_root.clone(),
        install_root: settings.paths.install_root.clone(),
    });
    info!(
        path = %document_path.display(),
        is_docker = settings.paths.is_docker,
        "loading preferences"
    );

    let preferences = YamlPreferences::load(&document_path)?;
    let search_factory: Arc<dyn SearchClientFactory> =
        Arc::new(PlexClientFactory::new(preferences.plex().cloned()));
    let preferences: Arc<dyn Preferences> = Arc::new(preferences);

    let context = RuntimeContext::new(
        preferences,
        document_path,
        settings.paths.container_root.clone(),
        settings.paths.is_docker,
        search_factory,
    )?;
    Ok(Arc::new(context))
}

async fn run_serve(
    settings: config::Settings,
    context: Arc<RuntimeContext>,
) -> Result<(), AppError> {
    let series_path = context.default_document()?;
    info!(path = %series_path.display(), "series document selected");

    let store = Arc::new(SeriesStore::new(Arc::new(YamlDocumentFile::new(
        series_path,
    ))));
    let merger = Arc::new(ConfigMerger::new(
        Arc::clone(&store),
        Arc::clone(context.preferences()),
    ));
    let fonts = Arc::new(FontLibrary::new(settings.render.fallback_font.clone()));
    let preview = Arc::new(PreviewService::new(
        Arc::clone(&context),
        merger,
        Arc::new(DatafileServicesFactory),
        Arc::new(FontdueValidator::new(Arc::clone(&fonts))),
        Arc::new(ImageCardRenderer::new(fonts, settings.preview.jpeg_quality)),
        settings.preview.scratch_dir.clone(),
    ));
    let search = Arc::new(SearchService::new(
        Arc::clone(&context),
        settings.search.result_limit,
    ));

    let state = HttpState {
        store,
        preview,
        search,
        assets: Arc::new(AssetRoots::new(
            settings.paths.static_root.clone(),
            settings.paths.template_root.clone(),
        )),
        font_directory: settings.paths.font_directory.clone(),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
