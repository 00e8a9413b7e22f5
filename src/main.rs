use std::{future::IntoFuture, process, sync::Arc};

use folio::{
    application::{
        content::{ContentSource, QueryParams},
        error::AppError,
        export::export_site,
        writing::{LiveWriting, RefreshOutcome, WritingOptions, WritingService},
    },
    config::{self, ContentSourceSettings},
    domain::images::ImageUrlBuilder,
    infra::{
        cms::CmsClient,
        directory::DirectorySource,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
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
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Export(args) => run_export(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let service = Arc::new(build_writing_service(&settings)?);
    let initial = service.load().await;
    info!(
        target = "folio::serve",
        articles = initial.len(),
        "initial writing collection ready"
    );
    let writing = Arc::new(LiveWriting::with_collection(Arc::clone(&service), initial));

    let refresh_handle = settings.content.refresh_interval.map(|period| {
        let writing = Arc::clone(&writing);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // the first tick completes immediately
            loop {
                interval.tick().await;
                if let RefreshOutcome::Applied { articles } = writing.refresh().await {
                    info!(target = "folio::serve", articles, "writing collection refreshed");
                }
            }
        })
    });

    let state = HttpState {
        writing,
        public_site_url: Arc::from(settings.site.public_url.as_str()),
    };
    let result = serve_http(&settings, state).await;

    if let Some(handle) = refresh_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let service = build_writing_service(&settings)?;

    info!(
        target = "folio::export",
        out_dir = %args.out_dir.display(),
        "starting export"
    );

    let collection = service.fetch_collection().await?;
    export_site(&collection, settings.site.public_url.as_str(), &args.out_dir).await?;
    Ok(())
}

fn build_writing_service(settings: &config::Settings) -> Result<WritingService, AppError> {
    let source: Arc<dyn ContentSource> = match &settings.content.source {
        ContentSourceSettings::Cms {
            api_base,
            dataset,
            token,
            timeout,
        } => Arc::new(CmsClient::new(
            api_base.clone(),
            dataset.clone(),
            token.clone(),
            *timeout,
        )?),
        ContentSourceSettings::Directory { path } => Arc::new(DirectorySource::new(path.clone())),
    };

    let images = ImageUrlBuilder::new(
        settings.images.cdn_base.clone(),
        settings.images.project_id.clone(),
        settings.images.dataset.clone(),
    );

    let options = WritingOptions {
        query: settings.content.query.clone(),
        params: QueryParams::new(),
        page_size: settings.writing.page_size,
        image_width: settings.images.width,
        retry: settings.retry,
    };

    Ok(WritingService::new(source, images, options))
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "folio::serve", addr = %settings.server.addr, "listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => return server_result(result),
        () = shutdown_signal() => {}
    }

    info!(
        target = "folio::serve",
        grace_seconds = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested; draining connections"
    );
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(result) => server_result(result),
        Err(_) => {
            warn!(
                target = "folio::serve",
                "graceful shutdown timed out; dropping open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_result(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "folio::serve", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
