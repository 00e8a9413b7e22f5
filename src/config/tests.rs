use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert_eq!(settings.writing.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(settings.retry, RetryPolicy::default());
    assert_eq!(settings.images.width, DEFAULT_IMAGE_WIDTH);
    assert_eq!(settings.images.dataset, "production");
    assert_eq!(
        settings.content.source,
        ContentSourceSettings::Directory {
            path: PathBuf::from(DEFAULT_CONTENT_DIRECTORY)
        }
    );
    assert_eq!(
        settings.content.refresh_interval,
        Some(Duration::from_secs(DEFAULT_REFRESH_SECS))
    );
    assert_eq!(settings.content.query, DEFAULT_ARTICLES_QUERY);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.writing.page_size = Some(12);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        content: ContentOverrides {
            log_level: Some("debug".to_string()),
            writing_page_size: Some(6),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.writing.page_size.get(), 6);
}

#[test]
fn cms_source_requires_api_base() {
    let mut raw = RawSettings::default();
    raw.content.source = Some("cms".to_string());

    let err = Settings::from_raw(raw).expect_err("missing api base");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "content.api_base",
            ..
        }
    ));
}

#[test]
fn cms_source_resolves_dataset_and_token() {
    let mut raw = RawSettings::default();
    raw.content.source = Some("CMS".to_string());
    raw.content.api_base = Some("https://abc.api.example.io/v2024-01-01".to_string());
    raw.content.dataset = Some("staging".to_string());
    raw.content.project_id = Some("abc".to_string());
    raw.content.token = Some("  ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");

    match settings.content.source {
        ContentSourceSettings::Cms {
            api_base,
            dataset,
            token,
            timeout,
        } => {
            assert_eq!(api_base.as_str(), "https://abc.api.example.io/v2024-01-01");
            assert_eq!(dataset, "staging");
            assert_eq!(token, None);
            assert_eq!(timeout, Duration::from_secs(DEFAULT_CONTENT_TIMEOUT_SECS));
        }
        other => panic!("unexpected source: {other:?}"),
    }
    assert_eq!(settings.images.project_id, "abc");
    assert_eq!(settings.images.dataset, "staging");
}

#[test]
fn unknown_source_is_rejected() {
    let mut raw = RawSettings::default();
    raw.content.source = Some("ftp".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown source");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "content.source",
            ..
        }
    ));
}

#[test]
fn zero_refresh_disables_periodic_refresh() {
    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&ServeOverrides {
        content_refresh_seconds: Some(0),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.content.refresh_interval, None);
}

#[test]
fn zero_page_size_is_invalid() {
    let mut raw = RawSettings::default();
    raw.writing.page_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero page size");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "writing.page_size",
            ..
        }
    ));
}

#[test]
fn retry_delays_must_be_ordered() {
    let mut raw = RawSettings::default();
    raw.retry.initial_delay_ms = Some(2_000);
    raw.retry.max_delay_ms = Some(1_000);

    let err = Settings::from_raw(raw).expect_err("inverted delays");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "retry.max_delay_ms",
            ..
        }
    ));
}

#[test]
fn retry_overrides_are_applied() {
    let mut raw = RawSettings::default();
    raw.retry.max_attempts = Some(5);
    raw.retry.initial_delay_ms = Some(100);
    raw.retry.max_delay_ms = Some(800);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.retry.max_attempts.get(), 5);
    assert_eq!(settings.retry.initial_delay, Duration::from_millis(100));
    assert_eq!(settings.retry.max_delay, Duration::from_millis(800));
}

#[test]
fn site_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.site.public_url = Some("ftp://folio.example".to_string());

    let err = Settings::from_raw(raw).expect_err("ftp site url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "site.public_url",
            ..
        }
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_content_overrides(&ContentOverrides {
        log_json: Some(true),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["folio"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "folio",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--content-source",
        "cms",
        "--content-api-base",
        "https://abc.api.example.io/v1",
        "--content-refresh-seconds",
        "60",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.content.source.as_deref(), Some("cms"));
            assert_eq!(
                serve.overrides.content.api_base.as_deref(),
                Some("https://abc.api.example.io/v1")
            );
            assert_eq!(serve.overrides.content_refresh_seconds, Some(60));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_export_arguments() {
    let args = CliArgs::parse_from([
        "folio",
        "export",
        "--content-directory",
        "essays",
        "--site-public-url",
        "https://folio.example",
        "/tmp/site",
    ]);

    match args.command.expect("export command") {
        Command::Export(export) => {
            assert_eq!(
                export.content.directory.as_deref(),
                Some(std::path::Path::new("essays"))
            );
            assert_eq!(
                export.content.site_public_url.as_deref(),
                Some("https://folio.example")
            );
            assert_eq!(export.out_dir, std::path::Path::new("/tmp/site"));
        }
        _ => panic!("wrong command parsed"),
    }
}
