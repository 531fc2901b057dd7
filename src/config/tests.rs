use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.index.url.as_str(), "http://127.0.0.1:9200/");
    assert!(settings.cache.enabled);
    assert!(settings.cache.url.is_none());
    assert!(settings.cache.single_flight);
    assert_eq!(settings.ttl.films, Duration::from_secs(600));
    assert_eq!(settings.ttl.genres, Duration::from_secs(1200));
    assert_eq!(settings.ttl.persons, Duration::from_secs(600));
    assert!(settings.auth.tokens.is_empty());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn backend_overrides_apply_to_check() {
    let mut raw = RawSettings::default();
    raw.apply_backend_overrides(&BackendOverrides {
        index_url: Some("https://search.internal:9243".to_string()),
        cache_url: Some("redis://cache.internal:6379/2".to_string()),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.index.url.host_str(), Some("search.internal"));
    assert_eq!(
        settings.cache.url.as_ref().map(Url::as_str),
        Some("redis://cache.internal:6379/2")
    );
}

#[test]
fn blank_cache_url_means_in_process_store() {
    let mut raw = RawSettings::default();
    raw.cache.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.cache.url.is_none());
}

#[test]
fn rejects_non_redis_cache_url() {
    let mut raw = RawSettings::default();
    raw.cache.url = Some("http://127.0.0.1:6379".to_string());
    let err = Settings::from_raw(raw).expect_err("http scheme rejected");
    assert!(matches!(err, LoadError::Invalid { key: "cache.url", .. }));
}

#[test]
fn rejects_zero_ttl() {
    let mut raw = RawSettings::default();
    raw.ttl.genres = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero ttl rejected");
    assert!(matches!(err, LoadError::Invalid { key: "ttl.genres", .. }));
}

#[test]
fn rejects_zero_timeouts_and_pools() {
    let mut raw = RawSettings::default();
    raw.index.request_timeout_ms = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "index.request_timeout_ms",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.cache.max_connections = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "cache.max_connections",
            ..
        })
    ));
}

#[test]
fn auth_tokens_are_trimmed() {
    let mut raw = RawSettings::default();
    raw.auth.tokens = Some(vec![" alpha ".to_string(), String::new()]);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.auth.tokens, vec!["alpha".to_string()]);
}

#[test]
fn cache_toggles_from_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_enabled: Some(false),
        cache_single_flight: Some(false),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(!settings.cache.enabled);
    assert!(!settings.cache.single_flight);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["marquee"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "marquee",
        "serve",
        "--server-port",
        "9000",
        "--cache-single-flight",
        "false",
        "--index-url",
        "http://es:9200",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_port, Some(9000));
            assert_eq!(serve.overrides.cache_single_flight, Some(false));
            assert_eq!(
                serve.overrides.backends.index_url.as_deref(),
                Some("http://es:9200")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_check_arguments() {
    let args = CliArgs::parse_from(["marquee", "check", "--cache-url", "redis://cache:6379"]);

    match args.command.expect("check command") {
        Command::Check(check) => {
            assert_eq!(
                check.backends.cache_url.as_deref(),
                Some("redis://cache:6379")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
