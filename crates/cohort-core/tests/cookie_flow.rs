//! Manager over the HTTP cookie transport and TOML config

use cohort_core::prelude::*;
use cohort_core::ConfigError;
use cohort_persistence::{ClientState, StateBlob, TransportError};
use cohort_test_utils::two_way_experiment;
use proptest::prelude::*;

const CONFIG: &str = r#"
token_name = "ab"

[cookie]
max_age_secs = 3600

[[experiments]]
key = "checkout_button"
alternatives = [{ name = "green" }, { name = "red", weight = 3 }]

[[experiments]]
key = "signup_copy"
alternatives = [{ name = "short" }, { name = "long" }]
"#;

#[test]
fn from_config_registers_experiments() {
    let manager = ExperimentManager::from_config(ManagerConfig::from_toml_str(CONFIG).unwrap())
        .unwrap();

    let checkout = manager.lookup_experiment("checkout_button").unwrap();
    assert_eq!(checkout.alternative("green").unwrap().weight(), 1);
    assert_eq!(checkout.alternative("red").unwrap().weight(), 3);
    assert!(manager.lookup_experiment("signup_copy").is_ok());
    assert_eq!(manager.token_name(), "ab");
}

#[test]
fn from_config_rejects_invalid_definition() {
    let config = ManagerConfig::from_toml_str(
        r#"
        [[experiments]]
        key = "dup"
        alternatives = [{ name = "X" }, { name = "X" }]
        "#,
    )
    .unwrap();

    let err = ExperimentManager::from_config(config).unwrap_err();
    assert!(err.is_misuse());
    assert_eq!(err.key(), Some("dup"));
}

#[test]
fn from_config_rejects_duplicate_keys() {
    let config = ManagerConfig::new()
        .with_experiment(two_way_experiment("k").into())
        .with_experiment(two_way_experiment("k").into());
    assert!(ExperimentManager::from_config(config).unwrap_err().is_misuse());
}

#[test]
fn from_config_rejects_empty_token_name() {
    let err = ExperimentManager::from_config(ManagerConfig::new().with_token_name("")).unwrap_err();
    assert!(matches!(err, ManagerError::Config(ConfigError::Invalid(_))));
}

#[test]
fn unusable_token_names_never_reach_a_cookie() {
    for name in ["a;b", "x=y", ""] {
        let config = ManagerConfig::new().with_token_name(name);
        let err = ExperimentManager::from_config(config.clone()).unwrap_err();
        assert!(matches!(err, ManagerError::Config(ConfigError::Invalid(_))));

        let toml = format!("token_name = {name:?}\n");
        assert!(matches!(
            ManagerConfig::from_toml_str(&toml),
            Err(ConfigError::Invalid(_))
        ));

        // Constructed without the config check, the write itself is refused
        let manager = ExperimentManager::seeded(config, 5);
        manager.register_experiment(two_way_experiment("t1")).unwrap();
        let mut response = manager.cookie_response();
        let err = manager
            .start_experiment("t1", &CookieRequest::empty(), &mut response)
            .unwrap_err();
        assert_eq!(
            err.transport(),
            Some(&TransportError::InvalidName {
                name: name.to_string()
            })
        );
        assert_eq!(response.headers().count(), 0);
    }
}

#[test]
fn valid_token_name_keeps_start_idempotent() {
    let manager = ExperimentManager::seeded(ManagerConfig::new().with_token_name("ok"), 5);
    manager.register_experiment(two_way_experiment("t1")).unwrap();

    let mut first = manager.cookie_response();
    manager
        .start_experiment("t1", &CookieRequest::empty(), &mut first)
        .unwrap();
    let second = manager
        .start_experiment("t1", &first.to_request(), &mut manager.cookie_response())
        .unwrap();
    assert!(!second.did_start_first_time);
}

#[test]
fn load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cohort.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = ManagerConfig::load(&path).unwrap();
    assert_eq!(config.experiments.len(), 2);
    assert_eq!(config.cookie.max_age_secs, Some(3600));
}

#[test]
fn cookie_round_trip() {
    let manager = ExperimentManager::from_config(ManagerConfig::from_toml_str(CONFIG).unwrap())
        .unwrap();

    let mut response = manager.cookie_response();
    let started = manager
        .start_experiment("checkout_button", &CookieRequest::empty(), &mut response)
        .unwrap();

    let header = response.header("ab").unwrap();
    assert!(header.starts_with("ab=%7B%22checkout_button%22%3A%22"));
    assert!(header.contains("; Path=/; Max-Age=3600"));
    assert!(header.contains("; HttpOnly; Secure; SameSite=Lax"));

    let request = response.to_request();
    let token = request.read_token("ab").unwrap().unwrap();
    assert_eq!(
        StateBlob::decode(&token).unwrap().state_of("checkout_button"),
        ClientState::Assigned(started.alternative.as_str())
    );

    let mut response = manager.cookie_response();
    let finished = manager
        .finish_experiment("checkout_button", &request, &mut response)
        .unwrap();
    assert_eq!(finished.alternative, started.alternative);
    assert!(finished.did_finish_first_time);
    assert!(response.header("ab").unwrap().contains("%3Afinished%22%3A%22true%22"));
}

#[test]
fn other_cookies_are_ignored() {
    let manager = ExperimentManager::seeded(ManagerConfig::default(), 5);
    manager.register_experiment(two_way_experiment("t1")).unwrap();

    let request = CookieRequest::parse("session=abc; cohort=%7B%22t1%22%3A%22variant%22%7D; theme=dark");
    let mut response = manager.cookie_response();
    let res = manager.start_experiment("t1", &request, &mut response).unwrap();

    assert_eq!(res.alternative, "variant");
    assert!(!res.did_start_first_time);
    assert_eq!(response.headers().count(), 1);
}

#[test]
fn invalid_escape_is_transport_error() {
    let manager = ExperimentManager::seeded(ManagerConfig::default(), 5);
    manager.register_experiment(two_way_experiment("t1")).unwrap();

    let request = CookieRequest::parse("cohort=%7");
    let err = manager
        .start_experiment("t1", &request, &mut manager.cookie_response())
        .unwrap_err();
    assert!(matches!(err.transport(), Some(TransportError::InvalidEscape { .. })));
}

#[test]
fn oversized_token_is_refused() {
    let config = ManagerConfig::new().with_cookie(CookieConfig::new().with_max_len(64));
    let manager = ExperimentManager::seeded(config, 5);
    let key = "k".repeat(80);
    manager.register_experiment(two_way_experiment(&key)).unwrap();

    let mut response = manager.cookie_response();
    let err = manager
        .start_experiment(&key, &CookieRequest::empty(), &mut response)
        .unwrap_err();

    assert!(matches!(err.transport(), Some(TransportError::TooLong { limit: 64, .. })));
    assert_eq!(response.headers().count(), 0);
}

proptest! {
    #[test]
    fn prop_cookie_round_trip_keeps_assignment(
        seed in any::<u64>(),
        key in "[a-z][a-z0-9_ :%\"]{0,24}",
    ) {
        prop_assume!(!key.ends_with(":finished"));
        let manager = ExperimentManager::seeded(ManagerConfig::default(), seed);
        manager.register_experiment(two_way_experiment(&key)).unwrap();

        let mut response = manager.cookie_response();
        let started = manager
            .start_experiment(&key, &CookieRequest::empty(), &mut response)
            .unwrap();

        let mut next = manager.cookie_response();
        let resumed = manager
            .start_experiment(&key, &response.to_request(), &mut next)
            .unwrap();

        prop_assert_eq!(resumed.alternative, started.alternative);
        prop_assert!(!resumed.did_start_first_time);
        prop_assert_eq!(next.header("cohort"), response.header("cohort"));
    }
}
