use super::*;

fn env_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |key: &str| {
        pairs
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.to_string())
    }
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
bind_addr = "0.0.0.0:9000"
permits_file = "./data/permits.toml"
live_feed_capacity = 50
"#,
    );

    assert_eq!(settings.bind_addr, "0.0.0.0:9000");
    assert_eq!(
        settings.permits_file,
        Some(PathBuf::from("./data/permits.toml"))
    );
    assert_eq!(settings.live_feed_capacity, 50);
}

#[test]
fn unparsable_file_keeps_defaults() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "bind_addr = ");
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_prefixed_env_wins_over_legacy_name() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("GATE_SERVER_BIND", "127.0.0.1:1"),
            ("APP__BIND_ADDR", "127.0.0.1:2"),
            ("APP__LIVE_FEED_CAPACITY", "10"),
        ]),
    );
    assert_eq!(settings.bind_addr, "127.0.0.1:2");
    assert_eq!(settings.live_feed_capacity, 10);
}

#[test]
fn invalid_capacity_env_is_ignored() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[("APP__LIVE_FEED_CAPACITY", "lots")]),
    );
    assert_eq!(settings.live_feed_capacity, 200);
}
