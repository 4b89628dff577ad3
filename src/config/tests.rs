//! Configuration tests.

use super::*;

#[test]
fn default_config_template_parses_back() {
    let parsed: Result<FileConfig, _> = toml::from_str(DEFAULT_CONFIG_TEMPLATE);
    assert!(parsed.is_ok(), "default template should parse: {:?}", parsed.err());
}

#[test]
fn default_config_template_round_trips_through_to_toml() {
    let config = Config::default();
    let rendered = config.to_toml();
    let parsed: Result<FileConfig, _> = toml::from_str(&rendered);
    assert!(parsed.is_ok());
}

#[test]
fn provider_table_deserializes_into_provider_configs() {
    let toml_str = r#"
        bind_addr = "0.0.0.0:9000"

        [router]
        default = "anthropic,claude-3-5-sonnet"

        [providers.openai]
        base_url = "https://api.openai.com/v1"
        credential = "sk-test"
    "#;
    let parsed: FileConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(parsed.bind_addr.as_deref(), Some("0.0.0.0:9000"));
    let openai = parsed.providers.get("openai").unwrap();
    assert_eq!(openai.base_url, "https://api.openai.com/v1");
    assert_eq!(openai.credential, "sk-test");
    assert_eq!(parsed.router.unwrap().default, "anthropic,claude-3-5-sonnet");
}

#[test]
fn domain_mappings_table_deserializes() {
    let toml_str = r#"
        [domain_mappings]
        "my-gateway.internal" = "openai"
    "#;
    let parsed: FileConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(parsed.domain_mappings.get("my-gateway.internal"), Some(&"openai".to_string()));
}
