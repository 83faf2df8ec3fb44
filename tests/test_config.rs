use std::io::Write;

use vanity::config::{Config, ConfigError, DEFAULT_LISTEN_ADDR};

#[test]
fn test_config_default_address() {
    let cfg = Config::load_from(None, None).unwrap();
    assert_eq!(cfg.listen_addr, DEFAULT_LISTEN_ADDR);
}

#[test]
fn test_config_listen_override_beats_file() {
    let cfg = Config::from_yaml_str("listen: 0.0.0.0:3000\n").unwrap();
    assert_eq!(cfg.listen_addr, "0.0.0.0:3000");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "listen: 0.0.0.0:3000").unwrap();
    let cfg = Config::load_from(Some(file.path()), Some("127.0.0.1:8000".to_string())).unwrap();
    assert_eq!(cfg.listen_addr, "127.0.0.1:8000");
}

#[test]
fn test_config_invalid_listen_address() {
    let err = Config::load_from(None, Some("not-an-address".to_string())).unwrap_err();
    assert!(matches!(err, ConfigError::ListenAddr(_)));
}

#[test]
fn test_config_unknown_key_rejected() {
    let err = Config::from_yaml_str("vcs_uri: https://github.com/kare\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_config_missing_file() {
    let err = Config::load_from(Some(std::path::Path::new("/no/such/vanity.yaml")), None).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_config_builds_resolver() {
    let cfg = Config::from_yaml_str(
        "vcs: hg\nvcs_url: https://bitbucket.org/kare\nmodule_server_url: https://pkg.go.dev\nhost: kkn.fi\nrobots_txt: \"User-agent: *\\nDisallow: /\\n\"\n",
    )
    .unwrap();
    let resolver = cfg.resolver_builder().unwrap().build().unwrap();

    assert_eq!(resolver.vcs(), "hg");
    assert_eq!(resolver.vcs_url(), "https://bitbucket.org/kare/");
    assert_eq!(resolver.module_server().base(), "https://pkg.go.dev/");
    assert_eq!(resolver.host(), Some("kkn.fi"));
    assert_eq!(resolver.robots_txt(), "User-agent: *\nDisallow: /\n");
}

#[test]
fn test_config_reads_package_file() {
    let mut packages = tempfile::NamedTempFile::new().unwrap();
    write!(
        packages,
        "/gist\tgit\thttps://github.com/kare/gist\n\n/vanity/cmd/vanity\tgit\thttps://github.com/kare/vanity\n"
    )
    .unwrap();
    let yaml = format!("packages: {}\n", packages.path().display());
    let cfg = Config::from_yaml_str(&yaml).unwrap();
    let resolver = cfg.resolver_builder().unwrap().build().unwrap();

    assert_eq!(resolver.packages().len(), 2);
    assert!(resolver.packages().lookup("vanity").is_some());
}

#[test]
fn test_config_broken_package_file() {
    let mut packages = tempfile::NamedTempFile::new().unwrap();
    writeln!(packages, "/gist git").unwrap();
    let yaml = format!("packages: {}\n", packages.path().display());
    let cfg = Config::from_yaml_str(&yaml).unwrap();

    match cfg.resolver_builder() {
        Err(ConfigError::Package { line, .. }) => assert_eq!(line, 1),
        other => panic!("expected package error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_config_static_dir_validated_at_build() {
    let cfg = Config::from_yaml_str("static_dir:\n  path: /not/found\n  prefix: /files/\n").unwrap();
    assert!(cfg.resolver_builder().unwrap().build().is_err());

    let dir = tempfile::tempdir().unwrap();
    let yaml = format!("static_dir:\n  path: {}\n  prefix: .static\n", dir.path().display());
    let resolver = Config::from_yaml_str(&yaml)
        .unwrap()
        .resolver_builder()
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(resolver.static_dir().unwrap().prefix(), "/.static/");
}
