//! Tests for `source` statement resolution: environment expansion, relative and optional
//! sources, and inclusion-cycle rejection.

use {
    kconfig_core::{parser::KConfigErrorKind, Model, Tristate},
    std::{collections::HashMap, env, path::PathBuf},
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join("tests/fixtures").join(name).join("Kconfig")
}

#[test]
fn source_paths_expand_from_the_context() {
    let mut context = HashMap::<String, String>::default();
    context.insert("SUBDIR".to_string(), "sub".to_string());

    let model = Model::load_with(fixture("sourcing"), &context).unwrap();

    // The env-expanded source, the rsource, and the missing osource all resolve.
    let sourced = model.symbol("FROM_ENV_SOURCE").unwrap();
    assert_eq!(model.value(sourced).tristate(), Some(Tristate::Yes));
    assert!(model.symbol("FROM_RSOURCE").is_some());
}

#[test]
fn missing_required_variable_is_an_error() {
    let context = HashMap::<String, String>::default();
    let result = Model::load_with(fixture("sourcing"), &context);

    // With SUBDIR unset the source path falls apart.
    assert!(result.is_err());
}

#[test]
fn inclusion_cycles_are_rejected() {
    let context = HashMap::<String, String>::default();
    let err = Model::load_with(fixture("cycle"), &context).unwrap_err();

    assert!(matches!(err.kind, KConfigErrorKind::SourceCycle(_)), "unexpected error: {err}");
    assert!(err.location.is_some());
}
