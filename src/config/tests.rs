// Author: Dustin Pilgrim
// License: MIT

#[cfg(test)]
use super::*;
use std::fs;
use std::path::PathBuf;

use crate::embed::ApiShape;

#[test]
fn test_config_from_string() {
    let config_content = r#"
# compiler settings
embed:
  base_dir: ./api
  shapes:
    - resource_type: AWS::Serverless::Api
      pointer_key: DefinitionBody
alarms:
  description: Alarms for ${TemplateName}
  name_prefix: Panther-
  topic_parameter: AlarmTopicArn
  variables: {Env: prod, Team: security}
batch_mode: best_effort
output_format: json
"#;
    let config = CompilerConfig::from_str(config_content).expect("Failed to parse config");

    assert_eq!(config.embed.base_dir, Some(PathBuf::from("./api")));
    assert_eq!(config.embed.shapes, vec![ApiShape::new("AWS::Serverless::Api", "DefinitionBody")]);

    assert_eq!(config.alarms.description.as_deref(), Some("Alarms for ${TemplateName}"));
    assert_eq!(config.alarms.name_prefix, "Panther-");
    assert_eq!(config.alarms.topic_parameter.as_deref(), Some("AlarmTopicArn"));
    let vars: Vec<&str> = config.alarms.variables.keys().map(String::as_str).collect();
    assert_eq!(vars, vec!["Env", "Team"]);

    assert_eq!(config.batch_mode, BatchMode::BestEffort);
    assert_eq!(config.output_format, Format::Json);
}

#[test]
fn test_missing_sections_keep_defaults() {
    let config = CompilerConfig::from_str("alarms:\n  name_prefix: Dev-\nembed:\n").expect("Failed to parse config");
    assert_eq!(config.alarms.name_prefix, "Dev-");
    assert_eq!(config.embed, EmbedOptions::default());
    assert_eq!(config.embed.shapes.len(), 3);
    assert_eq!(config.batch_mode, BatchMode::FailFast);
    assert_eq!(config.output_format, Format::Yaml);

    let empty = CompilerConfig::from_str("# nothing configured\n").expect("Failed to parse empty config");
    assert_eq!(empty, CompilerConfig::default());
}

#[test]
fn test_unknown_section_is_rejected() {
    let err = CompilerConfig::from_str("embed: {}\noutput: yaml\n").unwrap_err();
    match err {
        CompileError::TypeMismatch { key_path, expected, found, .. } => {
            assert_eq!(key_path, "output");
            assert_eq!(expected, "one of embed, alarms, batch_mode, output_format");
            assert_eq!(found, "unknown key `output`");
        }
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_unknown_field_names_the_section() {
    let err = CompilerConfig::from_str("alarms:\n  prefix: Dev-\n").unwrap_err();
    match err {
        CompileError::TypeMismatch { key_path, found, .. } => {
            assert_eq!(key_path, "alarms");
            assert!(found.contains("prefix"));
        }
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_invalid_enum_value() {
    let err = CompilerConfig::from_str("batch_mode: sometimes\n").unwrap_err();
    match err {
        CompileError::TypeMismatch { key_path, expected, .. } => {
            assert_eq!(key_path, "batch_mode");
            assert_eq!(expected, "fail_fast or best_effort");
        }
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_non_mapping_config_is_rejected() {
    assert!(matches!(
        CompilerConfig::from_str("- embed\n- alarms\n"),
        Err(CompileError::TypeMismatch { .. })
    ));
}

#[test]
fn test_config_from_file_resolves_base_dir() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cfngen.yml");
    fs::write(&path, "embed:\n  base_dir: api\nbatch_mode: best_effort\n").expect("Failed to write config");

    let config = CompilerConfig::from_file(&path).expect("Failed to load config");
    assert_eq!(config.embed.base_dir, Some(dir.path().join("api")));
    assert_eq!(config.batch_mode, BatchMode::BestEffort);
}

#[test]
fn test_config_file_errors_name_the_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cfngen.yml");
    fs::write(&path, "output_format: xml\n").expect("Failed to write config");

    let err = CompilerConfig::from_file(&path).unwrap_err();
    assert_eq!(err.document(), Some(path.as_path()));
    assert_eq!(err.key_path(), Some("output_format"));
}

#[test]
fn test_config_fallback() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let primary = dir.path().join("missing.yml");
    let fallback = dir.path().join("fallback.yml");
    fs::write(&fallback, "output_format: json\n").expect("Failed to write fallback");

    let config = CompilerConfig::from_file_with_fallback(&primary, &fallback).expect("Failed to load fallback");
    assert_eq!(config.output_format, Format::Json);

    fs::write(&primary, "output_format: yaml\n").expect("Failed to write primary");
    let config = CompilerConfig::from_file_with_fallback(&primary, &fallback).expect("Failed to load primary");
    assert_eq!(config.output_format, Format::Yaml);
}

#[test]
fn test_builder_setters() {
    let config = CompilerConfig::default()
        .with_embed(EmbedOptions::default().with_base_dir("templates"))
        .with_alarms(AlarmOptions::default().with_name_prefix("Prod-"))
        .with_batch_mode(BatchMode::BestEffort)
        .with_output_format(Format::Json);

    assert_eq!(config.embed.base_dir, Some(PathBuf::from("templates")));
    assert_eq!(config.alarms.name_prefix, "Prod-");
    assert_eq!(config.batch_mode, BatchMode::BestEffort);
    assert_eq!(config.output_format, Format::Json);
}
