//! Integration tests for vault encryption and re-keying of YAML files.

mod common;

use common::{password_file, temp_tree};
use pretty_assertions::assert_eq;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};

use awsible::error::Error;
use awsible::vault::{default_output, Rekeyer, Vault, VAULT_HEADER};

// ============================================================================
// Test Helpers
// ============================================================================

fn vaulted_document(vault: &Vault) -> String {
    let mut db = Mapping::new();
    db.insert("user".into(), "app".into());
    db.insert(
        "password".into(),
        vault.encrypt("s3cr3t").unwrap().into(),
    );

    let mut doc = Mapping::new();
    doc.insert("db".into(), Value::Mapping(db));
    doc.insert(
        "api_token".into(),
        Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new("vault"),
            value: vault.encrypt("tok-123").unwrap().into(),
        })),
    );
    doc.insert(
        "keys".into(),
        Value::Sequence(vec![
            vault.encrypt("first").unwrap().into(),
            "plain".into(),
        ]),
    );
    serde_yaml::to_string(&Value::Mapping(doc)).unwrap()
}

fn lookup<'a>(doc: &'a Value, path: &[&str]) -> &'a Value {
    path.iter().fold(doc, |value, key| &value[*key])
}

fn untagged(value: &Value) -> &str {
    match value {
        Value::Tagged(tagged) => tagged.value.as_str().unwrap(),
        other => other.as_str().unwrap(),
    }
}

// ============================================================================
// Encryption
// ============================================================================

#[test]
fn test_encrypt_decrypt() {
    let vault = Vault::new("correct horse");
    let encrypted = vault.encrypt("hello world").unwrap();

    assert!(encrypted.starts_with(VAULT_HEADER));
    assert!(Vault::is_encrypted(&encrypted));
    assert_eq!(vault.decrypt(&encrypted).unwrap(), "hello world");
}

#[test]
fn test_same_plaintext_encrypts_differently() {
    let vault = Vault::new("pw");
    assert_ne!(vault.encrypt("x").unwrap(), vault.encrypt("x").unwrap());
}

#[test]
fn test_wrong_password_fails() {
    let encrypted = Vault::new("right").encrypt("secret").unwrap();
    let err = Vault::new("wrong").decrypt(&encrypted).unwrap_err();
    assert!(matches!(err, Error::Vault(_)));
    assert!(!err.to_string().contains("right"));
}

#[test]
fn test_password_file_trailing_newline() {
    let dir = temp_tree(&[]);
    let path = password_file(dir.path(), "pass.txt", "from-file");

    let encrypted = Vault::new("from-file").encrypt("v").unwrap();
    let vault = Vault::from_password_file(&path).unwrap();
    assert_eq!(vault.decrypt(&encrypted).unwrap(), "v");
}

#[test]
fn test_missing_password_file() {
    let dir = temp_tree(&[]);
    let err = Vault::from_password_file(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::VaultFileNotFound(_)));
    assert_eq!(err.exit_code(), 6);
}

// ============================================================================
// Re-keying
// ============================================================================

#[test]
fn test_rekey_file_to_default_output() {
    let old = Vault::new("old-password");
    let dir = temp_tree(&[]);
    let input = dir.path().join("secrets.yml");
    std::fs::write(&input, vaulted_document(&old)).unwrap();

    let rekeyer = Rekeyer::new(Vault::new("old-password"), Vault::new("new-password"));
    let report = rekeyer.rekey_file(&input, None).unwrap();

    assert_eq!(report.output, default_output(&input));
    assert_eq!(report.output.file_name().unwrap(), "secrets.yml.new");
    assert_eq!(report.rekeyed, 3);

    let doc: Value =
        serde_yaml::from_str(&std::fs::read_to_string(&report.output).unwrap()).unwrap();
    let new = Vault::new("new-password");

    assert_eq!(new.decrypt(untagged(lookup(&doc, &["db", "password"]))).unwrap(), "s3cr3t");
    assert_eq!(new.decrypt(untagged(lookup(&doc, &["api_token"]))).unwrap(), "tok-123");
    assert_eq!(new.decrypt(doc["keys"][0].as_str().unwrap()).unwrap(), "first");
    assert_eq!(doc["keys"][1].as_str(), Some("plain"));
    assert_eq!(lookup(&doc, &["db", "user"]).as_str(), Some("app"));
    assert!(matches!(doc["api_token"], Value::Tagged(_)));

    // The old password no longer opens anything
    assert!(old.decrypt(untagged(lookup(&doc, &["api_token"]))).is_err());
    // The input still opens with the old password
    let original: Value = serde_yaml::from_str(&std::fs::read_to_string(&input).unwrap()).unwrap();
    assert_eq!(
        old.decrypt(untagged(lookup(&original, &["db", "password"]))).unwrap(),
        "s3cr3t"
    );
}

#[test]
fn test_rekey_file_explicit_output() {
    let old = Vault::new("a");
    let dir = temp_tree(&[]);
    let input = dir.path().join("group_vars.yml");
    let output = dir.path().join("out.yml");
    std::fs::write(&input, vaulted_document(&old)).unwrap();

    let report = Rekeyer::new(Vault::new("a"), Vault::new("b"))
        .rekey_file(&input, Some(&output))
        .unwrap();
    assert_eq!(report.output, output);
    assert!(output.exists());
    assert!(!default_output(&input).exists());
}

#[test]
fn test_rekey_with_wrong_old_password_writes_nothing() {
    let dir = temp_tree(&[]);
    let input = dir.path().join("secrets.yml");
    std::fs::write(&input, vaulted_document(&Vault::new("real"))).unwrap();

    let err = Rekeyer::new(Vault::new("guess"), Vault::new("new"))
        .rekey_file(&input, None)
        .unwrap_err();
    assert!(matches!(err, Error::Vault(_)));
    assert!(!default_output(&input).exists());
}

#[test]
fn test_rekey_document_without_secrets() {
    let rekeyer = Rekeyer::new(Vault::new("a"), Vault::new("b"));
    let (out, count) = rekeyer.rekey_document("name: web\nport: 80\n").unwrap();
    assert_eq!(count, 0);
    let doc: Value = serde_yaml::from_str(&out).unwrap();
    assert_eq!(doc["port"].as_i64(), Some(80));
}

#[test]
fn test_rekey_missing_input() {
    let dir = temp_tree(&[]);
    let err = Rekeyer::new(Vault::new("a"), Vault::new("b"))
        .rekey_file(&dir.path().join("missing.yml"), None)
        .unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}
