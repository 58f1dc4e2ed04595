use kdbx_merge::{
    config::{CompressionConfig, DatabaseConfig, OuterCipherConfig},
    db::Entry,
    Database, DatabaseKey,
};

fn config_with(outer_cipher_config: OuterCipherConfig, compression_config: CompressionConfig) -> DatabaseConfig {
    DatabaseConfig {
        outer_cipher_config,
        compression_config,
        ..Default::default()
    }
}

fn roundtrip(config: DatabaseConfig, password: &str) {
    let mut db = Database::new(config);
    db.root.add_child(Entry::new());

    let mut buffer = Vec::new();
    db.save(&mut buffer, DatabaseKey::new().with_password(password))
        .expect("save should succeed");

    let db_loaded = Database::open(&mut buffer.as_slice(), DatabaseKey::new().with_password(password))
        .expect("open should succeed");

    assert_eq!(db, db_loaded);
}

#[test]
fn open_kdbx4_with_password_cipher_aes256_gzip() {
    roundtrip(config_with(OuterCipherConfig::AES256, CompressionConfig::GZip), "demopass");
}

#[test]
fn open_kdbx4_with_password_cipher_aes256_uncompressed() {
    roundtrip(config_with(OuterCipherConfig::AES256, CompressionConfig::None), "demopass");
}

#[test]
fn open_kdbx4_with_password_cipher_twofish_gzip() {
    roundtrip(config_with(OuterCipherConfig::Twofish, CompressionConfig::GZip), "demopass");
}

#[test]
fn open_kdbx4_with_password_cipher_twofish_uncompressed() {
    roundtrip(config_with(OuterCipherConfig::Twofish, CompressionConfig::None), "demopass");
}

#[test]
fn open_kdbx4_with_keyfile() {
    let config = config_with(OuterCipherConfig::AES256, CompressionConfig::GZip);

    let mut db = Database::new(config);
    db.root.add_child(Entry::new());

    let mut keyfile = b"not a very good keyfile but good enough for a test".as_ref();
    let key = DatabaseKey::new().with_keyfile(&mut keyfile).unwrap();

    let mut buffer = Vec::new();
    db.save(&mut buffer, key.clone()).expect("save should succeed");

    let db_loaded = Database::open(&mut buffer.as_slice(), key).expect("open should succeed");
    assert_eq!(db, db_loaded);
}

#[test]
fn open_broken_random_data() {
    let mut random_data: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
    random_data[0] = 0xFF;

    let result = Database::open(
        &mut random_data.as_slice(),
        DatabaseKey::new().with_password("whatever"),
    );

    assert!(result.is_err());
}

#[test]
fn open_with_wrong_password_fails() {
    let config = config_with(OuterCipherConfig::AES256, CompressionConfig::GZip);
    let mut db = Database::new(config);
    db.root.add_child(Entry::new());

    let mut buffer = Vec::new();
    db.save(&mut buffer, DatabaseKey::new().with_password("correct horse"))
        .expect("save should succeed");

    let result = Database::open(
        &mut buffer.as_slice(),
        DatabaseKey::new().with_password("battery staple"),
    );

    assert!(result.is_err());
}
