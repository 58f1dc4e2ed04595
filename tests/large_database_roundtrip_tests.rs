#[cfg(feature = "save_kdbx4")]
mod large_database_roundtrip_tests {
    use std::collections::HashMap;

    use kdbx_merge::{
        db::{fields, Entry, Protected, Value},
        Database, DatabaseKey,
    };

    /// This can be tuned based on how "large" we expect databases to realistically be.
    const LARGE_DATABASE_ENTRY_COUNT: usize = 10_000;

    const TEST_DATABASE_PASSWORD: &str = "demopass";

    /// Writing and reading back a large database should function as expected.
    /// This test guards against issues that might affect large databases.
    #[test]
    fn write_and_read_large_database() -> Result<(), Box<dyn std::error::Error>> {
        let mut db = Database::new(Default::default());

        db.meta.database_name = Some("Demo database".to_string());

        for i in 0..LARGE_DATABASE_ENTRY_COUNT {
            let mut entry = Entry::new();
            entry
                .fields
                .insert(fields::TITLE.to_string(), Value::Unprotected(format!("Entry_{i}")));
            entry
                .fields
                .insert(fields::USERNAME.to_string(), Value::Unprotected(format!("UserName_{i}")));
            entry.fields.insert(
                fields::PASSWORD.to_string(),
                Value::Protected(Protected::new(format!("Password_{i}").into_bytes())),
            );
            db.root.add_child(entry);
        }

        let key = DatabaseKey::new().with_password(TEST_DATABASE_PASSWORD);

        let mut buffer = Vec::new();
        db.save(&mut buffer, key.clone())?;

        // Read the database that was written in the previous block.
        let db_loaded = Database::open(&mut buffer.as_slice(), key)?;

        let by_title: HashMap<&str, &Entry> = db_loaded
            .root
            .entries()
            .into_iter()
            .map(|e| (e.get_title().expect("Title should be defined"), e))
            .collect();

        assert_eq!(by_title.len(), LARGE_DATABASE_ENTRY_COUNT);

        for i in 0..LARGE_DATABASE_ENTRY_COUNT {
            let entry = by_title
                .get(format!("Entry_{i}").as_str())
                .expect("Entry should be found");

            assert_eq!(
                format!("UserName_{i}"),
                entry.get_username().expect("Username should be defined")
            );
            assert_eq!(
                format!("Password_{i}"),
                entry.get_password().expect("Password should be defined")
            );
        }

        Ok(())
    }
}
