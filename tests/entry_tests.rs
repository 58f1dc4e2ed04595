use kdbx_merge::db::{AutoType, AutoTypeAssociation, Entry, Group, Node, Protected, Value};

fn sample_entry() -> Entry {
    let mut entry = Entry::new();
    entry.fields.insert("Title".to_string(), Value::Unprotected("Sample Entry".to_string()));
    entry.fields.insert("UserName".to_string(), Value::Unprotected("User Name".to_string()));
    entry
        .fields
        .insert("Password".to_string(), Value::Protected(Protected::new(b"Password".to_vec())));
    entry.fields.insert(
        "custom attribute".to_string(),
        Value::Unprotected("data for custom attribute".to_string()),
    );
    entry.autotype = Some(AutoType {
        enabled: true,
        sequence: Some("{USERNAME}{TAB}{TAB}{PASSWORD}{ENTER}".to_string()),
        associations: vec![AutoTypeAssociation {
            window: Some("Sample Window".to_string()),
            sequence: None,
        }],
    });
    entry
}

fn nested_entry() -> Entry {
    let mut entry = Entry::new();
    entry.fields.insert("Title".to_string(), Value::Unprotected("test entry".to_string()));
    entry.fields.insert("UserName".to_string(), Value::Unprotected("jdoe".to_string()));
    entry.fields.insert(
        "Password".to_string(),
        Value::Protected(Protected::new(b"nWuu5AtqsxqNhnYgLwoB".to_vec())),
    );
    entry
}

fn sample_root() -> Group {
    let mut root = Group::new("Root");
    root.add_child(sample_entry());

    let mut subgroup = Group::new("Subgroup");
    subgroup.add_child(nested_entry());

    let mut general = Group::new("General");
    general.add_child(subgroup);

    root.add_child(general);
    root
}

#[test]
fn entry_at_root() {
    let root = sample_root();

    if let Some(Node::Entry(e)) = root.get(&["Sample Entry"]) {
        assert_eq!(e.get_title(), Some("Sample Entry"));
        assert_eq!(e.get_username(), Some("User Name"));
        assert_eq!(e.get_password(), Some("Password"));
        assert_eq!(e.get("custom attribute"), Some("data for custom attribute"));

        if let Some(ref at) = e.autotype {
            if let Some(ref s) = at.sequence {
                assert_eq!(s, "{USERNAME}{TAB}{TAB}{PASSWORD}{ENTER}");
            } else {
                panic!("Expected a sequence");
            }
        } else {
            panic!("Expected an AutoType entry");
        }
    } else {
        panic!("Expected an entry");
    }
}

#[test]
fn entry_in_nested_group() {
    let root = sample_root();

    if let Some(Node::Entry(e)) = root.get(&["General", "Subgroup", "test entry"]) {
        assert_eq!(e.get_title(), Some("test entry"));
        assert_eq!(e.get_username(), Some("jdoe"));
        assert_eq!(e.get_password(), Some("nWuu5AtqsxqNhnYgLwoB"));
    } else {
        panic!("Expected an entry");
    }
}
