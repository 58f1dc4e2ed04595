use kdbx_merge::{
    db::{Entry, NodeRef, Value},
    Database, DatabaseKey,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::new(Default::default());
    let mut entry = Entry::new();
    entry
        .fields
        .insert("Title".to_string(), Value::Unprotected("Sample Entry".to_string()));
    entry
        .fields
        .insert("UserName".to_string(), Value::Unprotected("User Name".to_string()));
    db.root.add_child(entry);

    // Save and reopen, the way a real caller would round-trip a .kdbx file on disk.
    let key = DatabaseKey::new().with_password("demopass");
    let mut buffer = Vec::new();
    db.save(&mut buffer, key.clone())?;
    let db = Database::open(&mut buffer.as_slice(), key)?;

    // Iterate over all `Group`s and `Entry`s
    for node in &db.root {
        match node {
            NodeRef::Group(g) => {
                println!("Saw group '{0}'", g.name);
            }
            NodeRef::Entry(e) => {
                let title = e.get_title().unwrap_or("(no title)");
                let user = e.get_username().unwrap_or("(no username)");
                let pass = e.get_password().unwrap_or("(no password)");
                println!("Entry '{0}': '{1}' : '{2}'", title, user, pass);
            }
        }
    }

    Ok(())
}
