use base64::{engine::general_purpose as base64_engine, Engine as _};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::writer::Writer;

use crate::{
    crypt::ciphers::Cipher,
    db::entry::History,
    xml_db::{
        dump::{write_text, DumpXml, SimpleTag},
        parse::XmlParseError,
    },
    AutoType, AutoTypeAssociation, Entry, Value,
};

impl DumpXml for Entry {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("Entry")))?;

        SimpleTag("UUID", &self.uuid).dump_xml(writer, inner_cipher)?;

        if let Some(icon_id) = self.icon_id {
            SimpleTag("IconID", icon_id).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref uuid) = self.custom_icon_uuid {
            SimpleTag("CustomIconUUID", uuid).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref color) = self.foreground_color {
            SimpleTag("ForegroundColor", color).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref color) = self.background_color {
            SimpleTag("BackgroundColor", color).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref url) = self.override_url {
            SimpleTag("OverrideURL", url).dump_xml(writer, inner_cipher)?;
        }
        if let Some(quality_check) = self.quality_check {
            SimpleTag("QualityCheck", quality_check).dump_xml(writer, inner_cipher)?;
        }

        let tags = self.tags.join(";");
        SimpleTag("Tags", &tags).dump_xml(writer, inner_cipher)?;

        self.times.dump_xml(writer, inner_cipher)?;
        self.custom_data.dump_xml(writer, inner_cipher)?;

        if let Some(ref autotype) = self.autotype {
            autotype.dump_xml(writer, inner_cipher)?;
        }

        let mut field_names: Vec<&String> = self.fields.keys().collect();
        field_names.sort();

        for key in field_names {
            let value = &self.fields[key];
            match value {
                Value::Bytes(bytes) => {
                    // References a shared attachment in the database's binary pool by index.
                    writer.write_event(Event::Start(BytesStart::new("Binary")))?;
                    SimpleTag("Key", key).dump_xml(writer, inner_cipher)?;

                    let identifier = String::from_utf8_lossy(bytes).into_owned();
                    let mut value_start = BytesStart::new("Value");
                    value_start.push_attribute(("Ref", identifier.as_str()));
                    writer.write_event(Event::Start(value_start))?;
                    writer.write_event(Event::End(BytesEnd::new("Value")))?;

                    writer.write_event(Event::End(BytesEnd::new("Binary")))?;
                }
                _ => {
                    writer.write_event(Event::Start(BytesStart::new("String")))?;
                    SimpleTag("Key", key).dump_xml(writer, inner_cipher)?;
                    value.dump_xml(writer, inner_cipher)?;
                    writer.write_event(Event::End(BytesEnd::new("String")))?;
                }
            }
        }

        if let Some(ref history) = self.history {
            history.dump_xml(writer, inner_cipher)?;
        }

        writer.write_event(Event::End(BytesEnd::new("Entry")))?;

        Ok(())
    }
}

impl DumpXml for Value {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        match self {
            Value::Bytes(_) => unreachable!("Bytes values are dumped as Binary fields, not String values"),
            Value::Unprotected(s) => {
                writer.write_event(Event::Start(BytesStart::new("Value")))?;
                write_text(writer, s)?;
                writer.write_event(Event::End(BytesEnd::new("Value")))?;
            }
            Value::Protected(p) => {
                let mut start = BytesStart::new("Value");
                start.push_attribute(("Protected", "True"));
                writer.write_event(Event::Start(start))?;

                let encrypted = inner_cipher.encrypt(p.expose());
                let b64 = base64_engine::STANDARD.encode(&encrypted);
                write_text(writer, &b64)?;

                writer.write_event(Event::End(BytesEnd::new("Value")))?;
            }
        }

        Ok(())
    }
}

impl DumpXml for AutoType {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("AutoType")))?;

        SimpleTag("Enabled", self.enabled).dump_xml(writer, inner_cipher)?;
        if let Some(ref sequence) = self.sequence {
            SimpleTag("DefaultSequence", sequence).dump_xml(writer, inner_cipher)?;
        }
        for association in &self.associations {
            association.dump_xml(writer, inner_cipher)?;
        }

        writer.write_event(Event::End(BytesEnd::new("AutoType")))?;

        Ok(())
    }
}

impl DumpXml for AutoTypeAssociation {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("Association")))?;

        if let Some(ref window) = self.window {
            SimpleTag("Window", window).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref sequence) = self.sequence {
            SimpleTag("KeystrokeSequence", sequence).dump_xml(writer, inner_cipher)?;
        }

        writer.write_event(Event::End(BytesEnd::new("Association")))?;

        Ok(())
    }
}

impl DumpXml for History {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("History")))?;

        for entry in &self.entries {
            entry.dump_xml(writer, inner_cipher)?;
        }

        writer.write_event(Event::End(BytesEnd::new("History")))?;

        Ok(())
    }
}
