mod entry;
mod group;
mod meta;

use std::io::Write as IoWrite;

use base64::{engine::general_purpose as base64_engine, Engine as _};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use uuid::Uuid;

use crate::{
    crypt::ciphers::Cipher,
    db::{Color, CustomData, CustomDataItem, Database, DeletedObject, DeletedObjects, Times},
    xml_db::{get_epoch_baseline, parse::XmlParseError},
};

/// Format a timestamp suitable for an XML database
pub fn format_xml_timestamp(timestamp: &chrono::NaiveDateTime) -> String {
    let timestamp = timestamp.and_utc().timestamp() - get_epoch_baseline().and_utc().timestamp();
    let timestamp_bytes = i64::to_le_bytes(timestamp);
    base64_engine::STANDARD.encode(timestamp_bytes)
}

pub(crate) fn dump(db: &Database, inner_cipher: &mut dyn Cipher) -> Result<Vec<u8>, XmlParseError> {
    let mut buf = Vec::new();
    let mut xml_writer = Writer::new(&mut buf);
    xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))?;

    db.dump_xml(&mut xml_writer, inner_cipher)?;

    Ok(buf)
}

/// A trait that denotes an inner KeePass database object can be stored into an XML database.
///
/// Using a `quick_xml::writer::Writer` and an inner cipher, emit a series of `Event`s to the
/// writer to build up the XML document.
pub(crate) trait DumpXml {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError>;

    fn normalize_empty_elements(&self) -> bool {
        false
    }
}

fn write_text<E: IoWrite>(writer: &mut Writer<E>, text: &str) -> Result<(), XmlParseError> {
    let escaped = quick_xml::escape::escape(text);
    writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
    Ok(())
}

impl DumpXml for &chrono::NaiveDateTime {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        write_text(writer, &format_xml_timestamp(self))
    }
}

impl DumpXml for bool {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        write_text(writer, if *self { "True" } else { "False" })
    }
}

impl DumpXml for usize {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        write_text(writer, &format!("{}", self))
    }
}

impl DumpXml for i64 {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        write_text(writer, &format!("{}", self))
    }
}

impl DumpXml for &str {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        write_text(writer, self)
    }

    fn normalize_empty_elements(&self) -> bool {
        self.is_empty()
    }
}

impl DumpXml for &String {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        write_text(writer, self)
    }

    fn normalize_empty_elements(&self) -> bool {
        self.is_empty()
    }
}

impl DumpXml for &Uuid {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        let b64 = base64_engine::STANDARD.encode(self.as_bytes());
        write_text(writer, &b64)
    }
}

impl DumpXml for &Color {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        write_text(writer, &self.to_string())
    }
}

/// Convenience type for simplified serialization of single-value elements.
struct SimpleTag<S: AsRef<str>, D: DumpXml>(S, D);

impl<S: AsRef<str>, D: DumpXml> DumpXml for SimpleTag<S, D> {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new(self.0.as_ref())))?;
        if !self.1.normalize_empty_elements() {
            self.1.dump_xml(writer, inner_cipher)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.0.as_ref())))?;
        Ok(())
    }
}

impl DumpXml for Database {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("KeePassFile")))?;

        self.meta.dump_xml(writer, inner_cipher)?;

        writer.write_event(Event::Start(BytesStart::new("Root")))?;

        self.root.dump_xml(writer, inner_cipher)?;

        self.deleted_objects.dump_xml(writer, inner_cipher)?;

        writer.write_event(Event::End(BytesEnd::new("Root")))?;

        writer.write_event(Event::End(BytesEnd::new("KeePassFile")))?;

        Ok(())
    }
}

impl DumpXml for Times {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("Times")))?;
        for (time_name, time) in &self.times {
            SimpleTag(time_name, time).dump_xml(writer, inner_cipher)?;
        }

        SimpleTag("Expires", self.expires).dump_xml(writer, inner_cipher)?;
        SimpleTag("UsageCount", self.usage_count).dump_xml(writer, inner_cipher)?;

        writer.write_event(Event::End(BytesEnd::new("Times")))?;

        Ok(())
    }
}

impl DumpXml for CustomData {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("CustomData")))?;

        for (key, item) in &self.items {
            writer.write_event(Event::Start(BytesStart::new("Item")))?;

            SimpleTag("Key", key).dump_xml(writer, inner_cipher)?;
            item.dump_xml(writer, inner_cipher)?;

            writer.write_event(Event::End(BytesEnd::new("Item")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("CustomData")))?;

        Ok(())
    }
}

impl DumpXml for CustomDataItem {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        if let Some(ref value) = self.value {
            value.dump_xml(writer, inner_cipher)?;
        }

        if let Some(ref value) = self.last_modification_time {
            SimpleTag("LastModificationTime", value).dump_xml(writer, inner_cipher)?;
        }

        Ok(())
    }
}

impl DumpXml for DeletedObjects {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("DeletedObjects")))?;

        for object in &self.objects {
            object.dump_xml(writer, inner_cipher)?;
        }

        writer.write_event(Event::End(BytesEnd::new("DeletedObjects")))?;
        Ok(())
    }
}

impl DumpXml for DeletedObject {
    fn dump_xml<E: IoWrite>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("DeletedObject")))?;

        SimpleTag("UUID", &self.uuid).dump_xml(writer, inner_cipher)?;
        SimpleTag("DeletionTime", &self.deletion_time).dump_xml(writer, inner_cipher)?;

        writer.write_event(Event::End(BytesEnd::new("DeletedObject")))?;
        Ok(())
    }
}
