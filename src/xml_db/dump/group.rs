use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::writer::Writer;

use crate::{
    crypt::ciphers::Cipher,
    xml_db::{
        dump::{DumpXml, SimpleTag},
        parse::XmlParseError,
    },
    Group, Node,
};

impl DumpXml for Group {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("Group")))?;

        SimpleTag("UUID", &self.uuid).dump_xml(writer, inner_cipher)?;
        SimpleTag("Name", &self.name).dump_xml(writer, inner_cipher)?;

        if let Some(ref notes) = self.notes {
            SimpleTag("Notes", notes).dump_xml(writer, inner_cipher)?;
        }
        if let Some(icon_id) = self.icon_id {
            SimpleTag("IconID", icon_id).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref uuid) = self.custom_icon_uuid {
            SimpleTag("CustomIconUUID", uuid).dump_xml(writer, inner_cipher)?;
        }

        self.times.dump_xml(writer, inner_cipher)?;

        SimpleTag("IsExpanded", self.is_expanded).dump_xml(writer, inner_cipher)?;

        if let Some(ref sequence) = self.default_autotype_sequence {
            SimpleTag("DefaultAutoTypeSequence", sequence).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref enable) = self.enable_autotype {
            SimpleTag("EnableAutoType", enable).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref enable) = self.enable_searching {
            SimpleTag("EnableSearching", enable).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref uuid) = self.last_top_visible_entry {
            SimpleTag("LastTopVisibleEntry", uuid).dump_xml(writer, inner_cipher)?;
        }

        self.custom_data.dump_xml(writer, inner_cipher)?;

        for child in &self.children {
            child.dump_xml(writer, inner_cipher)?;
        }

        writer.write_event(Event::End(BytesEnd::new("Group")))?;

        Ok(())
    }
}

impl DumpXml for Node {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        match self {
            Node::Group(g) => g.dump_xml(writer, inner_cipher),
            Node::Entry(e) => e.dump_xml(writer, inner_cipher),
        }
    }
}
