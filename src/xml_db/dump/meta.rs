use base64::{engine::general_purpose as base64_engine, Engine as _};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::writer::Writer;

use crate::{
    compression::{Compression, GZipCompression},
    crypt::ciphers::Cipher,
    xml_db::{
        dump::{write_text, DumpXml, SimpleTag},
        parse::XmlParseError,
    },
    Meta,
};

impl DumpXml for Meta {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("Meta")))?;

        SimpleTag("Generator", self.generator.as_deref().unwrap_or("keepass-rs")).dump_xml(writer, inner_cipher)?;

        if let Some(ref v) = self.database_name {
            SimpleTag("DatabaseName", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.database_name_changed {
            SimpleTag("DatabaseNameChanged", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.database_description {
            SimpleTag("DatabaseDescription", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.database_description_changed {
            SimpleTag("DatabaseDescriptionChanged", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.default_username {
            SimpleTag("DefaultUserName", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.default_username_changed {
            SimpleTag("DefaultUserNameChanged", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(v) = self.maintenance_history_days {
            SimpleTag("MaintenanceHistoryDays", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.color {
            SimpleTag("Color", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.master_key_changed {
            SimpleTag("MasterKeyChanged", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(v) = self.master_key_change_rec {
            SimpleTag("MasterKeyChangeRec", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(v) = self.master_key_change_force {
            SimpleTag("MasterKeyChangeForce", v).dump_xml(writer, inner_cipher)?;
        }

        self.memory_protection.dump_xml(writer, inner_cipher)?;
        self.custom_icons.dump_xml(writer, inner_cipher)?;

        if let Some(v) = self.recyclebin_enabled {
            SimpleTag("RecycleBinEnabled", v).dump_xml(writer, inner_cipher)?;
        }
        SimpleTag("RecycleBinUUID", &self.recyclebin_uuid).dump_xml(writer, inner_cipher)?;
        if let Some(ref v) = self.recyclebin_changed {
            SimpleTag("RecycleBinChanged", v).dump_xml(writer, inner_cipher)?;
        }
        SimpleTag("EntryTemplatesGroup", &self.entry_templates_group).dump_xml(writer, inner_cipher)?;
        if let Some(ref v) = self.entry_templates_group_changed {
            SimpleTag("EntryTemplatesGroupChanged", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.last_selected_group {
            SimpleTag("LastSelectedGroup", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.last_top_visible_group {
            SimpleTag("LastTopVisibleGroup", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(v) = self.history_max_items {
            SimpleTag("HistoryMaxItems", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(v) = self.history_max_size {
            SimpleTag("HistoryMaxSize", v).dump_xml(writer, inner_cipher)?;
        }
        if let Some(ref v) = self.settings_changed {
            SimpleTag("SettingsChanged", v).dump_xml(writer, inner_cipher)?;
        }

        self.binaries.dump_xml(writer, inner_cipher)?;
        self.custom_data.dump_xml(writer, inner_cipher)?;

        writer.write_event(Event::End(BytesEnd::new("Meta")))?;

        Ok(())
    }
}

impl DumpXml for crate::db::meta::MemoryProtection {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("MemoryProtection")))?;

        SimpleTag("ProtectTitle", self.protect_title).dump_xml(writer, inner_cipher)?;
        SimpleTag("ProtectUserName", self.protect_username).dump_xml(writer, inner_cipher)?;
        SimpleTag("ProtectPassword", self.protect_password).dump_xml(writer, inner_cipher)?;
        SimpleTag("ProtectURL", self.protect_url).dump_xml(writer, inner_cipher)?;
        SimpleTag("ProtectNotes", self.protect_notes).dump_xml(writer, inner_cipher)?;

        writer.write_event(Event::End(BytesEnd::new("MemoryProtection")))?;

        Ok(())
    }
}

impl DumpXml for crate::db::meta::CustomIcons {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("CustomIcons")))?;

        for icon in &self.icons {
            icon.dump_xml(writer, inner_cipher)?;
        }

        writer.write_event(Event::End(BytesEnd::new("CustomIcons")))?;

        Ok(())
    }
}

impl DumpXml for crate::db::meta::Icon {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("Icon")))?;

        SimpleTag("UUID", &self.uuid).dump_xml(writer, inner_cipher)?;

        let b64 = base64_engine::STANDARD.encode(&self.data);
        SimpleTag("Data", &b64).dump_xml(writer, inner_cipher)?;

        writer.write_event(Event::End(BytesEnd::new("Icon")))?;

        Ok(())
    }
}

impl DumpXml for crate::db::meta::BinaryAttachments {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        writer.write_event(Event::Start(BytesStart::new("Binaries")))?;

        for attachment in &self.attachments {
            attachment.dump_xml(writer, inner_cipher)?;
        }

        writer.write_event(Event::End(BytesEnd::new("Binaries")))?;

        Ok(())
    }
}

impl DumpXml for crate::db::meta::BinaryAttachment {
    fn dump_xml<E: std::io::Write>(&self, writer: &mut Writer<E>, _inner_cipher: &mut dyn Cipher) -> Result<(), XmlParseError> {
        let mut start = BytesStart::new("Binary");
        if let Some(ref id) = self.identifier {
            start.push_attribute(("ID", id.as_str()));
        }
        if self.compressed {
            start.push_attribute(("Compressed", "True"));
        }
        writer.write_event(Event::Start(start))?;

        let content = if self.compressed {
            GZipCompression.compress(&self.content).map_err(XmlParseError::Compression)?
        } else {
            self.content.clone()
        };
        let b64 = base64_engine::STANDARD.encode(&content);
        write_text(writer, &b64)?;

        writer.write_event(Event::End(BytesEnd::new("Binary")))?;

        Ok(())
    }
}
