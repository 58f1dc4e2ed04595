use crate::{
    xml_db::parse::{parse_uuid, FromXml, SimpleTag, SimpleXmlEvent, XmlParseError},
    Entry, Group, Node, Times,
};

impl FromXml for Group {
    type Parses = Self;

    fn from_xml<I: Iterator<Item = super::SimpleXmlEvent>>(
        iterator: &mut std::iter::Peekable<I>,
        inner_cipher: &mut dyn crate::crypt::ciphers::Cipher,
    ) -> Result<Self::Parses, super::XmlParseError> {
        let open_tag = iterator.next().ok_or(XmlParseError::Eof)?;
        if !matches!(open_tag, SimpleXmlEvent::Start(ref tag, _) if tag == "Group") {
            return Err(XmlParseError::BadEvent {
                expected: "Open Group tag",
                event: open_tag,
            });
        }

        let mut out = Self::default();

        while let Some(event) = iterator.peek() {
            match event {
                SimpleXmlEvent::Start(name, _) => match &name[..] {
                    "UUID" => {
                        let raw = SimpleTag::<String>::from_xml(iterator, inner_cipher)?.value;
                        out.uuid = parse_uuid(&raw)?;
                    }
                    "Name" => {
                        out.name = SimpleTag::<String>::from_xml(iterator, inner_cipher)?.value;
                    }
                    "Notes" => {
                        out.notes =
                            SimpleTag::<Option<String>>::from_xml(iterator, inner_cipher)?.value;
                    }
                    "IconID" => {
                        out.icon_id =
                            Some(SimpleTag::<usize>::from_xml(iterator, inner_cipher)?.value);
                    }
                    "CustomIconUUID" => {
                        let raw = SimpleTag::<String>::from_xml(iterator, inner_cipher)?.value;
                        out.custom_icon_uuid = Some(parse_uuid(&raw)?);
                    }
                    "Times" => {
                        out.times = Times::from_xml(iterator, inner_cipher)?;
                    }
                    "IsExpanded" => {
                        out.is_expanded = SimpleTag::<bool>::from_xml(iterator, inner_cipher)?.value;
                    }
                    "DefaultAutoTypeSequence" => {
                        out.default_autotype_sequence =
                            SimpleTag::<Option<String>>::from_xml(iterator, inner_cipher)?.value;
                    }
                    "EnableAutoType" => {
                        out.enable_autotype =
                            SimpleTag::<Option<String>>::from_xml(iterator, inner_cipher)?.value;
                    }
                    "EnableSearching" => {
                        out.enable_searching =
                            SimpleTag::<Option<String>>::from_xml(iterator, inner_cipher)?.value;
                    }
                    "LastTopVisibleEntry" => {
                        let raw =
                            SimpleTag::<Option<String>>::from_xml(iterator, inner_cipher)?.value;
                        out.last_top_visible_entry = raw.map(|s| parse_uuid(&s)).transpose()?;
                    }
                    "CustomData" => {
                        out.custom_data =
                            crate::xml_db::parse::CustomData::from_xml(iterator, inner_cipher)?;
                    }
                    "Entry" => {
                        let entry = Entry::from_xml(iterator, inner_cipher)?;
                        out.children.push(Node::Entry(entry));
                    }
                    "Group" => {
                        let group = Group::from_xml(iterator, inner_cipher)?;
                        out.children.push(Node::Group(group));
                    }
                    _ => {
                        return Err(XmlParseError::BadEvent {
                            expected: "valid Group child",
                            event: event.clone(),
                        })
                    }
                },
                SimpleXmlEvent::End(name) if name == "Group" => break,
                _ => {
                    return Err(XmlParseError::BadEvent {
                        expected: "start tag or close Group",
                        event: event.clone(),
                    })
                }
            }
        }

        let close_tag = iterator.next().ok_or(XmlParseError::Eof)?;
        if !matches!(close_tag, SimpleXmlEvent::End(ref tag) if tag == "Group") {
            return Err(XmlParseError::BadEvent {
                expected: "Close Group tag",
                event: close_tag,
            });
        }

        Ok(out)
    }
}
