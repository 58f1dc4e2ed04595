use std::io::Read;

use base64::{engine::general_purpose as base64_engine, Engine as _};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypt::calculate_sha256;
use crate::error::CryptographyError;

pub type KeyElement = Vec<u8>;

/// A KeePass keyfile can carry its key either as the raw XML-wrapped value, as a
/// legacy 32-byte binary blob, or as an arbitrary file to be hashed wholesale.
fn parse_xml_keyfile(xml: &[u8]) -> Result<KeyElement, ParseXmlKeyfileError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut tag_stack: Vec<String> = Vec::new();
    let mut key_version: Option<String> = None;
    let mut key_value: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                tag_stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::End(_) => {
                tag_stack.pop();
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                if tag_stack == ["KeyFile", "Meta", "Version"] {
                    key_version = Some(text);
                } else if tag_stack == ["KeyFile", "Key", "Data"] {
                    key_value = Some(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let key_value = key_value.ok_or(ParseXmlKeyfileError::EmptyKey)?;
    let key_bytes = key_value.as_bytes().to_vec();

    if key_version.as_deref() == Some("2.0") {
        let trimmed_key = key_value.trim().replace(' ', "").replace(['\n', '\r'], "");

        return if let Ok(key) = hex::decode(&trimmed_key) {
            Ok(key)
        } else {
            Ok(key_bytes)
        };
    }

    if let Ok(key) = base64_engine::STANDARD.decode(&key_bytes) {
        Ok(key)
    } else {
        Ok(key_bytes)
    }
}

#[derive(Error, Debug)]
pub enum ParseXmlKeyfileError {
    #[error("Error parsing keyfile XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Empty key in XML keyfile")]
    EmptyKey,
}

fn parse_keyfile(buffer: &[u8]) -> Result<KeyElement, ParseXmlKeyfileError> {
    // try to parse the buffer as XML, if successful, use that data instead of full file
    if let Ok(v) = parse_xml_keyfile(buffer) {
        Ok(v)
    } else if buffer.len() == 32 {
        // legacy binary key format
        Ok(buffer.to_vec())
    } else {
        Ok(calculate_sha256(&[buffer])
            .map_err(|_| ParseXmlKeyfileError::EmptyKey)?
            .as_slice()
            .to_vec())
    }
}

/// A KeePass key, which might consist of a password and/or a keyfile
#[derive(Debug, Clone, Default, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct DatabaseKey {
    password: Option<String>,
    keyfile: Option<Vec<u8>>,
}

impl DatabaseKey {
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_keyfile(mut self, keyfile: &mut dyn Read) -> Result<Self, std::io::Error> {
        let mut buf = Vec::new();
        keyfile.read_to_end(&mut buf)?;

        self.keyfile = Some(buf);

        Ok(self)
    }

    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn get_key_elements(&self) -> Result<Vec<KeyElement>, GetKeyElementsError> {
        let mut out = Vec::new();

        if let Some(p) = &self.password {
            out.push(
                calculate_sha256(&[p.as_bytes()])
                    .map_err(|_| GetKeyElementsError::EmptyKey)?
                    .to_vec(),
            );
        }

        if let Some(ref f) = self.keyfile {
            out.push(parse_keyfile(f)?);
        }

        if out.is_empty() {
            return Err(GetKeyElementsError::EmptyKey);
        }

        Ok(out)
    }

    /// Returns true if the database key is not associated with any key component.
    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.keyfile.is_none()
    }
}

#[derive(Error, Debug)]
pub enum GetKeyElementsError {
    #[error("Invalid key - no key elements")]
    EmptyKey,

    #[error("Error parsing keyfile: {0}")]
    Keyfile(#[from] ParseXmlKeyfileError),

    #[error(transparent)]
    Cryptography(#[from] CryptographyError),
}

#[cfg(test)]
mod key_tests {
    use super::DatabaseKey;

    #[test]
    fn test_key() {
        let ke = DatabaseKey::new().with_password("asdf").get_key_elements().unwrap();
        assert_eq!(ke.len(), 1);

        let ke = DatabaseKey::new()
            .with_keyfile(&mut "bare-key-file".as_bytes())
            .unwrap()
            .get_key_elements()
            .unwrap();
        assert_eq!(ke.len(), 1);

        let ke = DatabaseKey::new()
            .with_keyfile(&mut "0123456789ABCDEF0123456789ABCDEF".as_bytes())
            .unwrap()
            .get_key_elements()
            .unwrap();
        assert_eq!(ke.len(), 1);

        let ke = DatabaseKey::new()
            .with_password("asdf")
            .with_keyfile(&mut "bare-key-file".as_bytes())
            .unwrap()
            .get_key_elements()
            .unwrap();
        assert_eq!(ke.len(), 2);

        let ke = DatabaseKey::new()
            .with_keyfile(&mut "<KeyFile><Key><Data>0123456789ABCDEF0123456789ABCDEF</Data></Key></KeyFile>".as_bytes())
            .unwrap()
            .get_key_elements()
            .unwrap();
        assert_eq!(ke.len(), 1);

        let xml_keyfile_v2 = r###"
            <?xml version="1.0" encoding="utf-8"?>
            <KeyFile>
                <Meta>
                    <Version>2.0</Version>
                </Meta>
                <Key>
                    <Data Hash="A65F0C2D">
                        36057B1C 35037FD9 62257893 C0A22403
                        EE3F8FBB 504D9981 08B821CB 00D28F89
                    </Data>
                </Key>
            </KeyFile>
        "###;
        let ke = DatabaseKey::new()
            .with_keyfile(&mut xml_keyfile_v2.trim().as_bytes())
            .unwrap()
            .get_key_elements()
            .unwrap();
        assert_eq!(ke.len(), 1);

        // other XML files will just be hashed as a "bare" keyfile
        let ke = DatabaseKey::new()
            .with_keyfile(&mut "<Not><A><KeyFile></KeyFile></A></Not>".as_bytes())
            .unwrap()
            .get_key_elements()
            .unwrap();
        assert_eq!(ke.len(), 1);

        assert!(DatabaseKey {
            password: None,
            keyfile: None,
        }
        .get_key_elements()
        .is_err());
    }
}
