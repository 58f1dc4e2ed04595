use cipher::BlockEncryptMut;
use cipher::{
    block_padding::{Pkcs7, UnpadError},
    generic_array::GenericArray,
    BlockDecryptMut, InvalidLength, KeyIvInit, StreamCipher,
};

/// A cipher usable for either the outer (block, CBC, IV-keyed) or inner (stream,
/// fixed-IV) encryption this format needs.
pub(crate) trait Cipher {
    fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8>;
    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, UnpadError>;

    /// The number of bytes expected by the cipher as an initialization vector.
    fn iv_size() -> usize
    where
        Self: Sized;

    /// The number of bytes expected by the cipher as a key.
    fn key_size() -> usize
    where
        Self: Sized;
}

pub(crate) struct AES256Cipher {
    encryptor: cbc::Encryptor<aes::Aes256>,
    decryptor: cbc::Decryptor<aes::Aes256>,
}

impl AES256Cipher {
    pub(crate) fn new(key: &[u8], iv: &[u8]) -> Result<Self, InvalidLength> {
        Ok(AES256Cipher {
            encryptor: cipher::KeyIvInit::new_from_slices(key, iv)?,
            decryptor: cipher::KeyIvInit::new_from_slices(key, iv)?,
        })
    }
}

impl Cipher for AES256Cipher {
    fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        self.encryptor.clone().encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, UnpadError> {
        let mut out = vec![0; ciphertext.len()];

        let len = self
            .decryptor
            .clone()
            .decrypt_padded_b2b_mut::<Pkcs7>(ciphertext, &mut out)?
            .len();

        out.truncate(len);

        Ok(out)
    }

    fn iv_size() -> usize {
        16
    }

    fn key_size() -> usize {
        32
    }
}

pub(crate) struct TwofishCipher {
    encryptor: cbc::Encryptor<twofish::Twofish>,
    decryptor: cbc::Decryptor<twofish::Twofish>,
}

impl TwofishCipher {
    pub(crate) fn new(key: &[u8], iv: &[u8]) -> Result<Self, InvalidLength> {
        Ok(TwofishCipher {
            encryptor: KeyIvInit::new_from_slices(key, iv)?,
            decryptor: KeyIvInit::new_from_slices(key, iv)?,
        })
    }
}

impl Cipher for TwofishCipher {
    fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        self.encryptor.clone().encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, UnpadError> {
        let mut buf = ciphertext.to_vec();
        let len = self.decryptor.clone().decrypt_padded_mut::<Pkcs7>(&mut buf)?.len();
        buf.truncate(len);
        Ok(buf)
    }

    fn iv_size() -> usize {
        16
    }

    fn key_size() -> usize {
        32
    }
}

/// The inner stream protector (spec §4.D): Salsa20 keyed by the SHA-256 of
/// `ProtectedStreamKey`, with the fixed IV this format always uses rather than a
/// per-database nonce.
pub(crate) struct Salsa20Cipher {
    cipher: salsa20::Salsa20,
}

impl Salsa20Cipher {
    pub(crate) fn new(key: &[u8]) -> Result<Self, InvalidLength> {
        let key = GenericArray::from_slice(key);
        let iv = GenericArray::from([0xE8, 0x30, 0x09, 0x4B, 0x97, 0x20, 0x5D, 0x2A]);

        Ok(Salsa20Cipher {
            cipher: KeyIvInit::new(key, &iv),
        })
    }
}

impl Cipher for Salsa20Cipher {
    fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::from(plaintext);
        self.cipher.apply_keystream(&mut buffer);
        buffer
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, UnpadError> {
        let mut buffer = Vec::from(ciphertext);
        self.cipher.apply_keystream(&mut buffer);
        Ok(buffer)
    }

    fn iv_size() -> usize {
        32
    }

    fn key_size() -> usize {
        32
    }
}

pub(crate) struct PlainCipher;
impl PlainCipher {
    pub(crate) fn new(_: &[u8]) -> Result<Self, InvalidLength> {
        Ok(PlainCipher)
    }
}
impl Cipher for PlainCipher {
    fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        Vec::from(plaintext)
    }
    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, UnpadError> {
        Ok(Vec::from(ciphertext))
    }

    fn iv_size() -> usize {
        1
    }

    fn key_size() -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes256_round_trips() {
        let key = [1u8; 32];
        let iv = [2u8; 16];
        let mut enc = AES256Cipher::new(&key, &iv).unwrap();
        let mut dec = AES256Cipher::new(&key, &iv).unwrap();

        let plaintext = b"a entry password value";
        let ciphertext = enc.encrypt(plaintext);
        assert_eq!(dec.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn twofish_round_trips() {
        let key = [5u8; 32];
        let iv = [6u8; 16];
        let mut enc = TwofishCipher::new(&key, &iv).unwrap();
        let mut dec = TwofishCipher::new(&key, &iv).unwrap();

        let plaintext = b"another value, longer than one block to exercise CBC chaining";
        let ciphertext = enc.encrypt(plaintext);
        assert_eq!(dec.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn salsa20_is_a_symmetric_keystream() {
        let key = [9u8; 32];
        let mut enc = Salsa20Cipher::new(&key).unwrap();
        let mut dec = Salsa20Cipher::new(&key).unwrap();

        let plaintext = b"protected field value";
        let ciphertext = enc.encrypt(plaintext);
        assert_ne!(ciphertext, plaintext);
        assert_eq!(dec.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn plain_cipher_is_identity() {
        let mut cipher = PlainCipher::new(&[]).unwrap();
        assert_eq!(cipher.decrypt(b"abc").unwrap(), b"abc");
    }
}
