//! Depositor notes and the values derived from them.
//!
//! A note is a random secret. Its commitment is inserted into the trees and
//! its nullifier is revealed on withdrawal. Both are one-way functions of the
//! secret under different domains, so a spent nullifier cannot be linked back
//! to the leaf it came from.

use std::fmt;

use secrecy::{ExposeSecret as _, SecretBox};
use zkb_core::base::{FIELD_SIZE, Field};
use zkb_tree::Hasher;

/// Size of a note secret. One byte short of a field element so it always
/// fits below the field modulus.
pub const SECRET_SIZE: usize = 31;

const SECRET_OFFSET: usize = 1;

/// Domain separator for commitments.
pub const COMMITMENT_DOMAIN: Field = Field::from_u64(0x636f_6d6d_6974); // "commit"

/// Domain separator for nullifiers.
pub const NULLIFIER_DOMAIN: Field = Field::from_u64(0x006e_756c_6c69_6679); // "nullify"

/// Embed a secret into a field element (big-endian, leading zero byte).
#[must_use]
pub fn secret_to_field(secret: &[u8; SECRET_SIZE]) -> Field {
    let mut bytes = [0_u8; FIELD_SIZE];
    if let Some(tail) = bytes.get_mut(SECRET_OFFSET..) {
        tail.copy_from_slice(secret);
    }
    Field::new(bytes)
}

/// Commitment of a secret embedded with [`secret_to_field`].
#[must_use]
pub fn commitment_of<H: Hasher>(secret: &Field, hasher: &H) -> Field {
    hasher.hash2(secret, &COMMITMENT_DOMAIN)
}

/// Nullifier of a secret embedded with [`secret_to_field`].
#[must_use]
pub fn nullifier_of<H: Hasher>(secret: &Field, hasher: &H) -> Field {
    hasher.hash2(secret, &NULLIFIER_DOMAIN)
}

/// A depositor's private note.
pub struct Note {
    secret: SecretBox<[u8; SECRET_SIZE]>,
}

impl Note {
    /// Draw a fresh random note.
    #[must_use]
    pub fn random() -> Self {
        Self::from_secret(rand::random())
    }

    /// Wrap existing secret bytes.
    #[must_use]
    pub fn from_secret(secret: [u8; SECRET_SIZE]) -> Self {
        Self {
            secret: SecretBox::new(Box::new(secret)),
        }
    }

    /// The raw secret bytes.
    #[must_use]
    pub fn expose_secret(&self) -> &[u8; SECRET_SIZE] {
        self.secret.expose_secret()
    }

    /// The secret as a field element.
    #[must_use]
    pub fn secret_field(&self) -> Field {
        secret_to_field(self.expose_secret())
    }

    /// The commitment to insert into the tree.
    #[must_use]
    pub fn commitment<H: Hasher>(&self, hasher: &H) -> Field {
        commitment_of(&self.secret_field(), hasher)
    }

    /// The nullifier revealed on withdrawal.
    #[must_use]
    pub fn nullifier<H: Hasher>(&self, hasher: &H) -> Field {
        nullifier_of(&self.secret_field(), hasher)
    }
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use zkb_tree::Sha256Hasher;

    use super::*;

    #[test]
    fn secret_embedding_keeps_leading_zero() {
        let field = secret_to_field(&[0xff; SECRET_SIZE]);
        let bytes = field.to_bytes();
        assert_eq!(bytes.first(), Some(&0));
        assert!(bytes.iter().skip(1).all(|b| *b == 0xff));
    }

    #[test]
    fn commitment_and_nullifier_differ() {
        let note = Note::from_secret([7; SECRET_SIZE]);
        let commitment = note.commitment(&Sha256Hasher);
        let nullifier = note.nullifier(&Sha256Hasher);
        assert_ne!(commitment, nullifier);
        assert_eq!(
            commitment,
            commitment_of(&note.secret_field(), &Sha256Hasher)
        );
        assert_eq!(nullifier, nullifier_of(&note.secret_field(), &Sha256Hasher));
    }

    #[test]
    fn random_notes_are_distinct() {
        let a = Note::random();
        let b = Note::random();
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn debug_hides_secret() {
        let note = Note::from_secret([0xab; SECRET_SIZE]);
        assert!(!format!("{note:?}").contains("ab"));
    }
}
