//! Identifier generation for Marketo elements

use super::error::RewriteError;
use uuid::Uuid;

/// Produces `id`/`mktoname` values such as `QX1`, `QX2`, ...
///
/// A generator lives for a single rewrite call. The rewriter uses one for
/// sections and one for image/text tags; their prefixes always differ so the
/// two sequences cannot collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGenerator {
    prefix: String,
    next: usize,
}

impl IdGenerator {
    /// Create a generator with a fixed prefix of two uppercase ASCII letters
    pub fn new(prefix: &str) -> Result<Self, RewriteError> {
        if prefix.len() != 2 || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(RewriteError::InvalidPrefix(prefix.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            next: 1,
        })
    }

    /// Create a generator with a random prefix
    pub fn random() -> Self {
        Self {
            prefix: random_prefixes().0,
            next: 1,
        }
    }

    /// Create a generator whose random prefix differs from `other`
    pub fn random_excluding(other: &str) -> Self {
        let (first, second) = random_prefixes();
        let prefix = if first != other { first } else { second };
        Self { prefix, next: 1 }
    }

    /// The letter prefix of every generated id
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Return the next id and advance the counter
    pub fn next_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Two distinct random prefixes drawn from one v4 UUID
fn random_prefixes() -> (String, String) {
    let bytes = Uuid::new_v4().into_bytes();
    let letter = |b: u8| char::from(b'A' + b % 26);

    let first: String = [letter(bytes[0]), letter(bytes[1])].iter().collect();
    let mut second: String = [letter(bytes[2]), letter(bytes[3])].iter().collect();
    if second == first {
        // Rotate the last letter so the pair is always distinct
        let rotated = letter(bytes[3].wrapping_add(1));
        second = [letter(bytes[2]), rotated].iter().collect();
    }

    (first, second)
}
