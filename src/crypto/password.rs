//! Passwords and the per-session password cache.

use zeroize::Zeroizing;

/// A password for encrypted entries.
///
/// The text is wiped from memory on drop. Both ZIP ciphers consume the
/// UTF-8 bytes of the password.
#[derive(Clone)]
pub struct Password {
    inner: Zeroizing<String>,
}

impl Password {
    /// Creates a new password from a string.
    pub fn new<S: Into<String>>(password: S) -> Self {
        Self {
            inner: Zeroizing::new(password.into()),
        }
    }

    /// Returns the password as a string slice.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Returns the bytes fed to key setup.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Returns true if the password is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the length of the password in characters.
    pub fn len(&self) -> usize {
        self.inner.chars().count()
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Password {}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose the actual password in debug output
        f.debug_struct("Password")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Password {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Passwords accepted so far, tried in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PasswordCache {
    passwords: Vec<Password>,
}

impl PasswordCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `password` unless an equal one is cached.
    ///
    /// Returns `true` if it was added.
    pub fn insert(&mut self, password: Password) -> bool {
        if self.passwords.contains(&password) {
            return false;
        }
        self.passwords.push(password);
        true
    }

    /// Cached passwords in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Password> {
        self.passwords.iter()
    }

    /// Number of cached passwords.
    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }
}
