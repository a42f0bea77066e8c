// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation abstractions.
//!
//! Object ids are SHA-256 hashes and come from the object store; every
//! other id (relations, sessions) is generated here so tests can swap in
//! a deterministic generator.

/// Alphabet for generated suffixes: lowercase alphanumerics, so ids stay
/// shell- and path-safe.
const SUFFIX_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Length of generated id suffixes.
pub const SUFFIX_LEN: usize = 5;

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Generator for random id suffixes.
pub trait IdGen: Send + Sync {
    fn suffix(&self) -> String;
}

/// Production generator backed by nanoid.
#[derive(Clone, Default)]
pub struct NanoIdGen;

impl IdGen for NanoIdGen {
    fn suffix(&self) -> String {
        nanoid::nanoid!(SUFFIX_LEN, &SUFFIX_ALPHABET)
    }
}

/// Deterministic sequential generator for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct SeqIdGen(std::sync::atomic::AtomicU64);

#[cfg(any(test, feature = "test-support"))]
impl SeqIdGen {
    pub fn new() -> Self {
        Self(std::sync::atomic::AtomicU64::new(0))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for SeqIdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl IdGen for SeqIdGen {
    fn suffix(&self) -> String {
        let n = self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("{:05}", n)
    }
}

/// Build a relation id slug from its type and name.
///
/// With a generator, appends a random suffix (`tool-log-scan-x7k2q`).
/// Without one, the slug is deterministic (`tool-view-log-scan`), which is
/// what auto-spawned relations use: the id doubles as the idempotence key.
pub fn relation_slug(relation_type: &str, name: &str, gen: Option<&dyn IdGen>) -> String {
    let mut slug = String::with_capacity(relation_type.len() + name.len() + SUFFIX_LEN + 2);
    push_slugged(&mut slug, relation_type);
    slug.push('-');
    push_slugged(&mut slug, name);
    if let Some(gen) = gen {
        slug.push('-');
        slug.push_str(&gen.suffix());
    }
    slug
}

/// Append `s` lowercased with runs of non-alphanumerics collapsed to `-`.
fn push_slugged(out: &mut String, s: &str) {
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
