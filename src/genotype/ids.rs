//! Content-addressed identifiers for anonymous genotype parts.
//!
//! VSLC, GVC, and effective-genotype nodes have no upstream accession, so
//! their identifiers are derived from the identifiers of their parts.  The
//! same parts in the same order always produce the same identifier, which is
//! what lets repeated construction across rows and files collapse onto one
//! node.

use md5::{Digest, Md5};

/// Prefix marking identifiers minted by this worker rather than sourced
/// from an upstream database.
pub const ID_PREFIX: &str = "MONARCH";

/// Make a content-addressed identifier from the given parts.
///
/// The parts are joined with `-` and hashed; callers are responsible for
/// passing them in the order their call site requires (see [`make_id_sorted`]
/// for an order-independent variant).  Any input is valid, including the
/// empty slice.
pub fn make_id(parts: &[&str]) -> String {
    hash_joined(&parts.join("-"))
}

/// Make a content-addressed identifier independent of part order.
///
/// Sorts the parts before joining, so permutations of the same set yield the
/// same identifier.
pub fn make_id_sorted(parts: &[&str]) -> String {
    let mut sorted = parts.to_vec();
    sorted.sort_unstable();
    hash_joined(&sorted.join("-"))
}

fn hash_joined(joined: &str) -> String {
    let digest = Md5::digest(joined.as_bytes());
    format!(
        "{}:{}",
        ID_PREFIX,
        base16ct::lower::encode_string(digest.as_slice())
    )
}
