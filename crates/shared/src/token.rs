//! Opaque token generation for participant identifiers and QR codes.

use rand::Rng;

/// Length of every generated token.
pub const TOKEN_LENGTH: usize = 8;

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random token of [`TOKEN_LENGTH`] upper-case alphanumeric characters.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Generates a token that `is_taken` does not reject.
///
/// Collisions are vanishingly rare (36^8 space), so this normally returns on the
/// first draw.
pub fn generate_unique_token<F>(mut is_taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    loop {
        let token = generate_token();
        if !is_taken(&token) {
            return token;
        }
    }
}
