use rand::Rng;

/// Characters used in join codes and referral codes. Uppercase alphanumerics
/// only, so codes survive being read aloud or typed on a phone.
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random code of the given length from [`CODE_CHARSET`].
///
/// Uniqueness is not guaranteed here; issuers check the generated code
/// against existing ones and retry on collision.
pub(crate) fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::generate_code;

    #[test]
    fn codes_have_requested_length_and_charset() {
        let code = generate_code(8);
        assert_eq!(code.len(), 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
