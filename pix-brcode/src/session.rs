//! Session identifiers pairing an operator screen with its viewer

use rand::Rng;
use url::Url;

use crate::{Error, Result};

const SESSION_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a session id of the form `XXXX-XX`.
pub fn generate_session_id<R: Rng>(rng: &mut R) -> String {
    let mut id = String::with_capacity(7);
    for i in 0..6 {
        if i == 4 {
            id.push('-');
        }
        let idx = rng.gen_range(0..SESSION_ALPHABET.len());
        id.push(SESSION_ALPHABET[idx] as char);
    }
    id
}

/// Whether `s` has the `XXXX-XX` session id shape.
pub fn is_session_id(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 7
        && bytes.iter().enumerate().all(|(i, &b)| {
            if i == 4 {
                b == b'-'
            } else {
                SESSION_ALPHABET.contains(&b)
            }
        })
}

/// Link opened on the viewer device: `{origin}/session/{id}?mode=mobile`.
pub fn session_url(origin: &str, session_id: &str) -> Result<Url> {
    if !is_session_id(session_id) {
        return Err(Error::Config(format!("Invalid session id: {}", session_id)));
    }
    let mut url = Url::parse(origin)?;
    url.set_path(&format!("session/{}", session_id));
    url.set_query(Some("mode=mobile"));
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_ids_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let id = generate_session_id(&mut rng);
            assert!(is_session_id(&id), "{}", id);
        }
    }

    #[test]
    fn test_is_session_id() {
        assert!(is_session_id("AB12-C3"));
        assert!(!is_session_id("ab12-c3"));
        assert!(!is_session_id("AB12C3"));
        assert!(!is_session_id("AB12-C34"));
    }

    #[test]
    fn test_session_url() {
        let url = session_url("https://pix.example.com", "AB12-C3").unwrap();
        assert_eq!(
            url.as_str(),
            "https://pix.example.com/session/AB12-C3?mode=mobile"
        );

        let url = session_url("http://localhost:8080/dashboard?x=1", "ZZZZ-99").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/session/ZZZZ-99?mode=mobile");
    }

    #[test]
    fn test_session_url_errors() {
        assert!(matches!(
            session_url("https://pix.example.com", "nope"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            session_url("not a url", "AB12-C3"),
            Err(Error::UrlParse(_))
        ));
    }
}
