//! Bearer token extraction from the Authorization header.

use axum::http::{HeaderMap, header};

use super::errors::AuthError;

/// Scheme prefix of the Authorization header.
pub const HEADER_PREFIX: &str = "Bearer ";

/// Strip the `Bearer ` prefix and return the raw token verbatim.
pub fn extract(header: &str) -> Result<&str, AuthError> {
    if header.trim().is_empty() {
        return Err(AuthError::MissingOrMalformedHeader);
    }

    let prefix = header
        .get(..HEADER_PREFIX.len())
        .ok_or(AuthError::MissingOrMalformedHeader)?;
    if !prefix.eq_ignore_ascii_case(HEADER_PREFIX) {
        return Err(AuthError::MissingOrMalformedHeader);
    }

    Ok(&header[HEADER_PREFIX.len()..])
}

/// Raw value of the Authorization header.
pub fn authorization_header(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingOrMalformedHeader)?
        .to_str()
        .map_err(|_| AuthError::MissingOrMalformedHeader)
}

/// Extract the bearer token from request headers.
pub fn extract_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    extract(authorization_header(headers)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_blank() {
        assert!(matches!(
            extract(""),
            Err(AuthError::MissingOrMalformedHeader)
        ));
        assert!(matches!(
            extract("   "),
            Err(AuthError::MissingOrMalformedHeader)
        ));
    }

    #[test]
    fn test_extract_shorter_than_prefix() {
        assert!(matches!(
            extract("Bear"),
            Err(AuthError::MissingOrMalformedHeader)
        ));
    }

    #[test]
    fn test_extract_other_scheme() {
        assert!(matches!(
            extract("Basic YWxpY2U6c2VjcmV0"),
            Err(AuthError::MissingOrMalformedHeader)
        ));
    }

    #[test]
    fn test_extract_keeps_remainder_verbatim() {
        assert_eq!(extract("bearer  padded ").unwrap(), " padded ");
    }

    #[test]
    fn test_extract_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(extract_from_headers(&headers).is_err());

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_from_headers(&headers).unwrap(), "abc.def.ghi");
    }
}
