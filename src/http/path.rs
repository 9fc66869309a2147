//! Percent-encoding for URL path segments

/// Encode one path segment; unreserved characters pass through
pub fn encode_segment(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(char::from(byte));
            }
            _ => result.push_str(&format!("%{byte:02X}")),
        }
    }
    result
}

/// Decode `%XX` escapes. `None` for truncated escapes or non-UTF-8 results.
///
/// `+` is left alone; it only means space in form bodies.
pub fn decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("scene.glb"), "scene.glb");
        assert_eq!(encode_segment("my model (1).obj"), "my%20model%20%281%29.obj");
        assert_eq!(encode_segment("café.png"), "caf%C3%A9.png");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("my%20model.obj").as_deref(), Some("my model.obj"));
        assert_eq!(decode("caf%c3%a9.png").as_deref(), Some("café.png"));
        assert_eq!(decode("a+b").as_deref(), Some("a+b"));
        assert_eq!(decode("%2e%2e").as_deref(), Some(".."));
    }

    #[test]
    fn test_decode_rejects_bad_escapes() {
        assert_eq!(decode("bad%2"), None);
        assert_eq!(decode("bad%zz"), None);
        assert_eq!(decode("%ff%fe"), None);
    }
}
