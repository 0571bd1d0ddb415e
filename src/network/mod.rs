use std::fmt;

use percent_encoding::percent_decode;

/// A validated, non-empty key. Keys are opaque bytes and compared exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key(Vec<u8>);

impl Key {
    /// Returns `None` for the empty key.
    pub fn new(key: impl Into<Vec<u8>>) -> Option<Key> {
        let key = key.into();
        if key.is_empty() {
            None
        } else {
            Some(Key(key))
        }
    }

    /// Key as stored in the engine.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Lossy, for log lines only.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Request send by the client.
#[derive(Debug, PartialEq)]
pub enum Req {
    /// Liveness probe.
    Health,
    /// Set value for given key. A missing value is stored as empty string.
    Store(Key, Vec<u8>),
    /// Get value for given key.
    Retrieve(Key),
    /// Remove value for given key.
    Delete(Key),
    /// List every pair in the bucket.
    AllKeys,
}

/// Reason a request was turned away before reaching the engine.
#[derive(Debug, PartialEq)]
pub enum Rejection {
    /// The `key` parameter is absent or empty.
    MissingKey,
    /// No route matches the path.
    UnknownRoute,
    /// The route exists but not for this method.
    MethodNotAllowed,
}

impl Req {
    /// Parse a request from its method and request target, e.g.
    /// `GET /store?key=a&value=b`.
    pub fn parse(method: &str, target: &str) -> std::result::Result<Req, Rejection> {
        let (path, query) = match target.find('?') {
            Some(i) => (&target[..i], &target[i + 1..]),
            None => (target, ""),
        };

        let known = matches!(
            path,
            "/health" | "/store" | "/retrieve" | "/delete" | "/allKeys"
        );
        // HEAD is answered like GET, the http layer drops the body.
        if known && method != "GET" && method != "HEAD" {
            return Err(Rejection::MethodNotAllowed);
        }

        match path {
            "/health" => Ok(Req::Health),
            "/allKeys" => Ok(Req::AllKeys),
            "/store" => {
                let key = key_param(query)?;
                let value = param(query, "value").unwrap_or_default();
                Ok(Req::Store(key, value))
            }
            "/retrieve" => Ok(Req::Retrieve(key_param(query)?)),
            "/delete" => Ok(Req::Delete(key_param(query)?)),
            _ => Err(Rejection::UnknownRoute),
        }
    }
}

fn key_param(query: &str) -> std::result::Result<Key, Rejection> {
    param(query, "key")
        .and_then(Key::new)
        .ok_or(Rejection::MissingKey)
}

// First occurrence wins, later duplicates are ignored.
fn param(query: &str, name: &str) -> Option<Vec<u8>> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let (k, v) = match pair.find('=') {
                Some(i) => (&pair[..i], &pair[i + 1..]),
                None => (pair, ""),
            };
            if decode(k) == name.as_bytes() {
                Some(decode(v))
            } else {
                None
            }
        })
}

// Form decoding without any utf-8 interpretation: `+` is a space and `%XX`
// yields the raw byte.
fn decode(raw: &str) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .bytes()
        .map(|b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> Key {
        Key::new(k).unwrap()
    }

    #[test]
    fn parses_every_route() {
        assert_eq!(Req::parse("GET", "/health"), Ok(Req::Health));
        assert_eq!(Req::parse("GET", "/allKeys"), Ok(Req::AllKeys));
        assert_eq!(
            Req::parse("GET", "/store?key=a&value=1"),
            Ok(Req::Store(key("a"), b"1".to_vec()))
        );
        assert_eq!(Req::parse("GET", "/retrieve?key=a"), Ok(Req::Retrieve(key("a"))));
        assert_eq!(Req::parse("GET", "/delete?key=a"), Ok(Req::Delete(key("a"))));
    }

    #[test]
    fn missing_value_is_empty() {
        assert_eq!(
            Req::parse("GET", "/store?key=a"),
            Ok(Req::Store(key("a"), vec![]))
        );
        assert_eq!(
            Req::parse("GET", "/store?key=a&value="),
            Ok(Req::Store(key("a"), vec![]))
        );
    }

    #[test]
    fn missing_or_empty_key_is_rejected() {
        for target in &[
            "/store",
            "/store?value=1",
            "/store?key=&value=1",
            "/retrieve",
            "/retrieve?key=",
            "/delete?other=a",
        ] {
            assert_eq!(Req::parse("GET", target), Err(Rejection::MissingKey), "{}", target);
        }
    }

    #[test]
    fn decodes_query() {
        assert_eq!(
            Req::parse("GET", "/store?key=a%20b&value=x+y%3Az"),
            Ok(Req::Store(key("a b"), b"x y:z".to_vec()))
        );
        assert_eq!(
            Req::parse("GET", "/store?key=%2B&value=1%2B1"),
            Ok(Req::Store(key("+"), b"1+1".to_vec()))
        );
    }

    #[test]
    fn keeps_raw_bytes() {
        assert_eq!(
            Req::parse("GET", "/store?key=%FF&value=%FF"),
            Ok(Req::Store(Key::new(vec![0xFF]).unwrap(), vec![0xFF]))
        );
        assert_eq!(
            Req::parse("GET", "/retrieve?key=%FE"),
            Ok(Req::Retrieve(Key::new(vec![0xFE]).unwrap()))
        );
        assert_ne!(
            Req::parse("GET", "/retrieve?key=%FF"),
            Req::parse("GET", "/retrieve?key=%C0")
        );
    }

    #[test]
    fn head_is_served_like_get() {
        assert_eq!(Req::parse("HEAD", "/health"), Ok(Req::Health));
        assert_eq!(Req::parse("HEAD", "/retrieve?key=a"), Ok(Req::Retrieve(key("a"))));
    }

    #[test]
    fn ignores_unknown_and_duplicate_params() {
        assert_eq!(
            Req::parse("GET", "/retrieve?foo=bar&key=first&key=second"),
            Ok(Req::Retrieve(key("first")))
        );
    }

    #[test]
    fn rejects_unknown_paths_and_methods() {
        assert_eq!(Req::parse("GET", "/"), Err(Rejection::UnknownRoute));
        assert_eq!(Req::parse("GET", "/store/"), Err(Rejection::UnknownRoute));
        assert_eq!(Req::parse("GET", "/allkeys"), Err(Rejection::UnknownRoute));
        assert_eq!(
            Req::parse("POST", "/store?key=a"),
            Err(Rejection::MethodNotAllowed)
        );
    }
}
