//! Svix-style webhook signature verification, as used by Clerk.
//!
//! The sender signs `"{id}.{timestamp}.{body}"` with HMAC-SHA256 and sends
//! one or more `v1,<base64>` tokens in the `svix-signature` header. The shared
//! secret looks like `whsec_<base64 key>`.
//!
//! Message age is not checked; a captured request can be replayed for as long
//! as the secret is valid.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// The only signature scheme accepted.
pub const SIGNATURE_VERSION: &str = "v1";

/// Decode the raw HMAC key from a `<prefix>_<base64>` secret.
///
/// Only the part after the first `_` is decoded. Returns `None` if there is
/// no separator or the payload is not valid base64.
pub fn signing_key(secret: &str) -> Option<Vec<u8>> {
  let (_prefix, payload) = secret.split_once('_')?;
  B64.decode(payload).ok()
}

/// The base64 signature a sender holding `key` would attach.
pub fn sign(key: &[u8], id: &str, timestamp: &str, body: &[u8]) -> String {
  let mut mac =
    <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
  mac.update(id.as_bytes());
  mac.update(b".");
  mac.update(timestamp.as_bytes());
  mac.update(b".");
  mac.update(body);
  B64.encode(mac.finalize().into_bytes())
}

/// Check `signature` (the raw header value) against `body` and the headers.
///
/// Fails closed: an empty secret or header, or a malformed secret, is a
/// rejection. Succeeds if any `v1` token matches, compared in constant time.
pub fn verify(
  body: &[u8],
  secret: &str,
  id: &str,
  timestamp: &str,
  signature: &str,
) -> bool {
  if secret.is_empty() || id.is_empty() || timestamp.is_empty() || signature.is_empty() {
    return false;
  }
  let Some(key) = signing_key(secret) else {
    return false;
  };

  let expected = sign(&key, id, timestamp, body);
  signature
    .split(' ')
    .filter_map(|token| token.split_once(','))
    .any(|(version, candidate)| {
      version == SIGNATURE_VERSION && bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  const KEY: &[u8] = b"MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
  const ID: &str = "msg_p5jXN8AQM9LWM0D4loKWxJek";
  const TS: &str = "1614265330";
  const BODY: &[u8] = br#"{"type":"user.created","data":{"id":"u_1"}}"#;

  fn secret() -> String { format!("whsec_{}", B64.encode(KEY)) }

  fn header() -> String { format!("v1,{}", sign(KEY, ID, TS, BODY)) }

  #[test]
  fn valid_signature_verifies() {
    assert!(verify(BODY, &secret(), ID, TS, &header()));
  }

  #[test]
  fn any_single_byte_change_fails() {
    let secret = secret();
    let header = header();

    for i in 0..BODY.len() {
      let mut body = BODY.to_vec();
      body[i] ^= 0x01;
      assert!(!verify(&body, &secret, ID, TS, &header), "body byte {i}");
    }
    for i in 0..ID.len() {
      let mut id = ID.as_bytes().to_vec();
      id[i] ^= 0x01;
      let id = String::from_utf8(id).unwrap();
      assert!(!verify(BODY, &secret, &id, TS, &header), "id byte {i}");
    }
    for i in 0..TS.len() {
      let mut ts = TS.as_bytes().to_vec();
      ts[i] ^= 0x01;
      let ts = String::from_utf8(ts).unwrap();
      assert!(!verify(BODY, &secret, ID, &ts, &header), "timestamp byte {i}");
    }
  }

  #[test]
  fn any_matching_token_is_enough() {
    let multi = format!("v1,bm90LXRoaXMtb25l v2,whatever {}", header());
    assert!(verify(BODY, &secret(), ID, TS, &multi));
  }

  #[test]
  fn only_v1_tokens_count() {
    let sig = sign(KEY, ID, TS, BODY);
    assert!(!verify(BODY, &secret(), ID, TS, &format!("v2,{sig}")));
    assert!(!verify(BODY, &secret(), ID, TS, &sig));
  }

  #[test]
  fn empty_inputs_fail_closed() {
    let header = header();
    assert!(!verify(BODY, "", ID, TS, &header));
    assert!(!verify(BODY, &secret(), "", TS, &header));
    assert!(!verify(BODY, &secret(), ID, "", &header));
    assert!(!verify(BODY, &secret(), ID, TS, ""));
  }

  #[test]
  fn secret_without_separator_fails() {
    let bare = B64.encode(KEY);
    assert!(signing_key(&bare).is_none());
    assert!(!verify(BODY, &bare, ID, TS, &header()));
  }

  #[test]
  fn key_is_taken_after_first_separator() {
    assert_eq!(signing_key(&secret()).unwrap(), KEY);
    assert!(signing_key("whsec_not_base64!").is_none());
  }

  #[test]
  fn body_is_signed_byte_for_byte() {
    let spaced = br#"{ "type": "user.created", "data": { "id": "u_1" } }"#;
    assert!(!verify(spaced, &secret(), ID, TS, &header()));
  }
}
