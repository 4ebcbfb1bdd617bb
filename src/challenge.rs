//! The challenge/response protocol (spec component C5): a replay-resistant,
//! copy-paste-safe scheme for invoking a remote PIV-token-backed recovery
//! operation over a limited-bandwidth text channel (chat, SMS, read aloud).
//!
//! A recovery machine holds a temporary in-RAM keypair for the duration of
//! one [`RecoverySession`]. Each challenge wraps one recovery part's
//! key-piece box, addressed to the same hardware key as that part, plus
//! metadata including four verification-word indices the two parties
//! compare out-of-band. The hardware token's side unseals the challenge,
//! re-seals the key-piece share to the session's temporary public key, and
//! sends that back as the response.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::crypto::curve::{Curve, EcPrivateKey, EcPublicKey};
use crate::crypto::secret::{Plaintext, SharedSecret};
use crate::crypto::cipher::CipherSuite;
use crate::crypto::shamir::Share;
use crate::ebox::{Config, Ebox};
use crate::sealed_box::{GuidSlot, SealedBox};
use crate::codec;
use crate::{Error, Result};

const CHALLENGE_VERSION: u8 = 1;
const CHALLENGE_TYPE_RECOVERY: u8 = 1;

const META_TAG_HOSTNAME: u8 = 1;
const META_TAG_CTIME: u8 = 2;
const META_TAG_DESCRIPTION: u8 = 3;
const META_TAG_WORDS: u8 = 4;
const META_TAG_TERMINATOR: u8 = 0;

const RESPONSE_TAG_ID: u8 = 1;
const RESPONSE_TAG_KEYPIECE: u8 = 2;
const RESPONSE_TAG_TERMINATOR: u8 = 0;

fn wrap_base64(data: &[u8]) -> String {
    let encoded = BASE64.encode(data);
    encoded
        .as_bytes()
        .chunks(64)
        .map(|chunk| std::str::from_utf8(chunk).expect("base64 alphabet is ASCII"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn unwrap_base64(text: &str) -> Result<Vec<u8>> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(stripped).map_err(|_| Error::BadCstring)
}

/// The plaintext carried inside an outer challenge Box.
#[derive(Debug, Clone)]
pub struct ChallengePayload {
    pub version: u8,
    pub kind: u8,
    pub part_id: u8,
    pub temporary_pubkey: Vec<u8>,
    pub eph: Vec<u8>,
    pub nonce: Vec<u8>,
    pub iv: Vec<u8>,
    pub ciphertext_and_tag: Vec<u8>,
    pub hostname: Option<String>,
    pub ctime: Option<u64>,
    pub description: Option<String>,
    pub words: Option<[u8; 4]>,
}

impl ChallengePayload {
    fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        codec::write_u8(&mut buf, self.version)?;
        codec::write_u8(&mut buf, self.kind)?;
        codec::write_u8(&mut buf, self.part_id)?;
        codec::write_eckey8(&mut buf, &self.temporary_pubkey)?;
        codec::write_eckey8(&mut buf, &self.eph)?;
        codec::write_string8(&mut buf, &self.nonce)?;
        codec::write_string8(&mut buf, &self.iv)?;
        codec::write_string8(&mut buf, &self.ciphertext_and_tag)?;

        if let Some(hostname) = &self.hostname {
            codec::write_u8(&mut buf, META_TAG_HOSTNAME)?;
            let mut body = hostname.as_bytes().to_vec();
            body.push(0);
            codec::write_string8(&mut buf, &body)?;
        }
        if let Some(ctime) = self.ctime {
            codec::write_u8(&mut buf, META_TAG_CTIME)?;
            codec::write_string8(&mut buf, &ctime.to_be_bytes())?;
        }
        if let Some(description) = &self.description {
            codec::write_u8(&mut buf, META_TAG_DESCRIPTION)?;
            let mut body = description.as_bytes().to_vec();
            body.push(0);
            codec::write_string8(&mut buf, &body)?;
        }
        if let Some(words) = self.words {
            codec::write_u8(&mut buf, META_TAG_WORDS)?;
            codec::write_string8(&mut buf, &words)?;
        }
        codec::write_u8(&mut buf, META_TAG_TERMINATOR)?;
        Ok(buf)
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = std::io::Cursor::new(bytes);
        let version = codec::read_u8(&mut r)?;
        let kind = codec::read_u8(&mut r)?;
        let part_id = codec::read_u8(&mut r)?;
        let temporary_pubkey = codec::read_eckey8(&mut r)?;
        let eph = codec::read_eckey8(&mut r)?;
        let nonce = codec::read_string8(&mut r)?;
        let iv = codec::read_string8(&mut r)?;
        let ciphertext_and_tag = codec::read_string8(&mut r)?;

        let mut hostname = None;
        let mut ctime = None;
        let mut description = None;
        let mut words = None;

        loop {
            let tag = codec::read_u8(&mut r)?;
            if tag == META_TAG_TERMINATOR {
                break;
            }
            let body = codec::read_string8(&mut r)?;
            match tag {
                META_TAG_HOSTNAME => {
                    hostname = Some(cstring_body_to_string(&body)?);
                }
                META_TAG_CTIME => {
                    let bytes: [u8; 8] = body.as_slice().try_into().map_err(|_| Error::Truncated)?;
                    ctime = Some(u64::from_be_bytes(bytes));
                }
                META_TAG_DESCRIPTION => {
                    description = Some(cstring_body_to_string(&body)?);
                }
                META_TAG_WORDS => {
                    let indices: [u8; 4] = body.as_slice().try_into().map_err(|_| Error::Truncated)?;
                    words = Some(indices);
                }
                // Challenge/response metadata is uniformly string8-bodied,
                // so any tag this crate doesn't recognize is safe to skip -
                // unlike the Ebox part-tag framework, there is no
                // OPTIONAL bit here to distinguish skippable tags.
                _ => {}
            }
        }

        Ok(ChallengePayload {
            version,
            kind,
            part_id,
            temporary_pubkey,
            eph,
            nonce,
            iv,
            ciphertext_and_tag,
            hostname,
            ctime,
            description,
            words,
        })
    }
}

fn cstring_body_to_string(body: &[u8]) -> Result<String> {
    match body.split_last() {
        Some((0, rest)) if !rest.contains(&0) => {
            String::from_utf8(rest.to_vec()).map_err(|_| Error::BadCstring)
        }
        _ => Err(Error::BadCstring),
    }
}

/// The plaintext carried inside an outer response Box.
#[derive(Debug, Clone)]
pub struct ResponsePayload {
    pub id: u8,
    pub keypiece: Vec<u8>,
}

impl ResponsePayload {
    fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        codec::write_u8(&mut buf, RESPONSE_TAG_ID)?;
        codec::write_string8(&mut buf, &[self.id])?;
        codec::write_u8(&mut buf, RESPONSE_TAG_KEYPIECE)?;
        codec::write_string8(&mut buf, &self.keypiece)?;
        codec::write_u8(&mut buf, RESPONSE_TAG_TERMINATOR)?;
        Ok(buf)
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = std::io::Cursor::new(bytes);
        let mut id = None;
        let mut keypiece = None;
        loop {
            let tag = codec::read_u8(&mut r)?;
            if tag == RESPONSE_TAG_TERMINATOR {
                break;
            }
            let body = codec::read_string8(&mut r)?;
            match tag {
                RESPONSE_TAG_ID => {
                    id = Some(*body.first().ok_or(Error::Truncated)?);
                }
                RESPONSE_TAG_KEYPIECE => keypiece = Some(body),
                _ => {}
            }
        }
        Ok(ResponsePayload {
            id: id.ok_or(Error::MissingRequiredTag("ID"))?,
            keypiece: keypiece.ok_or(Error::MissingRequiredTag("KEYPIECE"))?,
        })
    }
}

/// Build a challenge for one recovery part, returning the base64-framed,
/// 64-column-wrapped text to transmit.
#[allow(clippy::too_many_arguments)]
pub fn build_challenge(
    part_id: u8,
    hardware_recipient: &EcPublicKey,
    hardware_guid_slot: Option<GuidSlot>,
    cipher: CipherSuite,
    keypiece_eph: &[u8],
    keypiece_nonce: &[u8],
    keypiece_iv: &[u8],
    keypiece_ct_and_tag: &[u8],
    temporary_pubkey: &[u8],
    hostname: Option<String>,
    description: Option<String>,
    words: [u8; 4],
    ctime: u64,
) -> Result<String> {
    let payload = ChallengePayload {
        version: CHALLENGE_VERSION,
        kind: CHALLENGE_TYPE_RECOVERY,
        part_id,
        temporary_pubkey: temporary_pubkey.to_vec(),
        eph: keypiece_eph.to_vec(),
        nonce: keypiece_nonce.to_vec(),
        iv: keypiece_iv.to_vec(),
        ciphertext_and_tag: keypiece_ct_and_tag.to_vec(),
        hostname,
        ctime: Some(ctime),
        description,
        words: Some(words),
    };
    let plaintext = payload.serialize()?;
    let outer = SealedBox::seal_fresh(hardware_recipient, &plaintext, cipher, hardware_guid_slot)?;
    let mut bytes = Vec::new();
    outer.serialize(&mut bytes)?;
    Ok(wrap_base64(&bytes))
}

/// Parse and validate a received challenge, without yet acting on it.
/// Rejects a challenge missing `CTIME` or `WORDS` with
/// [`Error::MissingRequiredTag`].
pub fn parse_challenge(
    challenge_base64: &str,
    oracle: impl Fn(&EcPublicKey) -> Result<SharedSecret>,
) -> Result<ChallengePayload> {
    let bytes = unwrap_base64(challenge_base64)?;
    let mut cursor = std::io::Cursor::new(bytes);
    let outer = SealedBox::parse(&mut cursor)?;
    let plaintext = outer.unseal(oracle)?;
    let payload = ChallengePayload::parse(plaintext.as_bytes())?;

    if payload.version != CHALLENGE_VERSION {
        return Err(Error::BadVersion(payload.version));
    }
    if payload.kind != CHALLENGE_TYPE_RECOVERY {
        return Err(Error::MissingRequiredTag("type=RECOVERY"));
    }
    if payload.ctime.is_none() {
        return Err(Error::MissingRequiredTag("CTIME"));
    }
    if payload.words.is_none() {
        return Err(Error::MissingRequiredTag("WORDS"));
    }
    Ok(payload)
}

/// Build a response to an already-validated challenge: unseal the
/// wrapped key-piece box with the same hardware oracle, and re-seal its
/// plaintext to the challenge's temporary public key.
pub fn build_response(
    payload: &ChallengePayload,
    outer_cipher: CipherSuite,
    outer_curve: Curve,
    outer_recipient_pubkey: &[u8],
    oracle: impl Fn(&EcPublicKey) -> Result<SharedSecret>,
) -> Result<String> {
    let inner = SealedBox {
        guid_slot: None,
        cipher: outer_cipher,
        kdf: crate::crypto::kdf::Kdf::Sha512,
        nonce: payload.nonce.clone(),
        curve: outer_curve,
        recipient_pubkey: outer_recipient_pubkey.to_vec(),
        ephemeral_pubkey: payload.eph.clone(),
        iv: payload.iv.clone(),
        ciphertext_and_tag: payload.ciphertext_and_tag.clone(),
    };
    let share_plaintext = inner.unseal(oracle)?;

    let response = ResponsePayload {
        id: payload.part_id,
        keypiece: share_plaintext.as_bytes().to_vec(),
    };
    let response_plaintext = response.serialize()?;

    let temp_pub = EcPublicKey::from_sec1_bytes(outer_curve, &payload.temporary_pubkey)?;
    let outer = SealedBox::seal_fresh(&temp_pub, &response_plaintext, outer_cipher, None)?;
    let mut bytes = Vec::new();
    outer.serialize(&mut bytes)?;
    Ok(wrap_base64(&bytes))
}

/// Unseal and validate a response on the recovery machine, recovering
/// the Shamir share it carries.
pub fn verify_response(
    response_base64: &str,
    temporary_priv: &EcPrivateKey,
    expected_part_id: u8,
) -> Result<Share> {
    let bytes = unwrap_base64(response_base64)?;
    let mut cursor = std::io::Cursor::new(bytes);
    let outer = SealedBox::parse(&mut cursor)?;
    let plaintext = outer.unseal_with_privkey(temporary_priv)?;
    let response = ResponsePayload::parse(plaintext.as_bytes())?;
    if response.id != expected_part_id {
        return Err(Error::AuthFail);
    }
    Share::from_bytes(&response.keypiece)
}

#[cfg(target_os = "linux")]
fn lock_and_exclude<T>(value: &T) {
    let ptr = value as *const T as *mut libc::c_void;
    let len = std::mem::size_of::<T>();
    unsafe {
        if libc::mlock(ptr, len) != 0 {
            tracing::warn!("failed to mlock temporary recovery key memory");
        }
        if libc::madvise(ptr, len, libc::MADV_DONTDUMP) != 0 {
            tracing::warn!("failed to exclude temporary recovery key memory from core dumps");
        }
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn lock_and_exclude<T>(value: &T) {
    let ptr = value as *const T as *mut libc::c_void;
    let len = std::mem::size_of::<T>();
    unsafe {
        if libc::mlock(ptr, len) != 0 {
            tracing::warn!("failed to mlock temporary recovery key memory");
        }
    }
    tracing::warn!("core-dump exclusion is not implemented on this platform");
}

#[cfg(not(unix))]
fn lock_and_exclude<T>(_value: &T) {
    tracing::warn!("page locking is not available on this platform");
}

/// The recovery-session state machine from spec §4.5: `INIT →
/// CHALLENGE_EMITTED → RESPONSE_RECEIVED → SHARE_ACCEPTED`, repeated
/// until enough shares exist, then `COMBINE → UNSEAL_RECOVERY → DONE`.
/// Any state can transition to `ABORT`. Both terminal states zeroize the
/// temporary private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    ChallengeEmitted,
    ResponseReceived,
    ShareAccepted,
    Combine,
    UnsealRecovery,
    Done,
    Abort,
}

/// One recovery machine's in-memory session: the temporary keypair,
/// accumulated shares, and the state machine governing them.
pub struct RecoverySession {
    temporary_priv: Option<EcPrivateKey>,
    temporary_pubkey: Vec<u8>,
    state: SessionState,
    pending_part_id: Option<u8>,
    shares: Vec<Share>,
}

impl RecoverySession {
    pub fn new(curve: Curve) -> Self {
        let temporary_priv = EcPrivateKey::generate(curve);
        lock_and_exclude(&temporary_priv);
        let temporary_pubkey = temporary_priv.public_key().to_compressed();
        RecoverySession {
            temporary_priv: Some(temporary_priv),
            temporary_pubkey,
            state: SessionState::Init,
            pending_part_id: None,
            shares: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn temporary_pubkey(&self) -> &[u8] {
        &self.temporary_pubkey
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// Emit a challenge for `part_id`, moving to `CHALLENGE_EMITTED`.
    #[allow(clippy::too_many_arguments)]
    pub fn emit_challenge(
        &mut self,
        part_id: u8,
        hardware_recipient: &EcPublicKey,
        hardware_guid_slot: Option<GuidSlot>,
        cipher: CipherSuite,
        keypiece_eph: &[u8],
        keypiece_nonce: &[u8],
        keypiece_iv: &[u8],
        keypiece_ct_and_tag: &[u8],
        hostname: Option<String>,
        description: Option<String>,
        words: [u8; 4],
        ctime: u64,
    ) -> Result<String> {
        if self.temporary_priv.is_none() {
            return Err(Error::MissingRequiredTag("session already terminated"));
        }
        let text = build_challenge(
            part_id,
            hardware_recipient,
            hardware_guid_slot,
            cipher,
            keypiece_eph,
            keypiece_nonce,
            keypiece_iv,
            keypiece_ct_and_tag,
            self.temporary_pubkey(),
            hostname,
            description,
            words,
            ctime,
        )?;
        self.pending_part_id = Some(part_id);
        self.state = SessionState::ChallengeEmitted;
        Ok(text)
    }

    /// Verify a response against the pending challenge. On success the
    /// share is retained and the state advances to `SHARE_ACCEPTED`; on
    /// failure the response is discarded and the session falls back to
    /// `CHALLENGE_EMITTED`, awaiting a corrected response.
    pub fn accept_response(&mut self, response_base64: &str) -> Result<()> {
        let expected = self
            .pending_part_id
            .ok_or(Error::MissingRequiredTag("no pending challenge"))?;
        let temporary_priv = self
            .temporary_priv
            .as_ref()
            .ok_or(Error::MissingRequiredTag("session already terminated"))?;
        self.state = SessionState::ResponseReceived;
        match verify_response(response_base64, temporary_priv, expected) {
            Ok(share) => {
                self.shares.push(share);
                self.pending_part_id = None;
                self.state = SessionState::ShareAccepted;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::ChallengeEmitted;
                Err(err)
            }
        }
    }

    /// Combine every accepted share against `config` and open the
    /// Ebox's recovery payload, terminating the session in `DONE` and
    /// zeroizing the temporary private key.
    pub fn combine(&mut self, ebox: &Ebox, config: &Config) -> Result<Plaintext> {
        self.state = SessionState::Combine;
        let result = ebox.combine_recovery(config, &self.shares);
        self.state = SessionState::UnsealRecovery;
        let plaintext = result?;
        self.state = SessionState::Done;
        self.temporary_priv = None;
        Ok(plaintext)
    }

    /// Abandon the session, zeroizing the temporary private key.
    pub fn abort(&mut self) {
        self.temporary_priv = None;
        self.state = SessionState::Abort;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::ecdh;
    use crate::ebox::{ConfigSpec, EboxType, PartSpec};

    #[test]
    fn challenge_round_trips_to_a_recovered_share() {
        let hardware_priv = EcPrivateKey::generate(Curve::NistP256);
        let mut session = RecoverySession::new(Curve::NistP256);

        let k_final = [0x42u8; 32];
        let ebox = Ebox::seal(
            EboxType::Key,
            &k_final,
            CipherSuite::ChaCha20Poly1305,
            &k_final,
            vec![ConfigSpec::Recovery {
                threshold: 1,
                parts: vec![PartSpec {
                    recipient: hardware_priv.public_key(),
                    cipher: CipherSuite::ChaCha20Poly1305,
                    pubkey: None,
                    name: None,
                    cak: None,
                    guid: Some(vec![0x22; 16]),
                    slot: Some(0x9D),
                }],
            }],
        )
        .unwrap();

        let config = ebox.recovery_configs().next().unwrap();
        let part = &config.parts[0];
        let ephemeral_pubkey = ebox.ephemerals.get(&Curve::NistP256).unwrap();

        let challenge_text = build_challenge(
            7,
            &hardware_priv.public_key(),
            part.guid.clone().map(|g| GuidSlot { guid: g, slot: part.slot.unwrap() }),
            part.part_box.cipher,
            ephemeral_pubkey,
            &part.part_box.nonce,
            &part.part_box.iv,
            &part.part_box.ciphertext_and_tag,
            session.temporary_pubkey(),
            Some("laptop".to_string()),
            None,
            [1, 2, 3, 4],
            1_700_000_000,
        )
        .unwrap();

        let payload = parse_challenge(&challenge_text, |ephemeral_pub| ecdh(&hardware_priv, ephemeral_pub)).unwrap();
        assert_eq!(payload.part_id, 7);
        assert_eq!(payload.words, Some([1, 2, 3, 4]));

        let response_text = build_response(
            &payload,
            part.part_box.cipher,
            Curve::NistP256,
            &part.part_box.recipient_pubkey,
            |ephemeral_pub| ecdh(&hardware_priv, ephemeral_pub),
        )
        .unwrap();

        session.pending_part_id = Some(7);
        session.accept_response(&response_text).unwrap();
        assert_eq!(session.state(), SessionState::ShareAccepted);
        assert_eq!(session.shares().len(), 1);

        let recovered = session.combine(&ebox, config).unwrap();
        assert_eq!(recovered.as_bytes(), &k_final);
        assert_eq!(session.state(), SessionState::Done);
    }

    #[test]
    fn missing_words_tag_is_rejected() {
        let hardware_priv = EcPrivateKey::generate(Curve::NistP256);
        let payload = ChallengePayload {
            version: CHALLENGE_VERSION,
            kind: CHALLENGE_TYPE_RECOVERY,
            part_id: 1,
            temporary_pubkey: EcPrivateKey::generate(Curve::NistP256).public_key().to_compressed(),
            eph: EcPrivateKey::generate(Curve::NistP256).public_key().to_compressed(),
            nonce: vec![0u8; 16],
            iv: Vec::new(),
            ciphertext_and_tag: vec![0u8; 32],
            hostname: None,
            ctime: Some(1_700_000_000),
            description: None,
            words: None,
        };
        let plaintext = payload.serialize().unwrap();
        let outer = SealedBox::seal_fresh(
            &hardware_priv.public_key(),
            &plaintext,
            CipherSuite::ChaCha20Poly1305,
            None,
        )
        .unwrap();
        let mut bytes = Vec::new();
        outer.serialize(&mut bytes).unwrap();
        let text = wrap_base64(&bytes);

        let result = parse_challenge(&text, |ephemeral_pub| ecdh(&hardware_priv, ephemeral_pub));
        assert!(matches!(result, Err(Error::MissingRequiredTag("WORDS"))));
    }

    #[test]
    fn base64_framing_wraps_at_64_columns_and_tolerates_whitespace() {
        let data = vec![0xAAu8; 200];
        let wrapped = wrap_base64(&data);
        for line in wrapped.lines() {
            assert!(line.len() <= 64);
        }
        let with_whitespace = format!("  {}\n\t", wrapped);
        assert_eq!(unwrap_base64(&with_whitespace).unwrap(), data);
    }
}
