//! The `Ebox` assembler (spec component C4): many [`SealedBox`]es glued
//! together with GF(2^8) Shamir sharing to realize "one primary token XOR
//! an N-of-M threshold of recovery tokens" unlock semantics, with one
//! ephemeral keypair shared across every box on the same curve.
//!
//! An Ebox never stores `K_final` directly except inside a PRIMARY
//! config's box. Recovery configs instead each wrap a Shamir share of an
//! `IK ⊕ cfg_nonce` mask; combining `N` of a config's shares and
//! unmasking yields the shared per-Ebox intermediate key `IK`, which
//! opens the one `recovery_ct_and_tag` payload common to the whole Ebox.

use std::collections::HashMap;
use std::io::{Read, Write};

use rand::rngs::OsRng;

use crate::codec::{self, SshPublicKey};
use crate::crypto::cipher::{self, CipherSuite};
use crate::crypto::curve::{Curve, EcPrivateKey, EcPublicKey};
use crate::crypto::kdf::Kdf;
use crate::crypto::rng;
use crate::crypto::secret::{self, Key32, Plaintext, SharedSecret, SymmetricKey};
use crate::crypto::shamir::{self, Share};
use crate::sealed_box::{GuidSlot, SealedBox};
use crate::{Error, Result};

const MAGIC: [u8; 2] = [0xEB, 0x0C];
const VERSION: u8 = 3;

const TAG_PUBKEY: u8 = 1;
const TAG_NAME: u8 = 2;
const TAG_CAK: u8 = 3;
const TAG_GUID: u8 = 4;
const TAG_BOX: u8 = 5;
const TAG_SLOT: u8 = 6;
const TAG_OPTIONAL: u8 = 0x80;
const TAG_TERMINATOR: u8 = 0;

/// What an Ebox's recovery plaintext represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EboxType {
    Template = 1,
    Key = 2,
    Stream = 3,
}

impl EboxType {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            1 => Ok(EboxType::Template),
            2 => Ok(EboxType::Key),
            3 => Ok(EboxType::Stream),
            _ => Err(Error::BadVersion(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigType {
    Primary = 1,
    Recovery = 2,
}

impl ConfigType {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            1 => Ok(ConfigType::Primary),
            2 => Ok(ConfigType::Recovery),
            _ => Err(Error::BadVersion(v)),
        }
    }
}

/// The "Box-minus-header" structure carried by a part's `BOX` tag: a
/// [`SealedBox`] without its magic, version, guid/slot (those live on the
/// enclosing [`Part`]) or ephemeral public key (shared per curve via the
/// Ebox's `ephemerals` map).
#[derive(Debug, Clone)]
pub struct PartBox {
    pub cipher: CipherSuite,
    pub kdf: Kdf,
    pub nonce: Vec<u8>,
    pub curve: Curve,
    pub recipient_pubkey: Vec<u8>,
    pub iv: Vec<u8>,
    pub ciphertext_and_tag: Vec<u8>,
}

impl PartBox {
    fn from_sealed(sealed: &SealedBox) -> Self {
        PartBox {
            cipher: sealed.cipher,
            kdf: sealed.kdf,
            nonce: sealed.nonce.clone(),
            curve: sealed.curve,
            recipient_pubkey: sealed.recipient_pubkey.clone(),
            iv: sealed.iv.clone(),
            ciphertext_and_tag: sealed.ciphertext_and_tag.clone(),
        }
    }

    fn serialize<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_cstring8(w, self.cipher.name())?;
        codec::write_cstring8(w, self.kdf.name())?;
        codec::write_string8(w, &self.nonce)?;
        codec::write_cstring8(w, self.curve.name())?;
        codec::write_eckey8(w, &self.recipient_pubkey)?;
        codec::write_string8(w, &self.iv)?;
        codec::write_string(w, &self.ciphertext_and_tag)?;
        Ok(())
    }

    /// Parses a `BOX` tag body. `nonce` shorter than 16 bytes is
    /// [`Error::NonceTooShort`] here - the stricter Ebox-context minimum
    /// from spec §8's boundary cases, unlike a standalone `Box` parse.
    fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let cipher = CipherSuite::from_name(&codec::read_cstring8(r)?)?;
        let kdf = Kdf::from_name(&codec::read_cstring8(r)?)?;
        let nonce = codec::read_string8(r)?;
        if nonce.len() < 16 {
            return Err(Error::NonceTooShort);
        }
        let curve = Curve::from_name(&codec::read_cstring8(r)?)?;
        let recipient_pubkey = codec::read_eckey8(r)?;
        EcPublicKey::from_sec1_bytes(curve, &recipient_pubkey)?;
        let iv = codec::read_string8(r)?;
        let ciphertext_and_tag = codec::read_string(r)?;
        if ciphertext_and_tag.len() < cipher.tag_len() {
            return Err(Error::AuthFail);
        }
        Ok(PartBox {
            cipher,
            kdf,
            nonce,
            curve,
            recipient_pubkey,
            iv,
            ciphertext_and_tag,
        })
    }
}

/// One participating recipient within a [`Config`].
#[derive(Debug, Clone)]
pub struct Part {
    pub pubkey: Option<SshPublicKey>,
    pub name: Option<String>,
    pub cak: Option<SshPublicKey>,
    pub guid: Option<Vec<u8>>,
    pub part_box: PartBox,
    pub slot: Option<u8>,
}

impl Part {
    /// Reassemble the full wire-format [`SealedBox`] this part wraps,
    /// filling in the curve's shared ephemeral public key.
    pub fn to_sealed_box(&self, ephemeral_pubkey: &[u8]) -> SealedBox {
        let guid_slot = match (&self.guid, self.slot) {
            (Some(guid), Some(slot)) => Some(GuidSlot {
                guid: guid.clone(),
                slot,
            }),
            _ => None,
        };
        SealedBox {
            guid_slot,
            cipher: self.part_box.cipher,
            kdf: self.part_box.kdf,
            nonce: self.part_box.nonce.clone(),
            curve: self.part_box.curve,
            recipient_pubkey: self.part_box.recipient_pubkey.clone(),
            ephemeral_pubkey: ephemeral_pubkey.to_vec(),
            iv: self.part_box.iv.clone(),
            ciphertext_and_tag: self.part_box.ciphertext_and_tag.clone(),
        }
    }

    fn serialize<W: Write>(&self, w: &mut W) -> Result<()> {
        if let Some(pubkey) = &self.pubkey {
            codec::write_u8(w, TAG_PUBKEY)?;
            codec::write_key(w, pubkey)?;
        }
        if let Some(name) = &self.name {
            codec::write_u8(w, TAG_NAME)?;
            codec::write_cstring8(w, name)?;
        }
        if let Some(cak) = &self.cak {
            codec::write_u8(w, TAG_CAK)?;
            codec::write_key(w, cak)?;
        }
        if let Some(guid) = &self.guid {
            codec::write_u8(w, TAG_GUID)?;
            codec::write_string8(w, guid)?;
        }
        codec::write_u8(w, TAG_BOX)?;
        self.part_box.serialize(w)?;
        if let Some(slot) = self.slot {
            codec::write_u8(w, TAG_SLOT)?;
            codec::write_u8(w, slot)?;
        }
        codec::write_u8(w, TAG_TERMINATOR)?;
        Ok(())
    }

    fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let mut pubkey = None;
        let mut name = None;
        let mut cak = None;
        let mut guid = None;
        let mut part_box = None;
        let mut slot = None;

        loop {
            let tag = codec::read_u8(r)?;
            if tag == TAG_TERMINATOR {
                break;
            }
            if tag & TAG_OPTIONAL != 0 {
                // Unrecognized-or-not, an OPTIONAL tag's body is always a
                // plain string8 and is simply skipped.
                let _ = codec::read_string8(r)?;
                continue;
            }
            match tag {
                TAG_PUBKEY => pubkey = Some(codec::read_key(r)?),
                TAG_NAME => name = Some(codec::read_cstring8(r)?),
                TAG_CAK => cak = Some(codec::read_key(r)?),
                TAG_GUID => guid = Some(codec::read_string8(r)?),
                TAG_BOX => part_box = Some(PartBox::parse(r)?),
                TAG_SLOT => slot = Some(codec::read_u8(r)?),
                other => return Err(Error::UnknownTag(other)),
            }
        }

        Ok(Part {
            pubkey,
            name,
            cak,
            guid,
            part_box: part_box.ok_or(Error::MissingRequiredTag("BOX"))?,
            slot,
        })
    }
}

/// One unlock path of an Ebox.
#[derive(Debug, Clone)]
pub struct Config {
    pub kind: ConfigType,
    pub n: u8,
    pub m: u8,
    pub cfg_nonce: Vec<u8>,
    pub parts: Vec<Part>,
}

impl Config {
    fn serialize<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_u8(w, self.kind as u8)?;
        codec::write_u8(w, self.n)?;
        codec::write_u8(w, self.m)?;
        codec::write_string8(w, &self.cfg_nonce)?;
        for part in &self.parts {
            part.serialize(w)?;
        }
        Ok(())
    }

    fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let kind = ConfigType::from_u8(codec::read_u8(r)?)?;
        let n = codec::read_u8(r)?;
        let m = codec::read_u8(r)?;
        let cfg_nonce = codec::read_string8(r)?;
        let parts = (0..m).map(|_| Part::parse(r)).collect::<Result<Vec<_>>>()?;
        Ok(Config {
            kind,
            n,
            m,
            cfg_nonce,
            parts,
        })
    }
}

/// Everything needed to seal one [`Part`]: its recipient key and the
/// identifying metadata carried alongside it.
#[derive(Debug, Clone)]
pub struct PartSpec {
    pub recipient: EcPublicKey,
    pub cipher: CipherSuite,
    pub pubkey: Option<SshPublicKey>,
    pub name: Option<String>,
    pub cak: Option<SshPublicKey>,
    pub guid: Option<Vec<u8>>,
    pub slot: Option<u8>,
}

/// A configuration to build, before ephemeral keys and shares exist.
pub enum ConfigSpec {
    Primary { part: PartSpec },
    Recovery { threshold: u8, parts: Vec<PartSpec> },
}

impl ConfigSpec {
    fn parts(&self) -> &[PartSpec] {
        match self {
            ConfigSpec::Primary { part } => std::slice::from_ref(part),
            ConfigSpec::Recovery { parts, .. } => parts,
        }
    }
}

/// A sealed or parsed Ebox.
#[derive(Debug, Clone)]
pub struct Ebox {
    pub kind: EboxType,
    pub recovery_cipher: CipherSuite,
    pub recovery_iv: Vec<u8>,
    pub recovery_ct_and_tag: Vec<u8>,
    pub ephemerals: HashMap<Curve, Vec<u8>>,
    pub configs: Vec<Config>,
}

impl Ebox {
    /// Assemble a full Ebox around `k_final`: one ephemeral keypair per
    /// distinct recipient curve, one Shamir split per RECOVERY config,
    /// and a single AEAD-sealed recovery payload shared by the whole
    /// Ebox. Ephemeral private keys are dropped (and zeroized, via the
    /// underlying `SecretKey` types) as soon as the last box on their
    /// curve is sealed.
    pub fn seal(
        kind: EboxType,
        k_final: &[u8],
        recovery_cipher: CipherSuite,
        recovery_plaintext: &[u8],
        configs: Vec<ConfigSpec>,
    ) -> Result<Ebox> {
        let mut ephemeral_privs: HashMap<Curve, EcPrivateKey> = HashMap::new();
        let mut ephemerals: HashMap<Curve, Vec<u8>> = HashMap::new();
        for cfg in &configs {
            for part in cfg.parts() {
                let curve = part.recipient.curve();
                ephemeral_privs.entry(curve).or_insert_with(|| {
                    let eph = EcPrivateKey::generate(curve);
                    ephemerals.insert(curve, eph.public_key().to_compressed());
                    eph
                });
            }
        }

        let mut ik_bytes = [0u8; 32];
        rng::fill(&mut ik_bytes)?;
        let ik = Key32::new(ik_bytes);

        let mut recovery_iv = vec![0u8; recovery_cipher.nonce_len()];
        rng::fill(&mut recovery_iv)?;
        let recovery_key = SymmetricKey::new(ik.as_bytes().to_vec());
        let recovery_ct_and_tag =
            cipher::seal(recovery_cipher, &recovery_key, &recovery_iv, recovery_plaintext)?;

        let mut built_configs = Vec::with_capacity(configs.len());
        for cfg in configs {
            built_configs.push(match cfg {
                ConfigSpec::Primary { part } => {
                    let eph_priv = &ephemeral_privs[&part.recipient.curve()];
                    let sealed = SealedBox::seal(
                        &part.recipient,
                        eph_priv,
                        k_final,
                        part.cipher,
                        None,
                        None,
                        Vec::new(),
                    )?;
                    let built_part = Part {
                        pubkey: part.pubkey,
                        name: part.name,
                        cak: part.cak,
                        guid: part.guid,
                        part_box: PartBox::from_sealed(&sealed),
                        slot: part.slot,
                    };
                    Config {
                        kind: ConfigType::Primary,
                        n: 1,
                        m: 1,
                        cfg_nonce: Vec::new(),
                        parts: vec![built_part],
                    }
                }
                ConfigSpec::Recovery { threshold, parts } => {
                    let m = parts.len() as u8;
                    let mut cfg_nonce = vec![0u8; 16];
                    rng::fill(&mut cfg_nonce)?;
                    let mask = secret::expand_to_32(&cfg_nonce);
                    let ik_cfg = ik.xor(&mask);
                    let shares = shamir::split(ik_cfg.as_bytes(), threshold, m, &mut OsRng)?;

                    let mut built_parts = Vec::with_capacity(parts.len());
                    for (part, share) in parts.into_iter().zip(shares.into_iter()) {
                        let eph_priv = &ephemeral_privs[&part.recipient.curve()];
                        let sealed = SealedBox::seal(
                            &part.recipient,
                            eph_priv,
                            &share.to_bytes(),
                            part.cipher,
                            None,
                            None,
                            Vec::new(),
                        )?;
                        built_parts.push(Part {
                            pubkey: part.pubkey,
                            name: part.name,
                            cak: part.cak,
                            guid: part.guid,
                            part_box: PartBox::from_sealed(&sealed),
                            slot: part.slot,
                        });
                    }
                    Config {
                        kind: ConfigType::Recovery,
                        n: threshold,
                        m,
                        cfg_nonce,
                        parts: built_parts,
                    }
                }
            });
        }
        drop(ephemeral_privs);

        tracing::debug!(curves = ephemerals.len(), configs = built_configs.len(), "sealed an ebox");

        Ok(Ebox {
            kind,
            recovery_cipher,
            recovery_iv,
            recovery_ct_and_tag,
            ephemerals,
            configs: built_configs,
        })
    }

    /// Unseal via the first PRIMARY config whose oracle succeeds. The
    /// recovery ciphertext is never touched on this path.
    pub fn unseal_primary(
        &self,
        oracle: impl Fn(&EcPublicKey) -> Result<SharedSecret>,
    ) -> Result<Plaintext> {
        let config = self
            .configs
            .iter()
            .find(|c| c.kind == ConfigType::Primary)
            .ok_or(Error::MissingRequiredTag("PRIMARY config"))?;
        let part = &config.parts[0];
        let ephemeral_pubkey = self
            .ephemerals
            .get(&part.part_box.curve)
            .ok_or_else(|| Error::UnsupportedCurve(part.part_box.curve.name().to_string()))?;
        part.to_sealed_box(ephemeral_pubkey).unseal(oracle)
    }

    /// Unseal one RECOVERY part's box, returning the Shamir share it
    /// carries.
    pub fn unseal_recovery_part(
        &self,
        config: &Config,
        part_index: usize,
        oracle: impl Fn(&EcPublicKey) -> Result<SharedSecret>,
    ) -> Result<Share> {
        let part = &config.parts[part_index];
        let ephemeral_pubkey = self
            .ephemerals
            .get(&part.part_box.curve)
            .ok_or_else(|| Error::UnsupportedCurve(part.part_box.curve.name().to_string()))?;
        let plaintext = part.to_sealed_box(ephemeral_pubkey).unseal(oracle)?;
        Share::from_bytes(plaintext.as_bytes())
    }

    /// Combine `N` (or more) shares recovered from the same `config` and
    /// open the Ebox-wide recovery payload. A wrong mix of shares - too
    /// few, duplicated, or drawn from a different config - surfaces here
    /// as [`Error::BadShares`] rather than at Shamir combine time, per
    /// the no-side-channel error policy.
    pub fn combine_recovery(&self, config: &Config, shares: &[Share]) -> Result<Plaintext> {
        if (shares.len() as u8) < config.n {
            return Err(Error::InsufficientShares {
                have: shares.len() as u8,
                need: config.n,
            });
        }
        let ik_cfg = shamir::combine(shares)?;
        let mask = secret::expand_to_32(&config.cfg_nonce);
        let ik = ik_cfg.xor(&mask);
        let recovery_key = SymmetricKey::new(ik.as_bytes().to_vec());
        cipher::open(self.recovery_cipher, &recovery_key, &self.recovery_iv, &self.recovery_ct_and_tag)
            .map_err(|_| Error::BadShares)
    }

    pub fn recovery_configs(&self) -> impl Iterator<Item = &Config> {
        self.configs.iter().filter(|c| c.kind == ConfigType::Recovery)
    }

    pub fn serialize<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&MAGIC)?;
        codec::write_u8(w, VERSION)?;
        codec::write_u8(w, self.kind as u8)?;
        codec::write_cstring8(w, self.recovery_cipher.name())?;
        codec::write_string8(w, &self.recovery_iv)?;
        codec::write_string8(w, &self.recovery_ct_and_tag)?;

        // HashMap iteration order is unspecified; sort by curve name so
        // serialization is deterministic (required for byte-exact
        // re-encoding in the idempotence test).
        let mut ephemerals: Vec<_> = self.ephemerals.iter().collect();
        ephemerals.sort_by_key(|(curve, _)| curve.name());
        codec::write_u8(w, ephemerals.len() as u8)?;
        for (curve, pubkey) in ephemerals {
            codec::write_cstring8(w, curve.name())?;
            codec::write_eckey8(w, pubkey)?;
        }

        codec::write_u8(w, self.configs.len() as u8)?;
        for config in &self.configs {
            config.serialize(w)?;
        }
        Ok(())
    }

    pub fn parse<R: Read>(r: &mut R) -> Result<Ebox> {
        let mut magic = [0u8; 2];
        r.read_exact(&mut magic).map_err(|_| Error::Truncated)?;
        if magic != MAGIC {
            return Err(Error::BadMagic);
        }
        let version = codec::read_u8(r)?;
        if version != VERSION {
            return Err(Error::BadVersion(version));
        }
        let kind = EboxType::from_u8(codec::read_u8(r)?)?;
        let recovery_cipher = CipherSuite::from_name(&codec::read_cstring8(r)?)?;
        let recovery_iv = codec::read_string8(r)?;
        let recovery_ct_and_tag = codec::read_string8(r)?;

        let n_ephems = codec::read_u8(r)?;
        let mut ephemerals = HashMap::with_capacity(n_ephems as usize);
        for _ in 0..n_ephems {
            let curve = Curve::from_name(&codec::read_cstring8(r)?)?;
            let pubkey = codec::read_eckey8(r)?;
            EcPublicKey::from_sec1_bytes(curve, &pubkey)?;
            ephemerals.insert(curve, pubkey);
        }
        if ephemerals.is_empty() {
            return Err(Error::MissingRequiredTag("ephemerals"));
        }

        let n_configs = codec::read_u8(r)?;
        let configs = (0..n_configs)
            .map(|_| Config::parse(r))
            .collect::<Result<Vec<_>>>()?;

        for config in &configs {
            for part in &config.parts {
                if !ephemerals.contains_key(&part.part_box.curve) {
                    return Err(Error::UnsupportedCurve(part.part_box.curve.name().to_string()));
                }
            }
        }

        Ok(Ebox {
            kind,
            recovery_cipher,
            recovery_iv,
            recovery_ct_and_tag,
            ephemerals,
            configs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::EcPrivateKey;

    fn part_spec(recipient: &EcPrivateKey) -> PartSpec {
        PartSpec {
            recipient: recipient.public_key(),
            cipher: CipherSuite::ChaCha20Poly1305,
            pubkey: None,
            name: None,
            cak: None,
            guid: Some(vec![0x11; 16]),
            slot: Some(0x9D),
        }
    }

    #[test]
    fn primary_config_unseals_to_final_key() {
        let k_final = [0xABu8; 32];
        let primary_priv = EcPrivateKey::generate(Curve::NistP256);

        let ebox = Ebox::seal(
            EboxType::Key,
            &k_final,
            CipherSuite::Aes256Gcm,
            &k_final,
            vec![ConfigSpec::Primary {
                part: part_spec(&primary_priv),
            }],
        )
        .unwrap();

        let recovered = ebox
            .unseal_primary(|ephemeral_pub| crate::crypto::curve::ecdh(&primary_priv, ephemeral_pub))
            .unwrap();
        assert_eq!(recovered.as_bytes(), &k_final);
    }

    #[test]
    fn two_of_three_recovery_recombines_the_final_key() {
        let k_final = [0xABu8; 32];
        let recovery_privs: Vec<EcPrivateKey> =
            (0..3).map(|_| EcPrivateKey::generate(Curve::NistP256)).collect();

        let ebox = Ebox::seal(
            EboxType::Key,
            &k_final,
            CipherSuite::Aes256Gcm,
            &k_final,
            vec![ConfigSpec::Recovery {
                threshold: 2,
                parts: recovery_privs.iter().map(part_spec).collect(),
            }],
        )
        .unwrap();

        let config = ebox.recovery_configs().next().unwrap();
        let shares: Vec<Share> = [0usize, 2]
            .iter()
            .map(|&i| {
                ebox.unseal_recovery_part(config, i, |ephemeral_pub| {
                    crate::crypto::curve::ecdh(&recovery_privs[i], ephemeral_pub)
                })
                .unwrap()
            })
            .collect();

        let recovered = ebox.combine_recovery(config, &shares).unwrap();
        assert_eq!(recovered.as_bytes(), &k_final);
    }

    #[test]
    fn one_fewer_than_threshold_is_insufficient() {
        let k_final = [0x01u8; 32];
        let recovery_privs: Vec<EcPrivateKey> =
            (0..3).map(|_| EcPrivateKey::generate(Curve::NistP256)).collect();
        let ebox = Ebox::seal(
            EboxType::Key,
            &k_final,
            CipherSuite::Aes256Gcm,
            &k_final,
            vec![ConfigSpec::Recovery {
                threshold: 3,
                parts: recovery_privs.iter().map(part_spec).collect(),
            }],
        )
        .unwrap();

        let config = ebox.recovery_configs().next().unwrap();
        let share = ebox
            .unseal_recovery_part(config, 0, |ephemeral_pub| {
                crate::crypto::curve::ecdh(&recovery_privs[0], ephemeral_pub)
            })
            .unwrap();

        assert!(matches!(
            ebox.combine_recovery(config, &[share]),
            Err(Error::InsufficientShares { have: 1, need: 3 })
        ));
    }

    #[test]
    fn cross_config_shares_fail_with_bad_shares() {
        let k_final = [0x42u8; 32];
        let privs_a: Vec<EcPrivateKey> = (0..3).map(|_| EcPrivateKey::generate(Curve::NistP256)).collect();
        let privs_b: Vec<EcPrivateKey> = (0..3).map(|_| EcPrivateKey::generate(Curve::NistP256)).collect();

        let ebox = Ebox::seal(
            EboxType::Key,
            &k_final,
            CipherSuite::Aes256Gcm,
            &k_final,
            vec![
                ConfigSpec::Recovery {
                    threshold: 2,
                    parts: privs_a.iter().map(part_spec).collect(),
                },
                ConfigSpec::Recovery {
                    threshold: 2,
                    parts: privs_b.iter().map(part_spec).collect(),
                },
            ],
        )
        .unwrap();

        let config_a = &ebox.configs[0];
        let config_b = &ebox.configs[1];

        let share_a0 = ebox
            .unseal_recovery_part(config_a, 0, |ep| crate::crypto::curve::ecdh(&privs_a[0], ep))
            .unwrap();
        let share_b1 = ebox
            .unseal_recovery_part(config_b, 1, |ep| crate::crypto::curve::ecdh(&privs_b[1], ep))
            .unwrap();

        assert!(matches!(
            ebox.combine_recovery(config_a, &[share_a0, share_b1]),
            Err(Error::BadShares)
        ));
    }

    #[test]
    fn ephemerals_are_deduplicated_per_curve() {
        let k_final = [0x09u8; 32];
        let recovery_privs: Vec<EcPrivateKey> =
            (0..4).map(|_| EcPrivateKey::generate(Curve::NistP256)).collect();
        let ebox = Ebox::seal(
            EboxType::Key,
            &k_final,
            CipherSuite::Aes256Gcm,
            &k_final,
            vec![ConfigSpec::Recovery {
                threshold: 2,
                parts: recovery_privs.iter().map(part_spec).collect(),
            }],
        )
        .unwrap();
        assert_eq!(ebox.ephemerals.len(), 1);
    }

    #[test]
    fn serialize_then_parse_is_idempotent() {
        let k_final = [0x55u8; 32];
        let primary_priv = EcPrivateKey::generate(Curve::NistP384);
        let recovery_privs: Vec<EcPrivateKey> =
            (0..3).map(|_| EcPrivateKey::generate(Curve::NistP256)).collect();

        let ebox = Ebox::seal(
            EboxType::Key,
            &k_final,
            CipherSuite::ChaCha20Poly1305,
            &k_final,
            vec![
                ConfigSpec::Primary {
                    part: part_spec(&primary_priv),
                },
                ConfigSpec::Recovery {
                    threshold: 2,
                    parts: recovery_privs.iter().map(part_spec).collect(),
                },
            ],
        )
        .unwrap();

        let mut buf = Vec::new();
        ebox.serialize(&mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(&buf);
        let parsed = Ebox::parse(&mut cursor).unwrap();
        let mut reserialized = Vec::new();
        parsed.serialize(&mut reserialized).unwrap();
        assert_eq!(buf, reserialized);
    }

    #[test]
    fn unknown_non_optional_tag_aborts_part_parse() {
        let mut buf = Vec::new();
        codec::write_u8(&mut buf, 0x42).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(Part::parse(&mut cursor), Err(Error::UnknownTag(0x42))));
    }

    #[test]
    fn unknown_optional_tag_is_skipped() {
        let recipient = EcPrivateKey::generate(Curve::NistP256);
        let eph = EcPrivateKey::generate(Curve::NistP256);
        let sealed = SealedBox::seal(
            &recipient.public_key(),
            &eph,
            &[0u8; 33],
            CipherSuite::ChaCha20Poly1305,
            None,
            Some(vec![0u8; 16]),
            Vec::new(),
        )
        .unwrap();

        let mut buf = Vec::new();
        codec::write_u8(&mut buf, 0x80 | 0x42).unwrap();
        codec::write_string8(&mut buf, b"ignored payload").unwrap();
        codec::write_u8(&mut buf, TAG_BOX).unwrap();
        PartBox::from_sealed(&sealed).serialize(&mut buf).unwrap();
        codec::write_u8(&mut buf, TAG_TERMINATOR).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let part = Part::parse(&mut cursor).unwrap();
        assert!(part.pubkey.is_none());
    }

    #[test]
    fn short_nonce_in_a_part_box_is_rejected() {
        let recipient = EcPrivateKey::generate(Curve::NistP256);
        let eph = EcPrivateKey::generate(Curve::NistP256);
        let mut sealed = SealedBox::seal(
            &recipient.public_key(),
            &eph,
            &[0u8; 33],
            CipherSuite::ChaCha20Poly1305,
            None,
            Some(vec![0u8; 16]),
            Vec::new(),
        )
        .unwrap();
        sealed.nonce = vec![0u8; 15];

        let mut buf = Vec::new();
        PartBox::from_sealed(&sealed).serialize(&mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(PartBox::parse(&mut cursor), Err(Error::NonceTooShort)));
    }
}
