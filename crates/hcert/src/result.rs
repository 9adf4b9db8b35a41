//! Staged decode outcome.

use std::fmt;

use hcert_core::{Algorithm, ClaimSet, ErrorKind, Kid};
use serde::Serialize;

/// Decode stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Prefix check; bytes are the Base45 body.
    Prefix,
    /// Base45 decode; bytes are the zlib stream.
    Base45,
    /// Decompression; bytes are the envelope.
    Inflate,
    /// Envelope parse; bytes are the protected header.
    Envelope,
    /// Trust store lookup; bytes are the KID.
    KeyLookup,
    /// Signature check; bytes are the canonical signed structure.
    Signature,
    /// Claim set decode; bytes are the payload.
    Claims,
    /// Validity window check against the current time.
    Validity,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prefix => "prefix",
            Stage::Base45 => "base45",
            Stage::Inflate => "inflate",
            Stage::Envelope => "envelope",
            Stage::KeyLookup => "key_lookup",
            Stage::Signature => "signature",
            Stage::Claims => "claims",
            Stage::Validity => "validity",
        };
        f.write_str(name)
    }
}

/// What a stage produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Ok {
        #[serde(with = "hex")]
        bytes: Vec<u8>,
    },
    Failed {
        kind: ErrorKind,
        detail: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// The result of decoding one token.
///
/// Always returned, even when an early stage fails. Stages run in order and
/// stop at the first hard failure; an unknown key or invalid signature is
/// soft, so the claims are still decoded and exposed as unverified.
///
/// Verified claims are only reachable through [`DecodeResult::verified_claims`],
/// which returns `None` unless the signature checked out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodeResult {
    prefix_valid: bool,
    text_decode_ok: bool,
    decompress_ok: bool,
    envelope_parsed: bool,
    kid_found: bool,
    signature_valid: bool,
    expired: bool,
    not_yet_valid: bool,
    kid: Option<Kid>,
    algorithm: Option<Algorithm>,
    claims: Option<ClaimSet>,
    stages: Vec<StageRecord>,
}

impl DecodeResult {
    pub fn prefix_valid(&self) -> bool {
        self.prefix_valid
    }

    pub fn text_decode_ok(&self) -> bool {
        self.text_decode_ok
    }

    pub fn decompress_ok(&self) -> bool {
        self.decompress_ok
    }

    pub fn envelope_parsed(&self) -> bool {
        self.envelope_parsed
    }

    pub fn kid_found(&self) -> bool {
        self.kid_found
    }

    pub fn signature_valid(&self) -> bool {
        self.signature_valid
    }

    /// Set only when the signature verified.
    pub fn expired(&self) -> bool {
        self.expired
    }

    /// Set only when the signature verified.
    pub fn not_yet_valid(&self) -> bool {
        self.not_yet_valid
    }

    /// KID from the envelope, if it parsed and carried one.
    pub fn kid(&self) -> Option<&Kid> {
        self.kid.as_ref()
    }

    /// Algorithm of the trust entry used for verification.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Signed, in-window claims are usable; nothing else is.
    pub fn is_usable(&self) -> bool {
        self.signature_valid && !self.expired && !self.not_yet_valid && self.claims.is_some()
    }

    /// Claims, only when the signature verified.
    pub fn verified_claims(&self) -> Option<&ClaimSet> {
        if self.signature_valid {
            self.claims.as_ref()
        } else {
            None
        }
    }

    /// Claims regardless of the signature outcome. For diagnostics only.
    pub fn unverified_claims(&self) -> Option<&ClaimSet> {
        self.claims.as_ref()
    }

    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    /// Bytes produced by each successful stage, in order.
    pub fn raw_stage_bytes(&self) -> Vec<(Stage, &[u8])> {
        self.stages
            .iter()
            .filter_map(|record| match &record.outcome {
                StageOutcome::Ok { bytes } => Some((record.stage, bytes.as_slice())),
                StageOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// The bytes recorded for one stage, if it succeeded.
    pub fn stage_bytes(&self, stage: Stage) -> Option<&[u8]> {
        self.raw_stage_bytes()
            .into_iter()
            .find_map(|(s, bytes)| (s == stage).then_some(bytes))
    }

    /// The first failed stage and its error kind.
    pub fn failure(&self) -> Option<(Stage, ErrorKind)> {
        self.stages.iter().find_map(|record| match &record.outcome {
            StageOutcome::Failed { kind, .. } => Some((record.stage, *kind)),
            StageOutcome::Ok { .. } => None,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction (pipeline only)
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn pass(&mut self, stage: Stage, bytes: &[u8]) {
        match stage {
            Stage::Prefix => self.prefix_valid = true,
            Stage::Base45 => self.text_decode_ok = true,
            Stage::Inflate => self.decompress_ok = true,
            Stage::Envelope => self.envelope_parsed = true,
            Stage::KeyLookup => self.kid_found = true,
            Stage::Signature => self.signature_valid = true,
            Stage::Claims | Stage::Validity => {}
        }
        self.stages.push(StageRecord {
            stage,
            outcome: StageOutcome::Ok {
                bytes: bytes.to_vec(),
            },
        });
    }

    pub(crate) fn fail(&mut self, stage: Stage, kind: ErrorKind, detail: impl fmt::Display) {
        self.stages.push(StageRecord {
            stage,
            outcome: StageOutcome::Failed {
                kind,
                detail: detail.to_string(),
            },
        });
    }

    pub(crate) fn set_kid(&mut self, kid: Option<Kid>) {
        self.kid = kid;
    }

    pub(crate) fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = Some(algorithm);
    }

    pub(crate) fn set_claims(&mut self, claims: ClaimSet) {
        self.claims = Some(claims);
    }

    pub(crate) fn set_window(&mut self, expired: bool, not_yet_valid: bool) {
        self.expired = expired;
        self.not_yet_valid = not_yet_valid;
    }
}
