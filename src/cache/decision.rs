//! Cache decisions and risk classification.

use serde::Serialize;

use super::store::EntryId;

/// How a request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Exact,
    Intent,
    Miss,
}

impl HitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitKind::Exact => "exact",
            HitKind::Intent => "intent",
            HitKind::Miss => "miss",
        }
    }
}

/// Outcome of [`CacheEngine::decide`](super::CacheEngine::decide).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "hit_type", rename_all = "lowercase")]
pub enum Decision {
    /// The normalized prompt itself maps to a live entry.
    Exact { entry_id: EntryId, ttl_remaining: f64 },
    /// A different phrasing with the same intent key maps to a live entry.
    Intent {
        entry_id: EntryId,
        ttl_remaining: f64,
        confidence: f64,
        intent_key: String,
    },
    Miss,
}

impl Decision {
    pub fn kind(&self) -> HitKind {
        match self {
            Decision::Exact { .. } => HitKind::Exact,
            Decision::Intent { .. } => HitKind::Intent,
            Decision::Miss => HitKind::Miss,
        }
    }

    pub fn is_hit(&self) -> bool {
        !matches!(self, Decision::Miss)
    }

    pub fn entry_id(&self) -> Option<&str> {
        match self {
            Decision::Exact { entry_id, .. } | Decision::Intent { entry_id, .. } => {
                Some(entry_id.as_str())
            }
            Decision::Miss => None,
        }
    }

    /// 1.0 for exact hits, the extractor's score for intent hits, 0.0 on a miss.
    pub fn confidence(&self) -> f64 {
        match self {
            Decision::Exact { .. } => 1.0,
            Decision::Intent { confidence, .. } => *confidence,
            Decision::Miss => 0.0,
        }
    }

    /// Seconds until the served entry expires; 0.0 on a miss.
    pub fn ttl_remaining(&self) -> f64 {
        match self {
            Decision::Exact { ttl_remaining, .. } | Decision::Intent { ttl_remaining, .. } => {
                *ttl_remaining
            }
            Decision::Miss => 0.0,
        }
    }

    pub fn risk(&self) -> Risk {
        classify_risk(self.kind(), self.confidence(), self.ttl_remaining())
    }
}

/// How far a caller should trust a served decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    None,
    Low,
    Medium,
    High,
}

impl Risk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Risk::None => "none",
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        }
    }
}

impl std::fmt::Display for Risk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum confidence before a non-exact decision counts as trustworthy.
pub const HIGH_RISK_CONFIDENCE: f64 = 0.6;
/// Remaining lifetime (seconds) below which a hit is about to go stale.
pub const MEDIUM_RISK_TTL_SECS: f64 = 10.0;

pub fn classify_risk(kind: HitKind, confidence: f64, ttl_remaining: f64) -> Risk {
    if kind == HitKind::Exact {
        return Risk::None;
    }
    if confidence < HIGH_RISK_CONFIDENCE {
        return Risk::High;
    }
    if ttl_remaining < MEDIUM_RISK_TTL_SECS {
        return Risk::Medium;
    }
    Risk::Low
}
