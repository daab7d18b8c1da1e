use serde::{Deserialize, Serialize};

use crate::constant::{PivotKind, Strength, Timescale};
use crate::swing::SwingPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrongWeakLevel {
    pub time: i64,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: PivotKind,
    pub strength: Strength,
    pub timescale: Timescale,
}

/// Tags every pivot as strong when `is_swept` reports it consumed by a structure break.
pub fn classify_levels<F>(pivots: &[SwingPoint], is_swept: F) -> Vec<StrongWeakLevel>
where
    F: Fn(&SwingPoint) -> bool,
{
    pivots
        .iter()
        .map(|p| StrongWeakLevel {
            time: p.time,
            price: p.price,
            kind: p.kind,
            strength: if is_swept(p) {
                Strength::Strong
            } else {
                Strength::Weak
            },
            timescale: p.timescale,
        })
        .collect()
}
