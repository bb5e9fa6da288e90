use crate::models::plan::PlanKind;

/// A purchasable Stars tariff. The payload string is what comes back in
/// the successful-payment event and is the only plan-selection input.
#[derive(Debug, Clone, Copy)]
pub struct Tariff {
    pub title: &'static str,
    pub payload: &'static str,
    pub stars: u32,
    pub days: i64,
}

impl Tariff {
    pub fn plan(&self) -> PlanKind {
        PlanKind::TimeBoxed { days: self.days }
    }
}

pub const TARIFFS: &[Tariff] = &[Tariff {
    title: "Plus",
    payload: "vpn_plus",
    stars: 100,
    days: 30,
}];

pub fn tariff_for_payload(payload: &str) -> Option<&'static Tariff> {
    TARIFFS.iter().find(|t| t.payload == payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_payload_maps_to_30_days() {
        let tariff = tariff_for_payload("vpn_plus").unwrap();
        assert_eq!(tariff.plan(), PlanKind::TimeBoxed { days: 30 });
    }

    #[test]
    fn unknown_payload_maps_to_none() {
        assert!(tariff_for_payload("vpn_gold").is_none());
    }
}
