use chrono::{DateTime, Duration, Utc};
use rust_decimal_macros::dec;

use super::{CandidateItem, ChallengeType, HostIdentity};

pub fn item(id: &str) -> CandidateItem {
    CandidateItem {
        id: id.to_string(),
        title: format!("Challenge {}", id),
        host: HostIdentity {
            user_id: format!("host-{}", id),
            display_name: format!("Host {}", id),
        },
        location: "Mission Courts".to_string(),
        starts_at: DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000),
        rules: "First to 21".to_string(),
        description: "Pickup game".to_string(),
        win_condition: "Highest score".to_string(),
        ticket_price: dec!(5.00),
        challenge_type: ChallengeType::OneToOne,
        host_image_ref: Some(format!("hosts/{}.jpg", id)),
        display_image: None,
    }
}

pub fn items(n: usize) -> Vec<CandidateItem> {
    (0..n).map(|i| item(&format!("c{}", i))).collect()
}
