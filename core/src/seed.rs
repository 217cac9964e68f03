use chrono::{DateTime, Utc};

use crate::profiles::{Endpoint, Profile, ProfileId, RdpSettings, SshSettings};

// 2024-01-01T00:00:00Z
const SEEDED_AT: i64 = 1_704_067_200;

pub fn default_seed() -> Vec<Profile> {
    let seeded_at = DateTime::<Utc>::from_timestamp(SEEDED_AT, 0).unwrap_or_default();
    vec![
        Profile {
            id: ProfileId::from("seed-rdp-jumpbox"),
            name: "Prod Jumpbox".into(),
            host: "10.10.10.10".into(),
            endpoint: Endpoint::Rdp(RdpSettings {
                rdp_username: "source-control".into(),
                ..RdpSettings::default()
            }),
            password: None,
            note: "Requires VPN".into(),
            created_at: seeded_at,
            updated_at: seeded_at,
        },
        Profile {
            id: ProfileId::from("seed-ssh-build"),
            name: "Build Server".into(),
            host: "10.10.10.20".into(),
            endpoint: Endpoint::Ssh(SshSettings {
                username: "ec2-user".into(),
                ..SshSettings::default()
            }),
            password: None,
            note: String::new(),
            created_at: seeded_at,
            updated_at: seeded_at,
        },
    ]
}
