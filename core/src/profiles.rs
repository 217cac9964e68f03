use std::{fmt, str::FromStr};

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{DeserializeOwned, IgnoredAny},
};
use uuid::Uuid;

pub const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ProfileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ProfileId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Rdp,
    Ssh,
}

impl ProfileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileKind::Rdp => "rdp",
            ProfileKind::Ssh => "ssh",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProfileKind::Rdp => "RDP",
            ProfileKind::Ssh => "SSH",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rdp" => Ok(ProfileKind::Rdp),
            "ssh" => Ok(ProfileKind::Ssh),
            other => bail!("unrecognized profile kind `{other}`"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdpSettings {
    #[serde(default)]
    pub rdp_username: String,
    #[serde(default = "default_fullscreen")]
    pub rdp_fullscreen: bool,
    #[serde(default)]
    pub rdp_admin: bool,
}

impl Default for RdpSettings {
    fn default() -> Self {
        Self {
            rdp_username: String::new(),
            rdp_fullscreen: true,
            rdp_admin: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            username: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Endpoint {
    Rdp(RdpSettings),
    Ssh(SshSettings),
}

impl Endpoint {
    pub fn kind(&self) -> ProfileKind {
        match self {
            Endpoint::Rdp(_) => ProfileKind::Rdp,
            Endpoint::Ssh(_) => ProfileKind::Ssh,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub host: String,
    #[serde(flatten)]
    pub endpoint: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn kind(&self) -> ProfileKind {
        self.endpoint.kind()
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.kind(), &self.host)
    }

    pub fn to_draft(&self) -> ProfileDraft {
        let mut draft = ProfileDraft {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            kind: Some(self.kind()),
            host: self.host.clone(),
            password: self.password.clone(),
            note: Some(self.note.clone()),
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
            ..ProfileDraft::default()
        };
        match &self.endpoint {
            Endpoint::Rdp(rdp) => {
                draft.rdp_username = Some(rdp.rdp_username.clone());
                draft.rdp_fullscreen = Some(rdp.rdp_fullscreen);
                draft.rdp_admin = Some(rdp.rdp_admin);
            }
            Endpoint::Ssh(ssh) => {
                draft.port = Some(ssh.port);
                draft.username = Some(ssh.username.clone());
            }
        }
        draft
    }
}

/// Deduplication key: kind plus the trimmed, lowercased host.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    kind: ProfileKind,
    host: String,
}

impl IdentityKey {
    pub fn new(kind: ProfileKind, host: &str) -> Self {
        Self {
            kind,
            host: host.trim().to_lowercase(),
        }
    }

    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.host)
    }
}

/// Loosely typed profile input. Deserialization never fails on a bad field
/// value; the field is left unset instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<ProfileId>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_kind")]
    pub kind: Option<ProfileKind>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub host: String,
    #[serde(default, deserialize_with = "lenient_port")]
    pub port: Option<u16>,
    #[serde(default, deserialize_with = "lenient")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rdp_username: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rdp_fullscreen: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub rdp_admin: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileDraft {
    pub fn new(kind: ProfileKind, name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            host: host.into(),
            ..Self::default()
        }
    }
}

pub fn is_valid(profile: &Profile) -> bool {
    !profile.name.trim().is_empty() && !profile.host.trim().is_empty()
}

pub fn normalize(draft: &ProfileDraft, kind: ProfileKind) -> Profile {
    normalize_at(draft, kind, Utc::now())
}

pub fn normalize_at(draft: &ProfileDraft, kind: ProfileKind, now: DateTime<Utc>) -> Profile {
    let endpoint = match kind {
        ProfileKind::Rdp => Endpoint::Rdp(RdpSettings {
            rdp_username: trimmed(draft.rdp_username.as_deref()),
            rdp_fullscreen: draft.rdp_fullscreen.unwrap_or(true),
            rdp_admin: draft.rdp_admin.unwrap_or(false),
        }),
        ProfileKind::Ssh => Endpoint::Ssh(SshSettings {
            port: draft.port.unwrap_or(DEFAULT_SSH_PORT),
            username: trimmed(draft.username.as_deref()),
        }),
    };

    Profile {
        id: draft.id.clone().unwrap_or_default(),
        name: draft.name.trim().to_owned(),
        host: draft.host.trim().to_owned(),
        endpoint,
        password: draft
            .password
            .as_deref()
            .map(str::trim)
            .filter(|password| !password.is_empty())
            .map(str::to_owned),
        note: trimmed(draft.note.as_deref()),
        created_at: draft.created_at.unwrap_or(now),
        updated_at: draft.updated_at.unwrap_or(now),
    }
}

fn trimmed(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_owned()
}

fn default_fullscreen() -> bool {
    true
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Value(T),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortInput {
    Integer(u64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Loose<T>>::deserialize(deserializer)? {
        Some(Loose::Value(value)) => Some(value),
        Some(Loose::Other(_)) | None => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, String>(deserializer)?.unwrap_or_default())
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<ProfileKind>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, String>(deserializer)?.and_then(|kind| kind.parse().ok()))
}

fn lenient_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let port = match Option::<PortInput>::deserialize(deserializer)? {
        Some(PortInput::Integer(value)) => u16::try_from(value).ok(),
        Some(PortInput::Float(value))
            if value.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&value) =>
        {
            Some(value as u16)
        }
        Some(PortInput::Text(text)) => text.trim().parse().ok(),
        Some(PortInput::Float(_)) | Some(PortInput::Other(_)) | None => None,
    };
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn ssh_normalization_drops_rdp_fields() {
        let mut draft = ProfileDraft::new(ProfileKind::Ssh, " Box1 ", " 10.0.0.5 ");
        draft.username = Some(" ec2-user ".into());
        draft.rdp_username = Some("administrator".into());
        draft.rdp_admin = Some(true);

        let profile = normalize_at(&draft, ProfileKind::Ssh, at(0));

        assert_eq!(profile.name, "Box1");
        assert_eq!(profile.host, "10.0.0.5");
        assert_eq!(
            profile.endpoint,
            Endpoint::Ssh(SshSettings {
                port: 22,
                username: "ec2-user".into(),
            })
        );
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("rdpUsername").is_none());
        assert!(json.get("rdpFullscreen").is_none());
        assert!(json.get("rdpAdmin").is_none());
        assert_eq!(json["port"], 22);
    }

    #[test]
    fn rdp_normalization_applies_defaults_and_drops_ssh_fields() {
        let mut draft = ProfileDraft::new(ProfileKind::Rdp, "Jumpbox", "10.10.10.10");
        draft.port = Some(2222);
        draft.username = Some("root".into());

        let profile = normalize_at(&draft, ProfileKind::Rdp, at(0));

        assert_eq!(profile.endpoint, Endpoint::Rdp(RdpSettings::default()));
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("port").is_none());
        assert!(json.get("username").is_none());
        assert_eq!(json["kind"], "rdp");
        assert_eq!(json["rdpFullscreen"], true);
        assert_eq!(json["rdpAdmin"], false);
    }

    #[test]
    fn blank_password_is_absent_and_note_is_always_present() {
        let mut draft = ProfileDraft::new(ProfileKind::Ssh, "Box", "host");
        draft.password = Some("   ".into());

        let profile = normalize_at(&draft, ProfileKind::Ssh, at(0));
        assert_eq!(profile.password, None);
        assert_eq!(profile.note, "");

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["note"], "");
    }

    #[test]
    fn password_is_trimmed_when_present() {
        let mut draft = ProfileDraft::new(ProfileKind::Rdp, "Box", "host");
        draft.password = Some(" s3cret ".into());

        let profile = normalize_at(&draft, ProfileKind::Rdp, at(0));
        assert_eq!(profile.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn validity_depends_only_on_name_and_host() {
        let cases = [
            ("Box", "host", true),
            ("  ", "host", false),
            ("Box", " \t", false),
            ("", "", false),
        ];
        for (name, host, expected) in cases {
            for kind in [ProfileKind::Rdp, ProfileKind::Ssh] {
                let draft = ProfileDraft::new(kind, name, host);
                assert_eq!(is_valid(&normalize(&draft, kind)), expected, "{name:?} {host:?}");
            }
        }
    }

    #[test]
    fn identity_key_ignores_host_case_and_padding() {
        let a = IdentityKey::new(ProfileKind::Rdp, " Server.Example.COM ");
        let b = IdentityKey::new(ProfileKind::Rdp, "server.example.com");
        let c = IdentityKey::new(ProfileKind::Ssh, "server.example.com");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "rdp:server.example.com");
    }

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!("RDP".parse::<ProfileKind>().unwrap(), ProfileKind::Rdp);
        assert_eq!(" ssh ".parse::<ProfileKind>().unwrap(), ProfileKind::Ssh);
        assert!("vnc".parse::<ProfileKind>().is_err());
    }

    #[test]
    fn draft_deserialization_is_lenient() {
        let draft: ProfileDraft = serde_json::from_str(
            r#"{
                "id": "1712_abc",
                "name": null,
                "kind": "telnet",
                "host": "h",
                "port": "2222",
                "createdAt": "",
                "rdpAdmin": "yes"
            }"#,
        )
        .unwrap();

        assert_eq!(draft.id, Some(ProfileId::from("1712_abc")));
        assert_eq!(draft.name, "");
        assert_eq!(draft.kind, None);
        assert_eq!(draft.port, Some(2222));
        assert_eq!(draft.created_at, None);
        assert_eq!(draft.rdp_admin, None);
    }

    #[test]
    fn draft_port_coercion() {
        let parse = |raw: &str| {
            serde_json::from_str::<ProfileDraft>(&format!(r#"{{"port": {raw}}}"#))
                .unwrap()
                .port
        };
        assert_eq!(parse("22"), Some(22));
        assert_eq!(parse("2022.0"), Some(2022));
        assert_eq!(parse(r#"" 8022 ""#), Some(8022));
        assert_eq!(parse("70000"), None);
        assert_eq!(parse(r#""abc""#), None);
        assert_eq!(parse("null"), None);
    }

    #[test]
    fn profile_serializes_flat_and_round_trips() {
        let mut draft = ProfileDraft::new(ProfileKind::Ssh, "Box", "h");
        draft.id = Some("fixed".into());
        draft.port = Some(2200);
        let profile = normalize_at(&draft, ProfileKind::Ssh, at(1_700_000_000));

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["id"], "fixed");
        assert_eq!(json["kind"], "ssh");
        assert_eq!(json["createdAt"], "2023-11-14T22:13:20Z");

        let back: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn to_draft_preserves_every_field() {
        let mut draft = ProfileDraft::new(ProfileKind::Rdp, "Box", "h");
        draft.rdp_username = Some("ops".into());
        draft.rdp_fullscreen = Some(false);
        draft.password = Some("pw".into());
        let profile = normalize_at(&draft, ProfileKind::Rdp, at(5));

        assert_eq!(normalize_at(&profile.to_draft(), ProfileKind::Rdp, at(9)), profile);
    }
}
