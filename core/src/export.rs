use crate::{
    profiles::Profile,
    script::{LINE_END, escape_batch, script_text},
};

pub const ALL_SCRIPTS_FILENAME: &str = "shortcuts_all.bat";

/// Concatenates every profile's script in order, each under a `rem` banner,
/// with a blank line between entries.
pub fn render_all<'a, I>(profiles: I) -> String
where
    I: IntoIterator<Item = &'a Profile>,
{
    profiles
        .into_iter()
        .map(|profile| {
            format!(
                "rem ===== {} ({}) ====={LINE_END}{}",
                escape_batch(&profile.name),
                profile.kind().label(),
                script_text(profile)
            )
        })
        .collect::<Vec<_>>()
        .join(LINE_END)
}
