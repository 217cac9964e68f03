use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use directories::BaseDirs;
use jumpkit_core::{
    export::{ALL_SCRIPTS_FILENAME, render_all},
    profiles::{Profile, ProfileDraft, ProfileId, ProfileKind},
    registry::Registry,
    script::render,
    seed::default_seed,
};
use jumpkit_storage::ProfileStore;

type Result<T> = anyhow::Result<T>;

const DATA_DIR_ENV: &str = "JUMPKIT_DATA_DIR";

#[derive(Parser, Debug)]
#[command(name = "jumpkit", about = "Catalog RDP/SSH hosts and generate launcher scripts")]
struct Cli {
    /// Directory holding servers.json.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List saved profiles.
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        letter: Option<char>,
        #[arg(long)]
        json: bool,
    },
    /// Add a profile, or update the one with the same id or kind and host.
    Save(SaveArgs),
    Remove { id: String },
    /// Print one launcher script, or write it into a directory.
    Render {
        id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the combined script for every profile, or write it to a file.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace all profiles with the records of a JSON array.
    Import { file: PathBuf },
    /// Replace all profiles with the starter set.
    Reset,
}

#[derive(Args, Debug)]
struct SaveArgs {
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    kind: Option<ProfileKind>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    rdp_username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// `false` opens the remote desktop in a window.
    #[arg(long)]
    fullscreen: Option<bool>,
    #[arg(long)]
    admin: Option<bool>,
    #[arg(long)]
    note: Option<String>,
}

impl SaveArgs {
    /// Overlays the given flags on `base`, which is the stored profile when
    /// editing by id.
    fn into_draft(self, base: Option<&Profile>) -> ProfileDraft {
        let mut draft = base.map(Profile::to_draft).unwrap_or_default();
        draft.id = self.id.map(ProfileId::from).or(draft.id);
        if let Some(name) = self.name {
            draft.name = name;
        }
        draft.kind = self.kind.or(draft.kind);
        if let Some(host) = self.host {
            draft.host = host;
        }
        draft.port = self.port.or(draft.port);
        draft.username = self.username.or(draft.username);
        draft.rdp_username = self.rdp_username.or(draft.rdp_username);
        draft.password = self.password.or(draft.password);
        draft.note = self.note.or(draft.note);
        draft.rdp_fullscreen = self.fullscreen.or(draft.rdp_fullscreen);
        draft.rdp_admin = self.admin.or(draft.rdp_admin);
        draft
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("jumpkit failed: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir)?;
    let store = ProfileStore::new(&data_dir);
    tracing::debug!(path = %store.path().display(), "Using profile store");

    let mut registry = Registry::from_profiles(store.load_or_seed()?);

    match cli.command {
        Command::List {
            search,
            letter,
            json,
        } => {
            let found = registry.search(&search, letter);
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                for profile in found {
                    println!("{}", describe(profile));
                }
            }
        }
        Command::Save(args) => {
            let base = args
                .id
                .as_deref()
                .and_then(|id| registry.get(&ProfileId::from(id)))
                .cloned();
            let draft = args.into_draft(base.as_ref());
            let Some(saved) = registry.upsert(&draft) else {
                bail!("A profile needs a name, a host and a kind (rdp or ssh)");
            };
            store.save(registry.profiles())?;
            tracing::info!(id = %saved.id, key = %saved.identity_key(), "Saved profile");
            println!("{}", describe(&saved));
        }
        Command::Remove { id } => match registry.remove(&ProfileId::from(id.as_str())) {
            Some(removed) => {
                store.save(registry.profiles())?;
                tracing::info!(id = %removed.id, "Removed profile");
            }
            None => tracing::warn!(%id, "No profile with that id"),
        },
        Command::Render { id, out } => {
            let profile = lookup(&registry, &id)?;
            let rendered = render(profile);
            match out {
                Some(dir) => {
                    let path = dir.join(&rendered.filename);
                    write_file(&path, &rendered.text)?;
                    println!("{}", path.display());
                }
                None => print!("{}", rendered.text),
            }
        }
        Command::Export { out } => {
            let combined = render_all(&registry);
            match out {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(ALL_SCRIPTS_FILENAME)
                    } else {
                        path
                    };
                    write_file(&path, &combined)?;
                    println!("{}", path.display());
                }
                None => print!("{combined}"),
            }
        }
        Command::Import { file } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let incoming: Vec<ProfileDraft> = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            registry.replace_all(incoming);
            store.save(registry.profiles())?;
            tracing::info!(count = registry.len(), "Replaced profiles from batch");
        }
        Command::Reset => {
            registry = Registry::from_profiles(default_seed());
            store.save(registry.profiles())?;
            tracing::info!(count = registry.len(), "Restored starter profiles");
        }
    }

    Ok(())
}

fn lookup<'a>(registry: &'a Registry, id_or_name: &str) -> Result<&'a Profile> {
    registry
        .get(&ProfileId::from(id_or_name))
        .or_else(|| registry.find_by_name(id_or_name))
        .with_context(|| format!("No profile with id or name `{id_or_name}`"))
}

fn describe(profile: &Profile) -> String {
    format!(
        "{}  {:<3}  {}  {}",
        profile.id,
        profile.kind().label(),
        profile.host,
        profile.name
    )
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote script");
    Ok(())
}

fn init_tracing() {
    use std::sync::OnceLock;
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Ok(dir) = env::var(DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine config directory")?;
    let dir_name = if cfg!(target_os = "linux") {
        "jumpkit"
    } else {
        "Jumpkit"
    };
    Ok(base_dirs.config_dir().join(dir_name))
}
