use clap::{Parser, Subcommand};
use rodeo::config::{self, Config, ConfigError, FlickrConfig};
use rodeo::host::{self, FlickrClient, PhotoHost};
use rodeo::imaging::{self, WebResize};
use rodeo::ledger::LedgerBook;
use rodeo::metadata::{ExifTool, MetadataTool};
use rodeo::output;
use rodeo::publish::{PublishOptions, Publisher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "rodeo")]
#[command(about = "Publish photos to Flickr, driven by their keywords")]
#[command(long_about = "\
Publish photos to Flickr, driven by their keywords

Keywords embedded in each image (read with exiftool) are matched against
the [[rules]] in rodeo.toml. A matching rule can strip keywords before
upload, restrict who may see the photo, and add it to albums. Keywords
that are kept become Flickr tags.

Uploaded files are remembered in a JSON ledger, so running upload twice
on the same folder only publishes what is new.

Files:
  ~/.config/rodeo/rodeo.toml                  Config (--config overrides)
  ~/.config/rodeo/rodeo-uploaded-files.json   Upload ledger

Run 'rodeo gen-config' to generate a documented rodeo.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file [default: ~/.config/rodeo/rodeo.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct UploadArgs {
    /// Image files, or directories of images
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Upload even if the ledger says the file was already uploaded
    #[arg(short, long)]
    force: bool,

    /// Show what would happen without changing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Add every photo to this album, found by id or title
    #[arg(long, value_name = "ID_OR_NAME", conflicts_with = "create_album")]
    album: Option<String>,

    /// Add every photo to the album with this title, creating it if needed
    #[arg(long, value_name = "NAME")]
    create_album: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply keyword rules and upload images to Flickr
    Upload(UploadArgs),
    /// Write a web-sized copy (<name>-web.<ext>) next to each image
    Resize {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the metadata rodeo reads from each image
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List your Flickr albums
    ListAlbums,
    /// Show the effective configuration
    ViewConfig,
    /// Print a stock rodeo.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let load = || -> Result<Config, ConfigError> {
        let config = config::load_config(&config_path)?;
        log::debug!(
            "loaded {} ({} rules)",
            config_path.display(),
            config.rules.len()
        );
        Ok(config)
    };

    match cli.command {
        Command::Upload(args) => upload(&load()?, &config_path, args)?,
        Command::Resize { files } => {
            let config = load()?;
            let backend = imaging::backend_from_config(&config)?;
            let settings = WebResize::try_from(&config.resize).map_err(ConfigError::Validation)?;
            for file in expand_inputs(&files) {
                match imaging::resize_for_web(backend.as_ref(), &file, &settings) {
                    Ok(resized) => {
                        for line in output::format_resized(&file, &resized) {
                            println!("{}", line);
                        }
                    }
                    Err(e) => log::error!("{}: {}", file.display(), e),
                }
            }
        }
        Command::Info { files } => {
            let config = load()?;
            let exiftool = ExifTool::new(config.require_exiftool()?);
            for file in expand_inputs(&files) {
                match exiftool.extract(&file) {
                    Ok(record) => output::print_info(&file, &record),
                    Err(e) => log::error!("{}: {}", file.display(), e),
                }
            }
        }
        Command::ListAlbums => {
            let config = load()?;
            config.flickr.require_credentials()?;
            let albums = FlickrClient::new(&config.flickr).list_albums()?;
            output::print_album_list(&albums);
        }
        Command::ViewConfig => output::print_config(&config_path, &load()?),
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(())
}

fn upload(
    config: &Config,
    config_path: &Path,
    args: UploadArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let exiftool = ExifTool::new(config.require_exiftool()?);
    let needs_albums = args.album.is_some() || args.create_album.is_some();
    if !args.dry_run || needs_albums {
        config.flickr.require_credentials()?;
    }
    let client = FlickrClient::new(&config.flickr);
    let backend = imaging::backend_from_config(config)?;

    let album = match (&args.album, &args.create_album) {
        (Some(query), _) => Some(host::select_album(&client.list_albums()?, query)?),
        (None, Some(name)) => Some(host::album_for_creation(&client.list_albums()?, name)),
        (None, None) => None,
    };
    if let Some(album) = &album {
        println!("Album: {}", album);
    }

    let config_dir = config_path.parent().unwrap_or(Path::new(""));
    let ledger = LedgerBook::new(config.ledger_location(config_dir));
    let options = PublishOptions {
        force: args.force,
        dry_run: args.dry_run,
        album,
        set_date_posted: config.upload.set_date_posted,
    };

    let files = expand_inputs(&args.files);
    let user = link_user(&config.flickr);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer_user = user.clone();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_publish_event(&event, &printer_user) {
                println!("{}", line);
            }
        }
    });
    let summary = Publisher::new(
        &config.rules,
        &exiftool,
        &client,
        backend.as_ref(),
        ledger,
        options,
    )
    .with_events(tx)
    .publish_all(&files);
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;

    output::print_summary(&summary, &user);
    Ok(())
}

/// Name used in photo links: the Flickr user name, else the NSID.
fn link_user(flickr: &FlickrConfig) -> String {
    if flickr.username.trim().is_empty() {
        flickr.user_nsid.trim().to_string()
    } else {
        flickr.username.trim().to_string()
    }
}

/// Replace each directory argument by the supported images directly inside
/// it, sorted by name. Other arguments pass through unchanged.
fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        files.extend(
            WalkDir::new(input)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_supported_image(p)),
        );
    }
    files
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            imaging::supported_input_extensions().contains(&e.to_lowercase().as_str())
        })
        .unwrap_or(false)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
