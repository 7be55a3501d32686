//! Flyer Studio CLI - Bridge interface for the host application
//!
//! Commands: normalize, resolve, inject, project, generate, validate, placeholders, author
//! Outputs JSON to stdout, logs to stderr
//! Returns non-zero on failure, 2 on a rejected canvas

use clap::{Parser, Subcommand};
use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

use flyerstudio_core::{
    placeholder::unresolved,
    store::{InMemoryDesigns, InMemoryTenants},
    templates::{TemplateDraft, TemplateRegistry},
    validation::ValidationContext,
    inject_template, Bindings, CanvasDocument, Event, FlyerGenerator, StudioConfig, Tenant, Validator,
};

#[derive(Parser)]
#[command(name = "flyerstudio-cli")]
#[command(about = "Flyer Studio CLI - template data binding and zone locking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to templates directory
    #[arg(short, long, default_value = "templates")]
    templates_dir: PathBuf,

    /// Path to a JSON engine config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter spec; RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply zone defaults and lock flags to a canvas
    Normalize {
        /// Canvas JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Replace placeholders in a canvas
    Resolve {
        /// Canvas JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// JSON object of key -> value
        #[arg(short, long)]
        bindings: PathBuf,
    },

    /// Resolve a stored template's canvas by id
    Inject {
        /// Template id in the templates directory
        #[arg(long)]
        template: Uuid,

        /// JSON object of key -> value
        #[arg(short, long)]
        bindings: PathBuf,
    },

    /// Build bindings from an event and its tenant
    Project {
        #[arg(short, long)]
        event: PathBuf,

        #[arg(long)]
        tenant: PathBuf,
    },

    /// Generate the draft flyer for an event
    Generate {
        #[arg(short, long)]
        event: PathBuf,

        #[arg(long)]
        tenant: PathBuf,

        /// User the design is created for
        #[arg(short, long)]
        user: Uuid,
    },

    /// Lint a canvas
    Validate {
        /// Canvas JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Declared template width
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Declared template height
        #[arg(long, requires = "width")]
        height: Option<u32>,
    },

    /// List placeholder keys referenced by a canvas
    Placeholders {
        /// Canvas JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Turn a template draft into a stored template record
    Author {
        /// Template draft JSON file
        #[arg(short, long)]
        draft: PathBuf,

        /// Author of the template
        #[arg(short, long)]
        user: Uuid,
    },
}

fn init_logging(spec: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(spec)?.log_to_stderr().start()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid {}: {}", path.display(), e))
}

fn read_canvas(path: &Path) -> Result<CanvasDocument, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    CanvasDocument::from_json(&content).map_err(|e| format!("Invalid canvas {}: {}", path.display(), e))
}

fn emit<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&format!("Failed to encode output: {}", e)),
    }
}

fn fail(message: &str) -> ExitCode {
    println!("{}", serde_json::json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match init_logging(&cli.log_level) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("logging disabled: {}", e);
            None
        }
    };

    let config = match &cli.config {
        Some(path) => match StudioConfig::load(path) {
            Ok(c) => c,
            Err(e) => return fail(&e.to_string()),
        },
        None => StudioConfig::default(),
    };

    match run(cli.command, &cli.templates_dir, &config) {
        Ok(code) => code,
        Err(message) => fail(&message),
    }
}

fn run(command: Commands, templates_dir: &Path, config: &StudioConfig) -> Result<ExitCode, String> {
    match command {
        Commands::Normalize { input } => {
            let canvas = read_canvas(&input)?;
            Ok(emit(&flyerstudio_core::normalize(&canvas)))
        }

        Commands::Resolve { input, bindings } => {
            let canvas = read_canvas(&input)?;
            let bindings: Bindings = read_json(&bindings)?;
            let resolved = flyerstudio_core::resolve(&canvas, &bindings);
            Ok(emit(&serde_json::json!({
                "canvas": resolved,
                "unresolved": unresolved(&resolved, &bindings),
            })))
        }

        Commands::Inject { template, bindings } => {
            let bindings: Bindings = read_json(&bindings)?;
            let registry = TemplateRegistry::load_from_dir(templates_dir)
                .map_err(|e| format!("Failed to load templates: {}", e))?;
            let resolved = inject_template(&registry, template, &bindings).map_err(|e| e.to_string())?;
            Ok(emit(&serde_json::json!({
                "canvas": resolved,
                "unresolved": unresolved(&resolved, &bindings),
            })))
        }

        Commands::Project { event, tenant } => {
            let event: Event = read_json(&event)?;
            let tenant: Tenant = read_json(&tenant)?;
            let offset = config.reference_offset().map_err(|e| e.to_string())?;
            let bindings = flyerstudio_core::project(&event, &tenant, offset).map_err(|e| e.to_string())?;
            Ok(emit(&bindings))
        }

        Commands::Generate { event, tenant, user } => {
            let mut event: Event = read_json(&event)?;
            let tenant: Tenant = read_json(&tenant)?;
            let registry = TemplateRegistry::load_from_dir(templates_dir)
                .map_err(|e| format!("Failed to load templates: {}", e))?;
            let mut tenants = InMemoryTenants::new();
            tenants.insert(tenant);
            let mut designs = InMemoryDesigns::new();

            let generator = FlyerGenerator::new(&registry, &tenants, config);
            match generator.handle_event_created(&mut designs, &mut event, user) {
                Some(_) => Ok(emit(&serde_json::json!({
                    "success": true,
                    "event": event,
                    "design": designs.designs().first(),
                }))),
                None => {
                    println!("{}", serde_json::json!({ "success": false, "event_id": event.id }));
                    Ok(ExitCode::from(2))
                }
            }
        }

        Commands::Validate { input, width, height } => {
            let canvas = read_canvas(&input)?;
            let mut context = ValidationContext::default();
            if let (Some(w), Some(h)) = (width, height) {
                context = context.with_declared_size(w, h);
            }
            let result = Validator::new(config.failure_mode).validate(&canvas, &context);
            let code = emit(&result);
            if result.valid {
                Ok(code)
            } else {
                Ok(ExitCode::from(2))
            }
        }

        Commands::Placeholders { input } => {
            let canvas = read_canvas(&input)?;
            Ok(emit(&canvas.placeholders()))
        }

        Commands::Author { draft, user } => {
            let draft: TemplateDraft = read_json(&draft)?;
            let mut registry = TemplateRegistry::new();
            let validator = Validator::new(config.failure_mode);
            match registry.create(draft, user, &validator) {
                Ok(template) => Ok(emit(&template)),
                Err(e) => {
                    println!("{}", serde_json::json!({ "success": false, "error": e.to_string() }));
                    Ok(ExitCode::from(2))
                }
            }
        }
    }
}
